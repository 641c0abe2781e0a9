//! The one seam between `guard-core`'s pure state machine and wall-clock
//! time: a `Clock` trait drivers pass `now()` through, and a small set of
//! whole-minute arithmetic helpers every transition in `guard-core` uses to
//! compare timestamps. Kept dependency-free beyond `chrono` so it can sit
//! underneath every other crate in the workspace.

use chrono::DateTime;
use chrono::Duration;
use chrono::Utc;

/// A source of the current instant. Production code uses [`SystemClock`];
/// tests use a fixed or steppable fake so transition tests never race the
/// real clock.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// The production clock: wall time via `Utc::now()`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that always returns a fixed instant, settable by tests.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// `deadline + minutes`, saturating rather than panicking on overflow.
pub fn add_minutes(instant: DateTime<Utc>, minutes: i64) -> DateTime<Utc> {
    instant + Duration::minutes(minutes)
}

/// Whole minutes from `from` to `to`, truncated toward zero. Negative when
/// `to` precedes `from`.
pub fn minutes_between(from: DateTime<Utc>, to: DateTime<Utc>) -> i64 {
    (to - from).num_minutes()
}

/// True once `now` has reached or passed `deadline`.
pub fn has_elapsed(deadline: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    now >= deadline
}

/// True when `now` is still more than `threshold_minutes` away from
/// `instant` — the "plenty of lead time left" check `WHITELISTED` uses to
/// decide whether to leave a slot alone.
pub fn more_than_minutes_away(instant: DateTime<Utc>, now: DateTime<Utc>, threshold_minutes: i64) -> bool {
    minutes_between(now, instant) > threshold_minutes
}
