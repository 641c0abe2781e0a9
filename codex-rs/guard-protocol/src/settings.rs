use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

/// An inclusive `[min, max]` bound on a single numeric tunable, expressed in
/// minutes. Used both to validate `set_*` chat commands and to render the
/// allowed range back to the reviewer on a rejected value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingRange {
    pub min: i64,
    pub max: i64,
    /// The allowed values must land on this step relative to `min`. `1`
    /// means every integer in range is valid.
    pub step: i64,
}

impl SettingRange {
    pub const fn new(min: i64, max: i64, step: i64) -> Self {
        Self { min, max, step }
    }

    pub fn contains(self, value: i64) -> bool {
        value >= self.min && value <= self.max && (value - self.min) % self.step == 0
    }
}

#[derive(Debug, Clone, Error)]
#[error("{field} must be between {range_min} and {range_max} minutes in steps of {range_step}, got {value}")]
pub struct SettingValidationError {
    pub field: &'static str,
    pub value: i64,
    pub range_min: i64,
    pub range_max: i64,
    pub range_step: i64,
}

#[derive(Debug, Clone, Error)]
#[error("{field} must be one of {allowed:?}")]
pub struct BoolSettingValidationError {
    pub field: &'static str,
    pub allowed: &'static [&'static str],
}

/// The seven per-reviewer tunables that parameterize `guard-core`'s `step`
/// function. See spec §3. Five are whole-minute durations; the remaining
/// two are on/off switches for whether a reviewer wants a heads-up chat
/// message on an auto-cancel they didn't have to act on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewerSettings {
    /// How long before `review_start` the reviewer must have responded by.
    /// `decision_deadline = review_start - response_deadline_shift_minutes`.
    pub response_deadline_shift_minutes: i64,
    /// How long a `NOT_WHITELISTED` review sits armed before it auto-cancels.
    pub non_whitelist_cancel_delay_minutes: i64,
    /// Whether a timed-out `WAITING_FOR_APPROVE` sends a heads-up message
    /// before auto-cancelling.
    pub notify_whitelist_timeout: bool,
    /// Whether an auto-cancelled non-whitelisted review sends a heads-up
    /// message before cancelling the slot.
    pub notify_non_whitelist_cancel: bool,
    /// How close to `review_start` a whitelisted review must be before the
    /// bot stops trying to shift it and instead asks the reviewer directly.
    pub slot_shift_threshold_minutes: i64,
    /// How far before `review_start` a shifted whitelisted slot is moved to.
    pub slot_shift_duration_minutes: i64,
    /// Slots shorter than this, measured from `review_start` to
    /// `review_end`, are cancelled outright rather than shifted.
    pub cleanup_duration_minutes: i64,
}

const RESPONSE_DEADLINE_SHIFT: SettingRange = SettingRange::new(1, 60, 1);
const NON_WHITELIST_CANCEL_DELAY: SettingRange = SettingRange::new(1, 10, 1);
const SLOT_SHIFT_THRESHOLD: SettingRange = SettingRange::new(5, 60, 5);
const SLOT_SHIFT_DURATION: SettingRange = SettingRange::new(15, 60, 15);
const CLEANUP_DURATION_ALLOWED: [i64; 4] = [15, 30, 45, 60];

impl ReviewerSettings {
    /// Seeded onto every newly registered reviewer. See spec §3.
    pub fn defaults() -> Self {
        Self {
            response_deadline_shift_minutes: 20,
            non_whitelist_cancel_delay_minutes: 5,
            notify_whitelist_timeout: true,
            notify_non_whitelist_cancel: true,
            slot_shift_threshold_minutes: 25,
            slot_shift_duration_minutes: 15,
            cleanup_duration_minutes: 15,
        }
    }

    /// The valid range for a numeric field, used by `set_*` commands.
    /// `cleanup_duration_minutes` is an enum rather than a range — see
    /// [`Self::cleanup_duration_allowed`].
    pub fn range_for(field: &str) -> Option<SettingRange> {
        match field {
            "response_deadline_shift_minutes" => Some(RESPONSE_DEADLINE_SHIFT),
            "non_whitelist_cancel_delay_minutes" => Some(NON_WHITELIST_CANCEL_DELAY),
            "slot_shift_threshold_minutes" => Some(SLOT_SHIFT_THRESHOLD),
            "slot_shift_duration_minutes" => Some(SLOT_SHIFT_DURATION),
            _ => None,
        }
    }

    /// The closed set of values `cleanup_duration_minutes` may take.
    pub fn cleanup_duration_allowed() -> &'static [i64] {
        &CLEANUP_DURATION_ALLOWED
    }

    /// Validate and apply a single named numeric field, returning the
    /// updated settings on success. `cleanup_duration_minutes` is handled by
    /// [`Self::with_cleanup_duration`]; the two boolean fields by
    /// [`Self::with_bool_field`].
    pub fn with_field(mut self, field: &str, value: i64) -> Result<Self, SettingValidationError> {
        let range = Self::range_for(field).ok_or(SettingValidationError {
            field: "unknown",
            value,
            range_min: 0,
            range_max: 0,
            range_step: 0,
        })?;
        if !range.contains(value) {
            return Err(SettingValidationError {
                field: Self::static_name(field).unwrap_or("unknown"),
                value,
                range_min: range.min,
                range_max: range.max,
                range_step: range.step,
            });
        }
        match field {
            "response_deadline_shift_minutes" => self.response_deadline_shift_minutes = value,
            "non_whitelist_cancel_delay_minutes" => self.non_whitelist_cancel_delay_minutes = value,
            "slot_shift_threshold_minutes" => self.slot_shift_threshold_minutes = value,
            "slot_shift_duration_minutes" => self.slot_shift_duration_minutes = value,
            _ => unreachable!("range_for would have returned None"),
        }
        Ok(self)
    }

    /// Validate and apply `cleanup_duration_minutes`, the one enum-valued
    /// field among the five durations.
    pub fn with_cleanup_duration(mut self, value: i64) -> Result<Self, SettingValidationError> {
        if !CLEANUP_DURATION_ALLOWED.contains(&value) {
            return Err(SettingValidationError {
                field: "cleanup_duration_minutes",
                value,
                range_min: CLEANUP_DURATION_ALLOWED[0],
                range_max: *CLEANUP_DURATION_ALLOWED.last().expect("non-empty"),
                range_step: 15,
            });
        }
        self.cleanup_duration_minutes = value;
        Ok(self)
    }

    /// Apply one of the two boolean toggles by name.
    pub fn with_bool_field(mut self, field: &str, value: bool) -> Result<Self, BoolSettingValidationError> {
        match field {
            "notify_whitelist_timeout" => self.notify_whitelist_timeout = value,
            "notify_non_whitelist_cancel" => self.notify_non_whitelist_cancel = value,
            _ => {
                return Err(BoolSettingValidationError {
                    field: "unknown",
                    allowed: &["notify_whitelist_timeout", "notify_non_whitelist_cancel"],
                })
            }
        }
        Ok(self)
    }

    fn static_name(field: &str) -> Option<&'static str> {
        match field {
            "response_deadline_shift_minutes" => Some("response_deadline_shift_minutes"),
            "non_whitelist_cancel_delay_minutes" => Some("non_whitelist_cancel_delay_minutes"),
            "slot_shift_threshold_minutes" => Some("slot_shift_threshold_minutes"),
            "slot_shift_duration_minutes" => Some("slot_shift_duration_minutes"),
            "cleanup_duration_minutes" => Some("cleanup_duration_minutes"),
            _ => None,
        }
    }
}

impl Default for ReviewerSettings {
    fn default() -> Self {
        Self::defaults()
    }
}
