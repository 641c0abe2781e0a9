use thiserror::Error;

/// The closed alphabet of failure modes a reviewer-facing operation can
/// raise. See spec §7. Every adapter and driver crate maps its own
/// lower-level errors into one of these before it crosses a component
/// boundary, so `guard-core` and `guard-dispatch` never have to match on
/// transport-specific error types.
#[derive(Debug, Clone, Error)]
pub enum ErrorKind {
    /// No credential on file for this login, or the stored credential was
    /// rejected by the school's auth endpoint.
    #[error("not authenticated")]
    NotAuthenticated,

    /// A credential was expected in the vault but is missing or expired
    /// beyond repair.
    #[error("tokens missing")]
    TokensMissing,

    /// A booking referenced a notification id the school no longer has.
    #[error("notification missing")]
    NotificationMissing,

    /// A notification referenced a project the family index has never seen,
    /// even after a refresh.
    #[error("project unknown")]
    ProjectUnknown,

    /// A booking or notification was stale relative to the calendar by the
    /// time the bot acted on it.
    #[error("booking stale")]
    BookingStale,

    /// A downstream call failed in a way that is expected to be transient
    /// (timeout, 5xx, connection reset). Safe to retry next tick.
    #[error("external call failed transiently: {0}")]
    ExternalTransient(String),

    /// A caller supplied a value outside its accepted range or shape.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The chat user issuing a command is not the reviewer the conversation
    /// belongs to.
    #[error("access denied")]
    AccessDenied,

    /// An invariant the state machine depends on was violated. Not
    /// retryable; the affected review is abandoned and logged.
    #[error("fatal: {0}")]
    Fatal(String),
}
