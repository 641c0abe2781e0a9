use thiserror::Error;

/// Failure modes specific to talking to the school's booking API. Mapped
/// onto [`guard_protocol::ErrorKind`] at the crate boundary so callers in
/// `guard-core`, `guard-reconcile`, and `guard-dispatch` never match on
/// transport details.
#[derive(Debug, Error)]
pub enum SchoolApiError {
    #[error("login rejected by the school API")]
    BadCredentials,

    #[error("school API request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("school API returned an unexpected response for {url}: {reason}")]
    Decode { url: String, reason: String },

    #[error("school API returned {status} for {method} {url}: {body}")]
    Status {
        method: &'static str,
        url: String,
        status: reqwest::StatusCode,
        body: String,
    },
}

impl From<SchoolApiError> for guard_protocol::ErrorKind {
    fn from(err: SchoolApiError) -> Self {
        match err {
            SchoolApiError::BadCredentials => guard_protocol::ErrorKind::NotAuthenticated,
            SchoolApiError::Status { status, .. } if status.is_client_error() => {
                guard_protocol::ErrorKind::NotAuthenticated
            }
            other => guard_protocol::ErrorKind::ExternalTransient(other.to_string()),
        }
    }
}
