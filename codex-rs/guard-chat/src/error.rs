use thiserror::Error;

/// Failure modes specific to the chat transport. Mapped onto
/// [`guard_protocol::ErrorKind`] at the crate boundary.
#[derive(Debug, Error)]
pub enum ChatApiError {
    #[error("callback payload exceeds 64 bytes: {0:?}")]
    PayloadTooLong(String),

    #[error("chat API request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("chat API returned an unexpected response for {url}: {reason}")]
    Decode { url: String, reason: String },

    #[error("chat API returned {status} for {method} {url}: {body}")]
    Status {
        method: &'static str,
        url: String,
        status: reqwest::StatusCode,
        body: String,
    },
}

impl From<ChatApiError> for guard_protocol::ErrorKind {
    fn from(err: ChatApiError) -> Self {
        match err {
            ChatApiError::PayloadTooLong(_) => guard_protocol::ErrorKind::InvalidInput(err.to_string()),
            other => guard_protocol::ErrorKind::ExternalTransient(other.to_string()),
        }
    }
}
