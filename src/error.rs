use thiserror::Error;

/// Failures surfaced by the nutrition session.
///
/// `Cancelled` is control flow, not a failure: callers swallow it.
#[derive(Debug, Error)]
pub enum ClientError {
    /// No response reached the client.
    #[error("network error: {0}")]
    Network(String),

    /// The nutrition service answered with a non-2xx status.
    #[error("nutrition service returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// The request was superseded on its channel or the gateway was torn down.
    #[error("request cancelled")]
    Cancelled,

    /// Bad input caught locally, before any request was issued.
    #[error("validation failed: {0}")]
    Validation(String),

    /// A 2xx response whose body did not match the expected shape.
    #[error("malformed response: {0}")]
    Decode(String),

    /// A 2xx response reporting `success: false`.
    #[error("rejected by nutrition service: {0}")]
    Rejected(String),

    /// An exclusive operation is already in flight.
    #[error("{0} already in progress")]
    Busy(&'static str),
}

impl ClientError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ClientError::Cancelled)
    }

    /// Errors that soft paths (autocomplete, suggestion loads, daily summary)
    /// degrade to an empty or unchanged result.
    pub fn is_soft(&self) -> bool {
        matches!(
            self,
            ClientError::Network(_) | ClientError::Http { .. } | ClientError::Decode(_)
        )
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        ClientError::Validation(msg.into())
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            return ClientError::Decode(e.to_string());
        }
        match e.status() {
            Some(status) => ClientError::Http {
                status: status.as_u16(),
                body: String::new(),
            },
            None => ClientError::Network(e.to_string()),
        }
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(e: serde_json::Error) -> Self {
        ClientError::Decode(e.to_string())
    }
}
