use thiserror::Error;

/// Errors from the durable key/value store behind the session and quota blobs.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("storage connection error: {0}")]
    Connection(String),

    #[error("query error: {0}")]
    Query(String),

    #[error("io error: {0}")]
    Io(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<std::io::Error> for RepositoryError {
    fn from(err: std::io::Error) -> Self {
        RepositoryError::Io(err.to_string())
    }
}

/// A remote call that did not produce a usable answer, already classified.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    /// HTTP 401: the credential was rejected.
    #[error("not authenticated")]
    Unauthorized,

    /// HTTP 402, or a body flagged `needSubscription`.
    #[error("subscription required")]
    SubscriptionRequired { message: Option<String> },

    /// Any other non-OK status.
    #[error("server error (HTTP {status}): {message}")]
    Status { status: u16, message: String },

    /// No response at all (connect failure, timeout, reset).
    #[error("network error: {0}")]
    Network(String),

    /// A response arrived but its body was not what the contract promises.
    #[error("malformed response: {0}")]
    Deserialization(String),
}

impl BackendError {
    /// Transient failures carry no information about the server's state.
    pub fn is_transient(&self) -> bool {
        matches!(self, BackendError::Network(_) | BackendError::Deserialization(_))
    }
}

/// Operation-level errors for account, history and payment flows.
#[derive(Debug, Error)]
pub enum ClientError {
    /// No credential on this device. Not retryable: send the user to login.
    #[error("not authenticated")]
    NotAuthenticated,

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error(transparent)]
    Storage(#[from] RepositoryError),
}

/// Errors from the speech capture/synthesis capability.
#[derive(Debug, Error)]
pub enum SpeechError {
    #[error("speech is not supported on this device")]
    Unsupported,

    #[error("speech engine failed: {0}")]
    Failed(String),
}
