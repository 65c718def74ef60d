use crate::entity::EntityKind;

/// Failure of a single request made through a [`ContentFetcher`].
///
/// Callers above the fetcher treat every variant the same way ("this fetch
/// failed"); the variants only keep the original cause for logs and messages.
///
/// [`ContentFetcher`]: crate::fetcher::ContentFetcher
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    #[error("request to {url} failed: {message}")]
    Network { url: String, message: String },

    #[error("request to {url} returned status {status}")]
    Status { url: String, status: u16 },

    #[error("invalid payload from {url}: {message}")]
    Parse { url: String, message: String },
}

impl FetchError {
    pub fn url(&self) -> &str {
        match self {
            FetchError::Network { url, .. }
            | FetchError::Status { url, .. }
            | FetchError::Parse { url, .. } => url,
        }
    }
}

/// Unified error type for the multiverse crate.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("{kind} {id} not found")]
    NotFound { kind: EntityKind, id: u32 },

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias using [`ClientError`].
pub type ClientResult<T> = Result<T, ClientError>;
