use reqwest::StatusCode;
use std::error::Error as StdError;
use url::Url;

/// Boxed error used for opaque failures coming from collaborators.
pub type BoxError = Box<dyn StdError + Send + Sync>;

// Custom error type for fetch operations
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("Server returned status code {status} for {uri}")]
    NetworkStatus { status: StatusCode, uri: Url },

    #[error("Empty payload received from {uri}")]
    EmptyPayload { uri: Url },

    #[error("Transport error: {0}")]
    Transport(BoxError),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Invalid header: {0}")]
    InvalidHeader(String),

    #[error("Invalid scale {0}: must be a finite positive number")]
    InvalidScale(f64),

    #[error("Failed to build HTTP client: {0}")]
    ClientBuild(String),

    #[error("Invalid proxy configuration: {0}")]
    Proxy(String),

    #[error("Decode error: {0}")]
    Decode(BoxError),

    #[error("Load panicked: {0}")]
    Panicked(String),

    #[error("Operation cancelled")]
    Cancelled,
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        FetchError::Transport(Box::new(err))
    }
}

impl FetchError {
    /// The resolved URI this failure refers to, when there is one.
    pub fn uri(&self) -> Option<&Url> {
        match self {
            FetchError::NetworkStatus { uri, .. } | FetchError::EmptyPayload { uri } => Some(uri),
            _ => None,
        }
    }
}
