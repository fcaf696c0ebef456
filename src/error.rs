// Error taxonomy shared across the sync core
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("network error: {source}")]
    Network {
        #[source]
        source: reqwest::Error,
    },

    #[error("backend returned HTTP {status}")]
    Http { status: u16 },

    #[error("malformed payload: {message}")]
    Parse { message: String },

    #[error("payload is {age_minutes} minutes old, outside the freshness window")]
    Stale { age_minutes: i64 },

    #[error("operation cancelled")]
    Cancelled,
}

impl SyncError {
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Network { .. } => ErrorKind::Network,
            Self::Http { .. } => ErrorKind::Http,
            Self::Parse { .. } => ErrorKind::Parse,
            Self::Stale { .. } => ErrorKind::Stale,
            Self::Cancelled => ErrorKind::Cancelled,
        }
    }
}

impl From<reqwest::Error> for SyncError {
    fn from(source: reqwest::Error) -> Self {
        Self::Network { source }
    }
}

/// Payload-free mirror of the taxonomy, carried on the view-model so the
/// presentation shell can distinguish error states without recomputing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Network,
    Http,
    Parse,
    Stale,
    Cancelled,
}
