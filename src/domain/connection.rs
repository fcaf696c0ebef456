// Device connectivity domain model
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ConnectionState {
    pub connected: bool,
    pub last_seen: Option<DateTime<Utc>>,
    pub message: Option<String>,
}

impl ConnectionState {
    pub fn connected(last_seen: DateTime<Utc>) -> Self {
        Self {
            connected: true,
            last_seen: Some(last_seen),
            message: None,
        }
    }

    pub fn disconnected(last_seen: Option<DateTime<Utc>>, message: Option<String>) -> Self {
        Self {
            connected: false,
            last_seen,
            message,
        }
    }
}

/// Where the connectivity flag comes from. The backend grew two variants
/// over time; the core supports both behind one switch chosen at
/// construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectivitySource {
    /// Synthesized from the latest detection's recency.
    DerivedFromLatest,
    /// Fetched from the dedicated device-status endpoint.
    StatusFeed,
}
