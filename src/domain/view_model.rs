// The reconciled, presentation-ready snapshot of synchronization state
use super::connection::ConnectionState;
use super::cursor::PageCursor;
use super::telemetry::{SimUsage, TelemetryPoint};
use crate::error::ErrorKind;

/// One independently polled data source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeedKind {
    Latest,
    Path,
    Status,
    Usage,
}

impl FeedKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Latest => "latest",
            Self::Path => "path",
            Self::Status => "status",
            Self::Usage => "usage",
        }
    }
}

/// What went wrong on a feed's last tick, with enough detail for the shell
/// to render "error with retry count" without recomputing anything.
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorInfo {
    pub feed: FeedKind,
    pub kind: ErrorKind,
    pub attempts: u32,
    pub message: String,
}

/// The only entity the presentation layer reads. Replaced wholesale on every
/// applied tick; only the reconciler constructs one.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncViewModel {
    pub latest_point: Option<TelemetryPoint>,
    pub latest_is_stale: bool,
    /// Current page of the historical trail, most-recent-first as received.
    pub path: Vec<TelemetryPoint>,
    pub connection: ConnectionState,
    pub usage: Option<SimUsage>,
    pub cursor: PageCursor,
    pub last_error: Option<ErrorInfo>,
}

impl SyncViewModel {
    pub fn initial(page_size: u32) -> Self {
        Self {
            latest_point: None,
            latest_is_stale: false,
            path: Vec::new(),
            connection: ConnectionState::default(),
            usage: None,
            cursor: PageCursor::new(page_size),
            last_error: None,
        }
    }

    /// True before the first successful or failed tick has landed.
    pub fn is_loading(&self) -> bool {
        self.latest_point.is_none() && self.last_error.is_none()
    }
}
