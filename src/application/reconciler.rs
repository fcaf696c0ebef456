// Merges feed tick results into the single published view-model
use crate::domain::connection::{ConnectionState, ConnectivitySource};
use crate::domain::cursor::PageCursor;
use crate::domain::freshness::{age_minutes, is_fresh};
use crate::domain::telemetry::{Detection, SimUsage};
use crate::domain::view_model::{ErrorInfo, FeedKind, SyncViewModel};
use crate::error::SyncError;
use chrono::{DateTime, Utc};

/// Successful payload of one tick.
#[derive(Debug)]
pub enum FeedData {
    Latest(Option<Detection>),
    Path {
        detections: Vec<Detection>,
        /// Cursor the fetch was issued with; `has_more` is recomputed from
        /// the page fullness on apply.
        cursor: PageCursor,
    },
    Status(ConnectionState),
    Usage(SimUsage),
}

/// One tick's outcome, as delivered to the reconcile loop.
#[derive(Debug)]
pub struct FeedEvent {
    pub feed: FeedKind,
    /// Poller epoch the tick was issued under; stale epochs are dropped
    /// before `apply` is ever called.
    pub epoch: u64,
    pub attempts: u32,
    pub payload: Result<FeedData, SyncError>,
}

/// Exclusive owner of `SyncViewModel` construction. `apply` is synchronous
/// and always yields a complete snapshot from the previous one plus the new
/// event.
///
/// Events are applied in arrival order. A later-completing older tick can
/// overwrite a newer result; that matches the dashboard this core replaces,
/// and latest-result-wins-by-completion-time is kept deliberately rather
/// than adding issue-time sequence numbers.
pub struct Reconciler {
    view: SyncViewModel,
    connectivity: ConnectivitySource,
    freshness_window_minutes: i64,
}

impl Reconciler {
    pub fn new(
        connectivity: ConnectivitySource,
        freshness_window_minutes: i64,
        page_size: u32,
    ) -> Self {
        Self {
            view: SyncViewModel::initial(page_size),
            connectivity,
            freshness_window_minutes,
        }
    }

    pub fn view(&self) -> &SyncViewModel {
        &self.view
    }

    pub fn apply(&mut self, event: FeedEvent, now: DateTime<Utc>) -> SyncViewModel {
        let mut next = self.view.clone();

        match event.payload {
            Ok(FeedData::Latest(detection)) => {
                next.last_error = None;
                if let Some(detection) = detection {
                    let timestamp = detection.point.timestamp_utc;
                    let fresh = is_fresh(timestamp, now, self.freshness_window_minutes);
                    next.latest_is_stale = !fresh;
                    if !fresh {
                        // The fetch itself worked; the payload is just old.
                        // Still applied, but surfaced as a stale-data error
                        // so the shell can render the state distinctly.
                        let err = SyncError::Stale {
                            age_minutes: age_minutes(timestamp, now),
                        };
                        next.last_error = Some(ErrorInfo {
                            feed: FeedKind::Latest,
                            kind: err.kind(),
                            attempts: event.attempts,
                            message: err.to_string(),
                        });
                    }
                    if self.connectivity == ConnectivitySource::DerivedFromLatest {
                        next.connection = if fresh {
                            ConnectionState::connected(timestamp)
                        } else {
                            ConnectionState::disconnected(Some(timestamp), None)
                        };
                    }
                    next.latest_point = Some(detection.point);
                }
            }
            Ok(FeedData::Path { detections, cursor }) => {
                // Full replacement of the displayed window, never an append.
                next.cursor = cursor.after_fetch(detections.len());
                next.path = detections.into_iter().map(|d| d.point).collect();
            }
            Ok(FeedData::Status(state)) => {
                if self.connectivity == ConnectivitySource::StatusFeed {
                    next.connection = state;
                }
            }
            Ok(FeedData::Usage(usage)) => {
                next.usage = Some(usage);
            }
            Err(err) => {
                tracing::debug!(feed = event.feed.name(), error = %err, "feed tick failed");
                if self.is_connectivity_source(event.feed) {
                    next.connection.connected = false;
                }
                next.last_error = Some(ErrorInfo {
                    feed: event.feed,
                    kind: err.kind(),
                    attempts: event.attempts,
                    message: err.to_string(),
                });
            }
        }

        self.view = next.clone();
        next
    }

    fn is_connectivity_source(&self, feed: FeedKind) -> bool {
        match self.connectivity {
            ConnectivitySource::DerivedFromLatest => feed == FeedKind::Latest,
            ConnectivitySource::StatusFeed => feed == FeedKind::Status,
        }
    }
}
