// Client-side synchronization core for the vehicle-tracking dashboard.
//
// Keeps a presentation shell's view of a remote vehicle (position, speed,
// sign detections, connectivity, SIM usage) consistent with an
// eventually-consistent HTTP backend: polling, retry, staleness
// classification, cursor pagination, and reconciliation into one immutable
// view-model. The shell subscribes to snapshots and feeds paging intents
// back in; it never touches sync state directly.
pub mod application;
pub mod domain;
pub mod error;
pub mod infrastructure;

pub use application::repository::VehicleRepository;
pub use application::sync_service::SyncService;
pub use domain::view_model::SyncViewModel;
pub use error::{ErrorKind, SyncError};
pub use infrastructure::backend_api::BackendApi;
pub use infrastructure::config::{SyncSettings, load_sync_settings};
pub use infrastructure::http_client::EndpointClient;
