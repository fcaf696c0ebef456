// Repository trait for backend data access
use crate::domain::connection::ConnectionState;
use crate::domain::telemetry::{Detection, SimUsage};
use crate::error::SyncError;
use async_trait::async_trait;

#[async_trait]
pub trait VehicleRepository: Send + Sync {
    /// Newest detection, for the live-marker feed.
    async fn latest_detection(&self) -> Result<Option<Detection>, SyncError>;

    /// One page of the detections feed, newest first.
    async fn detections_page(&self, skip: u32, limit: u32) -> Result<Vec<Detection>, SyncError>;

    /// Full dump from the past-detections endpoint.
    async fn past_detections(&self) -> Result<Vec<Detection>, SyncError>;

    /// Device status from the dedicated status endpoint.
    async fn device_status(&self) -> Result<ConnectionState, SyncError>;

    /// SIM balance / data usage.
    async fn sim_usage(&self) -> Result<SimUsage, SyncError>;
}
