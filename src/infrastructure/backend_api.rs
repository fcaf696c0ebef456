// HTTP-backed repository for the vehicle-tracking backend
use crate::application::repository::VehicleRepository;
use crate::domain::connection::ConnectionState;
use crate::domain::telemetry::{Detection, SimUsage, TelemetryPoint};
use crate::error::SyncError;
use crate::infrastructure::http_client::EndpointClient;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;

#[derive(Debug, Clone)]
pub struct BackendApi {
    client: EndpointClient,
}

/// Wire shape of one detection row. The backend is loose about optional
/// fields; everything beyond coordinates and timestamp may be absent, and
/// `id` has been observed as both number and string.
#[derive(Debug, Deserialize)]
struct DetectionRow {
    #[serde(default)]
    id: Option<serde_json::Value>,
    latitude: f64,
    longitude: f64,
    #[serde(default)]
    speed: f64,
    timestamp: String,
    #[serde(default)]
    sign_type: Option<String>,
    #[serde(default)]
    image: Option<String>,
}

impl DetectionRow {
    fn into_detection(self) -> Option<Detection> {
        let timestamp = match DateTime::parse_from_rfc3339(&self.timestamp) {
            Ok(t) => t.with_timezone(&Utc),
            Err(err) => {
                tracing::debug!(timestamp = %self.timestamp, error = %err, "skipping row with unparseable timestamp");
                return None;
            }
        };
        let id = match self.id {
            Some(serde_json::Value::String(s)) => s,
            Some(other) => other.to_string(),
            // No id on the wire; the timestamp is the best stable key left.
            None => self.timestamp.clone(),
        };
        Some(Detection::new(
            id,
            TelemetryPoint::new(self.latitude, self.longitude, self.speed, timestamp),
            self.sign_type,
            self.image,
        ))
    }
}

/// The detections endpoints answer either `{ "data": [...] }` or a bare
/// array, depending on backend version. Accept both.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum DetectionEnvelope {
    Wrapped { data: Vec<DetectionRow> },
    Bare(Vec<DetectionRow>),
}

impl DetectionEnvelope {
    fn rows(self) -> Vec<DetectionRow> {
        match self {
            Self::Wrapped { data } => data,
            Self::Bare(rows) => rows,
        }
    }
}

#[derive(Debug, Deserialize)]
struct StatusRow {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    last_seen: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UsageRow {
    balance: f64,
    unit: String,
    /// Unix seconds, unlike the RFC 3339 strings everywhere else.
    timestamp: i64,
}

fn parse_detections(value: serde_json::Value) -> Result<Vec<Detection>, SyncError> {
    if value.is_null() {
        return Ok(Vec::new());
    }
    let envelope: DetectionEnvelope =
        serde_json::from_value(value).map_err(|err| SyncError::parse(err.to_string()))?;
    Ok(envelope
        .rows()
        .into_iter()
        .filter_map(DetectionRow::into_detection)
        .collect())
}

fn parse_status(value: serde_json::Value) -> Result<ConnectionState, SyncError> {
    let row: StatusRow =
        serde_json::from_value(value).map_err(|err| SyncError::parse(err.to_string()))?;
    let last_seen = row
        .last_seen
        .as_deref()
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|t| t.with_timezone(&Utc));
    Ok(ConnectionState {
        connected: row.status.as_deref() == Some("connected"),
        last_seen,
        message: row.message,
    })
}

fn parse_usage(value: serde_json::Value) -> Result<SimUsage, SyncError> {
    let row: UsageRow =
        serde_json::from_value(value).map_err(|err| SyncError::parse(err.to_string()))?;
    let timestamp_utc = DateTime::from_timestamp(row.timestamp, 0)
        .ok_or_else(|| SyncError::parse(format!("unix timestamp {} out of range", row.timestamp)))?;
    Ok(SimUsage::new(row.balance, row.unit, timestamp_utc))
}

impl BackendApi {
    pub fn new(client: EndpointClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl VehicleRepository for BackendApi {
    async fn latest_detection(&self) -> Result<Option<Detection>, SyncError> {
        let value = self
            .client
            .fetch_json("/api/detections", &[("limit", "1".to_string())])
            .await?;
        let mut detections = parse_detections(value)?;
        if detections.is_empty() {
            Ok(None)
        } else {
            // Newest-first for the single-latest query.
            Ok(Some(detections.remove(0)))
        }
    }

    async fn detections_page(&self, skip: u32, limit: u32) -> Result<Vec<Detection>, SyncError> {
        let value = self
            .client
            .fetch_json(
                "/api/detections",
                &[("skip", skip.to_string()), ("limit", limit.to_string())],
            )
            .await?;
        parse_detections(value)
    }

    async fn past_detections(&self) -> Result<Vec<Detection>, SyncError> {
        let value = self.client.fetch_json("/api/past_detections", &[]).await?;
        parse_detections(value)
    }

    async fn device_status(&self) -> Result<ConnectionState, SyncError> {
        let value = self.client.fetch_json("/api/device_status", &[]).await?;
        parse_status(value)
    }

    async fn sim_usage(&self) -> Result<SimUsage, SyncError> {
        let value = self.client.fetch_json("/api/sim-data", &[]).await?;
        parse_usage(value)
    }
}
