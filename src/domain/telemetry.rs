// Vehicle telemetry domain models
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, PartialEq)]
pub struct TelemetryPoint {
    pub latitude: f64,
    pub longitude: f64,
    pub speed_kmh: f64,
    pub timestamp_utc: DateTime<Utc>,
}

impl TelemetryPoint {
    pub fn new(latitude: f64, longitude: f64, speed_kmh: f64, timestamp_utc: DateTime<Utc>) -> Self {
        Self {
            latitude,
            longitude,
            speed_kmh,
            timestamp_utc,
        }
    }
}

/// A sign detection reported by the vehicle. `id` is the stable
/// reconciliation key; it is unique within one fetched page, nothing more.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub id: String,
    pub point: TelemetryPoint,
    pub sign_label: Option<String>,
    /// Base64 payload or URL, passed through opaquely for the shell to render.
    pub image: Option<String>,
}

impl Detection {
    pub fn new(
        id: String,
        point: TelemetryPoint,
        sign_label: Option<String>,
        image: Option<String>,
    ) -> Self {
        Self {
            id,
            point,
            sign_label,
            image,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimUsage {
    pub balance: f64,
    pub unit: String,
    pub timestamp_utc: DateTime<Utc>,
}

impl SimUsage {
    pub fn new(balance: f64, unit: String, timestamp_utc: DateTime<Utc>) -> Self {
        Self {
            balance,
            unit,
            timestamp_utc,
        }
    }
}
