// Staleness classification for timestamped records
use chrono::{DateTime, Duration, Utc};

pub const DEFAULT_WINDOW_MINUTES: i64 = 5;

/// A record is fresh when it is at most `window_minutes` old. A timestamp in
/// the future (clock skew) yields a negative age and counts as fresh; the
/// backend dashboard behaves the same way and we keep that contract.
pub fn is_fresh(timestamp: DateTime<Utc>, now: DateTime<Utc>, window_minutes: i64) -> bool {
    now.signed_duration_since(timestamp) <= Duration::minutes(window_minutes)
}

/// Age in whole minutes, clamped at zero for future timestamps.
pub fn age_minutes(timestamp: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    now.signed_duration_since(timestamp).num_minutes().max(0)
}
