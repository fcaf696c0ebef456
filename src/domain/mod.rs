// Domain layer - Pure types and rules, no I/O
pub mod connection;
pub mod cursor;
pub mod freshness;
pub mod telemetry;
pub mod view_model;
