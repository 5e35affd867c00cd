//! Typed errors for the arrival-detection and OTP engine.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    /// A coordinate fell outside the valid latitude/longitude range.
    #[error("invalid coordinate: lat={lat}, lon={lon}")]
    InvalidCoordinate { lat: f64, lon: f64 },

    /// A GTFS `HH:MM:SS` time string could not be parsed.
    #[error("invalid GTFS time: {0:?}")]
    InvalidGtfsTime(String),

    /// Aggregation was requested over zero qualifying events.
    ///
    /// Callers must surface this as "no data available", never as 0% or
    /// 100% on-time.
    #[error("no qualifying arrival events in the requested range")]
    EmptyDataset,
}
