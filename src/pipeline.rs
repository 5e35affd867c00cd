//! Batch pipeline: samples in, arrival events and diagnostics out.
//!
//! Recomputation is idempotent; running the pipeline twice over identical
//! inputs yields identical events.

use tracing::info;

use crate::config::DetectorConfig;
use crate::delay::attach_delays;
use crate::detector::detect_arrivals;
use crate::error::EngineError;
use crate::gtfs::Schedule;
use crate::types::{ArrivalEvent, PositionSample};

/// Pipeline output with every exclusion accounted for.
#[derive(Debug)]
pub struct PipelineOutcome {
    pub events: Vec<ArrivalEvent>,
    pub unknown_stops: usize,
    pub out_of_range: usize,
    pub unmatched: usize,
    pub implausible: usize,
}

/// Detects arrivals and attaches schedule context in one pass.
pub fn run(
    samples: &[PositionSample],
    schedule: &Schedule,
    config: &DetectorConfig,
) -> Result<PipelineOutcome, EngineError> {
    let detection = detect_arrivals(samples, schedule, config)?;
    let delays = attach_delays(&detection.candidates, schedule);

    let outcome = PipelineOutcome {
        events: delays.events,
        unknown_stops: detection.unknown_stops,
        out_of_range: detection.out_of_range,
        unmatched: delays.unmatched,
        implausible: delays.implausible,
    };

    info!(
        samples = samples.len(),
        events = outcome.events.len(),
        unknown_stops = outcome.unknown_stops,
        out_of_range = outcome.out_of_range,
        unmatched = outcome.unmatched,
        implausible = outcome.implausible,
        "Pipeline pass complete"
    );

    Ok(outcome)
}
