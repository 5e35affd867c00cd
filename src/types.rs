//! Core data model: position samples, inferred arrivals, and their
//! classification.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// One polled vehicle observation.
///
/// `observed_at` is agency-local naive time; the collector converts feed
/// timestamps before anything is stored. The ingestion layer enforces
/// uniqueness of `(observed_at, trip_id, stop_id)`, but the engine
/// deduplicates again so replayed input cannot bias results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionSample {
    pub trip_id: String,
    pub stop_id: String,
    pub latitude: f64,
    pub longitude: f64,
    pub observed_at: NaiveDateTime,
}

impl PositionSample {
    /// The operating day this sample belongs to.
    pub fn service_date(&self) -> NaiveDate {
        self.observed_at.date()
    }
}

/// Detector output: a time and a confidence distance, before any schedule
/// join.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArrivalCandidate {
    pub trip_id: String,
    pub stop_id: String,
    pub service_date: NaiveDate,
    /// `observed_at` of the minimum-distance sample in the group.
    pub inferred_arrival: NaiveDateTime,
    /// The minimum distance achieved, in meters.
    pub distance_to_stop_m: f64,
}

/// Delay classification. Thresholds are in [`crate::config`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    #[serde(rename = "On Time")]
    OnTime,
    #[serde(rename = "Minor Delay")]
    MinorDelay,
    #[serde(rename = "Major Delay")]
    MajorDelay,
}

/// Rider-relevant slice of the service day, assigned from the *scheduled*
/// arrival time so cohorts stay stable no matter how late a train ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CommuteWindow {
    Morning,
    Evening,
    Other,
}

/// A candidate joined against the schedule, with delay computed.
///
/// Purely derived: recomputing from the same samples and schedule must
/// reproduce this record bit for bit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArrivalEvent {
    pub trip_id: String,
    pub stop_id: String,
    pub stop_name: String,
    pub service_date: NaiveDate,
    pub inferred_arrival: NaiveDateTime,
    pub scheduled_arrival: NaiveDateTime,
    pub distance_to_stop_m: f64,
    /// Signed: positive is late, negative is early.
    pub delay_minutes: f64,
    pub severity: Severity,
    pub window: CommuteWindow,
}

impl ArrivalEvent {
    pub fn is_on_time(&self) -> bool {
        self.severity == Severity::OnTime
    }
}
