//! Delay computation: joins arrival candidates against the schedule and
//! classifies each arrival.

use chrono::{NaiveDateTime, Timelike};
use tracing::{debug, warn};

use crate::config::{
    EVENING_END_MIN, EVENING_START_MIN, MAJOR_DELAY_THRESHOLD_MIN, MAX_PLAUSIBLE_DELAY_MIN,
    MIN_PLAUSIBLE_DELAY_MIN, MORNING_END_MIN, MORNING_START_MIN, ON_TIME_MAX_DELAY_MIN,
};
use crate::gtfs::Schedule;
use crate::types::{ArrivalCandidate, ArrivalEvent, CommuteWindow, Severity};

/// Classifies a signed delay in minutes.
///
/// Exactly 4.0 minutes is still on time; the published definition of a
/// delayed train is "more than 4 minutes late". 15.0 and up is major.
pub fn classify(delay_minutes: f64) -> Severity {
    if delay_minutes <= ON_TIME_MAX_DELAY_MIN {
        Severity::OnTime
    } else if delay_minutes < MAJOR_DELAY_THRESHOLD_MIN {
        Severity::MinorDelay
    } else {
        Severity::MajorDelay
    }
}

/// Assigns a commute window from a scheduled arrival's local time of day.
///
/// The scheduled time, not the actual one, defines the cohort: a morning
/// train that ran two hours late is still a morning train.
pub fn commute_window(scheduled_arrival: NaiveDateTime) -> CommuteWindow {
    let seconds = scheduled_arrival.time().num_seconds_from_midnight();
    if (MORNING_START_MIN * 60..=MORNING_END_MIN * 60).contains(&seconds) {
        CommuteWindow::Morning
    } else if (EVENING_START_MIN * 60..=EVENING_END_MIN * 60).contains(&seconds) {
        CommuteWindow::Evening
    } else {
        CommuteWindow::Other
    }
}

/// Joins one candidate against the schedule.
///
/// Returns `None` when the `(trip_id, stop_id)` pair has no scheduled
/// arrival; schedule gaps are expected (last-minute service changes), so
/// this is an exclusion, not an error.
pub fn compute(candidate: &ArrivalCandidate, schedule: &Schedule) -> Option<ArrivalEvent> {
    let scheduled_arrival = schedule.scheduled_arrival(
        &candidate.trip_id,
        &candidate.stop_id,
        candidate.service_date,
    )?;
    let stop = schedule.stop(&candidate.stop_id)?;

    let delay_minutes =
        (candidate.inferred_arrival - scheduled_arrival).num_seconds() as f64 / 60.0;

    Some(ArrivalEvent {
        trip_id: candidate.trip_id.clone(),
        stop_id: candidate.stop_id.clone(),
        stop_name: stop.stop_name.clone(),
        service_date: candidate.service_date,
        inferred_arrival: candidate.inferred_arrival,
        scheduled_arrival,
        distance_to_stop_m: candidate.distance_to_stop_m,
        delay_minutes,
        severity: classify(delay_minutes),
        window: commute_window(scheduled_arrival),
    })
}

/// Events plus exclusion counts kept for diagnostics.
#[derive(Debug, Default)]
pub struct DelayOutcome {
    pub events: Vec<ArrivalEvent>,
    /// Candidates with no matching schedule entry.
    pub unmatched: usize,
    /// Events whose delay fell outside the plausibility band (stale
    /// samples, clock skew); excluded rather than zeroed so they cannot
    /// distort the mean.
    pub implausible: usize,
}

/// Joins a batch of candidates, absorbing schedule gaps as counted
/// exclusions.
pub fn attach_delays(candidates: &[ArrivalCandidate], schedule: &Schedule) -> DelayOutcome {
    let mut outcome = DelayOutcome::default();

    for candidate in candidates {
        let Some(event) = compute(candidate, schedule) else {
            debug!(
                trip_id = %candidate.trip_id,
                stop_id = %candidate.stop_id,
                service_date = %candidate.service_date,
                "No schedule entry for arrival candidate, dropping as unmatched"
            );
            outcome.unmatched += 1;
            continue;
        };

        if event.delay_minutes > MAX_PLAUSIBLE_DELAY_MIN
            || event.delay_minutes < MIN_PLAUSIBLE_DELAY_MIN
        {
            warn!(
                trip_id = %event.trip_id,
                stop_id = %event.stop_id,
                delay_minutes = event.delay_minutes,
                "Implausible delay, excluding event"
            );
            outcome.implausible += 1;
            continue;
        }

        outcome.events.push(event);
    }

    outcome
}
