//! OTP aggregation: rolls per-arrival delay records up into the summary
//! statistics the presentation layer renders.
//!
//! Every function here is pure over a slice of events and safe to call
//! repeatedly over overlapping or re-derived sets.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::error::EngineError;
use crate::types::{ArrivalEvent, CommuteWindow, Severity};

/// Arithmetic mean. 0.0 for empty input.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation given a pre-computed mean.
pub fn stddev(values: &[f64], mean: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

/// Share of each severity class within a set of events, as fractions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SeverityShares {
    pub on_time: f64,
    pub minor_delay: f64,
    pub major_delay: f64,
}

impl SeverityShares {
    fn of(events: &[&ArrivalEvent]) -> Self {
        let total = events.len() as f64;
        let count = |severity: Severity| {
            events.iter().filter(|e| e.severity == severity).count() as f64 / total
        };
        Self {
            on_time: count(Severity::OnTime),
            minor_delay: count(Severity::MinorDelay),
            major_delay: count(Severity::MajorDelay),
        }
    }
}

/// One day's slice of the OTP series.
#[derive(Debug, Clone, Serialize)]
pub struct DaySummary {
    pub date: NaiveDate,
    pub total_count: usize,
    pub on_time_fraction: f64,
    pub shares: SeverityShares,
    pub mean_delay_minutes: f64,
}

/// Per-stop or per-trip performance, ranked by mean delay.
#[derive(Debug, Clone, Serialize)]
pub struct GroupSummary {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub total_count: usize,
    pub on_time_fraction: f64,
    pub mean_delay_minutes: f64,
}

/// OTP within one commute window.
#[derive(Debug, Clone, Serialize)]
pub struct WindowSummary {
    pub window: CommuteWindow,
    pub total_count: usize,
    pub on_time_fraction: f64,
    pub shares: SeverityShares,
    pub mean_delay_minutes: f64,
}

/// Best or worst performer by mean delay.
#[derive(Debug, Clone, Serialize)]
pub struct Performer {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub mean_delay_minutes: f64,
}

/// Headline figures over the whole event set.
#[derive(Debug, Clone, Serialize)]
pub struct OtpSummary {
    pub total_count: usize,
    pub on_time_count: usize,
    pub on_time_fraction: f64,
    pub mean_delay_minutes: f64,
    pub delay_stddev_minutes: f64,
    pub best_trip: Performer,
    pub worst_trip: Performer,
    pub best_stop: Performer,
    pub worst_stop: Performer,
    pub date_range_start: NaiveDate,
    pub date_range_end: NaiveDate,
}

/// Everything the presentation layer consumes, in one document.
#[derive(Debug, Clone, Serialize)]
pub struct OtpReport {
    pub generated_at: DateTime<Utc>,
    pub summary: OtpSummary,
    pub by_day: Vec<DaySummary>,
    pub by_stop: Vec<GroupSummary>,
    pub by_trip: Vec<GroupSummary>,
    pub by_window: Vec<WindowSummary>,
}

/// Overall on-time fraction.
///
/// # Errors
///
/// [`EngineError::EmptyDataset`]: zero events must surface as "no data",
/// never as a numeric fraction.
pub fn overall_otp(events: &[ArrivalEvent]) -> Result<f64, EngineError> {
    if events.is_empty() {
        return Err(EngineError::EmptyDataset);
    }
    let on_time = events.iter().filter(|e| e.is_on_time()).count();
    Ok(on_time as f64 / events.len() as f64)
}

/// Per-day series, ordered chronologically.
pub fn by_day(events: &[ArrivalEvent]) -> Vec<DaySummary> {
    let mut days: BTreeMap<NaiveDate, Vec<&ArrivalEvent>> = BTreeMap::new();
    for event in events {
        days.entry(event.service_date).or_default().push(event);
    }

    days.into_iter()
        .map(|(date, group)| {
            let delays: Vec<f64> = group.iter().map(|e| e.delay_minutes).collect();
            DaySummary {
                date,
                total_count: group.len(),
                on_time_fraction: group.iter().filter(|e| e.is_on_time()).count() as f64
                    / group.len() as f64,
                shares: SeverityShares::of(&group),
                mean_delay_minutes: mean(&delays),
            }
        })
        .collect()
}

fn rank_by_mean_delay<F>(events: &[ArrivalEvent], key: F) -> Vec<GroupSummary>
where
    F: Fn(&ArrivalEvent) -> (&str, Option<&str>),
{
    let mut groups: BTreeMap<String, (Option<String>, Vec<&ArrivalEvent>)> = BTreeMap::new();
    for event in events {
        let (id, name) = key(event);
        let entry = groups
            .entry(id.to_string())
            .or_insert_with(|| (name.map(str::to_string), Vec::new()));
        entry.1.push(event);
    }

    let mut summaries: Vec<GroupSummary> = groups
        .into_iter()
        .map(|(id, (name, group))| {
            let delays: Vec<f64> = group.iter().map(|e| e.delay_minutes).collect();
            GroupSummary {
                id,
                name,
                total_count: group.len(),
                on_time_fraction: group.iter().filter(|e| e.is_on_time()).count() as f64
                    / group.len() as f64,
                mean_delay_minutes: mean(&delays),
            }
        })
        .collect();

    // Ascending mean delay: best performer first, worst last. The BTreeMap
    // pass already ordered ids, so equal means rank deterministically.
    summaries.sort_by(|a, b| {
        a.mean_delay_minutes
            .partial_cmp(&b.mean_delay_minutes)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    summaries
}

/// Per-stop performance, best (lowest mean delay) first.
pub fn by_stop(events: &[ArrivalEvent]) -> Vec<GroupSummary> {
    rank_by_mean_delay(events, |e| (e.stop_id.as_str(), Some(e.stop_name.as_str())))
}

/// Per-trip performance, best first.
pub fn by_trip(events: &[ArrivalEvent]) -> Vec<GroupSummary> {
    rank_by_mean_delay(events, |e| (e.trip_id.as_str(), None))
}

/// Morning and evening commute summaries.
///
/// Events scheduled outside both windows belong to the overall figures
/// only, so no `Other` entry is produced here.
pub fn by_commute_window(events: &[ArrivalEvent]) -> Vec<WindowSummary> {
    [CommuteWindow::Morning, CommuteWindow::Evening]
        .into_iter()
        .filter_map(|window| {
            let group: Vec<&ArrivalEvent> =
                events.iter().filter(|e| e.window == window).collect();
            if group.is_empty() {
                return None;
            }
            let delays: Vec<f64> = group.iter().map(|e| e.delay_minutes).collect();
            Some(WindowSummary {
                window,
                total_count: group.len(),
                on_time_fraction: group.iter().filter(|e| e.is_on_time()).count() as f64
                    / group.len() as f64,
                shares: SeverityShares::of(&group),
                mean_delay_minutes: mean(&delays),
            })
        })
        .collect()
}

/// Headline summary with best/worst performers and the covered date range.
pub fn summarize(events: &[ArrivalEvent]) -> Result<OtpSummary, EngineError> {
    if events.is_empty() {
        return Err(EngineError::EmptyDataset);
    }

    let delays: Vec<f64> = events.iter().map(|e| e.delay_minutes).collect();
    let mean_delay = mean(&delays);
    let on_time_count = events.iter().filter(|e| e.is_on_time()).count();

    let performer = |g: &GroupSummary| Performer {
        id: g.id.clone(),
        name: g.name.clone(),
        mean_delay_minutes: g.mean_delay_minutes,
    };

    // Non-empty events guarantee non-empty rankings.
    let trips = by_trip(events);
    let stops = by_stop(events);

    Ok(OtpSummary {
        total_count: events.len(),
        on_time_count,
        on_time_fraction: on_time_count as f64 / events.len() as f64,
        mean_delay_minutes: mean_delay,
        delay_stddev_minutes: stddev(&delays, mean_delay),
        best_trip: performer(trips.first().expect("non-empty")),
        worst_trip: performer(trips.last().expect("non-empty")),
        best_stop: performer(stops.first().expect("non-empty")),
        worst_stop: performer(stops.last().expect("non-empty")),
        date_range_start: events.iter().map(|e| e.service_date).min().expect("non-empty"),
        date_range_end: events.iter().map(|e| e.service_date).max().expect("non-empty"),
    })
}

/// Builds the complete report document.
pub fn build_report(events: &[ArrivalEvent]) -> Result<OtpReport, EngineError> {
    Ok(OtpReport {
        generated_at: Utc::now(),
        summary: summarize(events)?,
        by_day: by_day(events),
        by_stop: by_stop(events),
        by_trip: by_trip(events),
        by_window: by_commute_window(events),
    })
}
