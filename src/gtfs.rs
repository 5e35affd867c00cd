//! Static schedule reference, loaded from GTFS `stops.txt` and
//! `stop_times.txt`.
//!
//! The schedule is passed explicitly into every computation rather than
//! read from ambient state, so group processing stays deterministic and
//! tests can run against small fixture schedules.

use anyhow::{Context, Result};
use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use serde::Deserialize;
use std::collections::HashMap;
use std::fs::File;
use std::path::Path;
use tracing::info;

use crate::error::EngineError;

/// A scheduled time of day, in seconds past midnight. GTFS times on trips
/// that run past midnight exceed 24:00:00, so this is not a clock time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GtfsTime {
    seconds: u32,
}

impl GtfsTime {
    /// Parses `HH:MM:SS` (or `HH:MM`), accepting hours of 24 and beyond.
    pub fn parse(raw: &str) -> Result<Self, EngineError> {
        let invalid = || EngineError::InvalidGtfsTime(raw.to_string());

        let mut parts = raw.trim().split(':');
        let hours: u32 = parts.next().and_then(|p| p.parse().ok()).ok_or_else(invalid)?;
        let minutes: u32 = parts.next().and_then(|p| p.parse().ok()).ok_or_else(invalid)?;
        let seconds: u32 = match parts.next() {
            Some(p) => p.parse().map_err(|_| invalid())?,
            None => 0,
        };
        if parts.next().is_some() || minutes >= 60 || seconds >= 60 {
            return Err(invalid());
        }

        Ok(Self {
            seconds: hours * 3600 + minutes * 60 + seconds,
        })
    }

    /// Anchors this time of day onto a service date. Times past 24:00 roll
    /// into the following calendar day.
    pub fn on(self, service_date: NaiveDate) -> NaiveDateTime {
        service_date.and_time(NaiveTime::MIN) + Duration::seconds(i64::from(self.seconds))
    }
}

/// A physical stop with its fixed coordinates.
#[derive(Debug, Clone)]
pub struct Stop {
    pub stop_id: String,
    pub stop_name: String,
    pub stop_lat: f64,
    pub stop_lon: f64,
}

/// Immutable schedule reference for one published schedule version.
#[derive(Debug, Default)]
pub struct Schedule {
    stops: HashMap<String, Stop>,
    arrivals: HashMap<(String, String), GtfsTime>,
}

impl Schedule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_stop(&mut self, stop: Stop) {
        self.stops.insert(stop.stop_id.clone(), stop);
    }

    pub fn add_stop_time(&mut self, trip_id: &str, stop_id: &str, arrival: GtfsTime) {
        self.arrivals
            .insert((trip_id.to_string(), stop_id.to_string()), arrival);
    }

    pub fn stop(&self, stop_id: &str) -> Option<&Stop> {
        self.stops.get(stop_id)
    }

    /// Scheduled arrival for a trip at a stop, anchored to a service date.
    /// `None` when the pair is not in the published schedule.
    pub fn scheduled_arrival(
        &self,
        trip_id: &str,
        stop_id: &str,
        service_date: NaiveDate,
    ) -> Option<NaiveDateTime> {
        self.arrivals
            .get(&(trip_id.to_string(), stop_id.to_string()))
            .map(|t| t.on(service_date))
    }

    pub fn stop_count(&self) -> usize {
        self.stops.len()
    }

    pub fn stop_time_count(&self) -> usize {
        self.arrivals.len()
    }

    /// Loads `stops.txt` and `stop_times.txt` from a GTFS directory.
    ///
    /// Station parent records (`location_type = 1`) carry no scheduled
    /// arrivals and are skipped.
    pub fn from_gtfs_dir<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        let mut schedule = Self::new();

        let stops_path = dir.join("stops.txt");
        let file = File::open(&stops_path)
            .with_context(|| format!("opening {}", stops_path.display()))?;
        let mut rdr = csv::Reader::from_reader(file);
        for result in rdr.deserialize() {
            let record: StopRecord = result.context("reading stops.txt")?;
            if record.location_type.as_deref() == Some("1") {
                continue;
            }
            let (Some(stop_lat), Some(stop_lon)) = (record.stop_lat, record.stop_lon) else {
                continue;
            };
            schedule.add_stop(Stop {
                stop_id: record.stop_id,
                stop_name: record.stop_name,
                stop_lat,
                stop_lon,
            });
        }

        let stop_times_path = dir.join("stop_times.txt");
        let file = File::open(&stop_times_path)
            .with_context(|| format!("opening {}", stop_times_path.display()))?;
        let mut rdr = csv::Reader::from_reader(file);
        for result in rdr.deserialize() {
            let record: StopTimeRecord = result.context("reading stop_times.txt")?;
            let arrival = GtfsTime::parse(&record.arrival_time)
                .with_context(|| format!("trip {} stop {}", record.trip_id, record.stop_id))?;
            schedule.add_stop_time(&record.trip_id, &record.stop_id, arrival);
        }

        info!(
            stops = schedule.stop_count(),
            stop_times = schedule.stop_time_count(),
            "Schedule loaded"
        );
        Ok(schedule)
    }
}

#[derive(Debug, Deserialize)]
struct StopRecord {
    stop_id: String,
    stop_name: String,
    #[serde(default)]
    stop_lat: Option<f64>,
    #[serde(default)]
    stop_lon: Option<f64>,
    #[serde(default)]
    location_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StopTimeRecord {
    trip_id: String,
    stop_id: String,
    arrival_time: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_time() {
        let t = GtfsTime::parse("08:45:30").unwrap();
        let date = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();
        assert_eq!(
            t.on(date),
            date.and_hms_opt(8, 45, 30).unwrap()
        );
    }

    #[test]
    fn test_parse_past_midnight_rolls_over() {
        let t = GtfsTime::parse("25:30:00").unwrap();
        let date = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();
        let next_day = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();
        assert_eq!(t.on(date), next_day.and_hms_opt(1, 30, 0).unwrap());
    }

    #[test]
    fn test_parse_without_seconds() {
        let t = GtfsTime::parse("06:00").unwrap();
        let date = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();
        assert_eq!(t.on(date), date.and_hms_opt(6, 0, 0).unwrap());
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(GtfsTime::parse("").is_err());
        assert!(GtfsTime::parse("8").is_err());
        assert!(GtfsTime::parse("08:61:00").is_err());
        assert!(GtfsTime::parse("08:00:75").is_err());
        assert!(GtfsTime::parse("noon").is_err());
    }

    #[test]
    fn test_scheduled_arrival_lookup() {
        let mut schedule = Schedule::new();
        schedule.add_stop_time("101", "70011", GtfsTime::parse("08:45:00").unwrap());

        let date = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();
        assert_eq!(
            schedule.scheduled_arrival("101", "70011", date),
            Some(date.and_hms_opt(8, 45, 0).unwrap())
        );
        assert_eq!(schedule.scheduled_arrival("101", "70999", date), None);
    }
}
