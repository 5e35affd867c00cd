//! Arrival detection: collapses noisy position samples into at most one
//! arrival per `(trip_id, stop_id, service_date)`.
//!
//! The nearest-sample-as-arrival heuristic is deliberate: with a ~1-minute
//! polling interval the closest approach is the best available anchor for
//! "the train was at the platform". Do not upgrade this to interpolation
//! without revisiting the published OTP figures, which are defined against
//! this heuristic.

use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

use crate::config::DetectorConfig;
use crate::error::EngineError;
use crate::geo::haversine_m;
use crate::gtfs::Schedule;
use crate::types::{ArrivalCandidate, PositionSample};

/// Detector output plus exclusion counts kept for diagnostics.
#[derive(Debug, Default)]
pub struct Detection {
    /// One candidate per group that produced a plausible closest approach,
    /// ordered by `(trip_id, stop_id, service_date)`.
    pub candidates: Vec<ArrivalCandidate>,
    /// Groups whose stop has no known coordinates.
    pub unknown_stops: usize,
    /// Groups whose closest approach exceeded the plausible radius.
    pub out_of_range: usize,
}

/// Runs arrival detection over a batch of samples.
///
/// Duplicate samples (same `(trip_id, stop_id, observed_at)`) are dropped
/// before grouping, so replayed input yields identical output. Grouping
/// and selection use sorted orders throughout; given the same samples and
/// schedule the result is bit-identical on every run.
///
/// # Errors
///
/// Fails fast on the first sample with out-of-range coordinates.
pub fn detect_arrivals(
    samples: &[PositionSample],
    schedule: &Schedule,
    config: &DetectorConfig,
) -> Result<Detection, EngineError> {
    let mut seen: BTreeSet<(&str, &str, chrono::NaiveDateTime)> = BTreeSet::new();
    let mut groups: BTreeMap<(&str, &str, NaiveDate), Vec<&PositionSample>> = BTreeMap::new();

    for sample in samples {
        if !seen.insert((
            sample.trip_id.as_str(),
            sample.stop_id.as_str(),
            sample.observed_at,
        )) {
            continue;
        }
        groups
            .entry((
                sample.trip_id.as_str(),
                sample.stop_id.as_str(),
                sample.service_date(),
            ))
            .or_default()
            .push(sample);
    }

    let mut detection = Detection::default();

    for ((trip_id, stop_id, service_date), mut group) in groups {
        let Some(stop) = schedule.stop(stop_id) else {
            debug!(trip_id, stop_id, "Stop has no known coordinates, skipping group");
            detection.unknown_stops += 1;
            continue;
        };

        // Scan in time order with a strict `<` so the earliest sample wins
        // an exact distance tie (first arrival, not last sighting).
        group.sort_by_key(|s| s.observed_at);

        let mut best: Option<(f64, &PositionSample)> = None;
        for sample in group {
            let distance = haversine_m(
                sample.latitude,
                sample.longitude,
                stop.stop_lat,
                stop.stop_lon,
            )?;
            match best {
                Some((best_distance, _)) if distance >= best_distance => {}
                _ => best = Some((distance, sample)),
            }
        }

        let Some((distance, sample)) = best else {
            continue;
        };

        if distance > config.max_radius_m {
            debug!(
                trip_id,
                stop_id,
                distance_m = distance,
                "Closest approach beyond plausible radius, no arrival inferred"
            );
            detection.out_of_range += 1;
            continue;
        }

        detection.candidates.push(ArrivalCandidate {
            trip_id: trip_id.to_string(),
            stop_id: stop_id.to_string(),
            service_date,
            inferred_arrival: sample.observed_at,
            distance_to_stop_m: distance,
        });
    }

    Ok(detection)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gtfs::Stop;
    use chrono::NaiveDate;

    const STOP_LAT: f64 = 37.443_36;
    const STOP_LON: f64 = -122.164_91;

    fn fixture_schedule() -> Schedule {
        let mut schedule = Schedule::new();
        schedule.add_stop(Stop {
            stop_id: "70011".to_string(),
            stop_name: "Palo Alto".to_string(),
            stop_lat: STOP_LAT,
            stop_lon: STOP_LON,
        });
        schedule
    }

    /// A sample roughly `offset_m` meters north of the fixture stop.
    fn sample_at(minute: u32, offset_m: f64) -> PositionSample {
        let date = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();
        PositionSample {
            trip_id: "101".to_string(),
            stop_id: "70011".to_string(),
            latitude: STOP_LAT + offset_m / 111_000.0,
            longitude: STOP_LON,
            observed_at: date.and_hms_opt(8, minute, 0).unwrap(),
        }
    }

    #[test]
    fn test_selects_minimum_distance_sample() {
        let samples = vec![sample_at(40, 120.0), sample_at(41, 45.0), sample_at(42, 300.0)];
        let detection =
            detect_arrivals(&samples, &fixture_schedule(), &DetectorConfig::default()).unwrap();

        assert_eq!(detection.candidates.len(), 1);
        let candidate = &detection.candidates[0];
        assert_eq!(candidate.inferred_arrival, samples[1].observed_at);
        assert!((candidate.distance_to_stop_m - 45.0).abs() < 1.0);
    }

    #[test]
    fn test_tie_breaks_to_earliest_observation() {
        let samples = vec![sample_at(41, 50.0), sample_at(40, 50.0)];
        let detection =
            detect_arrivals(&samples, &fixture_schedule(), &DetectorConfig::default()).unwrap();

        assert_eq!(detection.candidates.len(), 1);
        assert_eq!(
            detection.candidates[0].inferred_arrival,
            sample_at(40, 50.0).observed_at
        );
    }

    #[test]
    fn test_single_sample_is_trivially_the_arrival() {
        let samples = vec![sample_at(40, 800.0)];
        let detection =
            detect_arrivals(&samples, &fixture_schedule(), &DetectorConfig::default()).unwrap();
        assert_eq!(detection.candidates.len(), 1);
    }

    #[test]
    fn test_excludes_groups_beyond_plausible_radius() {
        let samples = vec![sample_at(40, 5_000.0), sample_at(41, 3_000.0)];
        let detection =
            detect_arrivals(&samples, &fixture_schedule(), &DetectorConfig::default()).unwrap();

        assert!(detection.candidates.is_empty());
        assert_eq!(detection.out_of_range, 1);
    }

    #[test]
    fn test_duplicate_samples_do_not_change_output() {
        let samples = vec![sample_at(40, 120.0), sample_at(41, 45.0)];
        let mut doubled = samples.clone();
        doubled.extend(samples.clone());

        let schedule = fixture_schedule();
        let config = DetectorConfig::default();
        let once = detect_arrivals(&samples, &schedule, &config).unwrap();
        let twice = detect_arrivals(&doubled, &schedule, &config).unwrap();

        assert_eq!(once.candidates, twice.candidates);
    }

    #[test]
    fn test_unknown_stop_is_counted_not_fatal() {
        let mut sample = sample_at(40, 45.0);
        sample.stop_id = "99999".to_string();

        let detection =
            detect_arrivals(&[sample], &fixture_schedule(), &DetectorConfig::default()).unwrap();
        assert!(detection.candidates.is_empty());
        assert_eq!(detection.unknown_stops, 1);
    }

    #[test]
    fn test_deterministic_across_runs() {
        let mut samples = Vec::new();
        for trip in ["103", "101", "102"] {
            for minute in [42, 40, 41] {
                let mut s = sample_at(minute, f64::from(minute) * 3.0);
                s.trip_id = trip.to_string();
                samples.push(s);
            }
        }

        let schedule = fixture_schedule();
        let config = DetectorConfig::default();
        let a = detect_arrivals(&samples, &schedule, &config).unwrap();
        let b = detect_arrivals(&samples, &schedule, &config).unwrap();
        assert_eq!(a.candidates, b.candidates);

        let trips: Vec<_> = a.candidates.iter().map(|c| c.trip_id.as_str()).collect();
        assert_eq!(trips, vec!["101", "102", "103"]);
    }

    #[test]
    fn test_malformed_coordinates_fail_fast() {
        let mut sample = sample_at(40, 45.0);
        sample.latitude = 95.0;

        let result = detect_arrivals(&[sample], &fixture_schedule(), &DetectorConfig::default());
        assert!(result.is_err());
    }
}
