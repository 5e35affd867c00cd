//! Parser for SIRI `VehicleMonitoring` JSON, the raw position feed.
//!
//! Feed timestamps carry a UTC offset; samples are stored in agency-local
//! naive time so service dates line up with the published schedule.

use anyhow::{Context, Result};
use chrono::{DateTime, FixedOffset};
use chrono_tz::Tz;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::geo::validate_coordinate;
use crate::types::PositionSample;

#[derive(Debug, Deserialize)]
pub struct SiriEnvelope {
    #[serde(rename = "Siri")]
    pub siri: Siri,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Siri {
    pub service_delivery: ServiceDelivery,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ServiceDelivery {
    pub vehicle_monitoring_delivery: VehicleMonitoringDelivery,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct VehicleMonitoringDelivery {
    #[serde(default)]
    pub vehicle_activity: Vec<VehicleActivity>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct VehicleActivity {
    pub recorded_at_time: DateTime<FixedOffset>,
    pub monitored_vehicle_journey: MonitoredVehicleJourney,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MonitoredVehicleJourney {
    pub vehicle_ref: Option<String>,
    pub monitored_call: Option<MonitoredCall>,
    pub vehicle_location: Option<VehicleLocation>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MonitoredCall {
    pub stop_point_ref: String,
}

/// 511 serves coordinates as JSON strings.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct VehicleLocation {
    pub latitude: String,
    pub longitude: String,
}

/// Decodes a SIRI `VehicleMonitoring` response into position samples.
///
/// Activities without a monitored call or location (laying over, out of
/// service) are skipped; records with malformed coordinates are rejected
/// individually and logged, never partially ingested.
pub fn parse_vehicle_monitoring(bytes: &[u8], tz: Tz) -> Result<Vec<PositionSample>> {
    // 511 prefixes responses with a UTF-8 BOM.
    let bytes = bytes.strip_prefix(b"\xef\xbb\xbf").unwrap_or(bytes);
    let envelope: SiriEnvelope =
        serde_json::from_slice(bytes).context("decoding SIRI VehicleMonitoring JSON")?;

    let activities = envelope
        .siri
        .service_delivery
        .vehicle_monitoring_delivery
        .vehicle_activity;

    let mut samples = Vec::with_capacity(activities.len());

    for activity in activities {
        let journey = activity.monitored_vehicle_journey;
        let (Some(trip_id), Some(call), Some(location)) =
            (journey.vehicle_ref, journey.monitored_call, journey.vehicle_location)
        else {
            debug!("Vehicle activity without journey details, skipping");
            continue;
        };

        let (Ok(latitude), Ok(longitude)) =
            (location.latitude.parse::<f64>(), location.longitude.parse::<f64>())
        else {
            warn!(
                trip_id = %trip_id,
                lat = %location.latitude,
                lon = %location.longitude,
                "Unparseable coordinates, rejecting record"
            );
            continue;
        };
        if let Err(e) = validate_coordinate(latitude, longitude) {
            warn!(trip_id = %trip_id, error = %e, "Out-of-range coordinates, rejecting record");
            continue;
        }

        samples.push(PositionSample {
            trip_id,
            stop_id: call.stop_point_ref,
            latitude,
            longitude,
            observed_at: activity.recorded_at_time.with_timezone(&tz).naive_local(),
        });
    }

    Ok(samples)
}
