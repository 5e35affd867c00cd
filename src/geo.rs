//! Great-circle distance between a vehicle and a stop.

use crate::error::EngineError;

const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Rejects coordinates outside valid latitude/longitude ranges.
pub fn validate_coordinate(lat: f64, lon: f64) -> Result<(), EngineError> {
    if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) || lat.is_nan() || lon.is_nan() {
        return Err(EngineError::InvalidCoordinate { lat, lon });
    }
    Ok(())
}

/// Haversine distance in meters between two points given in decimal
/// degrees.
///
/// # Errors
///
/// Returns [`EngineError::InvalidCoordinate`] if either point is outside
/// the valid latitude/longitude range.
pub fn haversine_m(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> Result<f64, EngineError> {
    validate_coordinate(lat1, lon1)?;
    validate_coordinate(lat2, lon2)?;

    let dlat = (lat2 - lat1).to_radians();
    let dlon = (lon2 - lon1).to_radians();

    let a = (dlat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (dlon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    Ok(EARTH_RADIUS_M * c)
}
