//! Policy constants and runtime configuration.
//!
//! Delay thresholds and commute-window bounds are published figures; they
//! live here as named constants so a policy change never touches the
//! algorithms that apply them.

use chrono_tz::Tz;

/// Delays up to and including this many minutes count as on time.
/// "More than 4 minutes late" is the published definition of delayed.
pub const ON_TIME_MAX_DELAY_MIN: f64 = 4.0;

/// Delays at or above this many minutes count as major.
pub const MAJOR_DELAY_THRESHOLD_MIN: f64 = 15.0;

/// Delays outside this band are telemetry artifacts (stale samples, clock
/// skew) and are excluded from OTP rather than counted.
pub const MAX_PLAUSIBLE_DELAY_MIN: f64 = 500.0;
pub const MIN_PLAUSIBLE_DELAY_MIN: f64 = -100.0;

/// Commute windows, as minutes past local midnight. Both bounds inclusive.
pub const MORNING_START_MIN: u32 = 6 * 60;
pub const MORNING_END_MIN: u32 = 9 * 60;
pub const EVENING_START_MIN: u32 = 15 * 60 + 30;
pub const EVENING_END_MIN: u32 = 19 * 60 + 30;

/// Samples never closer than this to a stop are assumed to have missed it.
pub const DEFAULT_MAX_ARRIVAL_RADIUS_M: f64 = 2_000.0;

/// Tuning knobs for the arrival detector.
#[derive(Debug, Clone, Copy)]
pub struct DetectorConfig {
    /// Maximum plausible closest-approach distance, in meters.
    pub max_radius_m: f64,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            max_radius_m: DEFAULT_MAX_ARRIVAL_RADIUS_M,
        }
    }
}

/// Agency-local timezone, overridable via `AGENCY_TZ`.
pub fn agency_timezone() -> Tz {
    std::env::var("AGENCY_TZ")
        .ok()
        .and_then(|name| name.parse().ok())
        .unwrap_or(chrono_tz::America::Los_Angeles)
}
