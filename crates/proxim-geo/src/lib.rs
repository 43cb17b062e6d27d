//! # proxim-geo
//!
//! Pure geometry helpers for the proximity engine: great-circle distance
//! between two fixes and a scalar relative-velocity estimate from paired
//! satellite measurements. No state, no async.

use proxim_core::{Position, Report};

/// Fixed mean Earth radius in meters.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Sentinel distance for "position unknown". Callers must branch on this
/// before treating the value as a real distance; it is distinct from an
/// actual zero-distance result.
pub const DISTANCE_UNKNOWN: f64 = -1.0;

/// Great-circle (haversine) distance between two fixes, in meters.
///
/// Inputs are degrees; identical points yield 0; symmetric in its
/// arguments to floating-point tolerance. Altitude is ignored.
pub fn distance_meters(a: &Position, b: &Position) -> f64 {
    let lat_dist = (b.latitude - a.latitude).to_radians();
    let lon_dist = (b.longitude - a.longitude).to_radians();

    let h = (lat_dist / 2.0).sin().powi(2)
        + a.latitude.to_radians().cos()
            * b.latitude.to_radians().cos()
            * (lon_dist / 2.0).sin().powi(2);

    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_M * c
}

/// Distance between two optional fixes, [`DISTANCE_UNKNOWN`] when either
/// side has no known position.
pub fn distance_between(a: Option<&Position>, b: Option<&Position>) -> f64 {
    match (a, b) {
        (Some(a), Some(b)) => distance_meters(a, b),
        _ => DISTANCE_UNKNOWN,
    }
}

/// Scalar relative-velocity estimate between two reports, in m/s.
///
/// Matches satellite measurements by svid (only svids present on both
/// sides contribute) and averages the pseudorange-rate differences
/// `a.rate - b.rate` over the matched pairs. Returns 0 when there are no
/// matches or either report carries no measurements.
///
/// This is a rough approximation, not a true relative-velocity vector: no
/// direction is produced and rates are differenced raw, without unit
/// conversion across carriers.
pub fn relative_velocity(a: &Report, b: &Report) -> f64 {
    if a.measurements.is_empty() || b.measurements.is_empty() {
        return 0.0;
    }

    let mut total_diff = 0.0;
    let mut count = 0u32;

    for m1 in &a.measurements {
        for m2 in &b.measurements {
            if m1.svid == m2.svid {
                total_diff += m1.pseudorange_rate - m2.pseudorange_rate;
                count += 1;
            }
        }
    }

    if count > 0 {
        total_diff / count as f64
    } else {
        0.0
    }
}
