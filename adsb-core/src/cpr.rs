//! Compact Position Reporting — recovering a global lat/lon from an
//! even/odd pair of 17-bit CPR-encoded coordinates.
//!
//! A single CPR-encoded position is ambiguous: it only pins the aircraft down
//! to one of several candidate cells. Pairing an even-format frame with an
//! odd-format frame for the same aircraft, transmitted within a few seconds
//! of each other, resolves the ambiguity without needing any prior fix. This
//! module implements exactly that "global" decode; it does not implement the
//! single-frame "local" decode relative to a known reference position, since
//! nothing in this crate holds a trusted prior fix to decode against.

/// Latitude zones per hemisphere for the even format.
const NZ: f64 = 15.0;

/// Bits per CPR coordinate.
const CPR_BITS: u32 = 17;

/// Maximum time between an even/odd pair for them to still be paired (I4).
pub const MAX_PAIR_AGE_MS: i64 = 10_000;

/// Number of longitude zones at latitude `lat` (the "NL" function).
pub fn nl(lat: f64) -> i32 {
    if lat.abs() >= 87.0 {
        return 1;
    }
    if lat == 0.0 {
        return 59;
    }

    let a = 1.0 - (std::f64::consts::PI / (2.0 * NZ)).cos();
    let b = (std::f64::consts::PI / 180.0 * lat).cos().powi(2);
    ((2.0 * std::f64::consts::PI) / (1.0 - a / b).acos())
        .floor()
        .max(1.0) as i32
}

/// Always-nonnegative modulo, as CPR's zone arithmetic requires.
fn modulo(x: f64, y: f64) -> f64 {
    x - y * (x / y).floor()
}

/// Recover a global lat/lon from an even/odd CPR pair.
///
/// `lat_even`/`lon_even`/`lat_odd`/`lon_odd` are the raw 17-bit coordinates;
/// `age_ms` is the absolute time difference between the two frames in
/// milliseconds. Returns `None` if the pair is too old (I4) or if the two
/// candidate latitudes fall in different longitude zones (the pair straddles
/// a zone boundary and cannot be resolved).
pub fn global_decode(
    lat_even: u32,
    lon_even: u32,
    lat_odd: u32,
    lon_odd: u32,
    age_ms: i64,
    newer_is_odd: bool,
) -> Option<(f64, f64)> {
    if age_ms.abs() > MAX_PAIR_AGE_MS {
        return None;
    }

    let cpr_max = (1u32 << CPR_BITS) as f64;
    let dlat0 = 360.0 / (4.0 * NZ);
    let dlat1 = 360.0 / (4.0 * NZ - 1.0);

    let lat0 = lat_even as f64 / cpr_max;
    let lon0 = lon_even as f64 / cpr_max;
    let lat1 = lat_odd as f64 / cpr_max;
    let lon1 = lon_odd as f64 / cpr_max;

    let j = (59.0 * lat0 - 60.0 * lat1 + 0.5).floor();

    let mut rlat0 = dlat0 * (modulo(j, 60.0) + lat0);
    let mut rlat1 = dlat1 * (modulo(j, 59.0) + lat1);
    if rlat0 >= 270.0 {
        rlat0 -= 360.0;
    }
    if rlat1 >= 270.0 {
        rlat1 -= 360.0;
    }

    if nl(rlat0) != nl(rlat1) {
        return None;
    }

    let (lat, lon) = if !newer_is_odd {
        let nlr = nl(rlat0);
        let ni = nlr.max(1);
        let m = (lon0 * (nlr - 1) as f64 - lon1 * nlr as f64 + 0.5).floor();
        let lon = (360.0 / ni as f64) * (modulo(m, ni as f64) + lon0);
        (rlat0, lon)
    } else {
        let nlr = nl(rlat1);
        let ni = (nlr - 1).max(1);
        let m = (lon0 * (nlr - 1) as f64 - lon1 * nlr as f64 + 0.5).floor();
        let lon = (360.0 / ni as f64) * (modulo(m, ni as f64) + lon1);
        (rlat1, lon)
    };

    let lon = if lon >= 180.0 { lon - 360.0 } else { lon };

    Some((round6(lat), round6(lon)))
}

fn round6(val: f64) -> f64 {
    (val * 1_000_000.0).round() / 1_000_000.0
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
