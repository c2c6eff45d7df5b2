//! The sky aggregator: a mutex-guarded map of currently tracked
//! aircraft, updated by applying decoded messages and aged out on a timer.
//!
//! This is the only place in the crate holding mutable state shared across
//! more than one logical thread (see the concurrency model: one producer
//! reading frames, one producer pruning, one consumer rendering a
//! snapshot). Every public method takes `&self` and does its own locking so
//! a single `Sky` can be wrapped in an `Arc` and handed to all three.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::cpr;
use crate::types::{icao_to_string, AltitudeUnit, DecodedMessage};

/// Same aging policy as the ICAO cache: an aircraft not heard from in 60s
/// is considered gone.
pub const TTL: Duration = Duration::from_secs(60);

/// One half of a CPR even/odd pair, with the instant it was received so the
/// pair's freshness can be checked against the 10s window (I5).
#[derive(Debug, Clone, Copy)]
pub struct CprHalf {
    pub raw_lat: u32,
    pub raw_lon: u32,
    pub received_at: Instant,
}

/// A tracked aircraft. Cloned wholesale by `Sky::snapshot` so renderers
/// never hold the map's lock.
#[derive(Debug, Clone)]
pub struct Aircraft {
    pub icao: u32,
    pub hex: String,
    pub last_seen: Instant,
    pub messages: u64,
    pub callsign: Option<String>,
    pub altitude: i32,
    pub altitude_unit: AltitudeUnit,
    pub ground_speed: f64,
    pub heading_deg: f64,
    pub even_cpr: Option<CprHalf>,
    pub odd_cpr: Option<CprHalf>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl Aircraft {
    fn new(icao: u32) -> Self {
        Aircraft {
            icao,
            hex: icao_to_string(icao),
            last_seen: Instant::now(),
            messages: 0,
            callsign: None,
            altitude: 0,
            altitude_unit: AltitudeUnit::Feet,
            ground_speed: 0.0,
            heading_deg: 0.0,
            even_cpr: None,
            odd_cpr: None,
            latitude: None,
            longitude: None,
        }
    }

    /// Printable callsign with trailing filler spaces trimmed.
    pub fn display_callsign(&self) -> &str {
        self.callsign.as_deref().map(str::trim_end).unwrap_or("")
    }
}

/// Mutex-guarded map of tracked aircraft, keyed by 24-bit ICAO address.
pub struct Sky {
    aircraft: Mutex<HashMap<u32, Aircraft>>,
}

impl Sky {
    pub fn new() -> Self {
        Sky {
            aircraft: Mutex::new(HashMap::new()),
        }
    }

    /// Apply one decoded message to the fleet view. Frames that failed
    /// parity are dropped silently (I4/§4.5) — they never reach here with
    /// anything useful in them.
    pub fn apply(&self, msg: &DecodedMessage) {
        if !msg.crc_ok {
            return;
        }

        let mut map = self.aircraft.lock().unwrap();
        let ac = map.entry(msg.icao).or_insert_with(|| Aircraft::new(msg.icao));
        ac.last_seen = Instant::now();
        ac.messages += 1;

        match msg.df {
            0 | 4 | 20 => {
                ac.altitude = msg.altitude;
                ac.altitude_unit = msg.unit;
            }
            17 => apply_extended_squitter(ac, msg),
            _ => {}
        }
    }

    /// Deep copy of every tracked aircraft, safe to render without holding
    /// the lock.
    pub fn snapshot(&self) -> Vec<Aircraft> {
        self.aircraft.lock().unwrap().values().cloned().collect()
    }

    pub fn count(&self) -> usize {
        self.aircraft.lock().unwrap().len()
    }

    /// Remove every aircraft whose `last_seen` is older than [`TTL`].
    pub fn prune(&self) {
        self.aircraft
            .lock()
            .unwrap()
            .retain(|_, ac| ac.last_seen.elapsed() <= TTL);
    }
}

impl Default for Sky {
    fn default() -> Self {
        Self::new()
    }
}

fn apply_extended_squitter(ac: &mut Aircraft, msg: &DecodedMessage) {
    match msg.me_type {
        1..=4 => {
            ac.callsign = msg.callsign.clone();
        }
        9..=18 | 20..=22 => {
            ac.altitude = msg.altitude;
            ac.altitude_unit = msg.unit;
            update_cpr(ac, msg);
        }
        19 if msg.me_sub == 1 || msg.me_sub == 2 => {
            ac.ground_speed = msg.ground_speed;
            if msg.heading_valid {
                ac.heading_deg = msg.heading_deg;
            }
        }
        _ => {}
    }
}

fn update_cpr(ac: &mut Aircraft, msg: &DecodedMessage) {
    let half = CprHalf {
        raw_lat: msg.raw_lat_17b,
        raw_lon: msg.raw_lon_17b,
        received_at: Instant::now(),
    };

    if msg.cpr_odd {
        ac.odd_cpr = Some(half);
    } else {
        ac.even_cpr = Some(half);
    }

    let (Some(even), Some(odd)) = (ac.even_cpr, ac.odd_cpr) else {
        return;
    };

    let age_ms = diff_ms(even.received_at, odd.received_at);
    if age_ms.unsigned_abs() as u64 > cpr::MAX_PAIR_AGE_MS as u64 {
        return;
    }

    let newer_is_odd = odd.received_at > even.received_at;
    if let Some((lat, lon)) = cpr::global_decode(
        even.raw_lat,
        even.raw_lon,
        odd.raw_lat,
        odd.raw_lon,
        age_ms,
        newer_is_odd,
    ) {
        ac.latitude = Some(lat);
        ac.longitude = Some(lon);
    }
}

fn diff_ms(a: Instant, b: Instant) -> i64 {
    if a >= b {
        a.duration_since(b).as_millis() as i64
    } else {
        -(b.duration_since(a).as_millis() as i64)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
