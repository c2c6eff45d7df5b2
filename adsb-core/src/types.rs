//! Shared types, error enum, and the decoded message record for adsb-core.

use serde::Serialize;
use thiserror::Error;

/// Errors produced by the ambient (non-decode-path) parts of adsb-core.
///
/// Per-frame decode failures are never represented here — a bad frame is
/// data (`crc_ok == false`), not an exception. This enum only covers setup
/// and boundary failures: an unreadable input, or a byte slice whose length
/// doesn't match the bit count it claims to carry.
#[derive(Debug, Error)]
pub enum AdsbError {
    #[error("invalid hex string: {0}")]
    InvalidHex(String),
    #[error("invalid frame length: expected {expected} bits, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
    #[error("unrecognized downlink format: {0}")]
    UnknownDf(u8),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, AdsbError>;

// ---------------------------------------------------------------------------
// Hex utilities
// ---------------------------------------------------------------------------

/// Decode a hex string into bytes. Case-insensitive, must be even length.
pub fn hex_decode(hex: &str) -> Option<Vec<u8>> {
    let hex = hex.trim();
    if hex.len() % 2 != 0 {
        return None;
    }
    let mut bytes = Vec::with_capacity(hex.len() / 2);
    for chunk in hex.as_bytes().chunks(2) {
        let high = hex_digit(chunk[0])?;
        let low = hex_digit(chunk[1])?;
        bytes.push((high << 4) | low);
    }
    Some(bytes)
}

/// Encode bytes as uppercase hex string.
pub fn hex_encode(data: &[u8]) -> String {
    let mut s = String::with_capacity(data.len() * 2);
    for &b in data {
        s.push(HEX_CHARS[(b >> 4) as usize] as char);
        s.push(HEX_CHARS[(b & 0x0F) as usize] as char);
    }
    s
}

const HEX_CHARS: &[u8; 16] = b"0123456789ABCDEF";

fn hex_digit(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

/// Format a 24-bit ICAO address as a 6-char uppercase hex string.
pub fn icao_to_string(icao: u32) -> String {
    format!("{:06X}", icao & 0xFF_FFFF)
}

// ---------------------------------------------------------------------------
// Downlink Format length table
// ---------------------------------------------------------------------------

/// Message length in bits for a given Downlink Format (I1).
///
/// 112 bits iff `df` is one of {16, 17, 19, 20, 21}; 56 bits otherwise. DF 18
/// shares DF 17's explicit-address framing but this crate never reads an
/// extended-squitter body out of it, so it is intentionally absent from the
/// 112-bit set — `decode` still checksums it at the short length this table
/// gives it. `df` is a 5-bit field so this covers every value 0..=31.
pub fn df_bits(df: u8) -> usize {
    if matches!(df, 16 | 17 | 19 | 20 | 21) {
        112
    } else {
        56
    }
}

// ---------------------------------------------------------------------------
// ADS-B callsign character set
// ---------------------------------------------------------------------------

/// AIS 6-bit character set used for DF17 identification messages (ME 1-4).
///
/// 64 entries, `?` for reserved/unused codes. Preserve verbatim — downstream
/// tools expect `?` for anything outside this set.
pub const CALLSIGN_CHARSET: &[u8; 64] =
    b"?ABCDEFGHIJKLMNOPQRSTUVWXYZ????? ???????????????0123456789??????";

// ---------------------------------------------------------------------------
// Units
// ---------------------------------------------------------------------------

/// Altitude unit tag. Mode S altitude is feet unless the rare M=1 metric
/// encoding is transmitted (never implemented — see `decode::decode_ac13`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AltitudeUnit {
    Feet,
    Meters,
}

// ---------------------------------------------------------------------------
// DecodedMessage — the flat per-frame record
// ---------------------------------------------------------------------------

/// Immutable record produced per decoded frame.
///
/// This mirrors the wire layout directly rather than splitting into one
/// struct per Downlink Format: fields that don't apply to a given `df`/`me_type`
/// are simply left at their default (`None`/`-1`/`0`). That flat shape is what
/// lets the sky aggregator (`crate::sky`) pattern-match on `df`/`me_type`
/// without an enum-of-enums.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecodedMessage {
    /// Downlink format, 0-31.
    pub df: u8,
    /// Message length in bits, 56 or 112 (I1).
    pub bits: usize,
    /// Whether parity was verified, possibly after repair or AP-XOR recovery.
    pub crc_ok: bool,
    /// -1 if no repair; 0..bits if a single bit was flipped; `j | (i << 8)`
    /// if two bits were flipped (ascending j, then ascending i).
    pub error_bit: i32,
    /// 24-bit ICAO address.
    pub icao: u32,
    /// Capability subfield (DF 11/17/18), 0-7.
    pub ca: u8,

    // DF 4/5/20/21 surveillance fields.
    pub fs: u8,
    pub dr: u8,
    pub um: u8,
    /// Decimal string of four octal Mode A digits (DF5/21 squawk).
    pub identity: Option<String>,

    // Altitude (DF 0/4/16/20, and DF17 ME 9-18/20-22).
    pub altitude: i32,
    pub unit: AltitudeUnit,

    // Extended squitter (DF17/18) subfields.
    pub me_type: u8,
    pub me_sub: u8,
    pub aircraft_category: u8,
    /// 8-char callsign, with trailing filler intact (ME 1-4 only).
    pub callsign: Option<String>,
    pub cpr_odd: bool,
    pub utc_sync: bool,
    pub raw_lat_17b: u32,
    pub raw_lon_17b: u32,

    // Velocity (ME 19).
    pub ew_dir: u8,
    pub ew_vel: i32,
    pub ns_dir: u8,
    pub ns_vel: i32,
    pub vert_rate_source: u8,
    pub vert_rate_sign: u8,
    pub vert_rate: i32,
    pub ground_speed: f64,
    pub heading_deg: f64,
    pub heading_valid: bool,
}

impl Default for DecodedMessage {
    fn default() -> Self {
        DecodedMessage {
            df: 0,
            bits: 56,
            crc_ok: false,
            error_bit: -1,
            icao: 0,
            ca: 0,
            fs: 0,
            dr: 0,
            um: 0,
            identity: None,
            altitude: 0,
            unit: AltitudeUnit::Feet,
            me_type: 0,
            me_sub: 0,
            aircraft_category: 0,
            callsign: None,
            cpr_odd: false,
            utc_sync: false,
            raw_lat_17b: 0,
            raw_lon_17b: 0,
            ew_dir: 0,
            ew_vel: 0,
            ns_dir: 0,
            ns_vel: 0,
            vert_rate_source: 0,
            vert_rate_sign: 0,
            vert_rate: 0,
            ground_speed: 0.0,
            heading_deg: 0.0,
            heading_valid: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
