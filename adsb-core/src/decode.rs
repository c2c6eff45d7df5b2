//! Decode a raw Mode S frame into a [`DecodedMessage`].
//!
//! This is the one place in the crate where a "bad" outcome is data, not an
//! error: a frame that fails parity, or whose AP-XOR address can't be
//! validated against the cache, comes back with `crc_ok = false` rather than
//! an `Err`. Everything downstream (the sky aggregator, the CLI) is expected
//! to check `crc_ok` and drop what it doesn't trust.

use crate::cache::IcaoCache;
use crate::config::DecoderConfig;
use crate::crc::{self, get_bit};
use crate::types::*;

/// Read `len` bits starting at bit `start` (bit 0 = MSB of byte 0) as an
/// unsigned integer, MSB first. The one other place besides `get_bit` that
/// every field extraction in this module goes through.
fn bits_value(frame: &[u8], start: usize, len: usize) -> u32 {
    let mut v = 0u32;
    for i in 0..len {
        v = (v << 1) | get_bit(frame, start + i) as u32;
    }
    v
}

/// Decode one frame. Never fails: setup-level problems (empty input, a
/// length mismatch before the DF can even be trusted) simply return a
/// default record with `crc_ok = false`.
pub fn decode(raw: &[u8], config: &DecoderConfig, cache: &IcaoCache) -> DecodedMessage {
    let mut msg = DecodedMessage::default();
    if raw.is_empty() {
        return msg;
    }

    let df = (raw[0] >> 3) & 0x1F;
    let bits = df_bits(df);
    msg.df = df;
    msg.bits = bits;

    let len = bits / 8;
    if raw.len() < len {
        return msg;
    }
    let mut frame = raw[..len].to_vec();

    match df {
        11 | 17 | 18 => verify_explicit_address(&mut frame, df, bits, config, cache, &mut msg),
        _ => verify_ap_xor(&frame, bits, config, cache, &mut msg),
    }

    if !msg.crc_ok {
        return msg;
    }

    msg.ca = frame[0] & 0x07;

    match df {
        0 | 16 => msg.altitude = decode_altitude_13bit(bits_value(&frame, 19, 13)),
        4 | 20 => {
            decode_surveillance_common(&frame, &mut msg);
            msg.altitude = decode_altitude_13bit(bits_value(&frame, 19, 13));
        }
        5 | 21 => {
            decode_surveillance_common(&frame, &mut msg);
            msg.identity = Some(decode_squawk(bits_value(&frame, 19, 13)));
        }
        17 => decode_extended_squitter(&frame, &mut msg),
        _ => {}
    }

    msg
}

fn decode_surveillance_common(frame: &[u8], msg: &mut DecodedMessage) {
    msg.fs = bits_value(frame, 5, 3) as u8;
    msg.dr = bits_value(frame, 8, 5) as u8;
    msg.um = bits_value(frame, 13, 6) as u8;
}

// ---------------------------------------------------------------------------
// Parity / address verification
// ---------------------------------------------------------------------------

/// DF 11/17/18: the AP field is a pure CRC, so address recovery is a direct
/// read of bytes 1-3, not a guess. Single/two-bit repair applies here.
fn verify_explicit_address(
    frame: &mut [u8],
    df: u8,
    bits: usize,
    config: &DecoderConfig,
    cache: &IcaoCache,
    msg: &mut DecodedMessage,
) {
    if !config.check_crc {
        msg.crc_ok = true;
        msg.error_bit = -1;
        msg.icao = icao_from_bytes(frame);
        return;
    }

    let trailing = crc::extract_trailing_crc(frame, bits);
    let mut ok = crc::checksum(frame, bits) == trailing;
    let mut single = None;
    let mut two = None;

    if !ok && config.fix_errors && matches!(df, 11 | 17) {
        single = crc::fix_single_bit(frame, bits);
        ok = single.is_some();
        if !ok && config.aggressive && df == 17 {
            two = crc::fix_two_bits(frame, bits);
            ok = two.is_some();
        }
    }

    msg.error_bit = crc::encode_error_bit(single, two);
    msg.crc_ok = ok;
    if ok {
        let icao = icao_from_bytes(frame);
        msg.icao = icao;
        if msg.error_bit == -1 {
            cache.insert(icao);
        }
    }
}

/// DF 0/4/5/16/20/21/24: the AP field is the CRC XORed with the transponder
/// address. There is no way to repair bit errors without already knowing the
/// address, so the only recovery path is: compute the candidate address and
/// see if it was recently seen clean.
fn verify_ap_xor(
    frame: &[u8],
    bits: usize,
    config: &DecoderConfig,
    cache: &IcaoCache,
    msg: &mut DecodedMessage,
) {
    let trailing = crc::extract_trailing_crc(frame, bits);
    let candidate = crc::checksum(frame, bits) ^ trailing;

    if !config.check_crc {
        msg.crc_ok = true;
        msg.icao = candidate;
        return;
    }

    if cache.contains(candidate) {
        msg.crc_ok = true;
        msg.icao = candidate;
    } else {
        msg.crc_ok = false;
    }
}

fn icao_from_bytes(frame: &[u8]) -> u32 {
    ((frame[1] as u32) << 16) | ((frame[2] as u32) << 8) | frame[3] as u32
}

// ---------------------------------------------------------------------------
// Altitude
// ---------------------------------------------------------------------------

/// 12-bit AC field (DF17 ME 9-18, 20-22). Q=1 only; Q=0 reports 0 (no
/// Gillham fallback — see the open item on this in the design notes).
pub fn decode_altitude(alt_code: u32) -> i32 {
    if (alt_code >> 4) & 1 == 1 {
        let n = ((alt_code >> 5) << 4) | (alt_code & 0x0F);
        n as i32 * 25 - 1000
    } else {
        0
    }
}

/// 13-bit AC field (DF 0/4/16/20). M=0,Q=1 only; M=1 or (M=0,Q=0) report 0.
pub fn decode_altitude_13bit(alt_code: u32) -> i32 {
    let m_bit = (alt_code >> 6) & 1;
    let q_bit = (alt_code >> 4) & 1;

    if m_bit == 1 {
        return 0;
    }
    if q_bit == 1 {
        let n = ((alt_code & 0x1F80) >> 2) | ((alt_code & 0x0020) >> 1) | (alt_code & 0x000F);
        n as i32 * 25 - 1000
    } else {
        0
    }
}

// ---------------------------------------------------------------------------
// Mode A squawk
// ---------------------------------------------------------------------------

/// Decode a 13-bit identity code into its 4-digit octal squawk, per the
/// interleaved bit layout `C1 A1 C2 A2 C4 A4 _ B1 D1 B2 D2 B4 D4`.
pub fn decode_squawk(id_code: u32) -> String {
    let c1 = (id_code >> 12) & 1;
    let a1 = (id_code >> 11) & 1;
    let c2 = (id_code >> 10) & 1;
    let a2 = (id_code >> 9) & 1;
    let c4 = (id_code >> 8) & 1;
    let a4 = (id_code >> 7) & 1;
    let b1 = (id_code >> 5) & 1;
    let d1 = (id_code >> 4) & 1;
    let b2 = (id_code >> 3) & 1;
    let d2 = (id_code >> 2) & 1;
    let b4 = (id_code >> 1) & 1;
    let d4 = id_code & 1;

    let a = a4 * 4 + a2 * 2 + a1;
    let b = b4 * 4 + b2 * 2 + b1;
    let c = c4 * 4 + c2 * 2 + c1;
    let d = d4 * 4 + d2 * 2 + d1;

    format!("{a}{b}{c}{d}")
}

// ---------------------------------------------------------------------------
// Extended squitter (DF17)
// ---------------------------------------------------------------------------

fn decode_extended_squitter(frame: &[u8], msg: &mut DecodedMessage) {
    let me_type = bits_value(frame, 32, 5) as u8;
    msg.me_type = me_type;

    match me_type {
        1..=4 => decode_identification(frame, msg),
        9..=18 | 20..=22 => decode_position(frame, msg),
        19 => decode_velocity(frame, msg),
        _ => {}
    }
}

fn decode_identification(frame: &[u8], msg: &mut DecodedMessage) {
    msg.aircraft_category = msg.me_type.saturating_sub(1);

    let packed = bits_value(frame, 40, 24) as u64; // high 24 of the 48 callsign bits
    let packed_low = bits_value(frame, 64, 24) as u64;
    let all = (packed << 24) | packed_low;

    let mut callsign = String::with_capacity(8);
    for i in 0..8 {
        let idx = ((all >> (42 - i * 6)) & 0x3F) as usize;
        callsign.push(CALLSIGN_CHARSET[idx] as char);
    }
    msg.callsign = Some(callsign);
}

fn decode_position(frame: &[u8], msg: &mut DecodedMessage) {
    msg.altitude = decode_altitude(bits_value(frame, 40, 12));
    msg.utc_sync = get_bit(frame, 52) == 1;
    msg.cpr_odd = get_bit(frame, 53) == 1;
    msg.raw_lat_17b = bits_value(frame, 54, 17);
    msg.raw_lon_17b = bits_value(frame, 71, 17);
}

fn decode_velocity(frame: &[u8], msg: &mut DecodedMessage) {
    let subtype = bits_value(frame, 37, 3) as u8;
    msg.me_sub = subtype;

    match subtype {
        1 | 2 => decode_ground_velocity(frame, msg),
        3 | 4 => decode_airspeed_heading(frame, msg),
        _ => {}
    }
}

fn decode_ground_velocity(frame: &[u8], msg: &mut DecodedMessage) {
    let ew_dir = get_bit(frame, 45);
    let ew_vel = bits_value(frame, 46, 10) as i32 - 1;
    let ns_dir = get_bit(frame, 56);
    let ns_vel = bits_value(frame, 57, 10) as i32 - 1;
    let vr_source = get_bit(frame, 67);
    let vr_sign = get_bit(frame, 68);
    let vr_raw = bits_value(frame, 69, 9) as i32 - 1;

    msg.ew_dir = ew_dir;
    msg.ew_vel = ew_vel;
    msg.ns_dir = ns_dir;
    msg.ns_vel = ns_vel;
    msg.vert_rate_source = vr_source;
    msg.vert_rate_sign = vr_sign;
    msg.vert_rate = if vr_raw >= 0 { vr_raw * 64 } else { 0 };

    if ew_vel >= 0 && ns_vel >= 0 {
        let vx = ew_vel as f64;
        let vy = ns_vel as f64;
        msg.ground_speed = (vx * vx + vy * vy).sqrt().round();

        let ew_signed = if ew_dir == 1 { -vx } else { vx };
        let ns_signed = if ns_dir == 1 { -vy } else { vy };
        if ew_signed != 0.0 || ns_signed != 0.0 {
            msg.heading_deg = ew_signed.atan2(ns_signed).to_degrees().rem_euclid(360.0);
            msg.heading_valid = true;
        }
    }
}

fn decode_airspeed_heading(frame: &[u8], msg: &mut DecodedMessage) {
    msg.heading_valid = get_bit(frame, 42) == 1;
    if msg.heading_valid {
        let raw = bits_value(frame, 46, 7);
        msg.heading_deg = raw as f64 * 360.0 / 128.0;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::hex_decode;

    fn decode_hex(hex: &str, config: &DecoderConfig, cache: &IcaoCache) -> DecodedMessage {
        let raw = hex_decode(hex).unwrap();
        decode(&raw, config, cache)
    }

    // S1 — DF17 identification.
    #[test]
    fn test_s1_identification() {
        let config = DecoderConfig::default();
        let cache = IcaoCache::new();
        let msg = decode_hex("8D4840D6202CC371C32CE0576098", &config, &cache);
        assert_eq!(msg.df, 17);
        assert_eq!(msg.ca, 5);
        assert_eq!(msg.icao, 0x4840D6);
        assert_eq!(msg.me_type, 4);
        assert_eq!(msg.aircraft_category, 3);
        assert_eq!(msg.callsign.as_deref(), Some("KLM1023 "));
        assert!(msg.crc_ok);
        assert_eq!(msg.error_bit, -1);
    }

    // S2 — DF17 airborne position (even).
    #[test]
    fn test_s2_position_even() {
        let config = DecoderConfig::default();
        let cache = IcaoCache::new();
        let msg = decode_hex("8D40621D58C382D690C8AC2863A7", &config, &cache);
        assert_eq!(msg.icao, 0x40621D);
        assert_eq!(msg.me_type, 11);
        assert!(!msg.cpr_odd);
        assert_eq!(msg.raw_lat_17b, 93000);
        assert_eq!(msg.raw_lon_17b, 51372);
        assert_eq!(msg.altitude, 38000);
        assert_eq!(msg.unit, AltitudeUnit::Feet);
    }

    // S3 (partial) — DF17 airborne position (odd) companion frame.
    #[test]
    fn test_s3_position_odd_flag() {
        let config = DecoderConfig::default();
        let cache = IcaoCache::new();
        let msg = decode_hex("8D40621D58C386435CC412692AD6", &config, &cache);
        assert!(msg.cpr_odd);
        assert_eq!(msg.raw_lat_17b, 74158);
        assert_eq!(msg.raw_lon_17b, 50194);
    }

    // S4 — DF17 velocity.
    #[test]
    fn test_s4_velocity() {
        let config = DecoderConfig::default();
        let cache = IcaoCache::new();
        let msg = decode_hex("8D485020994409940838175B284F", &config, &cache);
        assert_eq!(msg.icao, 0x485020);
        assert_eq!(msg.me_type, 19);
        assert_eq!(msg.me_sub, 1);
        assert!((msg.ground_speed - 159.0).abs() < 1.0, "{}", msg.ground_speed);
        assert!((msg.heading_deg - 182.88).abs() < 0.5, "{}", msg.heading_deg);
        assert_eq!(msg.vert_rate_sign, 1);
        assert_eq!(msg.vert_rate, 832);
    }

    // S5 — single-bit repair.
    #[test]
    fn test_s5_single_bit_repair() {
        let config = DecoderConfig::default();
        let cache = IcaoCache::new();
        let mut raw = hex_decode("8D4840D6202CC371C32CE0576098").unwrap();
        let byte = 30 / 8;
        let mask = 1u8 << (7 - (30 % 8));
        raw[byte] ^= mask;

        let msg = decode(&raw, &config, &cache);
        assert!(msg.crc_ok);
        assert_eq!(msg.error_bit, 30);
    }

    // S6 — AP-XOR validation against the ICAO cache.
    #[test]
    fn test_s6_ap_xor_validation() {
        let config = DecoderConfig::default();
        let cache = IcaoCache::new();

        // A known-good DF4 altitude frame for ICAO 0xABCDEF: build one by
        // taking a clean DF17 frame's structure is overkill here — instead
        // construct a minimal DF4 frame and XOR the trailing CRC with the
        // address under test.
        let mut frame = vec![0x20u8, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00];
        frame[0] = (4 << 3) as u8; // DF=4
        let crc = crc::checksum(&frame, 56);
        let ap = crc ^ 0xABCDEF;
        frame[4] = (ap >> 16) as u8;
        frame[5] = (ap >> 8) as u8;
        frame[6] = ap as u8;

        let without_seed = decode(&frame, &config, &cache);
        assert!(!without_seed.crc_ok);

        cache.insert(0xABCDEF);
        let with_seed = decode(&frame, &config, &cache);
        assert!(with_seed.crc_ok);
        assert_eq!(with_seed.icao, 0xABCDEF);
    }

    // check_crc=false must bypass cache validation for AP-XOR frames too,
    // not just the explicit-address branch.
    #[test]
    fn test_check_crc_false_bypasses_ap_xor_validation() {
        let config = DecoderConfig {
            check_crc: false,
            ..DecoderConfig::default()
        };
        let cache = IcaoCache::new(); // deliberately empty

        let mut frame = vec![0x20u8, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00];
        frame[0] = (4 << 3) as u8; // DF=4
        let crc = crc::checksum(&frame, 56);
        let ap = crc ^ 0xABCDEF;
        frame[4] = (ap >> 16) as u8;
        frame[5] = (ap >> 8) as u8;
        frame[6] = ap as u8;

        let msg = decode(&frame, &config, &cache);
        assert!(msg.crc_ok);
        assert_eq!(msg.icao, 0xABCDEF);
        assert!(cache.is_empty(), "check_crc=false must not touch the cache");
    }

    #[test]
    fn test_p1_df_length_table() {
        for df in 0u8..=31 {
            let expected = if matches!(df, 16 | 17 | 19 | 20 | 21) {
                112
            } else {
                56
            };
            assert_eq!(df_bits(df), expected, "df={df}");
        }
    }

    #[test]
    fn test_squawk_7500() {
        // A=7 B=5 C=0 D=0, bit layout C1 A1 C2 A2 C4 A4 _ B1 D1 B2 D2 B4 D4.
        let id_code = 0b0_1_0_1_0_1_0_1_0_0_0_1_0;
        assert_eq!(decode_squawk(id_code), "7500");
    }

    #[test]
    fn test_squawk_7700() {
        let id_code = 0b0_1_0_1_0_1_0_1_0_1_0_1_0;
        assert_eq!(decode_squawk(id_code), "7700");
    }

    #[test]
    fn test_altitude_zero_when_q_clear() {
        assert_eq!(decode_altitude(0b0000_0000_0000), 0);
        assert_eq!(decode_altitude_13bit(0b0_000000_0_0000), 0);
    }

    #[test]
    fn test_altitude_13bit_metric_reports_zero() {
        // M-bit set (bit 6).
        assert_eq!(decode_altitude_13bit(0b1_000000_1_0000), 0);
    }

    #[test]
    fn test_decode_unrecognized_df_crc_checked_but_no_fields() {
        let config = DecoderConfig::default();
        let cache = IcaoCache::new();
        // DF 24 is an AP-XOR format with no field extraction in this crate.
        let mut frame = vec![0u8; 7];
        frame[0] = 24 << 3;
        let crc = crc::checksum(&frame, 56);
        cache.insert(0x123456);
        let ap = crc ^ 0x123456;
        frame[4] = (ap >> 16) as u8;
        frame[5] = (ap >> 8) as u8;
        frame[6] = ap as u8;
        let msg = decode(&frame, &config, &cache);
        assert!(msg.crc_ok);
        assert_eq!(msg.icao, 0x123456);
    }

    #[test]
    fn test_decode_empty_input() {
        let config = DecoderConfig::default();
        let cache = IcaoCache::new();
        let msg = decode(&[], &config, &cache);
        assert!(!msg.crc_ok);
    }
}
