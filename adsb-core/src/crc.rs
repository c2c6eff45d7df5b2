//! CRC-24 parity engine for Mode S messages.
//!
//! Mode S parity is not computed by polynomial division at decode time — the
//! reference decoders ship a precomputed 112-entry table of 24-bit words, one
//! per message bit, and the checksum is the XOR of the entries whose bit is
//! set. This module reproduces that table verbatim (`PARITY_TABLE`) rather
//! than deriving it from the generator polynomial, since the table *is* the
//! spec: ICAO Annex 10 defines the code this way, and every interoperable
//! decoder keys off these exact values.
//!
//! For a 56-bit (short) frame, only the last 56 rows of the table apply — the
//! table is indexed as if every frame were 112 bits, with short frames using
//! the trailing window. The final 24 rows are zero because the CRC field
//! occupies the frame's last 24 bits and must not participate in its own
//! computation.

/// Precomputed Mode S parity table, one 24-bit word per message bit (112
/// total). 56-bit frames use `PARITY_TABLE[56..]`.
const PARITY_TABLE: [u32; 112] = [
    0x3935ea, 0x1c9af5, 0xf1b77e, 0x78dbbf, 0xc397db, 0x9e31e9, 0xb0e2f0, 0x587178, 0x2c38bc,
    0x161c5e, 0x0b0e2f, 0xfa7d13, 0x82c48d, 0xbe9842, 0x5f4c21, 0xd05c14, 0x682e0a, 0x341705,
    0xe5f186, 0x72f8c3, 0xc68665, 0x9cb936, 0x4e5c9b, 0xd8d449, 0x939020, 0x49c810, 0x24e408,
    0x127204, 0x093902, 0x049c81, 0xfdb444, 0x7eda22, 0x3f6d11, 0xe04c8c, 0x702646, 0x381323,
    0xe3f395, 0x8e03ce, 0x4701e7, 0xdc7af7, 0x91c77f, 0xb719bb, 0xa476d9, 0xadc168, 0x56e0b4,
    0x2b705a, 0x15b82d, 0xf52612, 0x7a9309, 0xc2b380, 0x6159c0, 0x30ace0, 0x185670, 0x0c2b38,
    0x06159c, 0x030ace, 0x018567, 0xff38b7, 0x80665f, 0xbfc92b, 0xa01e91, 0xaff54c, 0x57faa6,
    0x2bfd53, 0xea04ad, 0x8af852, 0x457c29, 0xdd4410, 0x6ea208, 0x375104, 0x1ba882, 0x0dd441,
    0xf91024, 0x7c8812, 0x3e4409, 0xe0d800, 0x706c00, 0x383600, 0x1c1b00, 0x0e0d80, 0x0706c0,
    0x038360, 0x01c1b0, 0x00e0d8, 0x00706c, 0x003836, 0x001c1b, 0xfff409, 0x000000, 0x000000,
    0x000000, 0x000000, 0x000000, 0x000000, 0x000000, 0x000000, 0x000000, 0x000000, 0x000000,
    0x000000, 0x000000, 0x000000, 0x000000, 0x000000, 0x000000, 0x000000, 0x000000, 0x000000,
    0x000000, 0x000000, 0x000000,
];

/// Bit `i` of `frame`, with bit 0 the MSB of byte 0. Every other bit-layout
/// operation in this crate (altitude fields, callsign packing, CPR windows)
/// ultimately goes through this so a single off-by-one fix covers them all.
#[inline]
pub fn get_bit(frame: &[u8], i: usize) -> u8 {
    let byte = frame[i / 8];
    (byte >> (7 - (i % 8))) & 1
}

/// XOR of the parity-table entries whose corresponding message bit is 1.
///
/// `bits` must be 56 or 112; the CRC field itself (last 24 bits) is excluded
/// from the scan because those table rows are zero.
pub fn checksum(frame: &[u8], bits: usize) -> u32 {
    let offset = 112 - bits;
    let mut crc = 0u32;
    for j in 0..bits {
        if get_bit(frame, j) == 1 {
            crc ^= PARITY_TABLE[j + offset];
        }
    }
    crc
}

/// The trailing 24-bit Address/Parity field: the frame's last 3 bytes,
/// read big-endian.
pub fn extract_trailing_crc(frame: &[u8], bits: usize) -> u32 {
    let len = bits / 8;
    ((frame[len - 3] as u32) << 16) | ((frame[len - 2] as u32) << 8) | (frame[len - 1] as u32)
}

/// Attempt to repair a single flipped bit.
///
/// Scans bit positions in ascending order; on the first `j` whose flip makes
/// `checksum == extract_trailing_crc`, commits the flip into `frame` and
/// returns `Some(j)`. Returns `None`, leaving `frame` untouched, if no single
/// flip restores parity.
pub fn fix_single_bit(frame: &mut [u8], bits: usize) -> Option<usize> {
    let len = bits / 8;
    for j in 0..bits {
        let byte = j / 8;
        let mask = 1u8 << (7 - (j % 8));
        frame[byte] ^= mask;

        if checksum(&frame[..len], bits) == extract_trailing_crc(&frame[..len], bits) {
            return Some(j);
        }

        frame[byte] ^= mask; // flip back, try the next position
    }
    None
}

/// Attempt to repair two flipped bits. O(bits^2) — only ever invoked for
/// DF 17 in aggressive mode, and only after `fix_single_bit` has failed.
///
/// Scans `(j, i)` pairs with `j < i` in ascending `j` then ascending `i`;
/// returns the first pair that restores parity, encoded as `(j, i)`.
pub fn fix_two_bits(frame: &mut [u8], bits: usize) -> Option<(usize, usize)> {
    let len = bits / 8;
    for j in 0..bits {
        let byte_j = j / 8;
        let mask_j = 1u8 << (7 - (j % 8));
        frame[byte_j] ^= mask_j;

        for i in (j + 1)..bits {
            let byte_i = i / 8;
            let mask_i = 1u8 << (7 - (i % 8));
            frame[byte_i] ^= mask_i;

            if checksum(&frame[..len], bits) == extract_trailing_crc(&frame[..len], bits) {
                return Some((j, i));
            }

            frame[byte_i] ^= mask_i;
        }

        frame[byte_j] ^= mask_j;
    }
    None
}

/// Encode a repair result per the `error_bit` convention: -1 for none, the
/// bit index for a single-bit fix, or `j | (i << 8)` for a two-bit fix.
pub fn encode_error_bit(single: Option<usize>, two: Option<(usize, usize)>) -> i32 {
    if let Some((j, i)) = two {
        return (j as i32) | ((i as i32) << 8);
    }
    match single {
        Some(j) => j as i32,
        None => -1,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
