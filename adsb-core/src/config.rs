//! Decoder configuration shared between the library and the CLI.

use serde::{Deserialize, Serialize};

/// The three decoder options threaded from the CLI into [`crate::decode::decode`].
///
/// Grouped into one small `Copy` struct so a single value can be passed
/// through the pipeline instead of three loose booleans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecoderConfig {
    /// Attempt single-bit (and, with `aggressive`, two-bit) parity repair.
    pub fix_errors: bool,
    /// Verify frame parity at all. Turning this off trusts explicit-address
    /// frames (DF 11/17/18) outright and skips repair.
    pub check_crc: bool,
    /// Enable two-bit repair on DF 17, attempted only after single-bit
    /// repair has already failed.
    pub aggressive: bool,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        DecoderConfig {
            fix_errors: true,
            check_crc: true,
            aggressive: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = DecoderConfig::default();
        assert!(config.fix_errors);
        assert!(config.check_crc);
        assert!(!config.aggressive);
    }
}
