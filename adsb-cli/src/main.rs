//! adsb-cli: reads a line-oriented Mode S frame stream and prints a
//! periodic plain-text snapshot of the tracked fleet.
//!
//! The only I/O-performing, non-pure part of this project — everything it
//! calls into (`adsb_core::decode`, `Sky::apply`) is synchronous and
//! independently testable without it.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use clap::Parser;

use adsb_core::{decode, AdsbError, DecoderConfig, IcaoCache, Result, Sky};

#[derive(Parser)]
#[command(
    name = "adsb-cli",
    version,
    about = "Mode S / ADS-B frame decoder and live fleet view"
)]
struct Cli {
    /// Attempt single-bit (and, with --aggressive, two-bit) parity repair.
    #[arg(long, default_value_t = true, overrides_with = "no_fix_errors")]
    fix_errors: bool,
    #[arg(long, default_value_t = false, overrides_with = "fix_errors")]
    no_fix_errors: bool,

    /// Verify frame parity. Disabling trusts explicit-address frames outright.
    #[arg(long, default_value_t = true, overrides_with = "no_check_crc")]
    check_crc: bool,
    #[arg(long, default_value_t = false, overrides_with = "check_crc")]
    no_check_crc: bool,

    /// Enable two-bit repair on DF 17, after single-bit repair has failed.
    #[arg(long, default_value_t = false)]
    aggressive: bool,

    /// Read frames from a file instead of stdin.
    #[arg(long)]
    input: Option<PathBuf>,
}

impl Cli {
    fn decoder_config(&self) -> DecoderConfig {
        DecoderConfig {
            fix_errors: self.fix_errors && !self.no_fix_errors,
            check_crc: self.check_crc && !self.no_check_crc,
            aggressive: self.aggressive,
        }
    }
}

fn main() {
    let cli = Cli::parse();
    if let Err(err) = run(cli) {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = cli.decoder_config();
    let cache = Arc::new(IcaoCache::new());
    let sky = Arc::new(Sky::new());

    // Producer B: the ~1Hz prune ticker, running for the life of the process.
    let ticker_sky = Arc::clone(&sky);
    thread::spawn(move || loop {
        thread::sleep(Duration::from_secs(1));
        ticker_sky.prune();
        print_snapshot(&ticker_sky);
    });

    let reader: Box<dyn BufRead> = match &cli.input {
        Some(path) => Box::new(BufReader::new(File::open(path)?)),
        None => Box::new(BufReader::new(io::stdin())),
    };

    for line in reader.lines() {
        let line = line.map_err(AdsbError::Io)?;
        let Some(raw) = parse_frame_line(&line) else {
            continue;
        };
        let msg = decode(&raw, &config, &cache);
        sky.apply(&msg);
    }

    print_snapshot(&sky);
    Ok(())
}

/// Parse one `*HEXHEX...;` line into its raw bytes. Anything not matching
/// the 30-character `*` / 28-nibble / `;` shape is silently discarded, per
/// the line-framing contract — a malformed line is never an error.
fn parse_frame_line(line: &str) -> Option<Vec<u8>> {
    let line = line.trim();
    if line.len() != 30 || !line.starts_with('*') || !line.ends_with(';') {
        return None;
    }
    adsb_core::hex_decode(&line[1..29])
}

fn print_snapshot(sky: &Sky) {
    let snapshot = sky.snapshot();
    println!("-- {} aircraft --", snapshot.len());
    for ac in snapshot {
        let pos = match (ac.latitude, ac.longitude) {
            (Some(lat), Some(lon)) => format!("{lat:.4},{lon:.4}"),
            _ => "-".to_string(),
        };
        println!(
            "{:<6} {:<9} alt={:<6} gs={:<5.0} trk={:<5.0} {}",
            ac.hex,
            ac.display_callsign(),
            ac.altitude,
            ac.ground_speed,
            ac.heading_deg,
            pos
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_line() {
        let line = "*8D4840D6202CC371C32CE0576098;";
        let raw = parse_frame_line(line).expect("valid line");
        assert_eq!(raw.len(), 14);
    }

    #[test]
    fn test_parse_rejects_wrong_length() {
        assert!(parse_frame_line("*8D4840D6;").is_none());
    }

    #[test]
    fn test_parse_rejects_missing_star() {
        assert!(parse_frame_line("8D4840D6202CC371C32CE0576098;;").is_none());
    }

    #[test]
    fn test_parse_rejects_missing_semicolon() {
        assert!(parse_frame_line("*8D4840D6202CC371C32CE0576098 ").is_none());
    }

    #[test]
    fn test_parse_rejects_non_hex() {
        let line = "*ZZ4840D6202CC371C32CE0576098;";
        assert!(parse_frame_line(line).is_none());
    }

    #[test]
    fn test_decoder_config_overrides() {
        let cli = Cli {
            fix_errors: true,
            no_fix_errors: true,
            check_crc: true,
            no_check_crc: false,
            aggressive: true,
            input: None,
        };
        let config = cli.decoder_config();
        assert!(!config.fix_errors);
        assert!(config.check_crc);
        assert!(config.aggressive);
    }
}
