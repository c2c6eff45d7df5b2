//! adsb-core: Pure decode + tracking library for Mode S / ADS-B.
//!
//! No async, no I/O — just algorithms. The CLI binary in `adsb-cli` is the
//! only part of this project that touches a stream or a clock's wall-clock
//! side effects beyond the cache/sky's internal timers.

pub mod cache;
pub mod config;
pub mod cpr;
pub mod crc;
pub mod decode;
pub mod sky;
pub mod types;

pub use cache::IcaoCache;
pub use config::DecoderConfig;
pub use decode::decode;
pub use sky::{Aircraft, Sky};
pub use types::*;
