//! ICAO address cache — the address-recovery heuristic's only state.
//!
//! DF 11/17/18 carry the ICAO address explicitly and protect it with a pure
//! CRC. Every other format XORs the CRC with the address before transmission,
//! so recovering the address means guessing it from the CRC residual. That
//! residual is only trustworthy if the guessed address was seen recently on
//! a clean, explicit frame — this cache is exactly that 60-second memory,
//! modeled after the teacher's `IcaoCache` but keyed on wall-clock
//! `Instant`s instead of a caller-supplied timestamp, and internally
//! synchronized so it can be handed to more than one decode loop by
//! reference.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// How long an address stays valid after being seen on a clean frame.
pub const TTL: Duration = Duration::from_secs(60);

/// Time-windowed cache of ICAO addresses confirmed by a clean DF 11/17/18
/// frame (I3). Frames whose parity is XORed with the address (DF 0/4/5/16/
/// 20/21/24) are validated against this cache rather than trusted outright.
pub struct IcaoCache {
    entries: Mutex<HashMap<u32, Instant>>,
}

impl IcaoCache {
    pub fn new() -> Self {
        IcaoCache {
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Record that `icao` was seen on a clean, explicit-address frame just
    /// now. Idempotent: refreshing an existing entry's timestamp is fine.
    pub fn insert(&self, icao: u32) {
        self.entries.lock().unwrap().insert(icao, Instant::now());
    }

    /// True iff `icao` was inserted within the last `TTL`.
    pub fn contains(&self, icao: u32) -> bool {
        match self.entries.lock().unwrap().get(&icao) {
            Some(&seen) => seen.elapsed() <= TTL,
            None => false,
        }
    }

    /// Drop every entry older than `TTL`. Not required for correctness
    /// (`contains` already checks age) but keeps the map from growing
    /// unboundedly under long-running, high-traffic capture.
    pub fn prune(&self) {
        self.entries
            .lock()
            .unwrap()
            .retain(|_, &mut seen| seen.elapsed() <= TTL);
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Test-only: insert an address as if it had been seen `age` ago, so
    /// expiry can be exercised without sleeping past the real 60s TTL.
    #[cfg(test)]
    fn insert_aged(&self, icao: u32, age: Duration) {
        let seen = Instant::now().checked_sub(age).expect("age too large");
        self.entries.lock().unwrap().insert(icao, seen);
    }
}

impl Default for IcaoCache {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_then_contains() {
        let cache = IcaoCache::new();
        assert!(!cache.contains(0x4840D6));
        cache.insert(0x4840D6);
        assert!(cache.contains(0x4840D6));
    }

    #[test]
    fn test_ttl_expiry() {
        let cache = IcaoCache::new();
        cache.insert_aged(0xABCDEF, Duration::from_secs(60) + Duration::from_millis(50));
        assert!(!cache.contains(0xABCDEF));
    }

    #[test]
    fn test_within_ttl_still_present() {
        let cache = IcaoCache::new();
        cache.insert_aged(0xABCDEF, Duration::from_secs(59));
        assert!(cache.contains(0xABCDEF));
    }

    #[test]
    fn test_insert_is_idempotent_and_refreshes() {
        let cache = IcaoCache::new();
        cache.insert_aged(0x123456, Duration::from_secs(59));
        assert_eq!(cache.len(), 1);
        cache.insert(0x123456); // refresh
        assert_eq!(cache.len(), 1);
        assert!(cache.contains(0x123456));
    }

    #[test]
    fn test_prune_removes_expired_only() {
        let cache = IcaoCache::new();
        cache.insert_aged(0x000001, Duration::from_secs(61));
        cache.insert_aged(0x000002, Duration::from_secs(10));
        cache.prune();
        assert_eq!(cache.len(), 1);
        assert!(cache.contains(0x000002));
    }
}
