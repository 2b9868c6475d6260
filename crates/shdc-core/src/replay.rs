// ============================================
// File: crates/shdc-core/src/replay.rs
// ============================================
//! # Replay Guard
//!
//! ## Creation Reason
//! Implements the packet freshness defenses: the ±30 s timestamp band
//! and the recent `(DeviceId, Nonce3)` set, evaluated on every packet
//! after signature verification.
//!
//! ## Main Logical Flow
//! 1. Reject if `|now − header.timestamp| > 30 s` (`StaleTimestamp`)
//! 2. Reject if `(device_id, nonce)` was already seen (`ReplayedNonce`)
//! 3. Otherwise record the pair with its arrival instant
//!
//! Entries are retained for at least 60 s, then swept lazily every
//! Nth insert (or explicitly via [`ReplayGuard::sweep`]). Replays of
//! packets older than the retention window are still rejected by the
//! timestamp band, so no accepted packet is ever acceptable twice.
//!
//! ## ⚠️ Important Note for Next Developer
//! - The guard is shared by all receive paths; keep the critical
//!   section to a map lookup and insert
//! - Retention must never be shorter than twice the skew window
//!
//! ## Last Modified
//! v0.1.0 - Initial replay guard

use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::trace;

use shdc_common::time::{Timestamp, MAX_CLOCK_SKEW_SECS, REPLAY_RETENTION_SECS};
use shdc_common::types::DeviceId;

use crate::error::{CoreError, Result};
use crate::protocol::NONCE_SIZE;

/// How many inserts between lazy sweeps of expired entries.
const SWEEP_EVERY_INSERTS: u32 = 64;

// ============================================
// ReplayGuard
// ============================================

/// Thread-safe replay defense: timestamp skew window plus a recent
/// `(DeviceId, Nonce3)` set.
///
/// # Example
/// ```
/// use shdc_core::replay::ReplayGuard;
/// use shdc_common::time::Timestamp;
/// use shdc_common::types::DeviceId;
///
/// let guard = ReplayGuard::new();
/// let id = DeviceId::new(7);
/// let now = Timestamp::now();
///
/// assert!(guard.check_and_insert(id, [1, 2, 3], now).is_ok());
/// assert!(guard.check_and_insert(id, [1, 2, 3], now).is_err());
/// ```
#[derive(Debug)]
pub struct ReplayGuard {
    /// Maximum accepted |timestamp − now| in seconds.
    max_skew_secs: u64,
    /// How long seen entries are retained.
    retention: Duration,
    inner: Mutex<ReplayInner>,
}

#[derive(Debug, Default)]
struct ReplayInner {
    seen: HashMap<(DeviceId, [u8; NONCE_SIZE]), Instant>,
    inserts_since_sweep: u32,
}

impl ReplayGuard {
    /// Creates a guard with the protocol defaults (30 s skew, 60 s
    /// retention).
    #[must_use]
    pub fn new() -> Self {
        Self::with_limits(
            MAX_CLOCK_SKEW_SECS,
            Duration::from_secs(REPLAY_RETENTION_SECS),
        )
    }

    /// Creates a guard with explicit limits (used in tests and by
    /// deployments with unusual clock discipline).
    #[must_use]
    pub fn with_limits(max_skew_secs: u64, retention: Duration) -> Self {
        Self {
            max_skew_secs,
            retention,
            inner: Mutex::new(ReplayInner::default()),
        }
    }

    /// Validates freshness and records the packet.
    ///
    /// # Errors
    /// - `StaleTimestamp` if the header timestamp is outside the band
    /// - `ReplayedNonce` if the `(device, nonce)` pair repeats
    pub fn check_and_insert(
        &self,
        device_id: DeviceId,
        nonce: [u8; NONCE_SIZE],
        timestamp: Timestamp,
    ) -> Result<()> {
        let now = Timestamp::now();
        if u64::from(timestamp.skew_secs(now)) > self.max_skew_secs {
            return Err(CoreError::StaleTimestamp {
                timestamp: timestamp.as_secs(),
                now: now.as_secs(),
                max_skew: self.max_skew_secs,
            });
        }

        let mut inner = self.inner.lock();
        if inner.seen.contains_key(&(device_id, nonce)) {
            return Err(CoreError::ReplayedNonce { device_id });
        }

        inner.seen.insert((device_id, nonce), Instant::now());
        inner.inserts_since_sweep += 1;
        if inner.inserts_since_sweep >= SWEEP_EVERY_INSERTS {
            Self::sweep_locked(&mut inner, self.retention);
        }

        Ok(())
    }

    /// Removes entries older than the retention window.
    pub fn sweep(&self) {
        let mut inner = self.inner.lock();
        Self::sweep_locked(&mut inner, self.retention);
    }

    fn sweep_locked(inner: &mut ReplayInner, retention: Duration) {
        let before = inner.seen.len();
        inner.seen.retain(|_, inserted| inserted.elapsed() <= retention);
        inner.inserts_since_sweep = 0;

        let removed = before - inner.seen.len();
        if removed > 0 {
            trace!(removed, remaining = inner.seen.len(), "Swept replay entries");
        }
    }

    /// Returns the number of tracked entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().seen.len()
    }

    /// Returns `true` if no entries are tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ReplayGuard {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================
// Tests
// ============================================
