// ============================================
// File: crates/shdc-common/src/time.rs
// ============================================
//! # Time Utilities
//!
//! ## Creation Reason
//! Provides the protocol timestamp type and an atomic instant wrapper
//! used for lock-free last-activity tracking on hub-side sensor records.
//!
//! ## Main Functionality
//! - `Timestamp`: u32 UNIX-seconds wire timestamp with skew validation
//! - `AtomicInstant`: thread-safe wrapper around `Instant`
//!
//! ## Main Logical Flow
//! 1. Senders stamp each packet header with `Timestamp::now()`
//! 2. Receivers reject headers outside the ±30 s freshness band
//! 3. Sensor records store `AtomicInstant` for idle-expiry decisions
//!
//! ## ⚠️ Important Note for Next Developer
//! - Wire timestamps are u32 and wrap in 2106; `skew_secs` is
//!   computed with `abs_diff`, so ordering around the wrap is safe
//! - Freshness requires loosely NTP-synchronized clocks on both ends;
//!   skew above 30 s manifests as `StaleTimestamp` storms
//!
//! ## Last Modified
//! v0.1.0 - Initial time utilities

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

// ============================================
// Constants
// ============================================

/// Maximum acceptable clock skew for packet freshness (30 seconds).
pub const MAX_CLOCK_SKEW_SECS: u64 = 30;

/// How long replay entries are retained after arrival (60 seconds).
pub const REPLAY_RETENTION_SECS: u64 = 60;

// ============================================
// Timestamp
// ============================================

/// UNIX timestamp in seconds, as carried in the packet header.
///
/// # Purpose
/// Used in every SHDC header for freshness validation and as the
/// leading component of the AEAD nonce.
///
/// # Example
/// ```
/// use shdc_common::time::Timestamp;
///
/// let now = Timestamp::now();
/// assert!(now.is_recent(30));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(u32);

impl Timestamp {
    /// Creates a timestamp from UNIX seconds.
    #[must_use]
    pub const fn from_secs(secs: u32) -> Self {
        Self(secs)
    }

    /// Creates a timestamp for the current time.
    ///
    /// # Panics
    /// Panics if the system clock is set before the UNIX epoch.
    #[must_use]
    pub fn now() -> Self {
        let secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("System time before Unix epoch")
            .as_secs();
        Self(secs as u32)
    }

    /// Returns the UNIX timestamp in seconds.
    #[must_use]
    pub const fn as_secs(&self) -> u32 {
        self.0
    }

    /// Returns the timestamp as big-endian bytes (wire order).
    #[must_use]
    pub const fn to_be_bytes(&self) -> [u8; 4] {
        self.0.to_be_bytes()
    }

    /// Creates a timestamp from big-endian bytes.
    #[must_use]
    pub const fn from_be_bytes(bytes: [u8; 4]) -> Self {
        Self(u32::from_be_bytes(bytes))
    }

    /// Returns the absolute difference from another timestamp in seconds.
    #[must_use]
    pub const fn skew_secs(&self, other: Self) -> u32 {
        self.0.abs_diff(other.0)
    }

    /// Checks if the timestamp is within `max_skew_secs` of now.
    #[must_use]
    pub fn is_recent(&self, max_skew_secs: u64) -> bool {
        u64::from(self.skew_secs(Self::now())) <= max_skew_secs
    }

    /// Returns a timestamp `secs` seconds later than this one.
    #[must_use]
    pub const fn plus_secs(&self, secs: u32) -> Self {
        Self(self.0.wrapping_add(secs))
    }

    /// Returns `true` once the current time has reached this timestamp.
    #[must_use]
    pub fn has_passed(&self) -> bool {
        Self::now().0 >= self.0
    }
}

impl From<u32> for Timestamp {
    fn from(secs: u32) -> Self {
        Self(secs)
    }
}

impl From<Timestamp> for u32 {
    fn from(ts: Timestamp) -> Self {
        ts.0
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================
// AtomicInstant
// ============================================

/// Thread-safe wrapper around [`Instant`] for concurrent access.
///
/// # Purpose
/// Allows packet handlers to update last-seen times without locks
/// while background tasks read them for expiry decisions.
///
/// # Implementation
/// Stores nanoseconds elapsed since a reference instant (program
/// start) in an `AtomicU64` with relaxed ordering.
#[derive(Debug)]
pub struct AtomicInstant {
    /// Nanoseconds since the reference instant.
    nanos: AtomicU64,
}

impl AtomicInstant {
    /// Reference instant (lazily initialized at program start).
    fn reference() -> Instant {
        use std::sync::OnceLock;
        static REFERENCE: OnceLock<Instant> = OnceLock::new();
        *REFERENCE.get_or_init(Instant::now)
    }

    /// Creates a new `AtomicInstant` set to the current time.
    #[must_use]
    pub fn now() -> Self {
        Self::from_instant(Instant::now())
    }

    /// Creates a new `AtomicInstant` from an `Instant`.
    #[must_use]
    pub fn from_instant(instant: Instant) -> Self {
        let reference = Self::reference();
        let nanos = instant
            .checked_duration_since(reference)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(0);
        Self {
            nanos: AtomicU64::new(nanos),
        }
    }

    /// Loads the stored instant.
    #[must_use]
    pub fn load(&self) -> Instant {
        let nanos = self.nanos.load(Ordering::Relaxed);
        Self::reference() + Duration::from_nanos(nanos)
    }

    /// Stores a new instant.
    pub fn store(&self, instant: Instant) {
        let reference = Self::reference();
        let nanos = instant
            .checked_duration_since(reference)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(0);
        self.nanos.store(nanos, Ordering::Relaxed);
    }

    /// Updates to the current time.
    pub fn touch(&self) {
        self.store(Instant::now());
    }

    /// Returns the elapsed time since the stored instant.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.load().elapsed()
    }

    /// Checks if more than `duration` has elapsed since the stored instant.
    #[must_use]
    pub fn has_elapsed(&self, duration: Duration) -> bool {
        self.elapsed() > duration
    }
}

impl Default for AtomicInstant {
    fn default() -> Self {
        Self::now()
    }
}

impl Clone for AtomicInstant {
    fn clone(&self) -> Self {
        Self {
            nanos: AtomicU64::new(self.nanos.load(Ordering::Relaxed)),
        }
    }
}

// ============================================
// Tests
// ============================================
