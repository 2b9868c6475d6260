// ============================================
// File: crates/shdc-engine/src/stats.rs
// ============================================
//! # Engine Statistics
//!
//! ## Creation Reason
//! Lock-free counters for packet handling outcomes, incremented on
//! every receive path and exposed as an atomic snapshot.
//!
//! ## Last Modified
//! v0.1.0 - Initial counters

use std::sync::atomic::{AtomicU64, Ordering};

use shdc_core::error::CoreError;

/// Per-engine packet counters.
#[derive(Debug, Default)]
pub struct EngineStats {
    /// Datagrams received from the transport.
    pub packets_rx: AtomicU64,
    /// Packets sent to the transport.
    pub packets_tx: AtomicU64,
    /// Drops due to framing/payload decode failures.
    pub dropped_decode: AtomicU64,
    /// Drops due to signature verification failures.
    pub dropped_signature: AtomicU64,
    /// Drops due to stale timestamps or replayed nonces.
    pub dropped_freshness: AtomicU64,
    /// Drops due to AEAD open failures or unavailable keys.
    pub dropped_aead: AtomicU64,
    /// Drops due to wrong-state or unknown-device conditions.
    pub dropped_state: AtomicU64,
    /// Events delivered to the application.
    pub events_delivered: AtomicU64,
    /// Commands delivered to the application.
    pub commands_delivered: AtomicU64,
}

impl EngineStats {
    /// Creates zeroed counters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a received datagram.
    pub fn record_rx(&self) {
        self.packets_rx.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a sent packet.
    pub fn record_tx(&self) {
        self.packets_tx.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a delivered event.
    pub fn record_event(&self) {
        self.events_delivered.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a delivered command.
    pub fn record_command(&self) {
        self.commands_delivered.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a drop classified as wrong-state / unknown-device.
    pub fn record_state_drop(&self) {
        self.dropped_state.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a dropped packet, classified by the core error.
    pub fn record_core_drop(&self, err: &CoreError) {
        let counter = if err.is_decode_error() {
            &self.dropped_decode
        } else if err.is_freshness_error() {
            &self.dropped_freshness
        } else if matches!(err, CoreError::BadSignature) {
            &self.dropped_signature
        } else {
            &self.dropped_aead
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns a point-in-time copy of all counters.
    #[must_use]
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            packets_rx: self.packets_rx.load(Ordering::Relaxed),
            packets_tx: self.packets_tx.load(Ordering::Relaxed),
            dropped_decode: self.dropped_decode.load(Ordering::Relaxed),
            dropped_signature: self.dropped_signature.load(Ordering::Relaxed),
            dropped_freshness: self.dropped_freshness.load(Ordering::Relaxed),
            dropped_aead: self.dropped_aead.load(Ordering::Relaxed),
            dropped_state: self.dropped_state.load(Ordering::Relaxed),
            events_delivered: self.events_delivered.load(Ordering::Relaxed),
            commands_delivered: self.commands_delivered.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time view of [`EngineStats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)]
pub struct StatsSnapshot {
    pub packets_rx: u64,
    pub packets_tx: u64,
    pub dropped_decode: u64,
    pub dropped_signature: u64,
    pub dropped_freshness: u64,
    pub dropped_aead: u64,
    pub dropped_state: u64,
    pub events_delivered: u64,
    pub commands_delivered: u64,
}

impl StatsSnapshot {
    /// Total dropped packets across all causes.
    #[must_use]
    pub const fn total_dropped(&self) -> u64 {
        self.dropped_decode
            + self.dropped_signature
            + self.dropped_freshness
            + self.dropped_aead
            + self.dropped_state
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drop_classification() {
        let stats = EngineStats::new();

        stats.record_core_drop(&CoreError::UnknownType(0xFF));
        stats.record_core_drop(&CoreError::BadSignature);
        stats.record_core_drop(&CoreError::AeadFailure);
        stats.record_core_drop(&CoreError::ReplayedNonce {
            device_id: shdc_common::types::DeviceId::new(1),
        });

        let snap = stats.snapshot();
        assert_eq!(snap.dropped_decode, 1);
        assert_eq!(snap.dropped_signature, 1);
        assert_eq!(snap.dropped_aead, 1);
        assert_eq!(snap.dropped_freshness, 1);
        assert_eq!(snap.total_dropped(), 4);
    }

    #[test]
    fn test_delivery_counters() {
        let stats = EngineStats::new();
        stats.record_rx();
        stats.record_event();
        stats.record_command();

        let snap = stats.snapshot();
        assert_eq!(snap.packets_rx, 1);
        assert_eq!(snap.events_delivered, 1);
        assert_eq!(snap.commands_delivered, 1);
    }
}
