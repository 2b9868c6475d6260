// ============================================
// File: crates/shdc-core/src/error.rs
// ============================================
//! # Core Error Types
//!
//! ## Creation Reason
//! Defines the error taxonomy for protocol decoding, the cryptographic
//! envelope, and freshness checks.
//!
//! ## Error Categories
//! 1. **Decode Errors**: short/oversize packets, unknown types, malformed payloads
//! 2. **Crypto Errors**: signature and AEAD failures, unavailable keys
//! 3. **Freshness Errors**: stale timestamps, replayed nonces
//!
//! ## ⚠️ Important Note for Next Developer
//! - NEVER include key material in error messages
//! - Per-packet errors are recoverable; receivers drop and log
//!
//! ## Last Modified
//! v0.1.0 - Initial error definitions

use thiserror::Error;

use shdc_common::error::CommonError;
use shdc_common::types::{BroadcastKeyId, DeviceId};

// ============================================
// Result Type Alias
// ============================================

/// Result type for core protocol operations.
pub type Result<T> = std::result::Result<T, CoreError>;

// ============================================
// CoreError
// ============================================

/// Error taxonomy for packet decoding, crypto, and freshness checks.
///
/// # Security Note
/// Error messages are informative for debugging without revealing
/// sensitive information like key material.
#[derive(Error, Debug)]
pub enum CoreError {
    // ========================================
    // Decode Errors
    // ========================================

    /// Packet is shorter than the minimum frame (header + signature).
    #[error("Packet too short: expected at least {expected} bytes, got {actual}")]
    ShortPacket {
        /// Minimum expected length.
        expected: usize,
        /// Actual length received.
        actual: usize,
    },

    /// Packet exceeds the maximum datagram size.
    #[error("Packet too large: max {max} bytes, got {actual}")]
    OversizePacket {
        /// Maximum allowed size.
        max: usize,
        /// Actual size.
        actual: usize,
    },

    /// Unknown or unsupported message type byte.
    #[error("Unknown message type: 0x{0:02x}")]
    UnknownType(u8),

    /// Payload is structurally invalid for its message type.
    #[error("Malformed payload: {reason}")]
    MalformedPayload {
        /// What's wrong with the payload.
        reason: String,
    },

    // ========================================
    // Crypto Errors
    // ========================================

    /// Ed25519 signature verification failed.
    #[error("Signature verification failed")]
    BadSignature,

    /// AEAD open failed (tampered ciphertext or wrong key).
    #[error("AEAD authentication failed")]
    AeadFailure,

    /// No key available to decrypt the packet.
    #[error("Key unavailable: {context}")]
    KeyUnavailable {
        /// Which key was being resolved.
        context: String,
    },

    /// Failed to construct a cryptographic key.
    #[error("Key generation failed: {context}")]
    KeyGeneration {
        /// What key was being generated.
        context: String,
    },

    /// Key derivation failed.
    #[error("Key derivation failed: {reason}")]
    KeyDerivation {
        /// Why derivation failed.
        reason: String,
    },

    // ========================================
    // Freshness Errors
    // ========================================

    /// Header timestamp is outside the acceptable skew window.
    #[error("Stale timestamp: {timestamp} vs now {now} (max skew {max_skew}s)")]
    StaleTimestamp {
        /// Timestamp carried in the header.
        timestamp: u32,
        /// Local clock at validation time.
        now: u32,
        /// Maximum allowed skew in seconds.
        max_skew: u64,
    },

    /// The (device, nonce) pair was already accepted recently.
    #[error("Replayed nonce from device {device_id}")]
    ReplayedNonce {
        /// Sender whose nonce repeated.
        device_id: DeviceId,
    },

    // ========================================
    // Wrapped Errors
    // ========================================

    /// Error from the common crate.
    #[error(transparent)]
    Common(#[from] CommonError),
}

impl CoreError {
    // ========================================
    // Convenience Constructors
    // ========================================

    /// Creates a `ShortPacket` error.
    #[must_use]
    pub const fn short_packet(expected: usize, actual: usize) -> Self {
        Self::ShortPacket { expected, actual }
    }

    /// Creates an `OversizePacket` error.
    #[must_use]
    pub const fn oversize(max: usize, actual: usize) -> Self {
        Self::OversizePacket { max, actual }
    }

    /// Creates a `MalformedPayload` error.
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedPayload {
            reason: reason.into(),
        }
    }

    /// Creates a `KeyUnavailable` error.
    pub fn key_unavailable(context: impl Into<String>) -> Self {
        Self::KeyUnavailable {
            context: context.into(),
        }
    }

    /// Creates a `KeyUnavailable` error for a broadcast key id.
    #[must_use]
    pub fn unknown_broadcast_key(id: BroadcastKeyId) -> Self {
        Self::KeyUnavailable {
            context: format!("broadcast key id {id}"),
        }
    }

    /// Creates a `KeyGeneration` error.
    pub fn key_generation(context: impl Into<String>) -> Self {
        Self::KeyGeneration {
            context: context.into(),
        }
    }

    // ========================================
    // Error Classification
    // ========================================

    /// Returns `true` if this is a decode error.
    #[must_use]
    pub const fn is_decode_error(&self) -> bool {
        matches!(
            self,
            Self::ShortPacket { .. }
                | Self::OversizePacket { .. }
                | Self::UnknownType(_)
                | Self::MalformedPayload { .. }
        )
    }

    /// Returns `true` if this is a cryptographic error.
    #[must_use]
    pub const fn is_crypto_error(&self) -> bool {
        matches!(
            self,
            Self::BadSignature
                | Self::AeadFailure
                | Self::KeyUnavailable { .. }
                | Self::KeyGeneration { .. }
                | Self::KeyDerivation { .. }
        )
    }

    /// Returns `true` if this is a freshness error.
    #[must_use]
    pub const fn is_freshness_error(&self) -> bool {
        matches!(self, Self::StaleTimestamp { .. } | Self::ReplayedNonce { .. })
    }

    /// Returns `true` if this error might indicate an attack.
    ///
    /// These errors warrant additional logging and monitoring.
    #[must_use]
    pub const fn is_suspicious(&self) -> bool {
        matches!(
            self,
            Self::BadSignature
                | Self::AeadFailure
                | Self::StaleTimestamp { .. }
                | Self::ReplayedNonce { .. }
        )
    }
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CoreError::short_packet(76, 40);
        assert!(err.to_string().contains("76"));
        assert!(err.to_string().contains("40"));

        let err = CoreError::ReplayedNonce {
            device_id: DeviceId::new(0xAABB_CCDD),
        };
        assert!(err.to_string().contains("AABBCCDD"));
    }

    #[test]
    fn test_error_classification() {
        assert!(CoreError::UnknownType(0xFF).is_decode_error());
        assert!(CoreError::BadSignature.is_crypto_error());
        assert!(CoreError::BadSignature.is_suspicious());
        assert!(CoreError::AeadFailure.is_suspicious());

        let stale = CoreError::StaleTimestamp {
            timestamp: 100,
            now: 300,
            max_skew: 30,
        };
        assert!(stale.is_freshness_error());
        assert!(stale.is_suspicious());
        assert!(!stale.is_crypto_error());
    }
}
