// ============================================
// File: crates/shdc-common/src/types.rs
// ============================================
//! # Core Type Definitions
//!
//! ## Creation Reason
//! Centralizes the identifier newtypes used throughout the SHDC stack,
//! preventing confusion between raw integers and protocol identities.
//!
//! ## Main Functionality
//! - `DeviceId`: 32-bit device identifier with the unassigned sentinel
//! - `BroadcastKeyId`: 1-byte monotonically rotating group key tag
//!
//! ## Main Logical Flow
//! 1. Sensors boot with `DeviceId::UNASSIGNED` until the hub allocates one
//! 2. Identifiers are used as map keys and in wire headers (big-endian)
//! 3. `BroadcastKeyId::next()` advances the group key version on rotation
//!
//! ## ⚠️ Important Note for Next Developer
//! - `DeviceId` 0x00000000 is reserved; the hub never allocates it
//! - A freshly rotated `BroadcastKeyId` never equals the active one
//!
//! ## Last Modified
//! v0.1.0 - Initial type definitions

use std::fmt;

use serde::{Deserialize, Serialize};

// ============================================
// DeviceId
// ============================================

/// 32-bit device identifier unique within one SHDC network.
///
/// # Wire Format
/// Encoded as a big-endian u32 in the packet header. The value
/// `0x00000000` is the "unassigned" sentinel used by sensors during
/// discovery, before the hub has allocated an identity.
///
/// # Example
/// ```
/// use shdc_common::types::DeviceId;
///
/// let id = DeviceId::new(0xAABB_CCDD);
/// assert_eq!(id.to_string(), "AABBCCDD");
/// assert!(!id.is_unassigned());
/// assert!(DeviceId::UNASSIGNED.is_unassigned());
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct DeviceId(u32);

impl DeviceId {
    /// Sentinel sender identity used by sensors before joining.
    pub const UNASSIGNED: Self = Self(0);

    /// Creates a device id from a raw u32.
    #[must_use]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Returns the raw u32 value.
    #[must_use]
    pub const fn as_u32(&self) -> u32 {
        self.0
    }

    /// Returns the id as big-endian bytes (wire order).
    #[must_use]
    pub const fn to_be_bytes(&self) -> [u8; 4] {
        self.0.to_be_bytes()
    }

    /// Creates a device id from big-endian bytes.
    #[must_use]
    pub const fn from_be_bytes(bytes: [u8; 4]) -> Self {
        Self(u32::from_be_bytes(bytes))
    }

    /// Returns `true` for the reserved unassigned sentinel.
    #[must_use]
    pub const fn is_unassigned(&self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:08X}", self.0)
    }
}

impl From<u32> for DeviceId {
    fn from(raw: u32) -> Self {
        Self(raw)
    }
}

impl From<DeviceId> for u32 {
    fn from(id: DeviceId) -> Self {
        id.0
    }
}

// ============================================
// BroadcastKeyId
// ============================================

/// 1-byte version tag of the hub's broadcast group key.
///
/// Advances by one (mod 256) on every rotation. The wrap policy
/// guarantees a freshly issued id never equals the id it replaces.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct BroadcastKeyId(u8);

impl BroadcastKeyId {
    /// Creates a key id from a raw byte.
    #[must_use]
    pub const fn new(raw: u8) -> Self {
        Self(raw)
    }

    /// Returns the raw byte value.
    #[must_use]
    pub const fn as_u8(&self) -> u8 {
        self.0
    }

    /// Returns the id a freshly rotated key should carry.
    ///
    /// Successor ids always differ from the id they replace, even
    /// across the mod-256 wrap.
    #[must_use]
    pub const fn next(&self) -> Self {
        Self(self.0.wrapping_add(1))
    }
}

impl fmt::Display for BroadcastKeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02X}", self.0)
    }
}

impl From<u8> for BroadcastKeyId {
    fn from(raw: u8) -> Self {
        Self(raw)
    }
}

impl From<BroadcastKeyId> for u8 {
    fn from(id: BroadcastKeyId) -> Self {
        id.0
    }
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_id_sentinel() {
        assert!(DeviceId::UNASSIGNED.is_unassigned());
        assert!(!DeviceId::new(0xAABB_CCDD).is_unassigned());
    }

    #[test]
    fn test_device_id_bytes_roundtrip() {
        let id = DeviceId::new(0xAABB_CCDD);
        assert_eq!(id.to_be_bytes(), [0xAA, 0xBB, 0xCC, 0xDD]);
        assert_eq!(DeviceId::from_be_bytes(id.to_be_bytes()), id);
    }

    #[test]
    fn test_device_id_display() {
        assert_eq!(DeviceId::new(0x1000_0001).to_string(), "10000001");
        assert_eq!(DeviceId::UNASSIGNED.to_string(), "00000000");
    }

    #[test]
    fn test_broadcast_key_id_next() {
        let id = BroadcastKeyId::new(0x01);
        assert_eq!(id.next().as_u8(), 0x02);

        // Wrap never reissues the active id.
        let last = BroadcastKeyId::new(0xFF);
        assert_eq!(last.next().as_u8(), 0x00);
        assert_ne!(last.next(), last);
    }

    #[test]
    fn test_serde_transparent() {
        let id = DeviceId::new(42);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "42");
        let restored: DeviceId = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, id);
    }
}
