// ============================================
// File: crates/shdc-core/src/protocol/mod.rs
// ============================================
//! # Protocol Module
//!
//! ## Creation Reason
//! Defines the SHDC v1.0 wire protocol: message types, payload
//! structures, and the binary codec.
//!
//! ## Wire Format
//! Every datagram is one packet:
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │ Header (12 bytes)                            │
//! │ ├─ Type       u8                             │
//! │ ├─ DeviceId   u32 (big-endian)               │
//! │ ├─ Timestamp  u32 (big-endian, UNIX seconds) │
//! │ └─ Nonce      3 bytes (random)               │
//! ├──────────────────────────────────────────────┤
//! │ Payload (variable, per message type)         │
//! ├──────────────────────────────────────────────┤
//! │ Signature (64 bytes, Ed25519 over            │
//! │            Header ∥ Payload)                 │
//! └──────────────────────────────────────────────┘
//! ```
//! Packets are 76..=512 bytes; all multi-byte integers big-endian.
//!
//! ## ⚠️ Important Note for Next Developer
//! - Field order is wire format - DO NOT reorder
//! - The signature covers the payload as-on-wire, ciphertext included
//!
//! ## Last Modified
//! v0.1.0 - Initial protocol definitions

pub mod codec;
pub mod messages;

pub use codec::Packet;
pub use messages::{
    BroadcastCommand, CommandBody, CommandType, DiscoveryRequest, DiscoveryResponse, EventBody,
    EventReport, EventType, Header, JoinGrant, JoinRequest, JoinResponse, KeyRotation,
    MessageType, RotationBody, RotationScope,
};

// ============================================
// Constants
// ============================================

/// Size of the packet header in bytes.
pub const HEADER_SIZE: usize = 12;

/// Size of the trailing Ed25519 signature in bytes.
pub const SIGNATURE_SIZE: usize = 64;

/// Size of the per-packet header nonce in bytes.
pub const NONCE_SIZE: usize = 3;

/// Maximum encoded packet size (one UDP datagram on the closed network).
pub const MAX_PACKET_SIZE: usize = 512;

/// Minimum valid packet size (header + empty payload + signature).
pub const MIN_PACKET_SIZE: usize = HEADER_SIZE + SIGNATURE_SIZE;

/// Maximum payload size within one packet.
pub const MAX_PAYLOAD_SIZE: usize = MAX_PACKET_SIZE - MIN_PACKET_SIZE;

/// Default SHDC UDP port.
pub const SHDC_PORT: u16 = 56700;

/// IPv4 multicast group used for hub discovery.
pub const SHDC_MULTICAST_ADDR: std::net::Ipv4Addr = std::net::Ipv4Addr::new(239, 255, 0, 1);
