// ============================================
// File: crates/shdc-core/src/protocol/messages.rs
// ============================================
//! # Protocol Message Definitions
//!
//! ## Creation Reason
//! Defines the structure of all SHDC messages exchanged between
//! sensors and the hub, plus the plaintext bodies carried inside
//! encrypted payloads.
//!
//! ## Main Functionality
//! - `MessageType`: wire type byte for every message
//! - `Header`: the 12-byte packet header
//! - One payload struct per message type (§ wire format in [`super`])
//! - Plaintext bodies (`JoinGrant`, `EventBody`, `CommandBody`,
//!   `RotationBody`) sealed inside AEAD payloads
//!
//! ## Message Payloads
//! | Type | Name | Payload |
//! |------|------|---------|
//! | 0x00 | HUB_DISCOVERY_REQ | pubkey[32] ∥ info_len u8 ∥ info |
//! | 0x01 | EVENT_REPORT | AEAD(event_type u8 ∥ data_len u8 ∥ data) |
//! | 0x02 | JOIN_REQUEST | pubkey[32] ∥ info_len u8 ∥ info |
//! | 0x03 | JOIN_RESPONSE | eph_pub[32] ∥ AEAD(join grant) |
//! | 0x04 | BROADCAST_COMMAND | bkid u8 ∥ AEAD(cmd u8 ∥ len u16 ∥ data) |
//! | 0x05 | KEY_ROTATION | AEAD(scope u8 ∥ key[32] ∥ from u32 ∥ bkid u8?) |
//! | 0x06 | HUB_DISCOVERY_RESP | hub_id u32 ∥ pubkey[32] ∥ caps_len u8 ∥ caps |
//!
//! ## ⚠️ Important Note for Next Developer
//! - Plaintext bodies holding key material zeroize on drop
//! - Constructors validate length-limited fields up front so encoding
//!   is infallible
//!
//! ## Last Modified
//! v0.1.0 - Initial message definitions

use rand::rngs::OsRng;
use rand::RngCore;
use zeroize::{Zeroize, ZeroizeOnDrop};

use shdc_common::time::Timestamp;
use shdc_common::types::{BroadcastKeyId, DeviceId};

use crate::error::{CoreError, Result};
use crate::protocol::NONCE_SIZE;

// ============================================
// MessageType
// ============================================

/// Protocol message type identifier.
///
/// # Wire Format
/// Single byte at the start of every packet header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MessageType {
    /// Sensor → Hub: broadcast to discover the hub (cleartext, signed).
    HubDiscoveryReq = 0x00,
    /// Sensor → Hub: encrypted event or status message.
    EventReport = 0x01,
    /// Sensor → Hub: join handshake initiation (cleartext, signed).
    JoinRequest = 0x02,
    /// Hub → Sensor: join grant sealed to the sensor identity key.
    JoinResponse = 0x03,
    /// Hub → Sensors: command sealed under the group broadcast key.
    BroadcastCommand = 0x04,
    /// Hub → Sensor: key update sealed under the current session key.
    KeyRotation = 0x05,
    /// Hub → Sensor: unicast discovery response (cleartext, signed).
    HubDiscoveryResp = 0x06,
}

impl MessageType {
    /// Converts a byte to a `MessageType`.
    #[must_use]
    pub const fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x00 => Some(Self::HubDiscoveryReq),
            0x01 => Some(Self::EventReport),
            0x02 => Some(Self::JoinRequest),
            0x03 => Some(Self::JoinResponse),
            0x04 => Some(Self::BroadcastCommand),
            0x05 => Some(Self::KeyRotation),
            0x06 => Some(Self::HubDiscoveryResp),
            _ => None,
        }
    }

    /// Converts the message type to its byte representation.
    #[must_use]
    pub const fn as_byte(self) -> u8 {
        self as u8
    }

    /// Checks if this message carries a cleartext (but signed) payload.
    #[must_use]
    pub const fn is_cleartext(self) -> bool {
        matches!(
            self,
            Self::HubDiscoveryReq | Self::HubDiscoveryResp | Self::JoinRequest
        )
    }

    /// Checks if this message carries an encrypted payload.
    #[must_use]
    pub const fn is_encrypted(self) -> bool {
        !self.is_cleartext()
    }
}

impl TryFrom<u8> for MessageType {
    type Error = CoreError;

    fn try_from(value: u8) -> Result<Self> {
        Self::from_byte(value).ok_or(CoreError::UnknownType(value))
    }
}

impl From<MessageType> for u8 {
    fn from(msg_type: MessageType) -> Self {
        msg_type.as_byte()
    }
}

// ============================================
// EventType
// ============================================

/// Well-known event codes for `EVENT_REPORT` messages.
///
/// The wire carries a raw `u8`; unknown codes are delivered to the
/// application unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
#[allow(missing_docs)]
pub enum EventType {
    Motion = 0x01,
    DoorOpen = 0x02,
    DoorClose = 0x03,
    WindowOpen = 0x04,
    WindowClose = 0x05,
    Temperature = 0x06,
    Humidity = 0x07,
    Smoke = 0x08,
    GlassBreak = 0x09,
    Vibration = 0x0A,
    Heartbeat = 0xFF,
}

impl EventType {
    /// Converts a byte to a well-known event type.
    #[must_use]
    pub const fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x01 => Some(Self::Motion),
            0x02 => Some(Self::DoorOpen),
            0x03 => Some(Self::DoorClose),
            0x04 => Some(Self::WindowOpen),
            0x05 => Some(Self::WindowClose),
            0x06 => Some(Self::Temperature),
            0x07 => Some(Self::Humidity),
            0x08 => Some(Self::Smoke),
            0x09 => Some(Self::GlassBreak),
            0x0A => Some(Self::Vibration),
            0xFF => Some(Self::Heartbeat),
            _ => None,
        }
    }

    /// Converts the event type to its byte representation.
    #[must_use]
    pub const fn as_byte(self) -> u8 {
        self as u8
    }
}

// ============================================
// CommandType
// ============================================

/// Well-known command codes for `BROADCAST_COMMAND` messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
#[allow(missing_docs)]
pub enum CommandType {
    Lockdown = 0x01,
    Unlock = 0x02,
    ArmSystem = 0x03,
    DisarmSystem = 0x04,
    Emergency = 0x05,
    TestMode = 0x06,
    Reset = 0x07,
}

impl CommandType {
    /// Converts a byte to a well-known command type.
    #[must_use]
    pub const fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x01 => Some(Self::Lockdown),
            0x02 => Some(Self::Unlock),
            0x03 => Some(Self::ArmSystem),
            0x04 => Some(Self::DisarmSystem),
            0x05 => Some(Self::Emergency),
            0x06 => Some(Self::TestMode),
            0x07 => Some(Self::Reset),
            _ => None,
        }
    }

    /// Converts the command type to its byte representation.
    #[must_use]
    pub const fn as_byte(self) -> u8 {
        self as u8
    }
}

// ============================================
// Header
// ============================================

/// The 12-byte SHDC packet header.
///
/// # Wire Format (big-endian)
/// ```text
/// ┌─────────────────────────────────────┐
/// │ Type      (1 byte)                  │
/// │ DeviceId  (4 bytes)  sender         │
/// │ Timestamp (4 bytes)  UNIX seconds   │
/// │ Nonce     (3 bytes)  random         │
/// └─────────────────────────────────────┘
/// ```
///
/// The header doubles as AEAD associated data, and its fields form the
/// 12-byte GCM nonce, binding every ciphertext to its exact header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    /// Message type.
    pub msg_type: MessageType,
    /// Sender device id (`DeviceId::UNASSIGNED` during discovery).
    pub device_id: DeviceId,
    /// UNIX timestamp in seconds.
    pub timestamp: Timestamp,
    /// Per-packet random nonce.
    pub nonce: [u8; NONCE_SIZE],
}

impl Header {
    /// Creates a header with explicit fields.
    #[must_use]
    pub const fn new(
        msg_type: MessageType,
        device_id: DeviceId,
        timestamp: Timestamp,
        nonce: [u8; NONCE_SIZE],
    ) -> Self {
        Self {
            msg_type,
            device_id,
            timestamp,
            nonce,
        }
    }

    /// Creates a header stamped with the current time and a fresh
    /// random nonce from the OS CSRNG.
    #[must_use]
    pub fn fresh(msg_type: MessageType, device_id: DeviceId) -> Self {
        let mut nonce = [0u8; NONCE_SIZE];
        OsRng.fill_bytes(&mut nonce);
        Self {
            msg_type,
            device_id,
            timestamp: Timestamp::now(),
            nonce,
        }
    }
}

// ============================================
// Cleartext Payloads
// ============================================

/// `HUB_DISCOVERY_REQ` payload: the sensor introduces itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryRequest {
    /// Sensor's Ed25519 identity public key.
    pub public_key: [u8; 32],
    /// Optional textual device identifier (max 255 bytes UTF-8).
    pub device_info: String,
}

impl DiscoveryRequest {
    /// Creates a discovery request.
    ///
    /// # Errors
    /// Returns `MalformedPayload` if `device_info` exceeds 255 bytes.
    pub fn new(public_key: [u8; 32], device_info: impl Into<String>) -> Result<Self> {
        let device_info = device_info.into();
        check_info_len(&device_info)?;
        Ok(Self {
            public_key,
            device_info,
        })
    }
}

/// `HUB_DISCOVERY_RESP` payload: the hub identifies itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryResponse {
    /// Unique hub identifier.
    pub hub_id: DeviceId,
    /// Hub's Ed25519 identity public key.
    pub hub_public_key: [u8; 32],
    /// Optional version/capability string (max 255 bytes UTF-8).
    pub capabilities: String,
}

impl DiscoveryResponse {
    /// Creates a discovery response.
    ///
    /// # Errors
    /// Returns `MalformedPayload` if `capabilities` exceeds 255 bytes.
    pub fn new(
        hub_id: DeviceId,
        hub_public_key: [u8; 32],
        capabilities: impl Into<String>,
    ) -> Result<Self> {
        let capabilities = capabilities.into();
        check_info_len(&capabilities)?;
        Ok(Self {
            hub_id,
            hub_public_key,
            capabilities,
        })
    }
}

/// `JOIN_REQUEST` payload: same shape as the discovery request, but
/// addressed to a specific hub as the join handshake initiation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinRequest {
    /// Sensor's Ed25519 identity public key.
    pub public_key: [u8; 32],
    /// Optional textual device identifier (max 255 bytes UTF-8).
    pub device_info: String,
}

impl JoinRequest {
    /// Creates a join request.
    ///
    /// # Errors
    /// Returns `MalformedPayload` if `device_info` exceeds 255 bytes.
    pub fn new(public_key: [u8; 32], device_info: impl Into<String>) -> Result<Self> {
        let device_info = device_info.into();
        check_info_len(&device_info)?;
        Ok(Self {
            public_key,
            device_info,
        })
    }
}

fn check_info_len(s: &str) -> Result<()> {
    if s.len() > u8::MAX as usize {
        return Err(CoreError::malformed(format!(
            "info string too long: {} bytes (max 255)",
            s.len()
        )));
    }
    Ok(())
}

// ============================================
// Encrypted Payloads
// ============================================

/// `JOIN_RESPONSE` payload: an ephemeral X25519 public key followed by
/// the join grant sealed to the sensor's identity key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinResponse {
    /// Hub's fresh X25519 ephemeral public key.
    pub ephemeral_public: [u8; 32],
    /// AEAD ciphertext of the [`JoinGrant`].
    pub sealed: Vec<u8>,
}

/// `EVENT_REPORT` payload: an [`EventBody`] sealed under the sensor's
/// current session key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventReport {
    /// AEAD ciphertext of the event body.
    pub ciphertext: Vec<u8>,
}

/// `BROADCAST_COMMAND` payload: the broadcast key id in the clear,
/// then a [`CommandBody`] sealed under that broadcast key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BroadcastCommand {
    /// Which broadcast key sealed the ciphertext.
    pub key_id: BroadcastKeyId,
    /// AEAD ciphertext of the command body.
    pub ciphertext: Vec<u8>,
}

/// `KEY_ROTATION` payload: a [`RotationBody`] sealed under the
/// counterparty's current session key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyRotation {
    /// AEAD ciphertext of the rotation body.
    pub ciphertext: Vec<u8>,
}

// ============================================
// Plaintext Bodies (inside AEAD)
// ============================================

/// The join grant sealed inside a `JOIN_RESPONSE`.
///
/// # Wire Format (69 bytes plaintext)
/// ```text
/// assigned_id       u32
/// session_key       32 bytes
/// broadcast_key_id  u8
/// broadcast_key     32 bytes
/// ```
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct JoinGrant {
    /// Device id allocated to the sensor.
    #[zeroize(skip)]
    pub assigned_id: DeviceId,
    /// Fresh per-sensor AES-256 session key.
    pub session_key: [u8; 32],
    /// Version tag of the current broadcast key.
    #[zeroize(skip)]
    pub broadcast_key_id: BroadcastKeyId,
    /// Current group broadcast key.
    pub broadcast_key: [u8; 32],
}

impl std::fmt::Debug for JoinGrant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print key material
        f.debug_struct("JoinGrant")
            .field("assigned_id", &self.assigned_id)
            .field("broadcast_key_id", &self.broadcast_key_id)
            .finish_non_exhaustive()
    }
}

/// The event body sealed inside an `EVENT_REPORT`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventBody {
    /// Event type code (see [`EventType`] for well-known values).
    pub event_type: u8,
    /// Sensor-specific data (max 255 bytes).
    pub data: Vec<u8>,
}

impl EventBody {
    /// Creates an event body.
    ///
    /// # Errors
    /// Returns `MalformedPayload` if `data` exceeds 255 bytes.
    pub fn new(event_type: u8, data: impl Into<Vec<u8>>) -> Result<Self> {
        let data = data.into();
        if data.len() > u8::MAX as usize {
            return Err(CoreError::malformed(format!(
                "event data too long: {} bytes (max 255)",
                data.len()
            )));
        }
        Ok(Self { event_type, data })
    }
}

/// The command body sealed inside a `BROADCAST_COMMAND`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandBody {
    /// Command type code (see [`CommandType`] for well-known values).
    pub command_type: u8,
    /// Command-specific data (u16 length on the wire).
    pub data: Vec<u8>,
}

impl CommandBody {
    /// Creates a command body.
    ///
    /// # Errors
    /// Returns `MalformedPayload` if `data` exceeds the u16 length field.
    pub fn new(command_type: u8, data: impl Into<Vec<u8>>) -> Result<Self> {
        let data = data.into();
        if data.len() > u16::MAX as usize {
            return Err(CoreError::malformed(format!(
                "command data too long: {} bytes",
                data.len()
            )));
        }
        Ok(Self { command_type, data })
    }
}

/// Which key a `KEY_ROTATION` message replaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RotationScope {
    /// Per-sensor session key.
    Session = 0x01,
    /// Shared broadcast key.
    Broadcast = 0x02,
}

impl RotationScope {
    /// Converts a byte to a rotation scope.
    #[must_use]
    pub const fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x01 => Some(Self::Session),
            0x02 => Some(Self::Broadcast),
            _ => None,
        }
    }

    /// Converts the scope to its byte representation.
    #[must_use]
    pub const fn as_byte(self) -> u8 {
        self as u8
    }
}

/// The rotation body sealed inside a `KEY_ROTATION`.
///
/// Broadcast rotations carry the new key id; session rotations do not.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct RotationBody {
    /// Which key is being replaced.
    #[zeroize(skip)]
    pub scope: RotationScope,
    /// The replacement key.
    pub new_key: [u8; 32],
    /// When the new key becomes active.
    #[zeroize(skip)]
    pub valid_from: Timestamp,
    /// New broadcast key id (broadcast scope only).
    #[zeroize(skip)]
    pub new_key_id: Option<BroadcastKeyId>,
}

impl RotationBody {
    /// Creates a session-key rotation body.
    #[must_use]
    pub const fn session(new_key: [u8; 32], valid_from: Timestamp) -> Self {
        Self {
            scope: RotationScope::Session,
            new_key,
            valid_from,
            new_key_id: None,
        }
    }

    /// Creates a broadcast-key rotation body.
    #[must_use]
    pub const fn broadcast(
        new_key: [u8; 32],
        valid_from: Timestamp,
        new_key_id: BroadcastKeyId,
    ) -> Self {
        Self {
            scope: RotationScope::Broadcast,
            new_key,
            valid_from,
            new_key_id: Some(new_key_id),
        }
    }
}

impl std::fmt::Debug for RotationBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print key material
        f.debug_struct("RotationBody")
            .field("scope", &self.scope)
            .field("valid_from", &self.valid_from)
            .field("new_key_id", &self.new_key_id)
            .finish_non_exhaustive()
    }
}

// ============================================
// Tests
// ============================================
