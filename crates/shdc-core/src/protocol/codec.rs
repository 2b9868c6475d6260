// ============================================
// File: crates/shdc-core/src/protocol/codec.rs
// ============================================
//! # Protocol Codec
//!
//! ## Creation Reason
//! Provides bit-exact binary serialization and deserialization for all
//! SHDC packets and payloads.
//!
//! ## Parsing Strategy
//! 1. Check frame bounds (76..=512 bytes)
//! 2. Decode the 12-byte header (reject unknown types)
//! 3. Split payload and trailing 64-byte signature
//! 4. Type-specific payload parsers validate structure exactly
//!
//! The decoder is total: every input yields either a decoded value or
//! a tagged [`CoreError`], never partial state.
//!
//! ## ⚠️ Important Note for Next Developer
//! - Always validate buffer lengths before reading
//! - All multi-byte integers are big-endian on the wire
//! - The signature covers header ∥ payload exactly as transmitted
//!
//! ## Last Modified
//! v0.1.0 - Initial codec implementation

use bytes::{Buf, BufMut, BytesMut};

use shdc_common::time::Timestamp;
use shdc_common::types::{BroadcastKeyId, DeviceId};

use crate::crypto::keys::{IdentityKeyPair, IdentityPublicKey};
use crate::crypto::AES_TAG_SIZE;
use crate::error::{CoreError, Result};
use crate::protocol::messages::{
    BroadcastCommand, CommandBody, DiscoveryRequest, DiscoveryResponse, EventBody, EventReport,
    Header, JoinGrant, JoinRequest, JoinResponse, KeyRotation, MessageType, RotationBody,
    RotationScope,
};
use crate::protocol::{
    HEADER_SIZE, MAX_PACKET_SIZE, MAX_PAYLOAD_SIZE, MIN_PACKET_SIZE, SIGNATURE_SIZE,
};

// ============================================
// Header Codec
// ============================================

impl Header {
    /// Encodes the header into its 12-byte wire representation.
    #[must_use]
    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut bytes = [0u8; HEADER_SIZE];
        bytes[0] = self.msg_type.as_byte();
        bytes[1..5].copy_from_slice(&self.device_id.to_be_bytes());
        bytes[5..9].copy_from_slice(&self.timestamp.to_be_bytes());
        bytes[9..12].copy_from_slice(&self.nonce);
        bytes
    }

    /// Decodes a header from exactly 12 bytes.
    ///
    /// # Errors
    /// - `ShortPacket` if fewer than 12 bytes are provided
    /// - `UnknownType` for an unrecognized type byte
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < HEADER_SIZE {
            return Err(CoreError::short_packet(HEADER_SIZE, data.len()));
        }

        let msg_type = MessageType::try_from(data[0])?;
        let device_id = DeviceId::from_be_bytes([data[1], data[2], data[3], data[4]]);
        let timestamp = Timestamp::from_be_bytes([data[5], data[6], data[7], data[8]]);
        let mut nonce = [0u8; 3];
        nonce.copy_from_slice(&data[9..12]);

        Ok(Self {
            msg_type,
            device_id,
            timestamp,
            nonce,
        })
    }
}

// ============================================
// Packet
// ============================================

/// A complete SHDC packet: header, raw payload, trailing signature.
///
/// The payload is kept in wire form; use the type-specific payload
/// decoders ([`DiscoveryRequest::decode`] etc.) after signature
/// verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    /// The 12-byte header.
    pub header: Header,
    /// Payload bytes, exactly as transmitted (ciphertext included).
    pub payload: Vec<u8>,
    /// Ed25519 signature over header ∥ payload.
    pub signature: [u8; SIGNATURE_SIZE],
}

impl Packet {
    /// Builds and signs a packet.
    ///
    /// # Errors
    /// Returns `OversizePacket` if the payload would push the encoded
    /// packet past 512 bytes.
    pub fn build(header: Header, payload: Vec<u8>, signer: &IdentityKeyPair) -> Result<Self> {
        if payload.len() > MAX_PAYLOAD_SIZE {
            return Err(CoreError::oversize(
                MAX_PACKET_SIZE,
                MIN_PACKET_SIZE + payload.len(),
            ));
        }

        let mut signed = Vec::with_capacity(HEADER_SIZE + payload.len());
        signed.extend_from_slice(&header.to_bytes());
        signed.extend_from_slice(&payload);
        let signature = signer.sign(&signed);

        Ok(Self {
            header,
            payload,
            signature,
        })
    }

    /// Encodes the packet into wire bytes.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = BytesMut::with_capacity(HEADER_SIZE + self.payload.len() + SIGNATURE_SIZE);
        buf.put_slice(&self.header.to_bytes());
        buf.put_slice(&self.payload);
        buf.put_slice(&self.signature);
        buf.to_vec()
    }

    /// Decodes a packet from wire bytes.
    ///
    /// # Errors
    /// - `ShortPacket` below the 76-byte minimum frame
    /// - `OversizePacket` above 512 bytes
    /// - `UnknownType` for an unrecognized type byte
    pub fn decode(data: &[u8]) -> Result<Self> {
        if data.len() < MIN_PACKET_SIZE {
            return Err(CoreError::short_packet(MIN_PACKET_SIZE, data.len()));
        }
        if data.len() > MAX_PACKET_SIZE {
            return Err(CoreError::oversize(MAX_PACKET_SIZE, data.len()));
        }

        let header = Header::from_bytes(&data[..HEADER_SIZE])?;
        let payload = data[HEADER_SIZE..data.len() - SIGNATURE_SIZE].to_vec();
        let mut signature = [0u8; SIGNATURE_SIZE];
        signature.copy_from_slice(&data[data.len() - SIGNATURE_SIZE..]);

        Ok(Self {
            header,
            payload,
            signature,
        })
    }

    /// Returns the signed region: header ∥ payload.
    #[must_use]
    pub fn signed_bytes(&self) -> Vec<u8> {
        let mut signed = Vec::with_capacity(HEADER_SIZE + self.payload.len());
        signed.extend_from_slice(&self.header.to_bytes());
        signed.extend_from_slice(&self.payload);
        signed
    }

    /// Verifies the trailing signature against a public key.
    ///
    /// # Errors
    /// Returns `BadSignature` if verification fails.
    pub fn verify(&self, public_key: &IdentityPublicKey) -> Result<()> {
        public_key.verify(&self.signed_bytes(), &self.signature)
    }

    /// Returns the total encoded size in bytes.
    #[must_use]
    pub fn wire_size(&self) -> usize {
        HEADER_SIZE + self.payload.len() + SIGNATURE_SIZE
    }
}

// ============================================
// Cleartext Payload Codecs
// ============================================

/// Encodes `pubkey[32] ∥ len u8 ∥ bytes` into `buf`.
fn put_key_and_info(buf: &mut BytesMut, public_key: &[u8; 32], info: &str) {
    buf.put_slice(public_key);
    buf.put_u8(info.len() as u8);
    buf.put_slice(info.as_bytes());
}

/// Decodes `pubkey[32] ∥ len u8 ∥ bytes` from `data`.
fn get_key_and_info(data: &[u8]) -> Result<([u8; 32], String)> {
    if data.len() < 33 {
        return Err(CoreError::malformed(format!(
            "payload too short for public key: {} bytes",
            data.len()
        )));
    }

    let mut public_key = [0u8; 32];
    public_key.copy_from_slice(&data[..32]);

    let info_len = data[32] as usize;
    if data.len() != 33 + info_len {
        return Err(CoreError::malformed("info length mismatch"));
    }

    let info = std::str::from_utf8(&data[33..])
        .map_err(|_| CoreError::malformed("info is not valid UTF-8"))?
        .to_string();

    Ok((public_key, info))
}

impl DiscoveryRequest {
    /// Serializes the payload to wire bytes.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = BytesMut::with_capacity(33 + self.device_info.len());
        put_key_and_info(&mut buf, &self.public_key, &self.device_info);
        buf.to_vec()
    }

    /// Deserializes the payload from wire bytes.
    ///
    /// # Errors
    /// Returns `MalformedPayload` on structural mismatch.
    pub fn decode(data: &[u8]) -> Result<Self> {
        let (public_key, device_info) = get_key_and_info(data)?;
        Ok(Self {
            public_key,
            device_info,
        })
    }
}

impl JoinRequest {
    /// Serializes the payload to wire bytes.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = BytesMut::with_capacity(33 + self.device_info.len());
        put_key_and_info(&mut buf, &self.public_key, &self.device_info);
        buf.to_vec()
    }

    /// Deserializes the payload from wire bytes.
    ///
    /// # Errors
    /// Returns `MalformedPayload` on structural mismatch.
    pub fn decode(data: &[u8]) -> Result<Self> {
        let (public_key, device_info) = get_key_and_info(data)?;
        Ok(Self {
            public_key,
            device_info,
        })
    }
}

impl DiscoveryResponse {
    /// Serializes the payload to wire bytes.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = BytesMut::with_capacity(37 + self.capabilities.len());
        buf.put_u32(self.hub_id.as_u32());
        buf.put_slice(&self.hub_public_key);
        buf.put_u8(self.capabilities.len() as u8);
        buf.put_slice(self.capabilities.as_bytes());
        buf.to_vec()
    }

    /// Deserializes the payload from wire bytes.
    ///
    /// # Errors
    /// Returns `MalformedPayload` on structural mismatch.
    pub fn decode(data: &[u8]) -> Result<Self> {
        if data.len() < 37 {
            return Err(CoreError::malformed(format!(
                "discovery response too short: {} bytes",
                data.len()
            )));
        }

        let mut buf = data;
        let hub_id = DeviceId::new(buf.get_u32());
        let mut hub_public_key = [0u8; 32];
        buf.copy_to_slice(&mut hub_public_key);
        let caps_len = buf.get_u8() as usize;
        if buf.remaining() != caps_len {
            return Err(CoreError::malformed("capabilities length mismatch"));
        }
        let capabilities = std::str::from_utf8(buf)
            .map_err(|_| CoreError::malformed("capabilities are not valid UTF-8"))?
            .to_string();

        Ok(Self {
            hub_id,
            hub_public_key,
            capabilities,
        })
    }
}

// ============================================
// Encrypted Payload Codecs
// ============================================

impl JoinResponse {
    /// Serializes the payload to wire bytes.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = BytesMut::with_capacity(32 + self.sealed.len());
        buf.put_slice(&self.ephemeral_public);
        buf.put_slice(&self.sealed);
        buf.to_vec()
    }

    /// Deserializes the payload from wire bytes.
    ///
    /// # Errors
    /// Returns `MalformedPayload` if the payload cannot contain an
    /// ephemeral key and a tagged ciphertext.
    pub fn decode(data: &[u8]) -> Result<Self> {
        if data.len() < 32 + AES_TAG_SIZE {
            return Err(CoreError::malformed(format!(
                "join response too short: {} bytes",
                data.len()
            )));
        }

        let mut ephemeral_public = [0u8; 32];
        ephemeral_public.copy_from_slice(&data[..32]);

        Ok(Self {
            ephemeral_public,
            sealed: data[32..].to_vec(),
        })
    }
}

impl EventReport {
    /// Serializes the payload to wire bytes.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        self.ciphertext.clone()
    }

    /// Deserializes the payload from wire bytes.
    ///
    /// # Errors
    /// Returns `MalformedPayload` if the payload is shorter than a
    /// tagged minimal event body.
    pub fn decode(data: &[u8]) -> Result<Self> {
        if data.len() < AES_TAG_SIZE + 2 {
            return Err(CoreError::malformed(format!(
                "event report too short: {} bytes",
                data.len()
            )));
        }
        Ok(Self {
            ciphertext: data.to_vec(),
        })
    }
}

impl BroadcastCommand {
    /// Serializes the payload to wire bytes.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = BytesMut::with_capacity(1 + self.ciphertext.len());
        buf.put_u8(self.key_id.as_u8());
        buf.put_slice(&self.ciphertext);
        buf.to_vec()
    }

    /// Deserializes the payload from wire bytes.
    ///
    /// # Errors
    /// Returns `MalformedPayload` if the payload is shorter than a key
    /// id plus a tagged minimal command body.
    pub fn decode(data: &[u8]) -> Result<Self> {
        if data.len() < 1 + AES_TAG_SIZE + 3 {
            return Err(CoreError::malformed(format!(
                "broadcast command too short: {} bytes",
                data.len()
            )));
        }
        Ok(Self {
            key_id: BroadcastKeyId::new(data[0]),
            ciphertext: data[1..].to_vec(),
        })
    }
}

impl KeyRotation {
    /// Serializes the payload to wire bytes.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        self.ciphertext.clone()
    }

    /// Deserializes the payload from wire bytes.
    ///
    /// # Errors
    /// Returns `MalformedPayload` if the payload is shorter than a
    /// tagged minimal rotation body.
    pub fn decode(data: &[u8]) -> Result<Self> {
        if data.len() < AES_TAG_SIZE + 37 {
            return Err(CoreError::malformed(format!(
                "key rotation too short: {} bytes",
                data.len()
            )));
        }
        Ok(Self {
            ciphertext: data.to_vec(),
        })
    }
}

// ============================================
// Plaintext Body Codecs
// ============================================

impl JoinGrant {
    /// Plaintext wire size: 4 + 32 + 1 + 32.
    pub const WIRE_SIZE: usize = 69;

    /// Serializes the grant to plaintext wire bytes.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = BytesMut::with_capacity(Self::WIRE_SIZE);
        buf.put_u32(self.assigned_id.as_u32());
        buf.put_slice(&self.session_key);
        buf.put_u8(self.broadcast_key_id.as_u8());
        buf.put_slice(&self.broadcast_key);
        buf.to_vec()
    }

    /// Deserializes a grant from plaintext wire bytes.
    ///
    /// # Errors
    /// Returns `MalformedPayload` unless exactly 69 bytes.
    pub fn decode(data: &[u8]) -> Result<Self> {
        if data.len() != Self::WIRE_SIZE {
            return Err(CoreError::malformed(format!(
                "join grant must be {} bytes, got {}",
                Self::WIRE_SIZE,
                data.len()
            )));
        }

        let mut buf = data;
        let assigned_id = DeviceId::new(buf.get_u32());
        let mut session_key = [0u8; 32];
        buf.copy_to_slice(&mut session_key);
        let broadcast_key_id = BroadcastKeyId::new(buf.get_u8());
        let mut broadcast_key = [0u8; 32];
        buf.copy_to_slice(&mut broadcast_key);

        Ok(Self {
            assigned_id,
            session_key,
            broadcast_key_id,
            broadcast_key,
        })
    }
}

impl EventBody {
    /// Serializes the body to plaintext wire bytes.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = BytesMut::with_capacity(2 + self.data.len());
        buf.put_u8(self.event_type);
        buf.put_u8(self.data.len() as u8);
        buf.put_slice(&self.data);
        buf.to_vec()
    }

    /// Deserializes a body from plaintext wire bytes.
    ///
    /// # Errors
    /// Returns `MalformedPayload` on structural mismatch.
    pub fn decode(data: &[u8]) -> Result<Self> {
        if data.len() < 2 {
            return Err(CoreError::malformed("event body too short"));
        }

        let event_type = data[0];
        let data_len = data[1] as usize;
        if data.len() != 2 + data_len {
            return Err(CoreError::malformed("event data length mismatch"));
        }

        Ok(Self {
            event_type,
            data: data[2..].to_vec(),
        })
    }
}

impl CommandBody {
    /// Serializes the body to plaintext wire bytes.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = BytesMut::with_capacity(3 + self.data.len());
        buf.put_u8(self.command_type);
        buf.put_u16(self.data.len() as u16);
        buf.put_slice(&self.data);
        buf.to_vec()
    }

    /// Deserializes a body from plaintext wire bytes.
    ///
    /// # Errors
    /// Returns `MalformedPayload` on structural mismatch.
    pub fn decode(data: &[u8]) -> Result<Self> {
        if data.len() < 3 {
            return Err(CoreError::malformed("command body too short"));
        }

        let mut buf = data;
        let command_type = buf.get_u8();
        let data_len = buf.get_u16() as usize;
        if buf.remaining() != data_len {
            return Err(CoreError::malformed("command data length mismatch"));
        }

        Ok(Self {
            command_type,
            data: buf.to_vec(),
        })
    }
}

impl RotationBody {
    /// Serializes the body to plaintext wire bytes (37 or 38 bytes).
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = BytesMut::with_capacity(38);
        buf.put_u8(self.scope.as_byte());
        buf.put_slice(&self.new_key);
        buf.put_u32(self.valid_from.as_secs());
        if let Some(id) = self.new_key_id {
            buf.put_u8(id.as_u8());
        }
        buf.to_vec()
    }

    /// Deserializes a body from plaintext wire bytes.
    ///
    /// # Errors
    /// Returns `MalformedPayload` for an invalid scope byte or a size
    /// inconsistent with the scope.
    pub fn decode(data: &[u8]) -> Result<Self> {
        if data.len() < 37 {
            return Err(CoreError::malformed("rotation body too short"));
        }

        let scope = RotationScope::from_byte(data[0])
            .ok_or_else(|| CoreError::malformed(format!("invalid rotation scope 0x{:02x}", data[0])))?;

        let mut buf = &data[1..];
        let mut new_key = [0u8; 32];
        buf.copy_to_slice(&mut new_key);
        let valid_from = Timestamp::from_secs(buf.get_u32());

        let new_key_id = match (scope, buf.remaining()) {
            (RotationScope::Session, 0) => None,
            (RotationScope::Broadcast, 1) => Some(BroadcastKeyId::new(buf.get_u8())),
            _ => {
                return Err(CoreError::malformed(
                    "rotation body size inconsistent with scope",
                ))
            }
        };

        Ok(Self {
            scope,
            new_key,
            valid_from,
            new_key_id,
        })
    }
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::keys::IdentityKeyPair;

    fn test_header(msg_type: MessageType) -> Header {
        Header::new(
            msg_type,
            DeviceId::new(0xAABB_CCDD),
            Timestamp::from_secs(1_700_000_000),
            [0x01, 0x02, 0x03],
        )
    }

    #[test]
    fn test_header_roundtrip() {
        let header = test_header(MessageType::EventReport);
        let bytes = header.to_bytes();
        assert_eq!(bytes.len(), HEADER_SIZE);
        assert_eq!(bytes[0], 0x01);
        assert_eq!(&bytes[1..5], &[0xAA, 0xBB, 0xCC, 0xDD]);

        let decoded = Header::from_bytes(&bytes).unwrap();
        assert_eq!(decoded, header);
    }

    #[test]
    fn test_header_unknown_type() {
        let mut bytes = test_header(MessageType::EventReport).to_bytes();
        bytes[0] = 0x42;
        assert!(matches!(
            Header::from_bytes(&bytes),
            Err(CoreError::UnknownType(0x42))
        ));
    }

    #[test]
    fn test_packet_roundtrip() {
        let signer = IdentityKeyPair::generate();
        let payload = DiscoveryRequest::new([0x11; 32], "TempSensor")
            .unwrap()
            .encode();
        let packet =
            Packet::build(test_header(MessageType::HubDiscoveryReq), payload, &signer).unwrap();

        let encoded = packet.encode();
        assert!(encoded.len() >= MIN_PACKET_SIZE);
        assert!(encoded.len() <= MAX_PACKET_SIZE);

        let decoded = Packet::decode(&encoded).unwrap();
        assert_eq!(decoded, packet);
        assert!(decoded.verify(&signer.public_key()).is_ok());
    }

    #[test]
    fn test_packet_too_short() {
        let result = Packet::decode(&[0u8; 40]);
        assert!(matches!(result, Err(CoreError::ShortPacket { .. })));
    }

    #[test]
    fn test_packet_too_large() {
        let mut data = vec![0u8; MAX_PACKET_SIZE + 1];
        data[0] = MessageType::EventReport.as_byte();
        let result = Packet::decode(&data);
        assert!(matches!(result, Err(CoreError::OversizePacket { .. })));
    }

    #[test]
    fn test_packet_oversize_payload_rejected_at_build() {
        let signer = IdentityKeyPair::generate();
        let result = Packet::build(
            test_header(MessageType::EventReport),
            vec![0u8; MAX_PAYLOAD_SIZE + 1],
            &signer,
        );
        assert!(matches!(result, Err(CoreError::OversizePacket { .. })));
    }

    #[test]
    fn test_signature_binds_header_and_payload() {
        let signer = IdentityKeyPair::generate();
        let payload = DiscoveryRequest::new([0x11; 32], "s").unwrap().encode();
        let packet =
            Packet::build(test_header(MessageType::HubDiscoveryReq), payload, &signer).unwrap();

        // Flip a payload bit.
        let mut tampered = packet.clone();
        tampered.payload[0] ^= 0x01;
        assert!(matches!(
            tampered.verify(&signer.public_key()),
            Err(CoreError::BadSignature)
        ));

        // Flip a header bit.
        let mut tampered = packet.clone();
        tampered.header.nonce[0] ^= 0x01;
        assert!(matches!(
            tampered.verify(&signer.public_key()),
            Err(CoreError::BadSignature)
        ));

        // Flip a signature bit.
        let mut tampered = packet;
        tampered.signature[0] ^= 0x01;
        assert!(matches!(
            tampered.verify(&signer.public_key()),
            Err(CoreError::BadSignature)
        ));
    }

    #[test]
    fn test_discovery_request_roundtrip() {
        let original = DiscoveryRequest::new([0x42; 32], "Motion sensor, hallway").unwrap();
        let decoded = DiscoveryRequest::decode(&original.encode()).unwrap();
        assert_eq!(decoded, original);
    }

    #[test]
    fn test_discovery_request_empty_info() {
        let original = DiscoveryRequest::new([0x42; 32], "").unwrap();
        let encoded = original.encode();
        assert_eq!(encoded.len(), 33);
        assert_eq!(DiscoveryRequest::decode(&encoded).unwrap(), original);
    }

    #[test]
    fn test_discovery_request_length_mismatch() {
        let mut encoded = DiscoveryRequest::new([0x42; 32], "abc").unwrap().encode();
        encoded[32] = 10; // claims 10 info bytes, only 3 present
        assert!(matches!(
            DiscoveryRequest::decode(&encoded),
            Err(CoreError::MalformedPayload { .. })
        ));
    }

    #[test]
    fn test_discovery_response_roundtrip() {
        let original =
            DiscoveryResponse::new(DeviceId::new(0x1000_0001), [0x33; 32], "shdc/1.0").unwrap();
        let decoded = DiscoveryResponse::decode(&original.encode()).unwrap();
        assert_eq!(decoded, original);
    }

    #[test]
    fn test_join_response_roundtrip() {
        let original = JoinResponse {
            ephemeral_public: [0x55; 32],
            sealed: vec![0xEE; JoinGrant::WIRE_SIZE + AES_TAG_SIZE],
        };
        let decoded = JoinResponse::decode(&original.encode()).unwrap();
        assert_eq!(decoded, original);
    }

    #[test]
    fn test_broadcast_command_roundtrip() {
        let original = BroadcastCommand {
            key_id: BroadcastKeyId::new(0x02),
            ciphertext: vec![0xCC; 40],
        };
        let decoded = BroadcastCommand::decode(&original.encode()).unwrap();
        assert_eq!(decoded, original);
    }

    #[test]
    fn test_join_grant_roundtrip() {
        let original = JoinGrant {
            assigned_id: DeviceId::new(0xAABB_CCDD),
            session_key: [0x11; 32],
            broadcast_key_id: BroadcastKeyId::new(0x01),
            broadcast_key: [0x22; 32],
        };
        let encoded = original.encode();
        assert_eq!(encoded.len(), JoinGrant::WIRE_SIZE);
        let decoded = JoinGrant::decode(&encoded).unwrap();
        assert_eq!(decoded, original);
    }

    #[test]
    fn test_join_grant_wrong_size() {
        assert!(JoinGrant::decode(&[0u8; 68]).is_err());
        assert!(JoinGrant::decode(&[0u8; 70]).is_err());
    }

    #[test]
    fn test_event_body_roundtrip() {
        let original = EventBody::new(0x01, b"23.5C".to_vec()).unwrap();
        let decoded = EventBody::decode(&original.encode()).unwrap();
        assert_eq!(decoded, original);

        let empty = EventBody::new(0x01, Vec::new()).unwrap();
        assert_eq!(EventBody::decode(&empty.encode()).unwrap(), empty);
    }

    #[test]
    fn test_command_body_roundtrip() {
        let original = CommandBody::new(0x03, vec![0x01, 0x02]).unwrap();
        let encoded = original.encode();
        assert_eq!(encoded.len(), 5);
        // u16 big-endian length field
        assert_eq!(&encoded[1..3], &[0x00, 0x02]);
        assert_eq!(CommandBody::decode(&encoded).unwrap(), original);
    }

    #[test]
    fn test_rotation_body_roundtrip() {
        let session = RotationBody::session([0x44; 32], Timestamp::from_secs(1_700_000_100));
        let encoded = session.encode();
        assert_eq!(encoded.len(), 37);
        assert_eq!(RotationBody::decode(&encoded).unwrap(), session);

        let broadcast = RotationBody::broadcast(
            [0x33; 32],
            Timestamp::from_secs(1_700_000_100),
            BroadcastKeyId::new(0x02),
        );
        let encoded = broadcast.encode();
        assert_eq!(encoded.len(), 38);
        assert_eq!(RotationBody::decode(&encoded).unwrap(), broadcast);
    }

    #[test]
    fn test_rotation_body_scope_size_mismatch() {
        // Session body with a trailing key id byte is invalid.
        let mut encoded = RotationBody::session([0x44; 32], Timestamp::from_secs(100)).encode();
        encoded.push(0x05);
        assert!(RotationBody::decode(&encoded).is_err());

        // Broadcast body missing its key id is invalid.
        let mut encoded = RotationBody::broadcast(
            [0x44; 32],
            Timestamp::from_secs(100),
            BroadcastKeyId::new(1),
        )
        .encode();
        encoded.pop();
        assert!(RotationBody::decode(&encoded).is_err());
    }

    #[test]
    fn test_rotation_body_bad_scope() {
        let mut encoded = RotationBody::session([0x44; 32], Timestamp::from_secs(100)).encode();
        encoded[0] = 0x03;
        assert!(matches!(
            RotationBody::decode(&encoded),
            Err(CoreError::MalformedPayload { .. })
        ));
    }
}
