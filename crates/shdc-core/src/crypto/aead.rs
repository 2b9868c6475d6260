// ============================================
// File: crates/shdc-core/src/crypto/aead.rs
// ============================================
//! # Payload Encryption
//!
//! ## Creation Reason
//! Provides authenticated encryption for SHDC payloads using
//! AES-256-GCM, with the nonce and associated data derived from the
//! packet header.
//!
//! ## Nonce Construction
//! ```text
//! nonce (12 bytes) = timestamp (4, BE) ∥ device_id (4, BE) ∥ nonce3 ∥ 0x00
//! ```
//!
//! ## Associated Data
//! The full 12-byte header. Every ciphertext is therefore bound to
//! its exact header; replacing or re-stamping the header makes the
//! open fail.
//!
//! ## ⚠️ Important Note for Next Developer
//! - Never reuse a (key, nonce) pair - catastrophic security failure.
//!   The replay guard rejects duplicate (device_id, nonce3) headers,
//!   which also defends the AEAD nonce under a fixed key.
//!
//! ## Last Modified
//! v0.1.0 - Initial AEAD implementation

use aes_gcm::{
    aead::{Aead, KeyInit, Payload},
    Aes256Gcm, Nonce,
};

use crate::crypto::keys::SymmetricKey;
use crate::crypto::AES_NONCE_SIZE;
use crate::error::{CoreError, Result};
use crate::protocol::messages::Header;

// ============================================
// Nonce Construction
// ============================================

/// Derives the 12-byte AES-GCM nonce from a packet header.
#[must_use]
pub fn packet_nonce(header: &Header) -> [u8; AES_NONCE_SIZE] {
    let mut nonce = [0u8; AES_NONCE_SIZE];
    nonce[0..4].copy_from_slice(&header.timestamp.to_be_bytes());
    nonce[4..8].copy_from_slice(&header.device_id.to_be_bytes());
    nonce[8..11].copy_from_slice(&header.nonce);
    // nonce[11] stays 0x00
    nonce
}

// ============================================
// Seal / Open
// ============================================

/// Encrypts a payload under `key`, bound to `header`.
///
/// # Returns
/// Ciphertext with the 16-byte GCM tag appended.
///
/// # Errors
/// Returns `AeadFailure` if encryption fails (should not happen with
/// valid inputs).
pub fn seal(key: &SymmetricKey, header: &Header, plaintext: &[u8]) -> Result<Vec<u8>> {
    let cipher = Aes256Gcm::new_from_slice(key.as_bytes()).map_err(|_| CoreError::AeadFailure)?;
    let nonce = Nonce::from(packet_nonce(header));
    let aad = header.to_bytes();

    cipher
        .encrypt(
            &nonce,
            Payload {
                msg: plaintext,
                aad: &aad,
            },
        )
        .map_err(|_| CoreError::AeadFailure)
}

/// Decrypts a payload under `key`, bound to `header`.
///
/// # Errors
/// Returns `AeadFailure` on a wrong key, tampered ciphertext, or a
/// header that does not match the one the sender sealed against.
pub fn open(key: &SymmetricKey, header: &Header, ciphertext: &[u8]) -> Result<Vec<u8>> {
    let cipher = Aes256Gcm::new_from_slice(key.as_bytes()).map_err(|_| CoreError::AeadFailure)?;
    let nonce = Nonce::from(packet_nonce(header));
    let aad = header.to_bytes();

    cipher
        .decrypt(
            &nonce,
            Payload {
                msg: ciphertext,
                aad: &aad,
            },
        )
        .map_err(|_| CoreError::AeadFailure)
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::AES_TAG_SIZE;
    use crate::protocol::messages::MessageType;
    use shdc_common::time::Timestamp;
    use shdc_common::types::DeviceId;

    fn test_key() -> SymmetricKey {
        SymmetricKey::from_bytes([0x42; 32])
    }

    fn test_header() -> Header {
        Header::new(
            MessageType::EventReport,
            DeviceId::new(0xAABB_CCDD),
            Timestamp::from_secs(0x0102_0304),
            [0x0A, 0x0B, 0x0C],
        )
    }

    #[test]
    fn test_nonce_layout() {
        let nonce = packet_nonce(&test_header());
        assert_eq!(
            nonce,
            [0x01, 0x02, 0x03, 0x04, 0xAA, 0xBB, 0xCC, 0xDD, 0x0A, 0x0B, 0x0C, 0x00]
        );
    }

    #[test]
    fn test_seal_open_roundtrip() {
        let key = test_key();
        let header = test_header();
        let plaintext = b"motion detected";

        let ciphertext = seal(&key, &header, plaintext).unwrap();
        assert_eq!(ciphertext.len(), plaintext.len() + AES_TAG_SIZE);

        let opened = open(&key, &header, &ciphertext).unwrap();
        assert_eq!(opened, plaintext);
    }

    #[test]
    fn test_wrong_key_fails() {
        let header = test_header();
        let ciphertext = seal(&test_key(), &header, b"secret").unwrap();

        let other = SymmetricKey::from_bytes([0x43; 32]);
        assert!(matches!(
            open(&other, &header, &ciphertext),
            Err(CoreError::AeadFailure)
        ));
    }

    #[test]
    fn test_header_change_fails() {
        let key = test_key();
        let header = test_header();
        let ciphertext = seal(&key, &header, b"secret").unwrap();

        // Different device id: nonce and AAD both change.
        let mut other = header;
        other.device_id = DeviceId::new(0x1111_1111);
        assert!(matches!(
            open(&key, &other, &ciphertext),
            Err(CoreError::AeadFailure)
        ));

        // Same nonce inputs, different type byte: only the AAD changes.
        let mut other = header;
        other.msg_type = MessageType::KeyRotation;
        assert!(matches!(
            open(&key, &other, &ciphertext),
            Err(CoreError::AeadFailure)
        ));
    }

    #[test]
    fn test_tampered_ciphertext_fails() {
        let key = test_key();
        let header = test_header();
        let mut ciphertext = seal(&key, &header, b"secret").unwrap();
        ciphertext[0] ^= 0xFF;

        assert!(matches!(
            open(&key, &header, &ciphertext),
            Err(CoreError::AeadFailure)
        ));
    }

    #[test]
    fn test_empty_plaintext() {
        let key = test_key();
        let header = test_header();

        let ciphertext = seal(&key, &header, b"").unwrap();
        assert_eq!(ciphertext.len(), AES_TAG_SIZE);
        assert!(open(&key, &header, &ciphertext).unwrap().is_empty());
    }
}
