// ============================================
// File: crates/shdc-core/src/crypto/sealed.rs
// ============================================
//! # Sealed Join Grants
//!
//! ## Creation Reason
//! Implements the `JOIN_RESPONSE` confidentiality construction: only
//! the owner of the sensor identity secret key can open the grant,
//! while the hub authenticates via the outer packet signature.
//!
//! ## Construction
//! ```text
//! Hub                                            Sensor
//!  │  eph = X25519 keypair (fresh per join)        │
//!  │  shared = eph.sk × Montgomery(sensor_ed_pk)   │
//!  │  wrap = HKDF(shared, salt=header,             │
//!  │              info="shdc-join-v1")             │
//!  │  sealed = AES-256-GCM(wrap, nonce=0, grant)   │
//!  │  send eph.pk ∥ sealed ────────────────────►   │
//!  │                                               │
//!  │          shared = ed_sk_scalar × eph.pk       │
//!  │          wrap, open as above                  │
//! ```
//! The all-zero GCM nonce is safe because the wrap key is unique per
//! packet (fresh ephemeral, header-salted derivation).
//!
//! ## ⚠️ Important Note for Next Developer
//! - The ephemeral secret is consumed by the exchange and never reused
//! - The Ed25519→X25519 conversion uses the dalek clamped scalar and
//!   Montgomery point forms; both sides must agree on this mapping
//!
//! ## Last Modified
//! v0.1.0 - Initial sealed-grant implementation

use aes_gcm::{
    aead::{Aead, KeyInit, Payload},
    Aes256Gcm, Nonce,
};
use rand::rngs::OsRng;
use x25519_dalek::{x25519, PublicKey as X25519PublicKey, StaticSecret};
use zeroize::Zeroize;

use crate::crypto::kdf::derive_join_wrap_key;
use crate::crypto::keys::{IdentityKeyPair, IdentityPublicKey, SymmetricKey};
use crate::crypto::AES_NONCE_SIZE;
use crate::error::{CoreError, Result};
use crate::protocol::messages::Header;

/// Seals `plaintext` to a sensor identity key.
///
/// # Arguments
/// * `recipient` - the sensor's Ed25519 identity public key
/// * `header` - the exact header of the outgoing `JOIN_RESPONSE`
///
/// # Returns
/// The fresh ephemeral X25519 public key and the sealed ciphertext;
/// the ephemeral public is prepended to the payload on the wire.
///
/// # Errors
/// Returns `KeyDerivation` or `AeadFailure` on crypto failures.
pub fn seal_to_identity(
    recipient: &IdentityPublicKey,
    header: &Header,
    plaintext: &[u8],
) -> Result<([u8; 32], Vec<u8>)> {
    let ephemeral = StaticSecret::random_from_rng(OsRng);
    let ephemeral_public = X25519PublicKey::from(&ephemeral).to_bytes();

    let recipient_mont = X25519PublicKey::from(recipient.to_montgomery_bytes());
    let shared = ephemeral.diffie_hellman(&recipient_mont);

    let wrap_key = derive_join_wrap_key(shared.as_bytes(), header)?;
    let sealed = zero_nonce_seal(&wrap_key, plaintext)?;

    Ok((ephemeral_public, sealed))
}

/// Opens a sealed grant using the sensor's identity key pair.
///
/// # Errors
/// - `KeyDerivation` if the wrap key cannot be derived
/// - `AeadFailure` if the grant was not sealed to this identity or
///   the ciphertext was tampered with
pub fn open_with_identity(
    identity: &IdentityKeyPair,
    header: &Header,
    ephemeral_public: &[u8; 32],
    sealed: &[u8],
) -> Result<Vec<u8>> {
    let mut scalar = identity.x25519_scalar();
    let mut shared = x25519(scalar, *ephemeral_public);
    scalar.zeroize();

    let wrap_key = derive_join_wrap_key(&shared, header);
    shared.zeroize();

    zero_nonce_open(&wrap_key?, sealed)
}

// The wrap key is single-use, so a fixed nonce cannot repeat under it.
fn zero_nonce_seal(key: &SymmetricKey, plaintext: &[u8]) -> Result<Vec<u8>> {
    let cipher = Aes256Gcm::new_from_slice(key.as_bytes()).map_err(|_| CoreError::AeadFailure)?;
    let nonce = Nonce::from([0u8; AES_NONCE_SIZE]);
    cipher
        .encrypt(
            &nonce,
            Payload {
                msg: plaintext,
                aad: b"",
            },
        )
        .map_err(|_| CoreError::AeadFailure)
}

fn zero_nonce_open(key: &SymmetricKey, ciphertext: &[u8]) -> Result<Vec<u8>> {
    let cipher = Aes256Gcm::new_from_slice(key.as_bytes()).map_err(|_| CoreError::AeadFailure)?;
    let nonce = Nonce::from([0u8; AES_NONCE_SIZE]);
    cipher
        .decrypt(
            &nonce,
            Payload {
                msg: ciphertext,
                aad: b"",
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
    use crate::protocol::messages::MessageType;
    use shdc_common::time::Timestamp;
    use shdc_common::types::DeviceId;

    fn join_header() -> Header {
        Header::new(
            MessageType::JoinResponse,
            DeviceId::new(0x1000_0001),
            Timestamp::from_secs(1_700_000_000),
            [0x07, 0x08, 0x09],
        )
    }

    #[test]
    fn test_seal_open_roundtrip() {
        let sensor = IdentityKeyPair::generate();
        let header = join_header();
        let grant = b"assigned id and keys";

        let (eph_pub, sealed) = seal_to_identity(&sensor.public_key(), &header, grant).unwrap();
        let opened = open_with_identity(&sensor, &header, &eph_pub, &sealed).unwrap();

        assert_eq!(opened, grant);
    }

    #[test]
    fn test_only_recipient_can_open() {
        let sensor = IdentityKeyPair::generate();
        let eavesdropper = IdentityKeyPair::generate();
        let header = join_header();

        let (eph_pub, sealed) =
            seal_to_identity(&sensor.public_key(), &header, b"secret grant").unwrap();

        assert!(matches!(
            open_with_identity(&eavesdropper, &header, &eph_pub, &sealed),
            Err(CoreError::AeadFailure)
        ));
    }

    #[test]
    fn test_header_binding() {
        let sensor = IdentityKeyPair::generate();
        let header = join_header();

        let (eph_pub, sealed) =
            seal_to_identity(&sensor.public_key(), &header, b"secret grant").unwrap();

        let mut other = header;
        other.nonce = [0xFF, 0xFF, 0xFF];
        assert!(matches!(
            open_with_identity(&sensor, &other, &eph_pub, &sealed),
            Err(CoreError::AeadFailure)
        ));
    }

    #[test]
    fn test_tampered_sealed_fails() {
        let sensor = IdentityKeyPair::generate();
        let header = join_header();

        let (eph_pub, mut sealed) =
            seal_to_identity(&sensor.public_key(), &header, b"secret grant").unwrap();
        sealed[0] ^= 0x01;

        assert!(matches!(
            open_with_identity(&sensor, &header, &eph_pub, &sealed),
            Err(CoreError::AeadFailure)
        ));
    }

    #[test]
    fn test_fresh_ephemeral_per_seal() {
        let sensor = IdentityKeyPair::generate();
        let header = join_header();

        let (eph1, _) = seal_to_identity(&sensor.public_key(), &header, b"grant").unwrap();
        let (eph2, _) = seal_to_identity(&sensor.public_key(), &header, b"grant").unwrap();
        assert_ne!(eph1, eph2);
    }
}
