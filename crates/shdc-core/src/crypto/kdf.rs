// ============================================
// File: crates/shdc-core/src/crypto/kdf.rs
// ============================================
//! # Key Derivation Functions
//!
//! ## Creation Reason
//! Derives the join wrap key from the X25519 shared secret, with
//! domain separation via the salt and info parameters.
//!
//! ## Main Functionality
//! - `derive_join_wrap_key`: HKDF-SHA256 keyed to the exact join header
//! - `hkdf_expand`: generic HKDF-SHA256 expansion
//!
//! ## Last Modified
//! v0.1.0 - Initial KDF implementation

use hkdf::Hkdf;
use sha2::Sha256;

use super::AES_KEY_SIZE;
use crate::crypto::SymmetricKey;
use crate::error::{CoreError, Result};
use crate::protocol::messages::Header;

/// HKDF info label for the join wrap key (domain separation).
pub const JOIN_WRAP_INFO: &[u8] = b"shdc-join-v1";

/// Derives the 32-byte wrap key that seals a `JOIN_RESPONSE` grant.
///
/// # Arguments
/// * `shared_secret` - X25519 output of hub-ephemeral × sensor-identity
/// * `header` - the exact header of the `JOIN_RESPONSE` packet (salt)
///
/// # Key Binding
/// Salting with the header ties the wrap key to one specific packet:
/// a grant cannot be replayed under a different header even if the
/// ephemeral exchange were somehow repeated.
///
/// # Errors
/// Returns `KeyDerivation` if HKDF expansion fails.
pub fn derive_join_wrap_key(shared_secret: &[u8; 32], header: &Header) -> Result<SymmetricKey> {
    let salt = header.to_bytes();
    let hk = Hkdf::<Sha256>::new(Some(&salt), shared_secret);

    let mut key_bytes = [0u8; AES_KEY_SIZE];
    hk.expand(JOIN_WRAP_INFO, &mut key_bytes)
        .map_err(|_| CoreError::KeyDerivation {
            reason: "HKDF expansion failed".into(),
        })?;

    Ok(SymmetricKey::from_bytes(key_bytes))
}

/// Generic HKDF-SHA256 expansion.
///
/// # Errors
/// Returns `KeyDerivation` if `output_len` exceeds the HKDF-SHA256
/// maximum (255 * 32 bytes).
pub fn hkdf_expand(ikm: &[u8], salt: &[u8], info: &[u8], output_len: usize) -> Result<Vec<u8>> {
    let hk = Hkdf::<Sha256>::new(Some(salt), ikm);

    let mut output = vec![0u8; output_len];
    hk.expand(info, &mut output)
        .map_err(|_| CoreError::KeyDerivation {
            reason: format!("HKDF expansion failed for {output_len} bytes"),
        })?;

    Ok(output)
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

    fn test_header(nonce: [u8; 3]) -> Header {
        Header::new(
            MessageType::JoinResponse,
            DeviceId::new(0x1000_0001),
            Timestamp::from_secs(1_700_000_000),
            nonce,
        )
    }

    #[test]
    fn test_derive_is_deterministic() {
        let shared = [0x42u8; 32];
        let header = test_header([1, 2, 3]);

        let k1 = derive_join_wrap_key(&shared, &header).unwrap();
        let k2 = derive_join_wrap_key(&shared, &header).unwrap();
        assert_eq!(k1, k2);
    }

    #[test]
    fn test_header_salt_separates_keys() {
        let shared = [0x42u8; 32];
        let k1 = derive_join_wrap_key(&shared, &test_header([1, 2, 3])).unwrap();
        let k2 = derive_join_wrap_key(&shared, &test_header([1, 2, 4])).unwrap();
        assert_ne!(k1, k2);
    }

    #[test]
    fn test_different_secrets_separate_keys() {
        let header = test_header([1, 2, 3]);
        let k1 = derive_join_wrap_key(&[0x42u8; 32], &header).unwrap();
        let k2 = derive_join_wrap_key(&[0x43u8; 32], &header).unwrap();
        assert_ne!(k1, k2);
    }

    #[test]
    fn test_hkdf_expand() {
        let output = hkdf_expand(&[0x42u8; 32], b"salt", b"info", 64).unwrap();
        assert_eq!(output.len(), 64);
        assert_ne!(&output[..32], &[0u8; 32]);

        // Over the HKDF-SHA256 limit.
        assert!(hkdf_expand(&[0x42u8; 32], b"salt", b"info", 256 * 32).is_err());
    }
}
