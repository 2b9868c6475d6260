// ============================================
// File: crates/shdc-core/src/crypto/mod.rs
// ============================================
//! # Cryptography Module
//!
//! ## Creation Reason
//! Centralizes all cryptographic operations of the SHDC protocol,
//! using audited RustCrypto and dalek implementations.
//!
//! ## Main Functionality
//!
//! ### Submodules
//! - [`keys`]: Key types (Ed25519 identities, AES-256 symmetric keys)
//! - [`aead`]: Packet payload encryption (AES-256-GCM)
//! - [`kdf`]: Key derivation (HKDF-SHA256)
//! - [`sealed`]: Join-grant sealing to a sensor identity key
//!
//! ## Cryptographic Design
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Join Phase                             │
//! │  Hub                                          Sensor        │
//! │   │  X25519 ephemeral × Ed25519-to-Montgomery identity      │
//! │   │              │                                          │
//! │   │              ▼                                          │
//! │   │  HKDF-SHA256(shared, salt=header, "shdc-join-v1")       │
//! │   │              │                                          │
//! │   │              ▼                                          │
//! │   │  AES-256-GCM wrap ───────► session + broadcast keys     │
//! └─────────────────────────────────────────────────────────────┘
//!
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   Steady State                              │
//! │                                                             │
//! │  nonce = ts(4) ∥ device_id(4) ∥ nonce3 ∥ 0x00               │
//! │  aad   = 12-byte header                                     │
//! │  AES-256-GCM(session / broadcast key) ──► ciphertext ∥ tag  │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Security Properties
//! - **Authenticity**: Ed25519 signature over header ∥ payload
//! - **Confidentiality/Integrity**: AES-256-GCM
//! - **Header Binding**: nonce and AAD derive from the exact header
//! - **Join Confidentiality**: only the sensor identity secret can
//!   open the join grant
//!
//! ## ⚠️ Important Note for Next Developer
//! - ALL implementations use RustCrypto/dalek (audited)
//! - NEVER roll your own crypto
//! - ALL symmetric keys implement Zeroize
//! - Replay defense at the header level also protects the AEAD nonce
//!   from reuse under the same key
//!
//! ## Last Modified
//! v0.1.0 - Initial crypto implementation

pub mod aead;
pub mod kdf;
pub mod keys;
pub mod sealed;

// Re-export primary types at module level
pub use aead::{open, packet_nonce, seal};
pub use keys::{IdentityKeyPair, IdentityPublicKey, SymmetricKey};
pub use sealed::{open_with_identity, seal_to_identity};

use rand::rngs::OsRng;
use rand::RngCore;

// ============================================
// Constants
// ============================================

/// Size of an Ed25519 public key in bytes.
pub const ED25519_PUBLIC_KEY_SIZE: usize = 32;

/// Size of an Ed25519 signature in bytes.
pub const ED25519_SIGNATURE_SIZE: usize = 64;

/// Size of an AES-256 key in bytes.
pub const AES_KEY_SIZE: usize = 32;

/// Size of an AES-GCM nonce in bytes.
pub const AES_NONCE_SIZE: usize = 12;

/// Size of an AES-GCM authentication tag in bytes.
pub const AES_TAG_SIZE: usize = 16;

// ============================================
// CSRNG
// ============================================

/// Fills a fixed-size array with bytes from the OS CSRNG.
#[must_use]
pub fn random_bytes<const N: usize>() -> [u8; N] {
    let mut bytes = [0u8; N];
    OsRng.fill_bytes(&mut bytes);
    bytes
}
