// ============================================
// File: crates/shdc-core/src/lib.rs
// ============================================
//! # SHDC Core - Protocol & Cryptography Library
//!
//! ## Creation Reason
//! Implements the protocol engine leaves of SHDC v1.0 (Smart Home
//! Device Communications): bit-exact packet framing, the cryptographic
//! envelope, and replay defense. This crate is the security backbone of
//! the stack; all correctness and security invariants live here or in
//! the engine built on top of it.
//!
//! ## Main Functionality
//!
//! ### Protocol Module ([`protocol`])
//! - Message type and payload definitions (discovery, join, events,
//!   broadcast commands, key rotation)
//! - Binary codec for the 12-byte header ∥ payload ∥ 64-byte signature
//!   wire format (big-endian, ≤512-byte datagrams)
//!
//! ### Crypto Module ([`crypto`])
//! - Key types (`IdentityKeyPair`, `SymmetricKey`)
//! - Ed25519 signatures over header ∥ payload
//! - AES-256-GCM sealing with header-derived nonces and header AAD
//! - X25519 + HKDF-SHA256 sealed join payloads
//!
//! ### Replay Module ([`replay`])
//! - ±30 s timestamp freshness band
//! - `(DeviceId, Nonce3)` recent-set with lazy sweeping
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                shdc-engine                          │
//! │                     │                               │
//! │         ┌───────────┴──────────┐                    │
//! │         ▼                      ▼                    │
//! │    shdc-core  ◄──       shdc-transport              │
//! │    You are here       │                             │
//! │         │             │                             │
//! │         └──────────┬──────────┘                     │
//! │                    ▼                                │
//! │               shdc-common                           │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! ## Security Guarantees
//! - **Confidentiality**: AES-256-GCM authenticated encryption
//! - **Integrity**: GCM tag on all encrypted payloads
//! - **Authenticity**: Ed25519 signature on every packet
//! - **Replay Protection**: timestamp band + recent-nonce set
//! - **Join Confidentiality**: payload sealed to the sensor identity
//!   key via ephemeral X25519, never in cleartext
//!
//! ## ⚠️ Important Note for Next Developer
//! - ALL cryptographic code uses audited RustCrypto/dalek implementations
//! - NEVER implement custom crypto primitives
//! - ALL symmetric keys implement Zeroize for secure cleanup
//! - Wire format changes MUST keep decode/encode bit-exact
//!
//! ## Last Modified
//! v0.1.0 - Initial implementation

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod crypto;
pub mod error;
pub mod protocol;
pub mod replay;

// Re-export commonly used items
pub use crypto::{IdentityKeyPair, IdentityPublicKey, SymmetricKey};
pub use error::{CoreError, Result};
pub use protocol::{Header, MessageType, Packet};
pub use replay::ReplayGuard;
