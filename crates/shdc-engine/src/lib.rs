// ============================================
// File: crates/shdc-engine/src/lib.rs
// ============================================
//! # SHDC Engine Library
//!
//! ## Creation Reason
//! Implements the role-aware SHDC protocol engines that tie inbound
//! datagrams to the codec, cryptographic envelope, replay guard, and
//! key lifecycle: a hub engine coordinating many sensors, and a sensor
//! engine driving discovery, join, and steady-state reporting.
//!
//! ## Main Functionality
//!
//! ### Modules
//! - [`config`]: engine configuration (timers, limits, addresses)
//! - [`keystore`]: persistent identity/peer storage interface
//! - [`keyring`]: in-memory key material and rotation bookkeeping
//! - [`hub`]: hub engine (join handling, rotations, broadcasts)
//! - [`sensor`]: sensor engine (discovery, join, event reporting)
//! - [`hooks`]: application callback handles
//! - [`stats`]: engine counters
//! - [`error`]: engine error types
//!
//! ## Data Flow
//! ```text
//! Transport ──► Codec decode ──► signer lookup ──► Ed25519 verify
//!     ──► ReplayGuard ──► AEAD open (keyring) ──► role handler
//!     ──► application hooks / response packets back to Transport
//! ```
//!
//! ## State Machines
//! ```text
//! Hub, per sensor:
//!   UNKNOWN ── join verified ──► JOINING ── first event ──► ACTIVE
//!   ACTIVE ── admin reset / idle expiry ──► UNKNOWN
//!
//! Sensor:
//!   IDLE ──► DISCOVERING ──► JOINING ──► ACTIVE
//!   ACTIVE ── repeated crypto failures ──► DISCOVERING
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - Per-packet failures are dropped and logged, never fatal; only a
//!   missing identity key or CSRNG failure aborts startup
//! - The keyring is the only shared mutable structure; keep its
//!   critical sections to single-packet work
//! - Multiple engine instances can coexist in one process; there is
//!   no global state
//!
//! ## Last Modified
//! v0.1.0 - Initial engine implementation

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod hooks;
pub mod hub;
pub mod keyring;
pub mod keystore;
pub mod sensor;
pub mod stats;

mod dispatch;

// Re-export primary types
pub use config::EngineConfig;
pub use error::{EngineError, Result};
pub use hooks::EventHooks;
pub use hub::HubEngine;
pub use keyring::SensorInfo;
pub use keystore::{FileKeyStore, KeyStore, MemoryKeyStore, PeerEntry};
pub use sensor::{DiscoveredHub, SensorEngine, SensorState};
pub use stats::{EngineStats, StatsSnapshot};
