// ============================================
// File: crates/shdc-transport/src/lib.rs
// ============================================
//! # SHDC Transport Library
//!
//! ## Creation Reason
//! Provides the datagram transport layer consumed by the SHDC engines:
//! an abstract `Transport` trait plus the production UDP implementation
//! with broadcast permission and multicast group membership.
//!
//! ## Main Functionality
//! - [`traits`]: `Transport` trait and `PacketSource` metadata
//! - [`udp`]: `UdpTransport` (tokio UDP socket, socket2 options)
//! - [`error`]: transport error types
//!
//! ## Design Philosophy
//! - Traits enable mock transports for protocol tests
//! - Async-first with `async_trait`
//! - One datagram = one SHDC packet (≤512 bytes); no framing
//!
//! ## ⚠️ Important Note for Next Developer
//! - UDP is connectionless - no guaranteed delivery; retries belong
//!   to the protocol engines, not this layer
//! - Implementations must be Send + Sync for use in async contexts
//!
//! ## Last Modified
//! v0.1.0 - Initial transport implementation

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod traits;
pub mod udp;

pub use error::{Result, TransportError};
pub use traits::{PacketSource, Transport};
pub use udp::UdpTransport;
