// ============================================
// File: crates/shdc-transport/src/traits.rs
// ============================================
//! # Transport Traits
//!
//! ## Creation Reason
//! Defines the abstract datagram interface the protocol engines
//! consume, decoupling them from socket specifics and enabling mock
//! transports in tests.
//!
//! ## Main Functionality
//! - `Transport`: UDP-like datagram transport interface
//! - `PacketSource`: metadata about received packets
//!
//! ## ⚠️ Important Note for Next Developer
//! - Buffer management is the caller's responsibility; a 512-byte
//!   buffer always suffices for one SHDC packet
//!
//! ## Last Modified
//! v0.1.0 - Initial trait definitions

use std::net::SocketAddr;
use std::time::Instant;

use async_trait::async_trait;

use crate::error::Result;

// ============================================
// PacketSource
// ============================================

/// Metadata about the source of a received datagram.
///
/// Used for routing responses and for hub-side sensor endpoint
/// bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PacketSource {
    /// Source address (IP and port).
    pub addr: SocketAddr,
    /// When the datagram was received.
    pub timestamp: Instant,
}

impl PacketSource {
    /// Creates a new `PacketSource` stamped now.
    #[must_use]
    pub fn new(addr: SocketAddr) -> Self {
        Self {
            addr,
            timestamp: Instant::now(),
        }
    }

    /// Returns the age of this packet (time since received).
    #[must_use]
    pub fn age(&self) -> std::time::Duration {
        self.timestamp.elapsed()
    }
}

// ============================================
// Transport Trait
// ============================================

/// Abstract interface for datagram-based transport.
///
/// # Thread Safety
/// Implementations must be `Send + Sync` to allow sharing across
/// async tasks.
///
/// # Example
/// ```ignore
/// async fn pump<T: Transport>(transport: &T) -> Result<()> {
///     let mut buf = [0u8; 512];
///     loop {
///         let (len, source) = transport.recv(&mut buf).await?;
///         let reply = handle(&buf[..len]);
///         transport.send(&reply, &source.addr).await?;
///     }
/// }
/// ```
#[async_trait]
pub trait Transport: Send + Sync {
    /// Receives a datagram.
    ///
    /// # Returns
    /// Tuple of (bytes received, packet source).
    ///
    /// # Errors
    /// Returns `RecvFailed` on socket errors, `ShuttingDown` after
    /// shutdown.
    async fn recv(&self, buf: &mut [u8]) -> Result<(usize, PacketSource)>;

    /// Sends a datagram to `dest`.
    ///
    /// # Returns
    /// Number of bytes sent.
    ///
    /// # Errors
    /// Returns `SendFailed` on socket errors, `ShuttingDown` after
    /// shutdown.
    async fn send(&self, buf: &[u8], dest: &SocketAddr) -> Result<usize>;

    /// Returns the local address this transport is bound to.
    ///
    /// # Errors
    /// Returns an error if the address cannot be determined.
    fn local_addr(&self) -> Result<SocketAddr>;

    /// Gracefully shuts down the transport.
    ///
    /// After shutdown, all operations return `ShuttingDown`.
    ///
    /// # Errors
    /// Returns an error if shutdown fails.
    async fn shutdown(&self) -> Result<()>;

    /// Returns `true` if the transport is still active.
    fn is_active(&self) -> bool;
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_packet_source() {
        let addr: SocketAddr = "127.0.0.1:56700".parse().unwrap();
        let source = PacketSource::new(addr);

        assert_eq!(source.addr, addr);
        assert!(source.age() < std::time::Duration::from_secs(1));
    }
}
