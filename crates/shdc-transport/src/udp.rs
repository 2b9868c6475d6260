// ============================================
// File: crates/shdc-transport/src/udp.rs
// ============================================
//! # UDP Transport Implementation
//!
//! ## Creation Reason
//! Provides the UDP socket transport for SHDC datagrams, wrapping
//! Tokio's UDP socket with our `Transport` trait.
//!
//! ## Main Functionality
//! - `UdpTransport`: socket binding with address reuse
//! - Broadcast permission (SO_BROADCAST) for hub discovery
//! - IPv4 multicast group join for 239.255.0.1
//! - Graceful shutdown support
//!
//! ## Design Choices
//! - Uses SO_REUSEADDR for quick rebinding after restart
//! - Non-blocking operations with Tokio
//! - Atomic shutdown flag for coordinated cleanup
//!
//! ## ⚠️ Important Note for Next Developer
//! - One datagram carries exactly one ≤512-byte SHDC packet
//! - Consider firewall rules when binding to non-loopback addresses
//!
//! ## Last Modified
//! v0.1.0 - Initial UDP transport implementation

use std::net::{Ipv4Addr, SocketAddr};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use socket2::{Domain, Protocol, Socket, Type};
use tokio::net::UdpSocket;
use tracing::{debug, info, trace};

use crate::error::{Result, TransportError};
use crate::traits::{PacketSource, Transport};

// ============================================
// UdpTransport
// ============================================

/// UDP-based transport implementation.
///
/// # Example
/// ```ignore
/// use shdc_transport::UdpTransport;
///
/// let transport = UdpTransport::bind("0.0.0.0:56700").await?;
/// transport.join_multicast(std::net::Ipv4Addr::new(239, 255, 0, 1))?;
///
/// let mut buf = [0u8; 512];
/// let (len, source) = transport.recv(&mut buf).await?;
/// transport.send(&buf[..len], &source.addr).await?;
/// ```
pub struct UdpTransport {
    /// Underlying UDP socket.
    socket: Arc<UdpSocket>,
    /// Local address we're bound to.
    local_addr: SocketAddr,
    /// Shutdown flag.
    shutdown: AtomicBool,
}

impl UdpTransport {
    /// Creates a new UDP transport bound to the specified address.
    ///
    /// # Socket Options
    /// - `SO_REUSEADDR`: enabled for quick rebinding
    /// - `SO_BROADCAST`: enabled so sensors may fall back to the IPv4
    ///   broadcast discovery destination
    ///
    /// # Errors
    /// - `InvalidAddress` if the string does not parse
    /// - `AddressInUse` / `BindFailed` if binding fails
    pub async fn bind(addr: impl AsRef<str>) -> Result<Self> {
        let addr_str = addr.as_ref();
        let socket_addr: SocketAddr =
            addr_str
                .parse()
                .map_err(|_| TransportError::InvalidAddress {
                    addr: addr_str.to_string(),
                })?;

        Self::bind_addr(socket_addr).await
    }

    /// Creates a new UDP transport bound to the specified socket address.
    ///
    /// # Errors
    /// Returns an error if socket creation, configuration, or binding
    /// fails.
    pub async fn bind_addr(addr: SocketAddr) -> Result<Self> {
        let domain = if addr.is_ipv4() {
            Domain::IPV4
        } else {
            Domain::IPV6
        };

        let socket = Socket::new(domain, Type::DGRAM, Some(Protocol::UDP))
            .map_err(|e| TransportError::io("creating UDP socket", e))?;

        socket
            .set_reuse_address(true)
            .map_err(|e| TransportError::io("setting SO_REUSEADDR", e))?;

        socket
            .set_broadcast(true)
            .map_err(|e| TransportError::io("setting SO_BROADCAST", e))?;

        socket
            .set_nonblocking(true)
            .map_err(|e| TransportError::io("setting non-blocking", e))?;

        socket.bind(&addr.into()).map_err(|e| {
            if e.kind() == std::io::ErrorKind::AddrInUse {
                TransportError::AddressInUse { addr }
            } else {
                TransportError::bind_failed(addr, e.to_string())
            }
        })?;

        let std_socket: std::net::UdpSocket = socket.into();
        let tokio_socket = UdpSocket::from_std(std_socket)
            .map_err(|e| TransportError::io("converting to Tokio socket", e))?;

        let local_addr = tokio_socket
            .local_addr()
            .map_err(|e| TransportError::io("getting local address", e))?;

        info!(%local_addr, "UDP transport bound");

        Ok(Self {
            socket: Arc::new(tokio_socket),
            local_addr,
            shutdown: AtomicBool::new(false),
        })
    }

    /// Joins an IPv4 multicast group on all interfaces, enabling
    /// reception of multicast discovery requests.
    ///
    /// # Errors
    /// Returns `MulticastJoinFailed` if the group join fails.
    pub fn join_multicast(&self, group: Ipv4Addr) -> Result<()> {
        self.socket
            .join_multicast_v4(group, Ipv4Addr::UNSPECIFIED)
            .map_err(|e| TransportError::MulticastJoinFailed {
                reason: e.to_string(),
            })?;

        debug!(%group, "Joined multicast group");
        Ok(())
    }

    /// Checks if the transport has been shut down.
    #[must_use]
    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Acquire)
    }
}

#[async_trait]
impl Transport for UdpTransport {
    async fn recv(&self, buf: &mut [u8]) -> Result<(usize, PacketSource)> {
        if self.is_shutdown() {
            return Err(TransportError::ShuttingDown);
        }

        let (len, addr) =
            self.socket
                .recv_from(buf)
                .await
                .map_err(|e| TransportError::RecvFailed {
                    reason: e.to_string(),
                })?;

        trace!(len, %addr, "Received datagram");

        Ok((len, PacketSource::new(addr)))
    }

    async fn send(&self, buf: &[u8], dest: &SocketAddr) -> Result<usize> {
        if self.is_shutdown() {
            return Err(TransportError::ShuttingDown);
        }

        let len =
            self.socket
                .send_to(buf, dest)
                .await
                .map_err(|e| TransportError::SendFailed {
                    dest: *dest,
                    reason: e.to_string(),
                })?;

        trace!(len, %dest, "Sent datagram");

        Ok(len)
    }

    fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.local_addr)
    }

    async fn shutdown(&self) -> Result<()> {
        debug!("Shutting down UDP transport");
        self.shutdown.store(true, Ordering::Release);
        Ok(())
    }

    fn is_active(&self) -> bool {
        !self.is_shutdown()
    }
}

impl std::fmt::Debug for UdpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UdpTransport")
            .field("local_addr", &self.local_addr)
            .field("shutdown", &self.is_shutdown())
            .finish()
    }
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_bind_and_local_addr() {
        let transport = UdpTransport::bind("127.0.0.1:0").await.unwrap();
        let addr = transport.local_addr().unwrap();

        assert_eq!(addr.ip(), std::net::Ipv4Addr::LOCALHOST);
        assert!(addr.port() > 0);
    }

    #[tokio::test]
    async fn test_send_recv_loopback() {
        let hub = UdpTransport::bind("127.0.0.1:0").await.unwrap();
        let sensor = UdpTransport::bind("127.0.0.1:0").await.unwrap();

        let hub_addr = hub.local_addr().unwrap();
        let sensor_addr = sensor.local_addr().unwrap();

        let message = b"shdc test datagram";
        sensor.send(message, &hub_addr).await.unwrap();

        let mut buf = [0u8; 512];
        let (len, source) = hub.recv(&mut buf).await.unwrap();

        assert_eq!(len, message.len());
        assert_eq!(&buf[..len], message);
        assert_eq!(source.addr, sensor_addr);
    }

    #[tokio::test]
    async fn test_shutdown() {
        let transport = UdpTransport::bind("127.0.0.1:0").await.unwrap();

        assert!(transport.is_active());
        transport.shutdown().await.unwrap();
        assert!(!transport.is_active());

        let mut buf = [0u8; 512];
        let result = transport.recv(&mut buf).await;
        assert!(matches!(result, Err(TransportError::ShuttingDown)));

        let dest: SocketAddr = "127.0.0.1:56700".parse().unwrap();
        let result = transport.send(b"late", &dest).await;
        assert!(matches!(result, Err(TransportError::ShuttingDown)));
    }

    #[tokio::test]
    async fn test_invalid_address() {
        let result = UdpTransport::bind("not-an-address").await;
        assert!(matches!(result, Err(TransportError::InvalidAddress { .. })));
    }

    #[tokio::test]
    async fn test_multicast_join() {
        let transport = UdpTransport::bind("0.0.0.0:0").await.unwrap();
        // Group join on the wildcard interface; allowed to fail on
        // hosts without multicast routes, but the call must not panic.
        let _ = transport.join_multicast(Ipv4Addr::new(239, 255, 0, 1));
    }
}
