// ============================================
// File: crates/shdc-transport/src/error.rs
// ============================================
//! # Transport Error Types
//!
//! ## Last Modified
//! v0.1.0 - Initial error definitions

use std::net::SocketAddr;

use thiserror::Error;

use shdc_common::error::CommonError;

/// Result type for transport operations.
pub type Result<T> = std::result::Result<T, TransportError>;

/// Transport error types.
#[derive(Error, Debug)]
pub enum TransportError {
    /// The address string could not be parsed.
    #[error("Invalid address: {addr}")]
    InvalidAddress {
        /// The offending address string.
        addr: String,
    },

    /// The address is already bound by another socket.
    #[error("Address already in use: {addr}")]
    AddressInUse {
        /// The contested address.
        addr: SocketAddr,
    },

    /// Socket binding failed.
    #[error("Failed to bind {addr}: {reason}")]
    BindFailed {
        /// Address we tried to bind.
        addr: SocketAddr,
        /// Why binding failed.
        reason: String,
    },

    /// Sending a datagram failed.
    #[error("Send to {dest} failed: {reason}")]
    SendFailed {
        /// Destination address.
        dest: SocketAddr,
        /// Why sending failed.
        reason: String,
    },

    /// Receiving a datagram failed.
    #[error("Receive failed: {reason}")]
    RecvFailed {
        /// Why receiving failed.
        reason: String,
    },

    /// Joining the discovery multicast group failed.
    #[error("Multicast join failed: {reason}")]
    MulticastJoinFailed {
        /// Why the group join failed.
        reason: String,
    },

    /// The transport has been shut down.
    #[error("Transport is shutting down")]
    ShuttingDown,

    /// An I/O operation failed.
    #[error("I/O error while {context}: {source}")]
    Io {
        /// What operation was being performed.
        context: String,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Error from the common crate.
    #[error(transparent)]
    Common(#[from] CommonError),
}

impl TransportError {
    /// Creates an `Io` error with context.
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Creates a `BindFailed` error.
    pub fn bind_failed(addr: SocketAddr, reason: impl Into<String>) -> Self {
        Self::BindFailed {
            addr,
            reason: reason.into(),
        }
    }

    /// Returns `true` if the transport is unusable and must be
    /// rebuilt rather than retried.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::InvalidAddress { .. }
                | Self::AddressInUse { .. }
                | Self::BindFailed { .. }
                | Self::ShuttingDown
        )
    }
}
