// ============================================
// File: crates/shdc-engine/src/error.rs
// ============================================
//! # Engine Error Types
//!
//! ## Last Modified
//! v0.1.0 - Initial error definitions

use thiserror::Error;

use shdc_common::error::CommonError;
use shdc_common::types::DeviceId;
use shdc_core::error::CoreError;
use shdc_transport::error::TransportError;

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;

/// Engine error types.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Operation not valid in the current state.
    #[error("Wrong state for {operation}: currently {state}")]
    WrongState {
        /// What operation was attempted.
        operation: String,
        /// The state the engine was in.
        state: String,
    },

    /// A packet referenced a device the hub does not manage.
    #[error("Unknown device: {0}")]
    UnknownDevice(DeviceId),

    /// The hub refused a join request.
    #[error("Join refused: {reason}")]
    JoinRefused {
        /// Why the join was refused.
        reason: String,
    },

    /// The identity key pair is missing from the keystore at startup.
    #[error("Identity key missing; provision the keystore before starting")]
    IdentityMissing,

    /// An operation exceeded its deadline.
    #[error("Timed out: {operation} after {duration_ms}ms")]
    Timeout {
        /// What operation timed out.
        operation: String,
        /// How long we waited.
        duration_ms: u64,
    },

    /// Invalid engine configuration.
    #[error("Invalid configuration: {field} - {reason}")]
    ConfigInvalid {
        /// Offending configuration field.
        field: String,
        /// Why the value is invalid.
        reason: String,
    },

    /// The engine is shutting down.
    #[error("Engine is shutting down")]
    ShuttingDown,

    /// Internal error (bug or unexpected condition).
    #[error("Internal error: {message}")]
    Internal {
        /// Description of what went wrong.
        message: String,
    },

    /// Error from the protocol core.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Error from the transport layer.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Error from the common crate.
    #[error(transparent)]
    Common(#[from] CommonError),

    /// I/O error (persistent keystore).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl EngineError {
    /// Creates a `WrongState` error.
    pub fn wrong_state(operation: impl Into<String>, state: impl std::fmt::Display) -> Self {
        Self::WrongState {
            operation: operation.into(),
            state: state.to_string(),
        }
    }

    /// Creates a `JoinRefused` error.
    pub fn join_refused(reason: impl Into<String>) -> Self {
        Self::JoinRefused {
            reason: reason.into(),
        }
    }

    /// Creates a `Timeout` error.
    pub fn timeout(operation: impl Into<String>, duration_ms: u64) -> Self {
        Self::Timeout {
            operation: operation.into(),
            duration_ms,
        }
    }

    /// Creates a `ConfigInvalid` error.
    pub fn config_invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ConfigInvalid {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Creates an `Internal` error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns `true` for per-packet failures that are dropped and
    /// logged rather than propagated.
    #[must_use]
    pub const fn is_packet_error(&self) -> bool {
        matches!(
            self,
            Self::Core(_) | Self::UnknownDevice(_) | Self::WrongState { .. }
        )
    }

    /// Returns `true` for conditions that abort engine startup.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::IdentityMissing | Self::ConfigInvalid { .. })
    }
}
