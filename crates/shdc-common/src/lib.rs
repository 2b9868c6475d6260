// ============================================
// File: crates/shdc-common/src/lib.rs
// ============================================
//! # SHDC Common - Shared Types & Errors
//!
//! ## Creation Reason
//! Provides the foundational type definitions shared by every crate in
//! the SHDC (Smart Home Device Communications) stack: device and key
//! identifiers, protocol timestamps, and the base error enum.
//!
//! ## Main Functionality
//! - [`types`]: `DeviceId`, `BroadcastKeyId` newtypes
//! - [`time`]: `Timestamp` (wire format, u32 UNIX seconds), `AtomicInstant`
//! - [`error`]: `CommonError` base error enum
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                 shdc-engine                         │
//! │                      │                              │
//! │          ┌───────────┴───────────┐                  │
//! │          ▼                       ▼                  │
//! │     shdc-core            shdc-transport             │
//! │          │                       │                  │
//! │          └───────────┬───────────┘                  │
//! │                      ▼                              │
//! │                shdc-common                          │
//! │                You are here                         │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - Wire timestamps are u32 UNIX seconds (big-endian on the wire)
//! - `DeviceId` 0x00000000 is the reserved "unassigned" sentinel
//! - Keep this crate dependency-light; it sits under everything
//!
//! ## Last Modified
//! v0.1.0 - Initial implementation

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod time;
pub mod types;

pub use error::{CommonError, Result};
pub use time::{AtomicInstant, Timestamp};
pub use types::{BroadcastKeyId, DeviceId};
