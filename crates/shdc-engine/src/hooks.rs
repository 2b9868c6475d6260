// ============================================
// File: crates/shdc-engine/src/hooks.rs
// ============================================
//! # Application Callback Hooks
//!
//! ## Creation Reason
//! The engines deliver protocol events to the application through a
//! small handler record populated at construction, instead of dynamic
//! handler registration.
//!
//! ## Main Functionality
//! - `EventHooks`: builder-style container for the five callbacks
//!   (`on_device_joined`, `on_event`, `on_device_left`, `on_command`,
//!   `on_error`)
//!
//! ## ⚠️ Important Note for Next Developer
//! - Handlers run on the engine's receive task; keep them short and
//!   never block. Forward to a channel for heavy work.
//!
//! ## Last Modified
//! v0.1.0 - Initial hook definitions

use shdc_common::types::DeviceId;

use crate::error::EngineError;
use crate::keyring::SensorInfo;

/// Handler for a sensor completing its join (hub side).
pub type JoinedHandler = dyn Fn(&SensorInfo) + Send + Sync;

/// Handler for a decrypted sensor event (hub side).
pub type EventHandler = dyn Fn(DeviceId, u8, &[u8]) + Send + Sync;

/// Handler for a sensor leaving the roster (hub side).
pub type LeftHandler = dyn Fn(DeviceId) + Send + Sync;

/// Handler for a decrypted broadcast command (sensor side).
pub type CommandHandler = dyn Fn(u8, &[u8]) + Send + Sync;

/// Handler for recovered per-packet errors, with a short context tag.
pub type ErrorHandler = dyn Fn(&EngineError, &str) + Send + Sync;

// ============================================
// EventHooks
// ============================================

/// Callback handles delivered to an engine at construction.
///
/// # Example
/// ```
/// use shdc_engine::hooks::EventHooks;
///
/// let hooks = EventHooks::new()
///     .on_event(|device_id, event_type, data| {
///         println!("{device_id}: event {event_type:#04x} ({} bytes)", data.len());
///     })
///     .on_error(|err, context| {
///         eprintln!("dropped packet during {context}: {err}");
///     });
/// ```
#[derive(Default)]
pub struct EventHooks {
    joined: Option<Box<JoinedHandler>>,
    event: Option<Box<EventHandler>>,
    left: Option<Box<LeftHandler>>,
    command: Option<Box<CommandHandler>>,
    error: Option<Box<ErrorHandler>>,
}

impl EventHooks {
    /// Creates an empty hook record; unset callbacks are no-ops.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the sensor-joined callback (hub side).
    #[must_use]
    pub fn on_device_joined(mut self, f: impl Fn(&SensorInfo) + Send + Sync + 'static) -> Self {
        self.joined = Some(Box::new(f));
        self
    }

    /// Sets the event callback (hub side).
    #[must_use]
    pub fn on_event(mut self, f: impl Fn(DeviceId, u8, &[u8]) + Send + Sync + 'static) -> Self {
        self.event = Some(Box::new(f));
        self
    }

    /// Sets the sensor-left callback (hub side).
    #[must_use]
    pub fn on_device_left(mut self, f: impl Fn(DeviceId) + Send + Sync + 'static) -> Self {
        self.left = Some(Box::new(f));
        self
    }

    /// Sets the command callback (sensor side).
    #[must_use]
    pub fn on_command(mut self, f: impl Fn(u8, &[u8]) + Send + Sync + 'static) -> Self {
        self.command = Some(Box::new(f));
        self
    }

    /// Sets the recovered-error callback.
    #[must_use]
    pub fn on_error(mut self, f: impl Fn(&EngineError, &str) + Send + Sync + 'static) -> Self {
        self.error = Some(Box::new(f));
        self
    }

    pub(crate) fn fire_joined(&self, info: &SensorInfo) {
        if let Some(handler) = &self.joined {
            handler(info);
        }
    }

    pub(crate) fn fire_event(&self, device_id: DeviceId, event_type: u8, data: &[u8]) {
        if let Some(handler) = &self.event {
            handler(device_id, event_type, data);
        }
    }

    pub(crate) fn fire_left(&self, device_id: DeviceId) {
        if let Some(handler) = &self.left {
            handler(device_id);
        }
    }

    pub(crate) fn fire_command(&self, command_type: u8, data: &[u8]) {
        if let Some(handler) = &self.command {
            handler(command_type, data);
        }
    }

    pub(crate) fn fire_error(&self, err: &EngineError, context: &str) {
        if let Some(handler) = &self.error {
            handler(err, context);
        }
    }
}

impl std::fmt::Debug for EventHooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventHooks")
            .field("on_device_joined", &self.joined.is_some())
            .field("on_event", &self.event.is_some())
            .field("on_device_left", &self.left.is_some())
            .field("on_command", &self.command.is_some())
            .field("on_error", &self.error.is_some())
            .finish()
    }
}

// ============================================
// Tests
// ============================================
