// ============================================
// File: crates/shdc-engine/src/sensor.rs
// ============================================
//! # Sensor Engine
//!
//! ## Creation Reason
//! Implements the sensor role: hub discovery with backoff, the join
//! handshake, encrypted event reporting, and application of broadcast
//! commands and key rotations.
//!
//! ## State Machine
//! ```text
//! IDLE ── discover() ──► DISCOVERING
//! DISCOVERING ── valid HUB_DISCOVERY_RESP ──► JOINING
//! DISCOVERING ── 5 min without a response ──► IDLE
//! JOINING ── JOIN_RESPONSE opened ──► ACTIVE
//! ACTIVE ── events / commands / rotations ──► ACTIVE
//! ACTIVE ── crypto failures over threshold ──► DISCOVERING
//! ```
//!
//! ## Discovery Retry
//! Requests go out at 5, 10, 20, 30, 30, … second intervals
//! (exponential backoff capped at 30 s) for up to 5 minutes; the
//! first signature-valid response wins.
//!
//! ## ⚠️ Important Note for Next Developer
//! - `discover`/`join` need the receive loop running; call `start`
//!   first
//! - Timeouts leave the state machine in a clean prior state:
//!   discovery falls back to IDLE, join stays in JOINING
//! - Events are always sealed under the current session key; rotated
//!   keys promote lazily at their activation time
//!
//! ## Last Modified
//! v0.1.0 - Initial sensor engine

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Mutex, RwLock};
use tokio::sync::{broadcast, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use zeroize::Zeroize;

use shdc_common::types::DeviceId;
use shdc_core::crypto::{open, open_with_identity, seal, IdentityKeyPair, IdentityPublicKey, SymmetricKey};
use shdc_core::error::CoreError;
use shdc_core::protocol::messages::{
    BroadcastCommand, CommandBody, DiscoveryRequest, DiscoveryResponse, EventBody, EventReport,
    Header, JoinGrant, JoinRequest, JoinResponse, KeyRotation, MessageType, RotationBody,
    RotationScope,
};
use shdc_core::protocol::{Packet, MAX_PACKET_SIZE};
use shdc_core::replay::ReplayGuard;
use shdc_transport::error::TransportError;
use shdc_transport::traits::Transport;
use shdc_transport::UdpTransport;

use crate::config::EngineConfig;
use crate::dispatch::{drop_packet, verify_and_guard};
use crate::error::{EngineError, Result};
use crate::hooks::EventHooks;
use crate::keyring::SensorKeyring;
use crate::keystore::KeyStore;
use crate::stats::{EngineStats, StatsSnapshot};

const RECV_BUF_SIZE: usize = MAX_PACKET_SIZE + 64;

// ============================================
// SensorState
// ============================================

/// Sensor engine states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorState {
    /// Not looking for a hub.
    Idle,
    /// Broadcasting discovery requests.
    Discovering,
    /// Hub selected; join handshake in flight.
    Joining,
    /// Joined; reporting events in steady state.
    Active,
}

impl std::fmt::Display for SensorState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "Idle"),
            Self::Discovering => write!(f, "Discovering"),
            Self::Joining => write!(f, "Joining"),
            Self::Active => write!(f, "Active"),
        }
    }
}

// ============================================
// DiscoveredHub
// ============================================

/// A hub that answered discovery with a valid signature.
#[derive(Debug, Clone)]
pub struct DiscoveredHub {
    /// Hub device id.
    pub hub_id: DeviceId,
    /// Hub identity public key.
    pub public_key: IdentityPublicKey,
    /// Address the response came from.
    pub addr: SocketAddr,
    /// Capability string from the response.
    pub capabilities: String,
}

// ============================================
// SensorEngine
// ============================================

/// The sensor protocol engine.
///
/// # Lifecycle
/// 1. Create with [`SensorEngine::new_sensor`]
/// 2. [`SensorEngine::start`] spawns the receive loop
/// 3. [`SensorEngine::discover`] then [`SensorEngine::join`]
/// 4. [`SensorEngine::send_event`] in steady state
pub struct SensorEngine {
    device_id_hint: Option<DeviceId>,
    device_info: String,
    config: EngineConfig,
    identity: Arc<IdentityKeyPair>,
    keyring: Arc<SensorKeyring>,
    replay: Arc<ReplayGuard>,
    transport: Arc<dyn Transport>,
    hooks: Arc<EventHooks>,
    stats: Arc<EngineStats>,
    state: RwLock<SensorState>,
    pending_hub: Mutex<Option<DiscoveredHub>>,
    discovery_waiter: Mutex<Option<oneshot::Sender<DiscoveredHub>>>,
    join_waiter: Mutex<Option<oneshot::Sender<DeviceId>>>,
    crypto_failures: AtomicU32,
    shutdown: AtomicBool,
    shutdown_tx: broadcast::Sender<()>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl SensorEngine {
    /// Creates a sensor engine.
    ///
    /// # Arguments
    /// * `device_id_hint` - id from a previous join, used as the
    ///   sender id during discovery; new sensors pass `None` and send
    ///   the unassigned sentinel
    /// * `device_info` - textual identifier carried in discovery and
    ///   join requests (max 255 bytes)
    ///
    /// # Errors
    /// - `IdentityMissing` if the keystore holds no identity key
    /// - `ConfigInvalid` for a bad configuration
    pub fn new_sensor(
        device_id_hint: Option<DeviceId>,
        device_info: impl Into<String>,
        keystore: Arc<dyn KeyStore>,
        transport: Arc<dyn Transport>,
        config: EngineConfig,
        hooks: EventHooks,
    ) -> Result<Arc<Self>> {
        config.validate()?;
        let identity = keystore
            .load_identity()?
            .ok_or(EngineError::IdentityMissing)?;

        let keyring = SensorKeyring::new(config.timing.rotation_grace());
        let (shutdown_tx, _) = broadcast::channel(1);

        info!(public_key = %identity.public_key(), "Sensor engine created");

        Ok(Arc::new(Self {
            device_id_hint,
            device_info: device_info.into(),
            config,
            identity: Arc::new(identity),
            keyring: Arc::new(keyring),
            replay: Arc::new(ReplayGuard::new()),
            transport,
            hooks: Arc::new(hooks),
            stats: Arc::new(EngineStats::new()),
            state: RwLock::new(SensorState::Idle),
            pending_hub: Mutex::new(None),
            discovery_waiter: Mutex::new(None),
            join_waiter: Mutex::new(None),
            crypto_failures: AtomicU32::new(0),
            shutdown: AtomicBool::new(false),
            shutdown_tx,
            tasks: Mutex::new(Vec::new()),
        }))
    }

    /// Convenience constructor: binds a UDP transport at the
    /// configured listen address.
    ///
    /// # Errors
    /// Propagates bind failures and [`SensorEngine::new_sensor`]
    /// errors.
    pub async fn bind_udp(
        device_id_hint: Option<DeviceId>,
        device_info: impl Into<String>,
        keystore: Arc<dyn KeyStore>,
        config: EngineConfig,
        hooks: EventHooks,
    ) -> Result<Arc<Self>> {
        let transport = UdpTransport::bind_addr(config.network.listen_addr).await?;
        Self::new_sensor(
            device_id_hint,
            device_info,
            keystore,
            Arc::new(transport),
            config,
            hooks,
        )
    }

    /// Spawns the receive loop and maintenance timer.
    ///
    /// Must be called from within a tokio runtime, before
    /// [`SensorEngine::discover`].
    ///
    /// # Errors
    /// Returns `ShuttingDown` if the engine was already stopped.
    pub fn start(self: &Arc<Self>) -> Result<()> {
        if self.shutdown.load(Ordering::SeqCst) {
            return Err(EngineError::ShuttingDown);
        }

        let mut tasks = self.tasks.lock();
        tasks.push(tokio::spawn(Arc::clone(self).recv_loop()));
        tasks.push(tokio::spawn(Arc::clone(self).maintenance_loop()));
        drop(tasks);

        info!("Sensor engine started");
        Ok(())
    }

    /// Cancels pending waits and stops the engine.
    pub async fn stop(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
        let _ = self.shutdown_tx.send(());

        // Dropping the waiters wakes any pending discover/join call.
        *self.discovery_waiter.lock() = None;
        *self.join_waiter.lock() = None;

        let tasks: Vec<JoinHandle<()>> = {
            let mut guard = self.tasks.lock();
            guard.drain(..).collect()
        };
        for task in tasks {
            if tokio::time::timeout(Duration::from_secs(5), task)
                .await
                .is_err()
            {
                warn!("Sensor task timed out during shutdown");
            }
        }

        let _ = self.transport.shutdown().await;
        info!("Sensor engine stopped");
    }

    /// Returns the current state.
    #[must_use]
    pub fn state(&self) -> SensorState {
        *self.state.read()
    }

    /// Returns the device id assigned by the hub, if joined.
    #[must_use]
    pub fn assigned_id(&self) -> Option<DeviceId> {
        self.keyring.hub().map(|h| h.assigned_id)
    }

    /// Returns a snapshot of the engine counters.
    #[must_use]
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Sender id used before the hub assigns one.
    fn provisional_id(&self) -> DeviceId {
        self.device_id_hint.unwrap_or(DeviceId::UNASSIGNED)
    }

    // ========================================
    // Application API
    // ========================================

    /// Broadcasts discovery requests with backoff until a hub answers
    /// with a valid signature or the deadline passes.
    ///
    /// On success the engine moves to JOINING with the hub recorded
    /// for [`SensorEngine::join`]; on timeout it falls back to IDLE.
    ///
    /// # Errors
    /// - `WrongState` if called while joining or active
    /// - `Timeout` if no hub answered in time
    pub async fn discover(self: &Arc<Self>, timeout: Duration) -> Result<DiscoveredHub> {
        {
            let mut state = self.state.write();
            match *state {
                SensorState::Joining | SensorState::Active => {
                    return Err(EngineError::wrong_state("discover", *state));
                }
                _ => *state = SensorState::Discovering,
            }
        }

        let deadline = Instant::now()
            + timeout.min(Duration::from_secs(self.config.timing.discovery_deadline_secs));
        let (tx, mut rx) = oneshot::channel();
        *self.discovery_waiter.lock() = Some(tx);

        let request =
            DiscoveryRequest::new(self.identity.public_key_bytes(), self.device_info.clone())?;
        let payload = request.encode();
        let dest = self.config.network.discovery_addr;

        let mut attempt = 0usize;
        loop {
            let header = Header::fresh(MessageType::HubDiscoveryReq, self.provisional_id());
            let packet = Packet::build(header, payload.clone(), &self.identity)?;
            match self.transport.send(&packet.encode(), &dest).await {
                Ok(_) => self.stats.record_tx(),
                Err(e) => warn!(%e, %dest, "Discovery send failed"),
            }
            debug!(attempt, %dest, "Discovery request sent");

            let wait = self
                .config
                .timing
                .discovery_backoff(attempt)
                .min(deadline.saturating_duration_since(Instant::now()));
            if wait.is_zero() {
                break;
            }

            match tokio::time::timeout(wait, &mut rx).await {
                Ok(Ok(hub)) => {
                    *self.pending_hub.lock() = Some(hub.clone());
                    *self.state.write() = SensorState::Joining;
                    info!(hub_id = %hub.hub_id, addr = %hub.addr, "Hub discovered");
                    return Ok(hub);
                }
                Ok(Err(_)) => return Err(EngineError::ShuttingDown),
                Err(_) => attempt += 1,
            }

            if Instant::now() >= deadline {
                break;
            }
        }

        *self.discovery_waiter.lock() = None;
        *self.state.write() = SensorState::Idle;
        Err(EngineError::timeout("discover", timeout.as_millis() as u64))
    }

    /// Sends join requests to the discovered hub until the sealed
    /// grant arrives or the deadline passes.
    ///
    /// # Errors
    /// - `WrongState` unless a hub was just discovered
    /// - `Timeout` if no grant arrived; the engine stays in JOINING
    pub async fn join(self: &Arc<Self>, hub_addr: SocketAddr, timeout: Duration) -> Result<DeviceId> {
        {
            let state = self.state.read();
            if *state != SensorState::Joining {
                return Err(EngineError::wrong_state("join", *state));
            }
        }
        if self.pending_hub.lock().is_none() {
            return Err(EngineError::wrong_state("join", "no hub discovered"));
        }

        let deadline = Instant::now() + timeout;
        let (tx, mut rx) = oneshot::channel();
        *self.join_waiter.lock() = Some(tx);

        let request = JoinRequest::new(self.identity.public_key_bytes(), self.device_info.clone())?;
        let payload = request.encode();
        let retry = Duration::from_secs(self.config.timing.join_retry_secs);

        loop {
            let header = Header::fresh(MessageType::JoinRequest, self.provisional_id());
            let packet = Packet::build(header, payload.clone(), &self.identity)?;
            match self.transport.send(&packet.encode(), &hub_addr).await {
                Ok(_) => self.stats.record_tx(),
                Err(e) => warn!(%e, %hub_addr, "Join send failed"),
            }

            let wait = retry.min(deadline.saturating_duration_since(Instant::now()));
            if wait.is_zero() {
                break;
            }

            match tokio::time::timeout(wait, &mut rx).await {
                Ok(Ok(assigned_id)) => return Ok(assigned_id),
                Ok(Err(_)) => return Err(EngineError::ShuttingDown),
                Err(_) => {}
            }

            if Instant::now() >= deadline {
                break;
            }
        }

        // Clean prior state: the hub remains selected for another try.
        *self.join_waiter.lock() = None;
        Err(EngineError::timeout("join", timeout.as_millis() as u64))
    }

    /// Seals an event under the current session key and sends it to
    /// the hub.
    ///
    /// # Errors
    /// - `WrongState` unless joined and active
    /// - Transport errors if the send fails
    pub async fn send_event(&self, event_type: u8, data: &[u8]) -> Result<()> {
        {
            let state = self.state.read();
            if *state != SensorState::Active {
                return Err(EngineError::wrong_state("send_event", *state));
            }
        }

        let hub = self
            .keyring
            .hub()
            .ok_or_else(|| EngineError::wrong_state("send_event", "not joined"))?;
        let key = self
            .keyring
            .session_key()
            .ok_or_else(|| EngineError::wrong_state("send_event", "not joined"))?;

        let body = EventBody::new(event_type, data.to_vec())?;
        let header = Header::fresh(MessageType::EventReport, hub.assigned_id);
        let ciphertext = seal(&key, &header, &body.encode())?;
        let packet = Packet::build(header, EventReport { ciphertext }.encode(), &self.identity)?;

        self.transport.send(&packet.encode(), &hub.hub_addr).await?;
        self.stats.record_tx();
        debug!(event_type, "Event sent");
        Ok(())
    }

    // ========================================
    // Background Tasks
    // ========================================

    async fn recv_loop(self: Arc<Self>) {
        let mut shutdown_rx = self.shutdown_tx.subscribe();
        let mut buf = [0u8; RECV_BUF_SIZE];

        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => break,
                result = self.transport.recv(&mut buf) => match result {
                    Ok((len, source)) => {
                        self.stats.record_rx();
                        self.handle_datagram(&buf[..len], source.addr);
                    }
                    Err(TransportError::ShuttingDown) => break,
                    Err(e) => {
                        debug!(%e, "Sensor receive error");
                        self.hooks.fire_error(&e.into(), "recv");
                    }
                }
            }
        }

        debug!("Sensor receive loop stopped");
    }

    async fn maintenance_loop(self: Arc<Self>) {
        let period = Duration::from_secs(self.config.timing.replay_sweep_secs.max(1));
        let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => break,
                _ = ticker.tick() => self.replay.sweep(),
            }
        }
    }

    // ========================================
    // Packet Handling
    // ========================================

    fn handle_datagram(&self, data: &[u8], src: SocketAddr) {
        let packet = match Packet::decode(data) {
            Ok(packet) => packet,
            Err(e) => {
                drop_packet(e.into(), "decode", &self.stats, &self.hooks);
                return;
            }
        };

        let (result, context) = match packet.header.msg_type {
            MessageType::HubDiscoveryResp => (
                self.handle_discovery_resp(&packet, src),
                "discovery response",
            ),
            MessageType::JoinResponse => (self.handle_join_response(&packet, src), "join response"),
            MessageType::BroadcastCommand => (self.handle_broadcast(&packet), "broadcast command"),
            MessageType::KeyRotation => (self.handle_rotation(&packet), "key rotation"),
            other => (
                Err(EngineError::wrong_state(
                    format!("sensor handling 0x{:02x}", other.as_byte()),
                    self.state(),
                )),
                "dispatch",
            ),
        };

        if let Err(err) = result {
            if matches!(
                err,
                EngineError::Core(CoreError::BadSignature | CoreError::AeadFailure)
            ) {
                self.note_crypto_failure();
            }
            drop_packet(err, context, &self.stats, &self.hooks);
        }
    }

    fn handle_discovery_resp(&self, packet: &Packet, src: SocketAddr) -> Result<()> {
        if self.state() != SensorState::Discovering {
            return Err(EngineError::wrong_state("discovery response", self.state()));
        }

        let response = DiscoveryResponse::decode(&packet.payload)?;
        let signer = IdentityPublicKey::from_bytes(&response.hub_public_key)?;
        verify_and_guard(packet, &signer, &self.replay)?;

        let hub = DiscoveredHub {
            hub_id: response.hub_id,
            public_key: signer,
            addr: src,
            capabilities: response.capabilities,
        };

        // First signature-valid response wins; later ones are dropped
        // once the waiter is gone.
        if let Some(tx) = self.discovery_waiter.lock().take() {
            let _ = tx.send(hub);
        }
        Ok(())
    }

    fn handle_join_response(&self, packet: &Packet, src: SocketAddr) -> Result<()> {
        if self.state() != SensorState::Joining {
            return Err(EngineError::wrong_state("join response", self.state()));
        }
        let hub = self
            .pending_hub
            .lock()
            .clone()
            .ok_or_else(|| EngineError::wrong_state("join response", "no hub discovered"))?;

        verify_and_guard(packet, &hub.public_key, &self.replay)?;

        let response = JoinResponse::decode(&packet.payload)?;
        let mut plaintext = open_with_identity(
            &self.identity,
            &packet.header,
            &response.ephemeral_public,
            &response.sealed,
        )?;
        let grant = JoinGrant::decode(&plaintext);
        plaintext.zeroize();
        let grant = grant?;

        self.keyring.install(hub.hub_id, hub.public_key, src, &grant);
        *self.state.write() = SensorState::Active;
        self.crypto_failures.store(0, Ordering::SeqCst);

        info!(
            assigned_id = %grant.assigned_id,
            hub_id = %hub.hub_id,
            "Joined hub"
        );

        if let Some(tx) = self.join_waiter.lock().take() {
            let _ = tx.send(grant.assigned_id);
        }
        Ok(())
    }

    fn handle_broadcast(&self, packet: &Packet) -> Result<()> {
        if self.state() != SensorState::Active {
            return Err(EngineError::wrong_state("broadcast command", self.state()));
        }
        let hub = self
            .keyring
            .hub()
            .ok_or_else(|| EngineError::wrong_state("broadcast command", "not joined"))?;

        verify_and_guard(packet, &hub.hub_public_key, &self.replay)?;

        let command = BroadcastCommand::decode(&packet.payload)?;
        let key = self.keyring.broadcast_key_for(command.key_id)?;
        let plaintext = open(&key, &packet.header, &command.ciphertext)?;
        let body = CommandBody::decode(&plaintext)?;

        self.crypto_failures.store(0, Ordering::SeqCst);
        self.stats.record_command();
        self.hooks.fire_command(body.command_type, &body.data);
        Ok(())
    }

    fn handle_rotation(&self, packet: &Packet) -> Result<()> {
        if self.state() != SensorState::Active {
            return Err(EngineError::wrong_state("key rotation", self.state()));
        }
        let hub = self
            .keyring
            .hub()
            .ok_or_else(|| EngineError::wrong_state("key rotation", "not joined"))?;

        verify_and_guard(packet, &hub.hub_public_key, &self.replay)?;

        let rotation = KeyRotation::decode(&packet.payload)?;
        let key = self
            .keyring
            .session_key()
            .ok_or_else(|| CoreError::key_unavailable("session key"))
            .map_err(EngineError::from)?;

        let mut plaintext = open(&key, &packet.header, &rotation.ciphertext)?;
        let body = RotationBody::decode(&plaintext);
        plaintext.zeroize();
        let body = body?;

        match body.scope {
            RotationScope::Session => {
                self.keyring
                    .apply_session_rotation(SymmetricKey::from_bytes(body.new_key), body.valid_from);
            }
            RotationScope::Broadcast => {
                let Some(new_id) = body.new_key_id else {
                    return Err(CoreError::malformed("broadcast rotation missing key id").into());
                };
                self.keyring.apply_broadcast_rotation(
                    new_id,
                    SymmetricKey::from_bytes(body.new_key),
                    body.valid_from,
                );
            }
        }

        self.crypto_failures.store(0, Ordering::SeqCst);
        debug!(scope = ?body.scope, valid_from = %body.valid_from, "Key rotation applied");
        Ok(())
    }

    /// Counts consecutive signature/AEAD failures in steady state;
    /// over the threshold the sensor re-enters discovery.
    fn note_crypto_failure(&self) {
        if self.state() != SensorState::Active {
            return;
        }
        let failures = self.crypto_failures.fetch_add(1, Ordering::SeqCst) + 1;
        if failures >= self.config.limits.crypto_failure_threshold {
            warn!(failures, "Crypto failure threshold exceeded; re-entering discovery");
            self.crypto_failures.store(0, Ordering::SeqCst);
            *self.state.write() = SensorState::Discovering;
        }
    }
}

impl std::fmt::Debug for SensorEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SensorEngine")
            .field("state", &self.state())
            .field("assigned_id", &self.assigned_id())
            .field("shutdown", &self.shutdown.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keystore::MemoryKeyStore;
    use shdc_transport::error::Result as TransportResult;
    use shdc_transport::traits::PacketSource;

    #[derive(Debug, Default)]
    struct NullTransport;

    #[async_trait::async_trait]
    impl Transport for NullTransport {
        async fn recv(&self, _buf: &mut [u8]) -> TransportResult<(usize, PacketSource)> {
            std::future::pending().await
        }

        async fn send(&self, buf: &[u8], _dest: &SocketAddr) -> TransportResult<usize> {
            Ok(buf.len())
        }

        fn local_addr(&self) -> TransportResult<SocketAddr> {
            Ok("127.0.0.1:0".parse().unwrap())
        }

        async fn shutdown(&self) -> TransportResult<()> {
            Ok(())
        }

        fn is_active(&self) -> bool {
            true
        }
    }

    fn sensor() -> Arc<SensorEngine> {
        let keystore = Arc::new(MemoryKeyStore::with_identity(IdentityKeyPair::generate()));
        SensorEngine::new_sensor(
            None,
            "test sensor",
            keystore,
            Arc::new(NullTransport),
            EngineConfig::default(),
            EventHooks::new(),
        )
        .unwrap()
    }

    #[test]
    fn test_missing_identity_is_fatal() {
        let result = SensorEngine::new_sensor(
            None,
            "test sensor",
            Arc::new(MemoryKeyStore::new()),
            Arc::new(NullTransport),
            EngineConfig::default(),
            EventHooks::new(),
        );
        assert!(matches!(result, Err(EngineError::IdentityMissing)));
    }

    #[test]
    fn test_initial_state() {
        let sensor = sensor();
        assert_eq!(sensor.state(), SensorState::Idle);
        assert!(sensor.assigned_id().is_none());
    }

    #[tokio::test]
    async fn test_send_event_requires_active() {
        let sensor = sensor();
        let result = sensor.send_event(0x01, b"").await;
        assert!(matches!(result, Err(EngineError::WrongState { .. })));
    }

    #[tokio::test]
    async fn test_join_requires_discovery() {
        let sensor = sensor();
        let addr: SocketAddr = "127.0.0.1:56700".parse().unwrap();
        let result = sensor.join(addr, Duration::from_millis(10)).await;
        assert!(matches!(result, Err(EngineError::WrongState { .. })));
    }

    #[tokio::test]
    async fn test_discover_times_out_to_idle() {
        let sensor = sensor();
        sensor.start().unwrap();

        let result = sensor.discover(Duration::from_millis(50)).await;
        assert!(matches!(result, Err(EngineError::Timeout { .. })));
        assert_eq!(sensor.state(), SensorState::Idle);

        sensor.stop().await;
    }
}
