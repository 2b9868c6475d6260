// ============================================
// File: crates/shdc-engine/src/hub.rs
// ============================================
//! # Hub Engine
//!
//! ## Creation Reason
//! Implements the hub role: answering discovery, granting joins,
//! receiving encrypted events, broadcasting commands, and driving the
//! key rotation schedules.
//!
//! ## Per-Sensor State Machine
//! ```text
//! UNKNOWN ── JOIN_REQUEST verified ──► JOINING
//! JOINING ── first EVENT_REPORT under the issued key ──► ACTIVE
//! ACTIVE  ── session rotation ──► ACTIVE (new key)
//! ACTIVE  ── admin reset / idle expiry ──► UNKNOWN
//! ```
//!
//! ## Background Tasks
//! - Receive loop: one datagram at a time through the shared dispatch
//!   pipeline (per-sensor arrival order is preserved)
//! - Broadcast rotation: every 15 min by default; hub construction
//!   counts as the reboot rotation
//! - Maintenance: replay sweeps, 24 h session rotations, idle expiry
//!
//! ## ⚠️ Important Note for Next Developer
//! - The hub never crashes on bad input from the network; every
//!   per-packet failure is drop-and-log
//! - Session rotations MUST be sealed under the old key before the
//!   new one is installed
//! - Hubs do not retry broadcasts; retries belong to senders
//!
//! ## Last Modified
//! v0.1.0 - Initial hub engine

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use zeroize::Zeroize;

use shdc_common::time::Timestamp;
use shdc_common::types::DeviceId;
use shdc_core::crypto::{open, seal, seal_to_identity, IdentityKeyPair, IdentityPublicKey, SymmetricKey};
use shdc_core::error::CoreError;
use shdc_core::protocol::messages::{
    BroadcastCommand, CommandBody, DiscoveryRequest, DiscoveryResponse, EventBody, EventReport,
    Header, JoinGrant, JoinRequest, JoinResponse, KeyRotation, MessageType, RotationBody,
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
use crate::keyring::{HubKeyring, PeerState, SensorInfo, SensorRecord};
use crate::keystore::{peer_entry, KeyStore};
use crate::stats::{EngineStats, StatsSnapshot};

/// Capability string carried in discovery responses.
const HUB_CAPABILITIES: &str = "shdc/1.0";

/// Receive buffer; oversized datagrams must fit so the decoder can
/// reject them explicitly.
const RECV_BUF_SIZE: usize = MAX_PACKET_SIZE + 64;

// ============================================
// HubEngine
// ============================================

/// The hub protocol engine.
///
/// # Lifecycle
/// 1. Create with [`HubEngine::new_hub`]
/// 2. [`HubEngine::start`] spawns the receive and timer tasks
/// 3. [`HubEngine::stop`] cancels timers and drains the engine
pub struct HubEngine {
    hub_id: DeviceId,
    config: EngineConfig,
    identity: Arc<IdentityKeyPair>,
    keystore: Arc<dyn KeyStore>,
    keyring: Arc<HubKeyring>,
    replay: Arc<ReplayGuard>,
    transport: Arc<dyn Transport>,
    hooks: Arc<EventHooks>,
    stats: Arc<EngineStats>,
    shutdown: AtomicBool,
    shutdown_tx: broadcast::Sender<()>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl HubEngine {
    /// Creates a hub engine.
    ///
    /// # Errors
    /// - `IdentityMissing` if the keystore holds no identity key
    /// - `ConfigInvalid` for a bad configuration or the reserved hub id
    pub fn new_hub(
        hub_id: DeviceId,
        keystore: Arc<dyn KeyStore>,
        transport: Arc<dyn Transport>,
        config: EngineConfig,
        hooks: EventHooks,
    ) -> Result<Arc<Self>> {
        config.validate()?;
        if hub_id.is_unassigned() {
            return Err(EngineError::config_invalid(
                "hub_id",
                "0x00000000 is the reserved unassigned sentinel",
            ));
        }

        let identity = keystore
            .load_identity()?
            .ok_or(EngineError::IdentityMissing)?;

        let keyring = HubKeyring::new(config.limits.first_device_id, config.limits.max_sensors);
        let (shutdown_tx, _) = broadcast::channel(1);

        info!(
            hub_id = %hub_id,
            public_key = %identity.public_key(),
            "Hub engine created"
        );

        Ok(Arc::new(Self {
            hub_id,
            config,
            identity: Arc::new(identity),
            keystore,
            keyring: Arc::new(keyring),
            replay: Arc::new(ReplayGuard::new()),
            transport,
            hooks: Arc::new(hooks),
            stats: Arc::new(EngineStats::new()),
            shutdown: AtomicBool::new(false),
            shutdown_tx,
            tasks: Mutex::new(Vec::new()),
        }))
    }

    /// Convenience constructor: binds a UDP transport at the
    /// configured listen address and joins the discovery multicast
    /// group when enabled.
    ///
    /// # Errors
    /// Propagates bind failures and [`HubEngine::new_hub`] errors;
    /// a failed multicast join degrades to unicast/broadcast
    /// discovery with a warning.
    pub async fn bind_udp(
        hub_id: DeviceId,
        keystore: Arc<dyn KeyStore>,
        config: EngineConfig,
        hooks: EventHooks,
    ) -> Result<Arc<Self>> {
        let transport = UdpTransport::bind_addr(config.network.listen_addr).await?;

        if config.network.join_multicast {
            if let std::net::IpAddr::V4(group) = config.network.discovery_addr.ip() {
                if group.is_multicast() {
                    if let Err(e) = transport.join_multicast(group) {
                        warn!(%e, "Multicast join failed; discovery limited to unicast");
                    }
                }
            }
        }

        Self::new_hub(hub_id, keystore, Arc::new(transport), config, hooks)
    }

    /// Spawns the receive loop and rotation timers.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    /// Returns `ShuttingDown` if the engine was already stopped.
    pub fn start(self: &Arc<Self>) -> Result<()> {
        if self.shutdown.load(Ordering::SeqCst) {
            return Err(EngineError::ShuttingDown);
        }

        let mut tasks = self.tasks.lock();
        tasks.push(tokio::spawn(Arc::clone(self).recv_loop()));
        tasks.push(tokio::spawn(Arc::clone(self).broadcast_rotation_loop()));
        tasks.push(tokio::spawn(Arc::clone(self).maintenance_loop()));
        drop(tasks);

        info!(hub_id = %self.hub_id, "Hub engine started");
        Ok(())
    }

    /// Cancels timers, drains the inbound queue, and stops the engine.
    pub async fn stop(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
        let _ = self.shutdown_tx.send(());

        let tasks: Vec<JoinHandle<()>> = {
            let mut guard = self.tasks.lock();
            guard.drain(..).collect()
        };
        for task in tasks {
            if tokio::time::timeout(Duration::from_secs(5), task)
                .await
                .is_err()
            {
                warn!("Hub task timed out during shutdown");
            }
        }

        let _ = self.transport.shutdown().await;
        info!(hub_id = %self.hub_id, "Hub engine stopped");
    }

    /// Returns the hub's device id.
    #[must_use]
    pub fn hub_id(&self) -> DeviceId {
        self.hub_id
    }

    /// Returns the hub's identity public key.
    #[must_use]
    pub fn public_key(&self) -> IdentityPublicKey {
        self.identity.public_key()
    }

    /// Returns a snapshot of the engine counters.
    #[must_use]
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Returns a view of every managed sensor.
    #[must_use]
    pub fn sensors(&self) -> Vec<SensorInfo> {
        self.keyring
            .all_sensors()
            .iter()
            .map(|record| SensorInfo::from(record.as_ref()))
            .collect()
    }

    // ========================================
    // Application API
    // ========================================

    /// Seals a command under the current broadcast key and fans it
    /// out to every ACTIVE sensor. Broadcasts are not retried.
    ///
    /// # Errors
    /// Returns an error if the command cannot be built or sealed;
    /// per-sensor send failures are logged and skipped.
    pub async fn broadcast(&self, command_type: u8, data: &[u8]) -> Result<()> {
        let body = CommandBody::new(command_type, data.to_vec())?;
        let (key_id, key) = self.keyring.broadcast_current();

        let header = Header::fresh(MessageType::BroadcastCommand, self.hub_id);
        let ciphertext = seal(&key, &header, &body.encode())?;
        let payload = BroadcastCommand { key_id, ciphertext }.encode();
        let packet = Packet::build(header, payload, &self.identity)?;
        let bytes = packet.encode();

        let mut delivered = 0usize;
        for record in self.keyring.active_sensors() {
            match self.transport.send(&bytes, &record.endpoint()).await {
                Ok(_) => {
                    self.stats.record_tx();
                    delivered += 1;
                }
                Err(e) => {
                    warn!(device_id = %record.device_id, %e, "Broadcast send failed");
                }
            }
        }

        debug!(
            command_type,
            key_id = %key_id,
            delivered,
            "Broadcast command sent"
        );
        Ok(())
    }

    /// Rotates the broadcast key and announces it to every ACTIVE
    /// sensor under its session key.
    ///
    /// # Errors
    /// Returns an error only if the rotation body cannot be built;
    /// per-sensor delivery failures are logged and skipped.
    pub async fn rotate_broadcast(&self) -> Result<()> {
        let lead = self.config.timing.rotation_lead_secs;
        let valid_from = Timestamp::now().plus_secs(lead);
        let previous_expiry =
            Instant::now() + Duration::from_secs(u64::from(lead)) + self.config.timing.rotation_grace();

        let (new_id, new_key) = self.keyring.rotate_broadcast(previous_expiry);
        let body = RotationBody::broadcast(*new_key.as_bytes(), valid_from, new_id);

        for record in self.keyring.active_sensors() {
            match self.send_rotation(&record, &body).await {
                Ok(()) => record.set_broadcast_key_id_acked(new_id),
                Err(e) => {
                    warn!(device_id = %record.device_id, %e, "Broadcast rotation delivery failed");
                }
            }
        }

        Ok(())
    }

    /// Rotates one sensor's session key. The announcement is sealed
    /// under the old key; the old key stays acceptable through the
    /// grace window.
    ///
    /// # Errors
    /// - `UnknownDevice` if the sensor is not in the roster
    /// - Transport or crypto errors if the announcement fails (the
    ///   old key then stays current)
    pub async fn rotate_session(&self, device_id: DeviceId) -> Result<()> {
        let record = self
            .keyring
            .get(device_id)
            .ok_or(EngineError::UnknownDevice(device_id))?;

        let lead = self.config.timing.rotation_lead_secs;
        let valid_from = Timestamp::now().plus_secs(lead);
        let new_key = SymmetricKey::generate();
        let body = RotationBody::session(*new_key.as_bytes(), valid_from);

        // Seal under the old key before installing the new one.
        self.send_rotation(&record, &body).await?;

        let previous_expiry =
            Instant::now() + Duration::from_secs(u64::from(lead)) + self.config.timing.rotation_grace();
        record.install_session(new_key, previous_expiry);

        info!(device_id = %device_id, %valid_from, "Session key rotated");
        Ok(())
    }

    /// Administratively removes a sensor, returning it to UNKNOWN.
    ///
    /// # Errors
    /// Returns `UnknownDevice` if the sensor is not in the roster.
    pub fn remove_sensor(&self, device_id: DeviceId) -> Result<()> {
        self.keyring
            .remove(device_id)
            .ok_or(EngineError::UnknownDevice(device_id))?;
        self.hooks.fire_left(device_id);
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
                        self.handle_datagram(&buf[..len], source.addr).await;
                    }
                    Err(TransportError::ShuttingDown) => break,
                    Err(e) => {
                        debug!(%e, "Hub receive error");
                        self.hooks.fire_error(&e.into(), "recv");
                    }
                }
            }
        }

        debug!("Hub receive loop stopped");
    }

    async fn broadcast_rotation_loop(self: Arc<Self>) {
        let period = self.config.timing.broadcast_rotation();
        // Construction already issued a fresh key; the first timed
        // rotation happens one full period later.
        let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => break,
                _ = ticker.tick() => {
                    if let Err(e) = self.rotate_broadcast().await {
                        warn!(%e, "Broadcast rotation failed");
                    }
                }
            }
        }
    }

    async fn maintenance_loop(self: Arc<Self>) {
        let period = Duration::from_secs(self.config.timing.replay_sweep_secs.max(1));
        let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => break,
                _ = ticker.tick() => {
                    self.replay.sweep();
                    self.run_session_rotations().await;
                    self.expire_idle_sensors();
                }
            }
        }
    }

    async fn run_session_rotations(&self) {
        let interval = self.config.timing.session_rotation();
        for record in self.keyring.active_sensors() {
            if record.needs_session_rotation(interval) {
                if let Err(e) = self.rotate_session(record.device_id).await {
                    warn!(device_id = %record.device_id, %e, "Scheduled session rotation failed");
                }
            }
        }
    }

    fn expire_idle_sensors(&self) {
        let idle_secs = self.config.timing.sensor_idle_expiry_secs;
        if idle_secs == 0 {
            return;
        }
        let timeout = Duration::from_secs(idle_secs);
        for record in self.keyring.all_sensors() {
            if record.is_idle(timeout) {
                info!(device_id = %record.device_id, "Sensor idle-expired");
                self.keyring.remove(record.device_id);
                self.hooks.fire_left(record.device_id);
            }
        }
    }

    // ========================================
    // Packet Handling
    // ========================================

    async fn handle_datagram(&self, data: &[u8], src: SocketAddr) {
        let packet = match Packet::decode(data) {
            Ok(packet) => packet,
            Err(e) => {
                drop_packet(e.into(), "decode", &self.stats, &self.hooks);
                return;
            }
        };

        let (result, context) = match packet.header.msg_type {
            MessageType::HubDiscoveryReq => (
                self.handle_discovery_req(&packet, src).await,
                "discovery request",
            ),
            MessageType::JoinRequest => {
                (self.handle_join_request(&packet, src).await, "join request")
            }
            MessageType::EventReport => (self.handle_event_report(&packet, src), "event report"),
            other => (
                Err(EngineError::wrong_state(
                    format!("hub handling 0x{:02x}", other.as_byte()),
                    "hub",
                )),
                "dispatch",
            ),
        };

        if let Err(err) = result {
            drop_packet(err, context, &self.stats, &self.hooks);
        }
    }

    async fn handle_discovery_req(&self, packet: &Packet, src: SocketAddr) -> Result<()> {
        let request = DiscoveryRequest::decode(&packet.payload)?;
        // Trust-on-first-contact: the signer key rides in the payload
        // and is checked again at join.
        let signer = IdentityPublicKey::from_bytes(&request.public_key)?;
        verify_and_guard(packet, &signer, &self.replay)?;

        debug!(%src, device_info = %request.device_info, "Discovery request");

        let response = DiscoveryResponse::new(
            self.hub_id,
            self.identity.public_key_bytes(),
            HUB_CAPABILITIES,
        )?;
        let header = Header::fresh(MessageType::HubDiscoveryResp, self.hub_id);
        let reply = Packet::build(header, response.encode(), &self.identity)?;
        self.send(&reply, &src).await
    }

    async fn handle_join_request(&self, packet: &Packet, src: SocketAddr) -> Result<()> {
        let request = JoinRequest::decode(&packet.payload)?;
        let signer = IdentityPublicKey::from_bytes(&request.public_key)?;
        verify_and_guard(packet, &signer, &self.replay)?;

        let session_key = SymmetricKey::generate();
        let (broadcast_key_id, broadcast_key) = self.keyring.broadcast_current();
        let record = self.keyring.register_join(
            signer,
            request.device_info.clone(),
            src,
            session_key.clone(),
            broadcast_key_id,
        )?;

        // Roster persistence is best-effort; the join proceeds either way.
        if let Err(e) = self.keystore.put_peer(&peer_entry(
            record.device_id,
            signer,
            request.device_info,
        )) {
            warn!(device_id = %record.device_id, %e, "Peer persistence failed");
        }

        let grant = JoinGrant {
            assigned_id: record.device_id,
            session_key: *session_key.as_bytes(),
            broadcast_key_id,
            broadcast_key: *broadcast_key.as_bytes(),
        };

        let header = Header::fresh(MessageType::JoinResponse, self.hub_id);
        let mut plaintext = grant.encode();
        let sealed = seal_to_identity(&signer, &header, &plaintext);
        plaintext.zeroize();
        let (ephemeral_public, sealed) = sealed?;

        let payload = JoinResponse {
            ephemeral_public,
            sealed,
        }
        .encode();
        let reply = Packet::build(header, payload, &self.identity)?;

        info!(device_id = %record.device_id, %src, "Join response sent");
        self.send(&reply, &src).await
    }

    fn handle_event_report(&self, packet: &Packet, src: SocketAddr) -> Result<()> {
        let device_id = packet.header.device_id;
        let record = self
            .keyring
            .get(device_id)
            .ok_or(EngineError::UnknownDevice(device_id))?;

        verify_and_guard(packet, &record.public_key, &self.replay)?;

        let report = EventReport::decode(&packet.payload)?;
        let plaintext = Self::open_with_grace(&record, &packet.header, &report.ciphertext)?;
        let body = EventBody::decode(&plaintext)?;

        record.touch();
        record.set_endpoint(src);
        if record.state() == PeerState::Joining {
            record.set_state(PeerState::Active);
            info!(device_id = %device_id, "Sensor active");
            self.hooks.fire_joined(&SensorInfo::from(record.as_ref()));
        }

        self.stats.record_event();
        self.hooks.fire_event(device_id, body.event_type, &body.data);
        Ok(())
    }

    /// Tries the current session key, then the previous one while its
    /// grace window lasts.
    fn open_with_grace(
        record: &SensorRecord,
        header: &Header,
        ciphertext: &[u8],
    ) -> Result<Vec<u8>> {
        let (current, previous) = record.decrypt_keys();
        match open(&current, header, ciphertext) {
            Ok(plaintext) => Ok(plaintext),
            Err(_) => match previous {
                Some(prev) => Ok(open(&prev, header, ciphertext)?),
                None => Err(CoreError::AeadFailure.into()),
            },
        }
    }

    async fn send_rotation(&self, record: &SensorRecord, body: &RotationBody) -> Result<()> {
        let header = Header::fresh(MessageType::KeyRotation, self.hub_id);
        let key = record.current_session_key();

        let mut plaintext = body.encode();
        let sealed = seal(&key, &header, &plaintext);
        plaintext.zeroize();

        let payload = KeyRotation { ciphertext: sealed? }.encode();
        let packet = Packet::build(header, payload, &self.identity)?;
        self.send(&packet, &record.endpoint()).await
    }

    async fn send(&self, packet: &Packet, dest: &SocketAddr) -> Result<()> {
        self.transport.send(&packet.encode(), dest).await?;
        self.stats.record_tx();
        Ok(())
    }
}

impl std::fmt::Debug for HubEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HubEngine")
            .field("hub_id", &self.hub_id)
            .field("sensors", &self.keyring.count())
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
    use async_trait_shim::NullTransport;

    // Minimal transport stub: sends succeed, receives park forever.
    mod async_trait_shim {
        use super::*;
        use shdc_transport::error::Result as TransportResult;
        use shdc_transport::traits::PacketSource;

        #[derive(Debug, Default)]
        pub struct NullTransport;

        #[async_trait::async_trait]
        impl Transport for NullTransport {
            async fn recv(&self, _buf: &mut [u8]) -> TransportResult<(usize, PacketSource)> {
                std::future::pending().await
            }

            async fn send(&self, buf: &[u8], _dest: &SocketAddr) -> TransportResult<usize> {
                Ok(buf.len())
            }

            fn local_addr(&self) -> TransportResult<SocketAddr> {
                Ok("127.0.0.1:56700".parse().unwrap())
            }

            async fn shutdown(&self) -> TransportResult<()> {
                Ok(())
            }

            fn is_active(&self) -> bool {
                true
            }
        }
    }

    fn hub_with_identity() -> Arc<HubEngine> {
        let keystore = Arc::new(MemoryKeyStore::with_identity(IdentityKeyPair::generate()));
        HubEngine::new_hub(
            DeviceId::new(0x1000_0001),
            keystore,
            Arc::new(NullTransport),
            EngineConfig::default(),
            EventHooks::new(),
        )
        .unwrap()
    }

    #[test]
    fn test_missing_identity_is_fatal() {
        let keystore = Arc::new(MemoryKeyStore::new());
        let result = HubEngine::new_hub(
            DeviceId::new(0x1000_0001),
            keystore,
            Arc::new(NullTransport),
            EngineConfig::default(),
            EventHooks::new(),
        );
        assert!(matches!(result, Err(EngineError::IdentityMissing)));
    }

    #[test]
    fn test_unassigned_hub_id_rejected() {
        let keystore = Arc::new(MemoryKeyStore::with_identity(IdentityKeyPair::generate()));
        let result = HubEngine::new_hub(
            DeviceId::UNASSIGNED,
            keystore,
            Arc::new(NullTransport),
            EngineConfig::default(),
            EventHooks::new(),
        );
        assert!(matches!(result, Err(EngineError::ConfigInvalid { .. })));
    }

    #[test]
    fn test_remove_unknown_sensor() {
        let hub = hub_with_identity();
        let result = hub.remove_sensor(DeviceId::new(0xDEAD_BEEF));
        assert!(matches!(result, Err(EngineError::UnknownDevice(_))));
    }

    #[tokio::test]
    async fn test_rotate_session_unknown_device() {
        let hub = hub_with_identity();
        let result = hub.rotate_session(DeviceId::new(0xDEAD_BEEF)).await;
        assert!(matches!(result, Err(EngineError::UnknownDevice(_))));
    }

    #[tokio::test]
    async fn test_start_stop() {
        let hub = hub_with_identity();
        hub.start().unwrap();
        hub.stop().await;

        // Restarting a stopped engine is refused.
        assert!(matches!(hub.start(), Err(EngineError::ShuttingDown)));
    }
}
