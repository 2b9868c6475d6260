// ============================================
// File: crates/shdc-engine/src/keyring.rs
// ============================================
//! # In-Memory Key Rings
//!
//! ## Creation Reason
//! Holds the live key material and rotation bookkeeping for each role:
//! the hub's per-sensor roster with session keys and the shared
//! broadcast key pair (current + previous), and the sensor's link to
//! its hub.
//!
//! ## Rotation Model
//! ```text
//! rotate ──► new key installed as "current"
//!            prior key demoted to "previous" with an expiry
//!            (valid_from + grace window)
//!
//! Hub decrypting EVENT_REPORT:  try current, then unexpired previous
//! Sensor decrypting BROADCAST:  select by key id among
//!                               active / pending / unexpired previous
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - All lock scopes are single-packet work; never hold across awaits
//! - Replaced keys zeroize when their slot drops
//! - The hub never allocates device id 0x00000000
//!
//! ## Last Modified
//! v0.1.0 - Initial key ring implementation

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use parking_lot::RwLock;
use tracing::{debug, info};

use shdc_common::time::{AtomicInstant, Timestamp};
use shdc_common::types::{BroadcastKeyId, DeviceId};
use shdc_core::crypto::{IdentityPublicKey, SymmetricKey};
use shdc_core::error::CoreError;
use shdc_core::protocol::messages::JoinGrant;

use crate::error::{EngineError, Result};

// ============================================
// PeerState
// ============================================

/// Hub-side state of one managed sensor. Absence from the roster is
/// the implicit UNKNOWN state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerState {
    /// Join response sent; waiting for the first event under the
    /// issued session key.
    Joining,
    /// Sensor confirmed the session key; in steady state.
    Active,
}

impl std::fmt::Display for PeerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Joining => write!(f, "Joining"),
            Self::Active => write!(f, "Active"),
        }
    }
}

// ============================================
// SensorRecord (hub side)
// ============================================

/// Hub-side record of one managed sensor.
pub struct SensorRecord {
    /// Allocated device id.
    pub device_id: DeviceId,
    /// Sensor's identity public key.
    pub public_key: IdentityPublicKey,
    /// Textual device info from the join request.
    pub device_info: String,
    /// Last known UDP endpoint.
    endpoint: RwLock<SocketAddr>,
    state: RwLock<PeerState>,
    session: RwLock<SessionSlot>,
    /// Last broadcast key id delivered to this sensor (via join grant
    /// or key rotation).
    broadcast_key_id_acked: RwLock<BroadcastKeyId>,
    /// Updated on every verified packet from the sensor.
    pub last_seen: AtomicInstant,
    /// When the session key was last rotated.
    rotated_at: AtomicInstant,
}

struct SessionSlot {
    current: SymmetricKey,
    previous: Option<(SymmetricKey, Instant)>,
}

impl SensorRecord {
    fn new(
        device_id: DeviceId,
        public_key: IdentityPublicKey,
        device_info: String,
        endpoint: SocketAddr,
        session_key: SymmetricKey,
        broadcast_key_id: BroadcastKeyId,
    ) -> Self {
        Self {
            device_id,
            public_key,
            device_info,
            endpoint: RwLock::new(endpoint),
            state: RwLock::new(PeerState::Joining),
            session: RwLock::new(SessionSlot {
                current: session_key,
                previous: None,
            }),
            broadcast_key_id_acked: RwLock::new(broadcast_key_id),
            last_seen: AtomicInstant::now(),
            rotated_at: AtomicInstant::now(),
        }
    }

    /// Returns the sensor's state.
    #[must_use]
    pub fn state(&self) -> PeerState {
        *self.state.read()
    }

    /// Moves the sensor to the given state.
    pub fn set_state(&self, state: PeerState) {
        *self.state.write() = state;
    }

    /// Returns `true` once the sensor has confirmed its session key.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.state() == PeerState::Active
    }

    /// Returns the last known endpoint.
    #[must_use]
    pub fn endpoint(&self) -> SocketAddr {
        *self.endpoint.read()
    }

    /// Updates the endpoint after a verified packet.
    pub fn set_endpoint(&self, addr: SocketAddr) {
        *self.endpoint.write() = addr;
    }

    /// Marks activity from this sensor.
    pub fn touch(&self) {
        self.last_seen.touch();
    }

    /// Returns the current session key.
    #[must_use]
    pub fn current_session_key(&self) -> SymmetricKey {
        self.session.read().current.clone()
    }

    /// Returns the current session key and, when still inside its
    /// grace window, the previous one.
    #[must_use]
    pub fn decrypt_keys(&self) -> (SymmetricKey, Option<SymmetricKey>) {
        let slot = self.session.read();
        let previous = slot
            .previous
            .as_ref()
            .filter(|(_, expiry)| Instant::now() < *expiry)
            .map(|(key, _)| key.clone());
        (slot.current.clone(), previous)
    }

    /// Installs a rotated session key; the replaced key stays
    /// acceptable until `previous_expiry`.
    pub fn install_session(&self, new_key: SymmetricKey, previous_expiry: Instant) {
        let mut slot = self.session.write();
        let old = std::mem::replace(&mut slot.current, new_key);
        slot.previous = Some((old, previous_expiry));
        drop(slot);
        self.rotated_at.touch();
    }

    /// Returns `true` once the session key is older than `interval`.
    #[must_use]
    pub fn needs_session_rotation(&self, interval: Duration) -> bool {
        self.rotated_at.has_elapsed(interval)
    }

    /// Returns the last broadcast key id delivered to this sensor.
    #[must_use]
    pub fn broadcast_key_id_acked(&self) -> BroadcastKeyId {
        *self.broadcast_key_id_acked.read()
    }

    /// Records delivery of a broadcast key id to this sensor.
    pub fn set_broadcast_key_id_acked(&self, id: BroadcastKeyId) {
        *self.broadcast_key_id_acked.write() = id;
    }

    /// Returns `true` if the sensor has been silent longer than
    /// `timeout`.
    #[must_use]
    pub fn is_idle(&self, timeout: Duration) -> bool {
        self.last_seen.has_elapsed(timeout)
    }
}

impl std::fmt::Debug for SensorRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SensorRecord")
            .field("device_id", &self.device_id)
            .field("state", &self.state())
            .field("endpoint", &self.endpoint())
            .finish_non_exhaustive()
    }
}

// ============================================
// SensorInfo
// ============================================

/// Key-material-free view of a [`SensorRecord`], passed to
/// application callbacks.
#[derive(Debug, Clone)]
pub struct SensorInfo {
    /// Allocated device id.
    pub device_id: DeviceId,
    /// Sensor's identity public key.
    pub public_key: IdentityPublicKey,
    /// Last known UDP endpoint.
    pub endpoint: SocketAddr,
    /// Textual device info from the join request.
    pub device_info: String,
    /// Current hub-side state.
    pub state: PeerState,
}

impl From<&SensorRecord> for SensorInfo {
    fn from(record: &SensorRecord) -> Self {
        Self {
            device_id: record.device_id,
            public_key: record.public_key,
            endpoint: record.endpoint(),
            device_info: record.device_info.clone(),
            state: record.state(),
        }
    }
}

// ============================================
// HubKeyring
// ============================================

/// Hub-side key material: the sensor roster and the broadcast key
/// pair (current + previous).
pub struct HubKeyring {
    sensors: DashMap<DeviceId, Arc<SensorRecord>>,
    by_pubkey: DashMap<[u8; 32], DeviceId>,
    broadcast: RwLock<BroadcastSlot>,
    next_device_id: AtomicU32,
    max_sensors: usize,
}

struct BroadcastSlot {
    current_id: BroadcastKeyId,
    current_key: SymmetricKey,
    previous: Option<(BroadcastKeyId, SymmetricKey, Instant)>,
}

impl HubKeyring {
    /// Creates a keyring with a fresh broadcast key (id 0x01).
    ///
    /// Construction counts as the reboot rotation: every hub start
    /// issues a new group key.
    #[must_use]
    pub fn new(first_device_id: u32, max_sensors: usize) -> Self {
        Self {
            sensors: DashMap::new(),
            by_pubkey: DashMap::new(),
            broadcast: RwLock::new(BroadcastSlot {
                current_id: BroadcastKeyId::new(0x01),
                current_key: SymmetricKey::generate(),
                previous: None,
            }),
            next_device_id: AtomicU32::new(first_device_id),
            max_sensors,
        }
    }

    /// Returns the current broadcast key and its id.
    #[must_use]
    pub fn broadcast_current(&self) -> (BroadcastKeyId, SymmetricKey) {
        let slot = self.broadcast.read();
        (slot.current_id, slot.current_key.clone())
    }

    /// Rotates the broadcast key. The replaced key stays acceptable
    /// until `previous_expiry`.
    ///
    /// # Returns
    /// The new key id and key.
    pub fn rotate_broadcast(&self, previous_expiry: Instant) -> (BroadcastKeyId, SymmetricKey) {
        let mut slot = self.broadcast.write();
        let new_id = slot.current_id.next();
        let new_key = SymmetricKey::generate();

        let old_id = slot.current_id;
        let old_key = std::mem::replace(&mut slot.current_key, new_key.clone());
        slot.previous = Some((old_id, old_key, previous_expiry));
        slot.current_id = new_id;

        info!(old = %old_id, new = %new_id, "Broadcast key rotated");
        (new_id, new_key)
    }

    /// Registers a joining sensor, allocating a device id. A sensor
    /// re-joining with a known identity key reuses its id and gets a
    /// fresh record.
    ///
    /// # Errors
    /// Returns `JoinRefused` when the roster is full.
    pub fn register_join(
        &self,
        public_key: IdentityPublicKey,
        device_info: String,
        endpoint: SocketAddr,
        session_key: SymmetricKey,
        broadcast_key_id: BroadcastKeyId,
    ) -> Result<Arc<SensorRecord>> {
        let rejoining = self.by_pubkey.get(public_key.as_bytes()).map(|id| *id);

        let device_id = match rejoining {
            Some(id) => id,
            None => {
                if self.sensors.len() >= self.max_sensors {
                    return Err(EngineError::join_refused(format!(
                        "roster full ({} sensors)",
                        self.max_sensors
                    )));
                }
                self.allocate_device_id()
            }
        };

        let record = Arc::new(SensorRecord::new(
            device_id,
            public_key,
            device_info,
            endpoint,
            session_key,
            broadcast_key_id,
        ));

        self.sensors.insert(device_id, Arc::clone(&record));
        self.by_pubkey.insert(public_key.to_bytes(), device_id);

        info!(
            device_id = %device_id,
            endpoint = %endpoint,
            rejoin = rejoining.is_some(),
            "Sensor registered"
        );

        Ok(record)
    }

    fn allocate_device_id(&self) -> DeviceId {
        loop {
            let raw = self.next_device_id.fetch_add(1, Ordering::SeqCst);
            let id = DeviceId::new(raw);
            if !id.is_unassigned() && !self.sensors.contains_key(&id) {
                return id;
            }
        }
    }

    /// Looks up a sensor by device id.
    #[must_use]
    pub fn get(&self, id: DeviceId) -> Option<Arc<SensorRecord>> {
        self.sensors.get(&id).map(|r| Arc::clone(r.value()))
    }

    /// Removes a sensor from the roster (administrative reset).
    pub fn remove(&self, id: DeviceId) -> Option<Arc<SensorRecord>> {
        let removed = self.sensors.remove(&id).map(|(_, record)| record);
        if let Some(ref record) = removed {
            self.by_pubkey.remove(record.public_key.as_bytes());
            debug!(device_id = %id, "Sensor removed from roster");
        }
        removed
    }

    /// Returns all sensors in the ACTIVE state.
    #[must_use]
    pub fn active_sensors(&self) -> Vec<Arc<SensorRecord>> {
        self.sensors
            .iter()
            .filter(|r| r.value().is_active())
            .map(|r| Arc::clone(r.value()))
            .collect()
    }

    /// Returns every managed sensor.
    #[must_use]
    pub fn all_sensors(&self) -> Vec<Arc<SensorRecord>> {
        self.sensors.iter().map(|r| Arc::clone(r.value())).collect()
    }

    /// Returns the roster size.
    #[must_use]
    pub fn count(&self) -> usize {
        self.sensors.len()
    }
}

impl std::fmt::Debug for HubKeyring {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HubKeyring")
            .field("sensors", &self.count())
            .field("max_sensors", &self.max_sensors)
            .finish_non_exhaustive()
    }
}

// ============================================
// SensorKeyring
// ============================================

/// Snapshot of the sensor's hub link metadata.
#[derive(Debug, Clone, Copy)]
pub struct HubInfo {
    /// Hub device id.
    pub hub_id: DeviceId,
    /// Hub identity public key.
    pub hub_public_key: IdentityPublicKey,
    /// Hub UDP endpoint.
    pub hub_addr: SocketAddr,
    /// Device id the hub assigned to this sensor.
    pub assigned_id: DeviceId,
}

/// Sensor-side key material: session key (with a pending successor
/// around rotations) and broadcast keys indexed by key id.
pub struct SensorKeyring {
    link: RwLock<Option<HubLink>>,
    grace: Duration,
}

struct HubLink {
    info: HubInfo,
    session_current: SymmetricKey,
    session_pending: Option<(SymmetricKey, Timestamp)>,
    broadcast: BroadcastSet,
}

struct BroadcastSet {
    active_id: BroadcastKeyId,
    active_key: SymmetricKey,
    pending: Option<(BroadcastKeyId, SymmetricKey, Timestamp)>,
    previous: Option<(BroadcastKeyId, SymmetricKey, Instant)>,
}

impl SensorKeyring {
    /// Creates an empty keyring; populated by a join grant.
    #[must_use]
    pub fn new(grace: Duration) -> Self {
        Self {
            link: RwLock::new(None),
            grace,
        }
    }

    /// Installs the hub link from an opened join grant.
    pub fn install(
        &self,
        hub_id: DeviceId,
        hub_public_key: IdentityPublicKey,
        hub_addr: SocketAddr,
        grant: &JoinGrant,
    ) {
        let link = HubLink {
            info: HubInfo {
                hub_id,
                hub_public_key,
                hub_addr,
                assigned_id: grant.assigned_id,
            },
            session_current: SymmetricKey::from_bytes(grant.session_key),
            session_pending: None,
            broadcast: BroadcastSet {
                active_id: grant.broadcast_key_id,
                active_key: SymmetricKey::from_bytes(grant.broadcast_key),
                pending: None,
                previous: None,
            },
        };
        *self.link.write() = Some(link);
    }

    /// Drops all hub state (re-discovery or shutdown).
    pub fn clear(&self) {
        *self.link.write() = None;
    }

    /// Returns the hub link metadata, if joined.
    #[must_use]
    pub fn hub(&self) -> Option<HubInfo> {
        self.link.read().as_ref().map(|l| l.info)
    }

    /// Returns the session key to seal the next outgoing packet
    /// under, promoting a pending rotated key once its activation
    /// time has passed.
    #[must_use]
    pub fn session_key(&self) -> Option<SymmetricKey> {
        let mut guard = self.link.write();
        let link = guard.as_mut()?;
        Self::promote_session(link);
        Some(link.session_current.clone())
    }

    fn promote_session(link: &mut HubLink) {
        if let Some((key, valid_from)) = link.session_pending.take() {
            if valid_from.has_passed() {
                link.session_current = key;
            } else {
                link.session_pending = Some((key, valid_from));
            }
        }
    }

    /// Stages a rotated session key for activation at `valid_from`.
    pub fn apply_session_rotation(&self, new_key: SymmetricKey, valid_from: Timestamp) {
        let mut guard = self.link.write();
        if let Some(link) = guard.as_mut() {
            link.session_pending = Some((new_key, valid_from));
            Self::promote_session(link);
            debug!(%valid_from, "Session key rotation staged");
        }
    }

    /// Stages a rotated broadcast key for activation at `valid_from`.
    pub fn apply_broadcast_rotation(
        &self,
        id: BroadcastKeyId,
        key: SymmetricKey,
        valid_from: Timestamp,
    ) {
        let mut guard = self.link.write();
        if let Some(link) = guard.as_mut() {
            link.broadcast.pending = Some((id, key, valid_from));
            Self::promote_broadcast(&mut link.broadcast, self.grace);
            debug!(new = %id, %valid_from, "Broadcast key rotation staged");
        }
    }

    fn promote_broadcast(set: &mut BroadcastSet, grace: Duration) {
        if let Some((id, key, valid_from)) = set.pending.take() {
            if valid_from.has_passed() {
                let old_id = set.active_id;
                let old_key = std::mem::replace(&mut set.active_key, key);
                set.previous = Some((old_id, old_key, Instant::now() + grace));
                set.active_id = id;
            } else {
                set.pending = Some((id, key, valid_from));
            }
        }
    }

    /// Resolves the broadcast key for an incoming command by key id.
    ///
    /// # Errors
    /// Returns `KeyUnavailable` for an unknown id, a pending key that
    /// is not yet valid, or a previous key past its grace window.
    pub fn broadcast_key_for(
        &self,
        id: BroadcastKeyId,
    ) -> std::result::Result<SymmetricKey, CoreError> {
        let mut guard = self.link.write();
        let link = guard
            .as_mut()
            .ok_or_else(|| CoreError::key_unavailable("not joined"))?;

        Self::promote_broadcast(&mut link.broadcast, self.grace);
        let set = &link.broadcast;

        if id == set.active_id {
            return Ok(set.active_key.clone());
        }
        if let Some((prev_id, prev_key, expiry)) = &set.previous {
            if id == *prev_id && Instant::now() < *expiry {
                return Ok(prev_key.clone());
            }
        }
        Err(CoreError::unknown_broadcast_key(id))
    }
}

impl std::fmt::Debug for SensorKeyring {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let joined = self.link.read().is_some();
        f.debug_struct("SensorKeyring")
            .field("joined", &joined)
            .finish_non_exhaustive()
    }
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;
    use shdc_core::crypto::IdentityKeyPair;

    fn endpoint() -> SocketAddr {
        "127.0.0.1:56700".parse().unwrap()
    }

    fn test_keyring() -> HubKeyring {
        HubKeyring::new(0xA000_0001, 4)
    }

    fn register(ring: &HubKeyring) -> Arc<SensorRecord> {
        let identity = IdentityKeyPair::generate();
        ring.register_join(
            identity.public_key(),
            "test sensor".into(),
            endpoint(),
            SymmetricKey::generate(),
            ring.broadcast_current().0,
        )
        .unwrap()
    }

    #[test]
    fn test_initial_broadcast_key_id() {
        let ring = test_keyring();
        assert_eq!(ring.broadcast_current().0, BroadcastKeyId::new(0x01));
    }

    #[test]
    fn test_device_id_allocation() {
        let ring = test_keyring();
        let a = register(&ring);
        let b = register(&ring);

        assert_eq!(a.device_id, DeviceId::new(0xA000_0001));
        assert_eq!(b.device_id, DeviceId::new(0xA000_0002));
        assert_eq!(ring.count(), 2);
    }

    #[test]
    fn test_rejoin_reuses_device_id() {
        let ring = test_keyring();
        let identity = IdentityKeyPair::generate();

        let first = ring
            .register_join(
                identity.public_key(),
                "sensor".into(),
                endpoint(),
                SymmetricKey::generate(),
                BroadcastKeyId::new(1),
            )
            .unwrap();
        let second = ring
            .register_join(
                identity.public_key(),
                "sensor".into(),
                endpoint(),
                SymmetricKey::generate(),
                BroadcastKeyId::new(1),
            )
            .unwrap();

        assert_eq!(first.device_id, second.device_id);
        assert_eq!(ring.count(), 1);
    }

    #[test]
    fn test_roster_limit() {
        let ring = HubKeyring::new(0xA000_0001, 2);
        register(&ring);
        register(&ring);

        let identity = IdentityKeyPair::generate();
        let result = ring.register_join(
            identity.public_key(),
            "overflow".into(),
            endpoint(),
            SymmetricKey::generate(),
            BroadcastKeyId::new(1),
        );
        assert!(matches!(result, Err(EngineError::JoinRefused { .. })));
    }

    #[test]
    fn test_session_rotation_grace_window() {
        let ring = test_keyring();
        let record = register(&ring);
        let old_key = record.current_session_key();

        let new_key = SymmetricKey::generate();
        record.install_session(new_key.clone(), Instant::now() + Duration::from_millis(30));

        // Inside the grace window both keys decrypt.
        let (current, previous) = record.decrypt_keys();
        assert_eq!(current, new_key);
        assert_eq!(previous, Some(old_key));

        // Afterwards only the new one does.
        std::thread::sleep(Duration::from_millis(40));
        let (current, previous) = record.decrypt_keys();
        assert_eq!(current, new_key);
        assert!(previous.is_none());
    }

    #[test]
    fn test_broadcast_rotation_id_advances() {
        let ring = test_keyring();
        let (id1, key1) = ring.broadcast_current();
        let (id2, key2) = ring.rotate_broadcast(Instant::now() + Duration::from_secs(60));

        assert_eq!(id2, id1.next());
        assert_ne!(key1, key2);
        assert_eq!(ring.broadcast_current().0, id2);
    }

    #[test]
    fn test_remove_clears_pubkey_index() {
        let ring = test_keyring();
        let record = register(&ring);
        let device_id = record.device_id;

        assert!(ring.remove(device_id).is_some());
        assert!(ring.get(device_id).is_none());
        assert_eq!(ring.count(), 0);
    }

    fn joined_sensor_keyring(grace: Duration) -> SensorKeyring {
        let ring = SensorKeyring::new(grace);
        let grant = JoinGrant {
            assigned_id: DeviceId::new(0xAABB_CCDD),
            session_key: [0x11; 32],
            broadcast_key_id: BroadcastKeyId::new(0x01),
            broadcast_key: [0x22; 32],
        };
        let hub_pk = IdentityKeyPair::generate().public_key();
        ring.install(DeviceId::new(0x1000_0001), hub_pk, endpoint(), &grant);
        ring
    }

    #[test]
    fn test_sensor_install_and_lookup() {
        let ring = joined_sensor_keyring(Duration::from_secs(60));

        let hub = ring.hub().unwrap();
        assert_eq!(hub.assigned_id, DeviceId::new(0xAABB_CCDD));
        assert_eq!(
            ring.session_key().unwrap(),
            SymmetricKey::from_bytes([0x11; 32])
        );
        assert_eq!(
            ring.broadcast_key_for(BroadcastKeyId::new(0x01)).unwrap(),
            SymmetricKey::from_bytes([0x22; 32])
        );
    }

    #[test]
    fn test_sensor_unknown_broadcast_id() {
        let ring = joined_sensor_keyring(Duration::from_secs(60));
        assert!(matches!(
            ring.broadcast_key_for(BroadcastKeyId::new(0x07)),
            Err(CoreError::KeyUnavailable { .. })
        ));
    }

    #[test]
    fn test_sensor_broadcast_rotation_windows() {
        let ring = joined_sensor_keyring(Duration::from_millis(30));
        let new_key = SymmetricKey::from_bytes([0x33; 32]);

        // Not yet valid: the new id is unavailable, the old one works.
        let future = Timestamp::from_secs(Timestamp::now().as_secs() + 100);
        ring.apply_broadcast_rotation(BroadcastKeyId::new(0x02), new_key.clone(), future);
        assert!(ring.broadcast_key_for(BroadcastKeyId::new(0x02)).is_err());
        assert!(ring.broadcast_key_for(BroadcastKeyId::new(0x01)).is_ok());

        // Immediately valid: the new id resolves, the old survives the
        // grace window, then expires.
        ring.apply_broadcast_rotation(BroadcastKeyId::new(0x02), new_key.clone(), Timestamp::now());
        assert_eq!(
            ring.broadcast_key_for(BroadcastKeyId::new(0x02)).unwrap(),
            new_key
        );
        assert!(ring.broadcast_key_for(BroadcastKeyId::new(0x01)).is_ok());

        std::thread::sleep(Duration::from_millis(40));
        assert!(matches!(
            ring.broadcast_key_for(BroadcastKeyId::new(0x01)),
            Err(CoreError::KeyUnavailable { .. })
        ));
    }

    #[test]
    fn test_sensor_session_rotation_promotes_at_valid_from() {
        let ring = joined_sensor_keyring(Duration::from_secs(60));
        let new_key = SymmetricKey::from_bytes([0x44; 32]);

        // Future activation keeps the old key current.
        let future = Timestamp::from_secs(Timestamp::now().as_secs() + 100);
        ring.apply_session_rotation(new_key.clone(), future);
        assert_eq!(
            ring.session_key().unwrap(),
            SymmetricKey::from_bytes([0x11; 32])
        );

        // Immediate activation swaps on the next use.
        ring.apply_session_rotation(new_key.clone(), Timestamp::now());
        assert_eq!(ring.session_key().unwrap(), new_key);
    }

    #[test]
    fn test_sensor_clear() {
        let ring = joined_sensor_keyring(Duration::from_secs(60));
        ring.clear();
        assert!(ring.hub().is_none());
        assert!(ring.session_key().is_none());
    }
}
