// ============================================
// File: crates/shdc-engine/src/keystore.rs
// ============================================
//! # Persistent Key Storage
//!
//! ## Creation Reason
//! Defines the storage interface the engines consume for long-term
//! material: the device identity key pair and the hub's peer roster.
//! Session and broadcast keys are ephemeral and never persisted.
//!
//! ## Main Functionality
//! - `KeyStore`: storage trait (`load_identity`, `save_identity`,
//!   `list_peers`, `put_peer`)
//! - `MemoryKeyStore`: in-process store for tests and embedding
//! - `FileKeyStore`: directory-backed store with restrictive
//!   permissions (0o600 key file on Unix)
//!
//! ## ⚠️ Important Note for Next Developer
//! - Storage confidentiality is this layer's responsibility; the
//!   engines hand it raw seed bytes
//! - Engines treat a missing identity at startup as fatal
//!   (`IdentityMissing`); provision with `load_or_create_identity`
//!
//! ## Last Modified
//! v0.1.0 - Initial keystore implementation

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::info;
use zeroize::Zeroizing;

use shdc_common::types::DeviceId;
use shdc_core::crypto::{IdentityKeyPair, IdentityPublicKey};

use crate::error::{EngineError, Result};

// ============================================
// PeerEntry
// ============================================

/// Persisted record of a known peer (hub-side sensor roster).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeerEntry {
    /// Allocated device id.
    pub device_id: DeviceId,
    /// Peer's identity public key.
    pub public_key: IdentityPublicKey,
    /// Textual device info from the join request.
    pub device_info: String,
}

// ============================================
// KeyStore Trait
// ============================================

/// Persistent storage interface consumed by the engines.
pub trait KeyStore: Send + Sync {
    /// Loads the device identity, if one has been provisioned.
    ///
    /// # Errors
    /// Returns an error if the backing store is unreadable or corrupt.
    fn load_identity(&self) -> Result<Option<IdentityKeyPair>>;

    /// Persists the device identity.
    ///
    /// # Errors
    /// Returns an error if the backing store is unwritable.
    fn save_identity(&self, identity: &IdentityKeyPair) -> Result<()>;

    /// Lists known peers.
    ///
    /// # Errors
    /// Returns an error if the backing store is unreadable or corrupt.
    fn list_peers(&self) -> Result<Vec<PeerEntry>>;

    /// Persists or replaces a peer record.
    ///
    /// # Errors
    /// Returns an error if the backing store is unwritable.
    fn put_peer(&self, peer: &PeerEntry) -> Result<()>;
}

/// Loads the identity, generating and saving a fresh one if absent.
///
/// # Errors
/// Propagates keystore read/write failures.
pub fn load_or_create_identity(store: &dyn KeyStore) -> Result<IdentityKeyPair> {
    if let Some(identity) = store.load_identity()? {
        return Ok(identity);
    }
    let identity = IdentityKeyPair::generate();
    store.save_identity(&identity)?;
    info!(public_key = %identity.public_key(), "Generated new device identity");
    Ok(identity)
}

// ============================================
// MemoryKeyStore
// ============================================

/// In-memory keystore for tests and embedded use.
#[derive(Default)]
pub struct MemoryKeyStore {
    identity: Mutex<Option<IdentityKeyPair>>,
    peers: Mutex<HashMap<DeviceId, PeerEntry>>,
}

impl MemoryKeyStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-provisioned with an identity.
    #[must_use]
    pub fn with_identity(identity: IdentityKeyPair) -> Self {
        let store = Self::new();
        *store.identity.lock() = Some(identity);
        store
    }
}

impl KeyStore for MemoryKeyStore {
    fn load_identity(&self) -> Result<Option<IdentityKeyPair>> {
        Ok(self.identity.lock().clone())
    }

    fn save_identity(&self, identity: &IdentityKeyPair) -> Result<()> {
        *self.identity.lock() = Some(identity.clone());
        Ok(())
    }

    fn list_peers(&self) -> Result<Vec<PeerEntry>> {
        Ok(self.peers.lock().values().cloned().collect())
    }

    fn put_peer(&self, peer: &PeerEntry) -> Result<()> {
        self.peers.lock().insert(peer.device_id, peer.clone());
        Ok(())
    }
}

impl std::fmt::Debug for MemoryKeyStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryKeyStore")
            .field("has_identity", &self.identity.lock().is_some())
            .field("peers", &self.peers.lock().len())
            .finish()
    }
}

// ============================================
// FileKeyStore
// ============================================

/// Directory-backed keystore: `identity.key` (raw 32-byte seed) and
/// `peers.json`.
///
/// # Layout
/// ```text
/// <dir>/
///   identity.key   raw Ed25519 seed, mode 0o600
///   peers.json     serialized peer roster
/// ```
#[derive(Debug)]
pub struct FileKeyStore {
    dir: PathBuf,
}

impl FileKeyStore {
    /// Opens (creating if needed) a keystore directory.
    ///
    /// # Errors
    /// Returns an error if the directory cannot be created.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&dir, fs::Permissions::from_mode(0o700))?;
        }

        Ok(Self { dir })
    }

    fn identity_path(&self) -> PathBuf {
        self.dir.join("identity.key")
    }

    fn peers_path(&self) -> PathBuf {
        self.dir.join("peers.json")
    }

    fn read_peers(&self) -> Result<HashMap<DeviceId, PeerEntry>> {
        let path = self.peers_path();
        if !path.exists() {
            return Ok(HashMap::new());
        }
        let content = fs::read_to_string(&path)?;
        let entries: Vec<PeerEntry> = serde_json::from_str(&content)
            .map_err(|e| EngineError::internal(format!("corrupt peers file: {e}")))?;
        Ok(entries.into_iter().map(|p| (p.device_id, p)).collect())
    }

    fn write_peers(&self, peers: &HashMap<DeviceId, PeerEntry>) -> Result<()> {
        let entries: Vec<&PeerEntry> = peers.values().collect();
        let content = serde_json::to_string_pretty(&entries)
            .map_err(|e| EngineError::internal(format!("peer serialization failed: {e}")))?;
        fs::write(self.peers_path(), content)?;
        Ok(())
    }
}

impl KeyStore for FileKeyStore {
    fn load_identity(&self) -> Result<Option<IdentityKeyPair>> {
        let path = self.identity_path();
        if !path.exists() {
            return Ok(None);
        }

        let bytes = Zeroizing::new(fs::read(&path)?);
        if bytes.len() != 32 {
            return Err(EngineError::internal(format!(
                "corrupt identity file: {} bytes",
                bytes.len()
            )));
        }

        let identity = IdentityKeyPair::from_bytes(&bytes)?;
        Ok(Some(identity))
    }

    fn save_identity(&self, identity: &IdentityKeyPair) -> Result<()> {
        let path = self.identity_path();
        let seed = Zeroizing::new(identity.to_bytes());
        fs::write(&path, *seed)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&path, fs::Permissions::from_mode(0o600))?;
        }

        info!(path = %path.display(), "Identity saved");
        Ok(())
    }

    fn list_peers(&self) -> Result<Vec<PeerEntry>> {
        Ok(self.read_peers()?.into_values().collect())
    }

    fn put_peer(&self, peer: &PeerEntry) -> Result<()> {
        let mut peers = self.read_peers()?;
        peers.insert(peer.device_id, peer.clone());
        self.write_peers(&peers)
    }
}

/// Returns a [`PeerEntry`] for persisting a joined sensor.
#[must_use]
pub fn peer_entry(
    device_id: DeviceId,
    public_key: IdentityPublicKey,
    device_info: String,
) -> PeerEntry {
    PeerEntry {
        device_id,
        public_key,
        device_info,
    }
}

// ============================================
// Tests
// ============================================
