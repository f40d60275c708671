//! Snapshot persistence for the session store.
//!
//! Only the durable subset of the store is written: sessions, the current
//! pointer, theme and settings. Live-stream state never reaches disk.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::debug;

use super::error::{PersistenceError, PersistenceResult};
use super::settings::{Theme, UserSettings};
use crate::session::{Session, SessionId};

/// Durable state of the store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    /// Schema version for forward compatibility. Absent on unversioned files.
    #[serde(default)]
    pub version: u32,
    /// Newest first.
    #[serde(default)]
    pub sessions: Vec<Session>,
    #[serde(default)]
    pub current_session_id: Option<SessionId>,
    #[serde(default)]
    pub theme: Theme,
    #[serde(default)]
    pub settings: UserSettings,
}

impl Snapshot {
    /// Current schema version.
    pub const CURRENT_VERSION: u32 = 1;

    /// Serialize to JSON string.
    pub fn to_json(&self) -> PersistenceResult<String> {
        let mut versioned = self.clone();
        versioned.version = Self::CURRENT_VERSION;
        serde_json::to_string_pretty(&versioned).map_err(PersistenceError::Serialize)
    }

    /// Deserialize from JSON string, rejecting snapshots from newer schemas.
    pub fn from_json(json: &str) -> PersistenceResult<Self> {
        let snapshot: Self = serde_json::from_str(json).map_err(PersistenceError::Deserialize)?;

        if snapshot.version > Self::CURRENT_VERSION {
            return Err(PersistenceError::VersionMismatch {
                expected: Self::CURRENT_VERSION,
                found: snapshot.version,
            });
        }

        Ok(snapshot)
    }
}

/// Where snapshots are read from and written to.
pub trait SnapshotStore: Send {
    /// Raw snapshot text, or `None` when nothing was saved yet.
    fn load(&self) -> PersistenceResult<Option<String>>;

    /// Replace the stored snapshot.
    fn save(&self, json: &str) -> PersistenceResult<()>;
}

/// Snapshot kept in a single JSON file.
#[derive(Debug, Clone)]
pub struct JsonFileSnapshotStore {
    path: PathBuf,
}

impl JsonFileSnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SnapshotStore for JsonFileSnapshotStore {
    fn load(&self) -> PersistenceResult<Option<String>> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "No snapshot file yet");
            return Ok(None);
        }
        Ok(Some(std::fs::read_to_string(&self.path)?))
    }

    fn save(&self, json: &str) -> PersistenceResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(&self.path, json)?;
        Ok(())
    }
}

/// In-memory snapshot slot. Clones share the same slot, so a test can keep
/// one handle and inspect what the store wrote.
#[derive(Debug, Clone, Default)]
pub struct MemorySnapshotStore {
    slot: Arc<Mutex<Option<String>>>,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate the slot.
    pub fn with_contents(json: &str) -> Self {
        Self {
            slot: Arc::new(Mutex::new(Some(json.to_string()))),
        }
    }

    /// Last saved snapshot text.
    pub fn contents(&self) -> Option<String> {
        self.slot.lock().ok().and_then(|slot| slot.clone())
    }
}

impl SnapshotStore for MemorySnapshotStore {
    fn load(&self) -> PersistenceResult<Option<String>> {
        Ok(self.contents())
    }

    fn save(&self, json: &str) -> PersistenceResult<()> {
        let mut slot = self
            .slot
            .lock()
            .map_err(|e| std::io::Error::other(e.to_string()))?;
        *slot = Some(json.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{Agent, CouncilPhase};

    #[test]
    fn test_snapshot_roundtrip_stamps_version() {
        let mut snapshot = Snapshot {
            sessions: vec![Session::new("q", vec![Agent::new("A")])],
            theme: Theme::Light,
            ..Default::default()
        };
        snapshot.current_session_id = Some(snapshot.sessions[0].id.clone());

        let restored = Snapshot::from_json(&snapshot.to_json().unwrap()).unwrap();
        assert_eq!(restored.version, Snapshot::CURRENT_VERSION);
        assert_eq!(restored.sessions, snapshot.sessions);
        assert_eq!(restored.current_session_id, snapshot.current_session_id);
        assert_eq!(restored.theme, Theme::Light);
    }

    #[test]
    fn test_newer_version_rejected() {
        let json = r#"{"version": 99, "sessions": []}"#;
        let err = Snapshot::from_json(json).unwrap_err();
        assert!(matches!(
            err,
            PersistenceError::VersionMismatch {
                expected: 1,
                found: 99
            }
        ));
    }

    #[test]
    fn test_unversioned_legacy_snapshot_loads() {
        let json = r#"{
            "sessions": [{
                "id": "old",
                "query": "legacy",
                "date": "2024-05-01T10:00:00Z",
                "summary": "Done...",
                "criticData": {"winner_id": "A", "reasoning": "r", "scores": {"A": 8}, "flaws": {}}
            }],
            "currentSessionId": "old"
        }"#;
        let snapshot = Snapshot::from_json(json).unwrap();
        assert_eq!(snapshot.version, 0);
        assert_eq!(snapshot.sessions.len(), 1);
        assert!(snapshot.sessions[0].active_phase.is_none());
        assert_eq!(snapshot.sessions[0].phase(), CouncilPhase::Critiquing);
        assert_eq!(snapshot.theme, Theme::Dark);
    }

    #[test]
    fn test_garbage_rejected() {
        assert!(matches!(
            Snapshot::from_json("not json"),
            Err(PersistenceError::Deserialize(_))
        ));
    }

    #[test]
    fn test_file_store_creates_parent_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("state.json");
        let store = JsonFileSnapshotStore::new(&path);

        assert!(store.load().unwrap().is_none());
        store.save("{}").unwrap();
        assert!(path.exists());
        assert_eq!(store.load().unwrap().as_deref(), Some("{}"));
    }

    #[test]
    fn test_memory_store_shares_slot() {
        let store = MemorySnapshotStore::new();
        let handle = store.clone();
        store.save("{\"version\":1}").unwrap();
        assert_eq!(handle.contents().as_deref(), Some("{\"version\":1}"));
    }
}
