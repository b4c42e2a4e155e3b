//! Record store for pod lifecycle observations
//!
//! Observations are appended per owner key and never deduplicated here.
//! A store-level lock makes every append exclusive with snapshot reads, so
//! recomputation never sees a half-appended owner group.

use crate::error::{AnalyzerError, Result};
use crate::models::{OwnerKey, PodElement};
use std::collections::{BTreeMap, HashMap};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info};

/// Serialized form: owner key string -> records in insertion order
pub type Snapshot = BTreeMap<String, Vec<PodElement>>;

/// Append-only store of observations grouped by owner
#[derive(Debug, Default)]
pub struct RecordStore {
    groups: RwLock<HashMap<OwnerKey, Vec<PodElement>>>,
    /// Bumped on every mutation so callers can tell when results are stale
    generation: AtomicU64,
}

impl RecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<OwnerKey, Vec<PodElement>>> {
        self.groups.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<OwnerKey, Vec<PodElement>>> {
        self.groups.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append one observation under its owner key
    pub fn record(&self, element: PodElement) -> Result<()> {
        element.validate()?;
        let key = element.owner_key();
        self.write().entry(key).or_default().push(element);
        self.generation.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    /// Copy of every owner group, taken under a single read lock
    pub fn groups(&self) -> Vec<(OwnerKey, Vec<PodElement>)> {
        self.read()
            .iter()
            .map(|(key, elements)| (key.clone(), elements.clone()))
            .collect()
    }

    /// Records of one owner in insertion order
    pub fn group(&self, owner: &OwnerKey) -> Vec<PodElement> {
        self.read().get(owner).cloned().unwrap_or_default()
    }

    pub fn owners(&self) -> Vec<OwnerKey> {
        let mut owners: Vec<OwnerKey> = self.read().keys().cloned().collect();
        owners.sort();
        owners
    }

    /// Number of owner groups
    pub fn owner_count(&self) -> usize {
        self.read().len()
    }

    /// Total number of raw observations across all owners
    pub fn record_count(&self) -> usize {
        self.read().values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Drop every observation
    pub fn reset(&self) {
        self.write().clear();
        self.generation.fetch_add(1, Ordering::SeqCst);
    }

    /// Replace the store with a decoded snapshot
    ///
    /// The whole input is decoded and validated before anything is swapped,
    /// so on error the store is left untouched.
    pub fn import_snapshot(&self, data: &[u8]) -> Result<()> {
        let snapshot: Snapshot = serde_json::from_slice(data).map_err(AnalyzerError::Decode)?;

        let mut groups = HashMap::with_capacity(snapshot.len());
        for (raw_key, elements) in snapshot {
            let key: OwnerKey = raw_key.parse()?;
            for element in &elements {
                element.validate()?;
                let record_key = element.owner_key();
                if record_key != key {
                    return Err(AnalyzerError::OwnerKeyMismatch {
                        key: raw_key,
                        record_key: record_key.to_string(),
                    });
                }
            }
            if !elements.is_empty() {
                groups.entry(key).or_insert_with(Vec::new).extend(elements);
            }
        }

        let owners = groups.len();
        let records: usize = groups.values().map(Vec::len).sum();
        *self.write() = groups;
        self.generation.fetch_add(1, Ordering::SeqCst);

        debug!(owners, records, "Snapshot loaded into record store");
        Ok(())
    }

    /// Serialize the store, owner keys sorted
    pub fn export_snapshot(&self) -> Result<Vec<u8>> {
        let snapshot: Snapshot = self
            .read()
            .iter()
            .map(|(key, elements)| (key.to_string(), elements.clone()))
            .collect();
        serde_json::to_vec(&snapshot).map_err(AnalyzerError::Encode)
    }

    /// Load a snapshot file, replacing the store
    pub fn import_snapshot_file(&self, path: &Path) -> Result<()> {
        let data = std::fs::read(path)?;
        self.import_snapshot(&data)?;
        info!(path = %path.display(), owners = self.owner_count(), "Imported snapshot file");
        Ok(())
    }

    /// Write the store to a snapshot file atomically
    pub fn export_snapshot_file(&self, path: &Path) -> Result<()> {
        let json = self.export_snapshot()?;

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let temp_path = path.with_extension("tmp");
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&temp_path)?;
        file.write_all(&json)?;
        file.sync_all()?;
        std::fs::rename(&temp_path, path)?;

        info!(path = %path.display(), bytes = json.len(), "Exported snapshot file");
        Ok(())
    }
}
