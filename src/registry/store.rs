//! In-memory dapp registry with JSON file persistence.
//!
//! Saves are serialized and replace the file atomically (write to a sibling
//! temp file, then rename). A record becomes visible only after it is on disk.

use std::ffi::OsString;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use dashmap::DashMap;
use tokio::sync::Mutex;

use crate::config::NetworkName;
use crate::registry::types::{DappItem, DappRecord, RegistryResult};
use crate::registry::DappRegistry;

/// A thread-safe registry keyed by (network, address).
#[derive(Clone, Default)]
pub struct InMemoryDappRegistry {
    inner: Arc<DashMap<(NetworkName, String), DappRecord>>,
    persistence_path: Option<PathBuf>,
    /// Held across snapshot, write and insert so saves land in order.
    save_lock: Arc<Mutex<()>>,
}

impl InMemoryDappRegistry {
    /// Create an empty registry.
    pub fn new(persistence_path: Option<PathBuf>) -> Self {
        Self {
            inner: Arc::new(DashMap::new()),
            persistence_path,
            save_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Load from `path` if it exists; later puts are saved back to it.
    pub fn load_from_file(path: impl AsRef<Path>) -> RegistryResult<Self> {
        let path = path.as_ref();
        let registry = Self::new(Some(path.to_path_buf()));
        if path.exists() {
            let reader = BufReader::new(File::open(path)?);
            let records: Vec<DappRecord> = serde_json::from_reader(reader)?;
            for record in records {
                registry
                    .inner
                    .insert((record.network, record.item.address.clone()), record);
            }
            tracing::info!(
                path = %path.display(),
                count = registry.inner.len(),
                "Loaded dapp registry"
            );
        }
        Ok(registry)
    }

    /// Current records with `pending` added or replaced, sorted by (network, address).
    fn records_with(&self, pending: &DappRecord) -> Vec<DappRecord> {
        let key = key_of(pending);
        let mut records: Vec<DappRecord> = self
            .inner
            .iter()
            .filter(|r| *r.key() != key)
            .map(|r| r.value().clone())
            .chain(std::iter::once(pending.clone()))
            .collect();
        records.sort_by(|a, b| (a.network, &a.item.address).cmp(&(b.network, &b.item.address)));
        records
    }

    /// Save the registry as it will be once `pending` is inserted.
    async fn persist(&self, pending: &DappRecord) -> RegistryResult<()> {
        let Some(path) = self.persistence_path.clone() else {
            return Ok(());
        };
        let records = self.records_with(pending);
        tokio::task::spawn_blocking(move || write_atomic(&path, &records)).await?
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl DappRegistry for InMemoryDappRegistry {
    async fn get(&self, address: &str, network: NetworkName) -> RegistryResult<Option<DappRecord>> {
        Ok(self
            .inner
            .get(&(network, address.to_string()))
            .map(|r| r.value().clone()))
    }

    async fn put(&self, item: DappItem, network: NetworkName) -> RegistryResult<DappRecord> {
        let registered_at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64;
        let record = DappRecord {
            item,
            network,
            registered_at,
        };

        let _guard = self.save_lock.lock().await;
        self.persist(&record).await?;
        self.inner.insert(key_of(&record), record.clone());
        Ok(record)
    }
}

fn key_of(record: &DappRecord) -> (NetworkName, String) {
    (record.network, record.item.address.clone())
}

/// Replace `path` with `records` via a sibling temp file and a rename.
fn write_atomic(path: &Path, records: &[DappRecord]) -> RegistryResult<()> {
    let mut tmp = OsString::from(path.as_os_str());
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    let file = File::create(&tmp)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, records)?;
    writer.flush()?;
    writer.get_ref().sync_all()?;
    std::fs::rename(&tmp, path)?;

    tracing::debug!(path = %path.display(), count = records.len(), "Saved dapp registry");
    Ok(())
}

impl std::fmt::Debug for InMemoryDappRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryDappRegistry")
            .field("records", &self.inner.len())
            .field("persistence_path", &self.persistence_path)
            .finish()
    }
}
