//! Persistent endpoint identity storage.
//!
//! This module provides a thread-safe store of accepted endpoint
//! fingerprints, keyed by `(host, port, identity type, scope)`. The store
//! persists to JSON at `~/.config/hostpin/known_identities.json`; every
//! mutating operation writes through immediately.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use std::time::SystemTime;

use anyhow::{Context, Result};
use identity::{IdentityType, Scope, StoredIdentity};
use serde::{Deserialize, Serialize};

/// Current on-disk format version.
const STORE_VERSION: u32 = 1;

/// Key identifying exactly one trust record.
///
/// At most one record exists per key; upserting replaces in place.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RecordKey {
    /// Endpoint hostname.
    pub host: String,
    /// Endpoint port.
    pub port: u16,
    /// Which kind of identity the record stores.
    pub identity_type: IdentityType,
    /// Global or per-connection scope.
    pub scope: Scope,
}

impl RecordKey {
    /// Creates a record key.
    pub fn new(
        host: impl Into<String>,
        port: u16,
        identity_type: IdentityType,
        scope: Scope,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            identity_type,
            scope,
        }
    }
}

/// The persisted unit of trust: one accepted fingerprint for one endpoint
/// in one scope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrustRecord {
    /// Endpoint hostname.
    pub host: String,
    /// Endpoint port.
    pub port: u16,
    /// Which kind of identity this record stores.
    pub identity_type: IdentityType,
    /// The currently accepted fingerprint and its timestamps.
    pub identity: StoredIdentity,
    /// User-supplied display label, independent of trust state.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nickname: Option<String>,
    /// Global or per-connection scope.
    pub scope: Scope,
}

impl TrustRecord {
    /// Creates a record with both timestamps set to now.
    pub fn new(
        host: impl Into<String>,
        port: u16,
        identity_type: IdentityType,
        fingerprint: impl Into<String>,
        scope: Scope,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            identity_type,
            identity: StoredIdentity::new(fingerprint),
            nickname: None,
            scope,
        }
    }

    /// Returns the key this record is stored under.
    pub fn key(&self) -> RecordKey {
        RecordKey::new(
            self.host.clone(),
            self.port,
            self.identity_type,
            self.scope.clone(),
        )
    }

    /// Structural validation applied on load. A record failing this check
    /// is treated as absent rather than crashing the lookup.
    fn is_structurally_valid(&self) -> bool {
        !self.host.is_empty()
            && !self.identity.fingerprint.is_empty()
            && self.identity.is_consistent()
    }
}

/// Wrapper for serializing the store file.
#[derive(Debug, Serialize)]
struct TrustStoreData<'a> {
    /// Version of the store format (for future migrations).
    version: u32,
    /// The records in the store.
    records: Vec<&'a TrustRecord>,
}

/// Thread-safe persistent store of trust records.
///
/// Uses a `RwLock<HashMap>` for concurrent access and persists to JSON for
/// durability across restarts. Read-then-decide-then-write sequences around
/// verification are serialized one level up, in the service.
pub struct TrustStore {
    /// The path to the JSON file.
    path: PathBuf,
    /// The records, keyed by endpoint and scope.
    records: RwLock<HashMap<RecordKey, TrustRecord>>,
}

impl TrustStore {
    /// Creates a trust store that will persist to the given path.
    ///
    /// This does not load the file; call `load()` to read existing data.
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            records: RwLock::new(HashMap::new()),
        }
    }

    /// Creates a trust store using the default path,
    /// `~/.config/hostpin/known_identities.json`.
    pub fn with_default_path() -> Self {
        Self::new(default_store_path())
    }

    /// Returns the path to the store file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the store from the JSON file.
    ///
    /// A missing file leaves the store empty. A file that is not valid JSON
    /// at all is an error; individual records that fail structural
    /// validation (missing host or fingerprint, inverted timestamps) are
    /// skipped with a warning and treated as absent.
    pub fn load(&self) -> Result<()> {
        if !self.path.exists() {
            tracing::debug!("Trust store file not found at {:?}, starting empty", self.path);
            return Ok(());
        }

        let contents = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read trust store: {}", self.path.display()))?;

        let data: serde_json::Value = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse trust store: {}", self.path.display()))?;

        let raw_records = data
            .get("records")
            .and_then(|r| r.as_array())
            .cloned()
            .unwrap_or_default();

        let mut records = self
            .records
            .write()
            .map_err(|_| anyhow::anyhow!("Failed to acquire write lock on trust store"))?;

        records.clear();
        let mut skipped = 0usize;
        for value in raw_records {
            match serde_json::from_value::<TrustRecord>(value) {
                Ok(record) if record.is_structurally_valid() => {
                    records.insert(record.key(), record);
                }
                Ok(record) => {
                    skipped += 1;
                    tracing::warn!(
                        host = %record.host,
                        port = record.port,
                        "Skipping structurally invalid trust record"
                    );
                }
                Err(err) => {
                    skipped += 1;
                    tracing::warn!("Skipping unparseable trust record: {}", err);
                }
            }
        }

        tracing::info!(
            "Loaded {} trust records from {:?} ({} skipped)",
            records.len(),
            self.path,
            skipped
        );
        Ok(())
    }

    /// Saves the store to the JSON file.
    ///
    /// Uses atomic write (write to temp file, then rename) to prevent
    /// corruption. Creates parent directories if they don't exist.
    fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create trust store directory: {}", parent.display())
            })?;
        }

        let records = self
            .records
            .read()
            .map_err(|_| anyhow::anyhow!("Failed to acquire read lock on trust store"))?;

        let data = TrustStoreData {
            version: STORE_VERSION,
            records: records.values().collect(),
        };

        let contents =
            serde_json::to_string_pretty(&data).context("Failed to serialize trust store")?;

        let temp_path = self.path.with_extension("json.tmp");
        fs::write(&temp_path, &contents)
            .with_context(|| format!("Failed to write temp trust store: {}", temp_path.display()))?;

        fs::rename(&temp_path, &self.path).with_context(|| {
            format!(
                "Failed to rename temp trust store {} to {}",
                temp_path.display(),
                self.path.display()
            )
        })?;

        tracing::debug!("Saved {} trust records to {:?}", records.len(), self.path);
        Ok(())
    }

    /// Resolves the record applicable to a connection attempt.
    ///
    /// This is the single place the precedence rule lives: a
    /// connection-scoped record, if present for the given connection id,
    /// wins over a global record for the same endpoint.
    pub fn applicable_record(
        &self,
        host: &str,
        port: u16,
        identity_type: IdentityType,
        connection_id: Option<&str>,
    ) -> Option<TrustRecord> {
        let records = self.records.read().ok()?;

        if let Some(id) = connection_id {
            let key = RecordKey::new(host, port, identity_type, Scope::Connection(id.to_string()));
            if let Some(record) = records.get(&key) {
                return Some(record.clone());
            }
        }

        let key = RecordKey::new(host, port, identity_type, Scope::Global);
        records.get(&key).cloned()
    }

    /// Returns every record visible to a connection: its own
    /// connection-scoped records plus all global records. With no
    /// connection id, returns only global records.
    pub fn all_records(&self, connection_id: Option<&str>) -> Result<Vec<TrustRecord>> {
        let records = self
            .records
            .read()
            .map_err(|_| anyhow::anyhow!("Failed to acquire read lock on trust store"))?;

        Ok(records
            .values()
            .filter(|record| match &record.scope {
                Scope::Global => true,
                Scope::Connection(id) => connection_id == Some(id.as_str()),
            })
            .cloned()
            .collect())
    }

    /// Creates or replaces the record for the given key and persists.
    ///
    /// An existing record keeps its `first_seen` and nickname; the
    /// fingerprint is overwritten and `last_seen` refreshed. A new record
    /// gets both timestamps set to now.
    pub fn upsert(
        &self,
        host: &str,
        port: u16,
        identity_type: IdentityType,
        fingerprint: &str,
        scope: Scope,
    ) -> Result<TrustRecord> {
        let updated = {
            let mut records = self
                .records
                .write()
                .map_err(|_| anyhow::anyhow!("Failed to acquire write lock on trust store"))?;

            let key = RecordKey::new(host, port, identity_type, scope.clone());
            let record = records
                .entry(key)
                .and_modify(|record| {
                    record.identity.fingerprint = fingerprint.to_string();
                    record.identity.last_seen = SystemTime::now();
                })
                .or_insert_with(|| {
                    TrustRecord::new(host, port, identity_type, fingerprint, scope.clone())
                });

            tracing::info!(
                host = %record.host,
                port = record.port,
                identity_type = %record.identity_type,
                scope = %record.scope,
                "Recorded endpoint identity"
            );

            record.clone()
        };

        self.save()?;
        Ok(updated)
    }

    /// Deletes exactly the record matching the given scope
    /// (connection-scoped if a connection id is given, else global).
    ///
    /// Returns whether a record was removed; removing an absent key is a
    /// no-op, not an error.
    pub fn remove(
        &self,
        host: &str,
        port: u16,
        identity_type: IdentityType,
        connection_id: Option<&str>,
    ) -> Result<bool> {
        let removed = {
            let mut records = self
                .records
                .write()
                .map_err(|_| anyhow::anyhow!("Failed to acquire write lock on trust store"))?;

            let scope = match connection_id {
                Some(id) => Scope::Connection(id.to_string()),
                None => Scope::Global,
            };
            records
                .remove(&RecordKey::new(host, port, identity_type, scope))
                .is_some()
        };

        if removed {
            tracing::info!(host = %host, port = port, "Removed trust record");
            self.save()?;
        }
        Ok(removed)
    }

    /// Deletes all records in the given scope: a connection's scoped
    /// records, or all global records if no connection id is given.
    ///
    /// Returns how many records were removed.
    pub fn clear(&self, connection_id: Option<&str>) -> Result<usize> {
        let removed = {
            let mut records = self
                .records
                .write()
                .map_err(|_| anyhow::anyhow!("Failed to acquire write lock on trust store"))?;

            let before = records.len();
            records.retain(|key, _| match (&key.scope, connection_id) {
                (Scope::Global, None) => false,
                (Scope::Connection(id), Some(target)) => id != target,
                _ => true,
            });
            before - records.len()
        };

        if removed > 0 {
            tracing::info!(
                removed = removed,
                scope = connection_id.unwrap_or("global"),
                "Cleared trust records"
            );
            self.save()?;
        }
        Ok(removed)
    }

    /// Updates the display label of a record. Does not touch the
    /// fingerprint or timestamps. Passing `None` clears the label.
    ///
    /// Returns whether a matching record was found; no placeholder is
    /// created for a missing key.
    pub fn set_nickname(
        &self,
        host: &str,
        port: u16,
        identity_type: IdentityType,
        nickname: Option<&str>,
        connection_id: Option<&str>,
    ) -> Result<bool> {
        let found = {
            let mut records = self
                .records
                .write()
                .map_err(|_| anyhow::anyhow!("Failed to acquire write lock on trust store"))?;

            let scope = match connection_id {
                Some(id) => Scope::Connection(id.to_string()),
                None => Scope::Global,
            };
            match records.get_mut(&RecordKey::new(host, port, identity_type, scope)) {
                Some(record) => {
                    record.nickname = nickname.map(str::to_string);
                    true
                }
                None => false,
            }
        };

        if found {
            self.save()?;
        }
        Ok(found)
    }

    /// Returns the number of records in the store.
    pub fn len(&self) -> Result<usize> {
        let records = self
            .records
            .read()
            .map_err(|_| anyhow::anyhow!("Failed to acquire read lock on trust store"))?;
        Ok(records.len())
    }

    /// Returns true if the store is empty.
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}

/// Returns the default store path,
/// `~/.config/hostpin/known_identities.json`.
pub fn default_store_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("hostpin")
        .join("known_identities.json")
}
