//! # Cart Persistence
//!
//! Durable key-value mirror of the cart.
//!
//! ```text
//!   CartStore ──save(items)──▶ PersistenceAdapter ──write(key, json)──▶ SnapshotBackend
//!             ◀──load()─────                      ◀──read(key)────────   ├── MemoryBackend
//!                                                                         └── FileBackend
//! ```
//!
//! Backends report failures as [`PersistenceError`]; the adapter logs them and
//! degrades (an unreadable snapshot loads as an empty cart, a failed write is
//! dropped). Nothing in here ever fails the caller.

use crate::cart::CartItem;
use crate::error::PersistenceError;
use crate::product::ProductSnapshot;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use std::collections::HashMap;
#[cfg(feature = "fs")]
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

/// Key the cart snapshot is stored under
pub const CART_SNAPSHOT_KEY: &str = "cart";

/// Raw key-value storage for snapshots
#[async_trait]
pub trait SnapshotBackend: Send + Sync {
    /// Read the value stored under `key`, `None` if nothing was ever written.
    async fn read(&self, key: &str) -> Result<Option<String>, PersistenceError>;

    /// Replace the value stored under `key`.
    async fn write(&self, key: &str, value: String) -> Result<(), PersistenceError>;

    /// Backend name (for logging)
    fn name(&self) -> &'static str;
}

/// Process-local backend, mostly for tests and ephemeral sessions
#[derive(Debug, Default)]
pub struct MemoryBackend {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a raw value (e.g. a hand-written or corrupt snapshot)
    pub fn with_entry(key: impl Into<String>, value: impl Into<String>) -> Self {
        let mut entries = HashMap::new();
        entries.insert(key.into(), value.into());
        Self {
            entries: Mutex::new(entries),
        }
    }

    /// Current raw value under `key`
    pub async fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().await.get(key).cloned()
    }
}

#[async_trait]
impl SnapshotBackend for MemoryBackend {
    async fn read(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        Ok(self.entries.lock().await.get(key).cloned())
    }

    async fn write(&self, key: &str, value: String) -> Result<(), PersistenceError> {
        self.entries.lock().await.insert(key.to_string(), value);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

/// One JSON file per key inside a data directory
#[cfg(feature = "fs")]
#[derive(Debug, Clone)]
pub struct FileBackend {
    dir: PathBuf,
}

#[cfg(feature = "fs")]
impl FileBackend {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

#[cfg(feature = "fs")]
#[async_trait]
impl SnapshotBackend for FileBackend {
    async fn read(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        match tokio::fs::read_to_string(self.path_for(key)).await {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn write(&self, key: &str, value: String) -> Result<(), PersistenceError> {
        tokio::fs::create_dir_all(&self.dir).await?;

        // Write-then-rename so a crash mid-write never leaves a torn snapshot.
        let path = self.path_for(key);
        let tmp = self.dir.join(format!("{}.json.tmp", key));
        tokio::fs::write(&tmp, value).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "file"
    }
}

/// Loads and saves cart snapshots, never failing the caller
#[derive(Clone)]
pub struct PersistenceAdapter {
    backend: Arc<dyn SnapshotBackend>,
    key: String,
}

impl PersistenceAdapter {
    /// Adapter over `backend` using the default cart key
    pub fn new(backend: Arc<dyn SnapshotBackend>) -> Self {
        Self {
            backend,
            key: CART_SNAPSHOT_KEY.to_string(),
        }
    }

    /// In-memory adapter
    pub fn memory() -> Self {
        Self::new(Arc::new(MemoryBackend::new()))
    }

    /// File adapter rooted at `dir`
    #[cfg(feature = "fs")]
    pub fn file(dir: impl Into<PathBuf>) -> Self {
        Self::new(Arc::new(FileBackend::new(dir)))
    }

    /// Builder: store under a different key (e.g. one cart per user)
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Read and normalize the snapshot. Missing or corrupt data loads as empty.
    pub async fn load(&self) -> Vec<CartItem> {
        match self.backend.read(&self.key).await {
            Ok(Some(raw)) => {
                let items = normalize_snapshot(&raw);
                info!(
                    backend = self.backend.name(),
                    items = items.len(),
                    "Loaded cart snapshot"
                );
                items
            }
            Ok(None) => {
                debug!(backend = self.backend.name(), "No cart snapshot found");
                Vec::new()
            }
            Err(e) => {
                error!(backend = self.backend.name(), "Failed to read cart snapshot: {}", e);
                Vec::new()
            }
        }
    }

    /// Overwrite the snapshot with `items`. Errors are logged, not returned.
    pub async fn save(&self, items: &[CartItem]) {
        let encoded = match serde_json::to_string(items) {
            Ok(encoded) => encoded,
            Err(e) => {
                error!("Failed to encode cart snapshot: {}", e);
                return;
            }
        };

        if let Err(e) = self.backend.write(&self.key, encoded).await {
            error!(backend = self.backend.name(), "Failed to write cart snapshot: {}", e);
        } else {
            debug!(backend = self.backend.name(), items = items.len(), "Saved cart snapshot");
        }
    }
}

impl std::fmt::Debug for PersistenceAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersistenceAdapter")
            .field("backend", &self.backend.name())
            .field("key", &self.key)
            .finish()
    }
}

// =============================================================================
// Snapshot Normalization
// =============================================================================

/// Parse a raw snapshot leniently.
///
/// Prices and quantities are coerced to finite numbers (0 when unusable), a
/// finite stored `totalPrice` is kept and otherwise recomputed, and entries
/// without `id`/`productId` or with a quantity below 1 are dropped.
pub fn normalize_snapshot(raw: &str) -> Vec<CartItem> {
    let value: Value = match serde_json::from_str(raw) {
        Ok(value) => value,
        Err(e) => {
            warn!("Cart snapshot is not valid JSON, starting empty: {}", e);
            return Vec::new();
        }
    };

    let Value::Array(entries) = value else {
        warn!("Cart snapshot is not a list, starting empty");
        return Vec::new();
    };

    entries
        .iter()
        .enumerate()
        .filter_map(|(index, entry)| {
            let item = normalize_entry(entry);
            if item.is_none() {
                warn!(index, "Dropping invalid cart snapshot entry");
            }
            item
        })
        .collect()
}

fn normalize_entry(entry: &Value) -> Option<CartItem> {
    let obj = entry.as_object()?;
    let id = coerce_id(obj.get("id"))?;
    let product_id = coerce_id(obj.get("productId"))?;

    let raw_quantity = coerce_number(obj.get("quantity")).trunc();
    if raw_quantity <= 0.0 {
        return None;
    }
    let quantity = if raw_quantity >= f64::from(u32::MAX) {
        u32::MAX
    } else {
        raw_quantity as u32
    };

    let snapshot = obj.get("productSnapshot").and_then(Value::as_object);
    let product_snapshot = normalize_snapshot_fields(snapshot, &product_id);

    let total_price = match obj.get("totalPrice").and_then(Value::as_f64) {
        Some(stored) if stored.is_finite() => stored,
        _ => product_snapshot.unit_price * f64::from(quantity),
    };

    Some(CartItem {
        id,
        product_id,
        product_snapshot,
        quantity,
        total_price,
        added_at: coerce_timestamp(obj.get("addedAt")),
    })
}

fn normalize_snapshot_fields(snapshot: Option<&Map<String, Value>>, product_id: &str) -> ProductSnapshot {
    let text = |key: &str| -> String {
        snapshot
            .and_then(|s| s.get(key))
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    };

    let images = snapshot
        .and_then(|s| s.get("images"))
        .and_then(Value::as_array)
        .map(|images| {
            images
                .iter()
                .filter_map(|v| v.as_str().map(String::from))
                .collect()
        })
        .unwrap_or_default();

    ProductSnapshot {
        id: coerce_id(snapshot.and_then(|s| s.get("id"))).unwrap_or_else(|| product_id.to_string()),
        name: text("name"),
        unit_price: coerce_number(snapshot.and_then(|s| s.get("unitPrice"))),
        unit: text("unit"),
        images,
        farmer_name: text("farmerName"),
        business_name: text("businessName"),
        location: text("location"),
    }
}

/// Numbers and numeric strings become finite `f64`; anything else is 0.
fn coerce_number(value: Option<&Value>) -> f64 {
    let number = match value {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.trim().parse::<f64>().unwrap_or(0.0),
        _ => 0.0,
    };
    if number.is_finite() {
        number
    } else {
        0.0
    }
}

fn coerce_id(value: Option<&Value>) -> Option<String> {
    match value {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    }
}

fn coerce_timestamp(value: Option<&Value>) -> DateTime<Utc> {
    match value {
        Some(Value::String(s)) => DateTime::parse_from_rfc3339(s)
            .map(|ts| ts.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now()),
        Some(Value::Number(n)) => n
            .as_i64()
            .and_then(DateTime::from_timestamp_millis)
            .unwrap_or_else(Utc::now),
        _ => Utc::now(),
    }
}
