//! Bounded, newest-first persistence for edited images.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::geometry::PixelSize;
use crate::storage::{KeyValueStore, StorageError, StorageResult};

pub const HISTORY_STORAGE_KEY: &str = "imageEditorHistory";
const HISTORY_CAPACITY: usize = 100;
const FILE_SIZE_UNITS: &[&str] = &["Bytes", "KB", "MB", "GB"];

/// One persisted edit, self-contained: the payload is a PNG data url.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryRecord {
    pub id: String,
    pub name: String,
    pub data_url: String,
    pub created_at: u64,
    pub modified_at: u64,
    pub size: u64,
    pub dimensions: PixelSize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewHistoryRecord {
    pub name: String,
    pub data_url: String,
    pub dimensions: PixelSize,
}

/// Partial update; absent fields keep their stored values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HistoryUpdate {
    pub name: Option<String>,
    pub data_url: Option<String>,
    pub dimensions: Option<PixelSize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistorySort {
    Date,
    Name,
    Size,
}

#[derive(Debug)]
pub struct HistoryStore<S: KeyValueStore> {
    store: S,
}

impl<S: KeyValueStore> HistoryStore<S> {
    pub const fn new(store: S) -> Self {
        Self { store }
    }

    /// All records, newest first. Unreadable or corrupt storage degrades to empty.
    pub fn list(&self) -> Vec<HistoryRecord> {
        let raw = match self.store.get(HISTORY_STORAGE_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(err) => {
                tracing::warn!(?err, "failed to read history; treating as empty");
                return Vec::new();
            }
        };

        match serde_json::from_str(&raw) {
            Ok(records) => records,
            Err(err) => {
                tracing::warn!(?err, "failed to parse stored history; treating as empty");
                Vec::new()
            }
        }
    }

    pub fn get(&self, id: &str) -> Option<HistoryRecord> {
        self.list().into_iter().find(|record| record.id == id)
    }

    /// Prepends a new record, evicting the oldest past capacity, and returns it.
    pub fn save(&self, record: NewHistoryRecord) -> StorageResult<HistoryRecord> {
        let now = epoch_millis();
        let record = HistoryRecord {
            id: Uuid::new_v4().to_string(),
            name: record.name,
            size: record.data_url.len() as u64,
            data_url: record.data_url,
            created_at: now,
            modified_at: now,
            dimensions: record.dimensions,
        };

        let mut records = self.list();
        records.insert(0, record.clone());
        records.truncate(HISTORY_CAPACITY);
        self.persist(&records)?;

        tracing::debug!(id = %record.id, name = %record.name, "saved history record");
        Ok(record)
    }

    /// Merges `update` into the record with `id`; a missing id is a silent no-op.
    pub fn update(&self, id: &str, update: HistoryUpdate) -> StorageResult<()> {
        let mut records = self.list();
        let Some(record) = records.iter_mut().find(|record| record.id == id) else {
            tracing::debug!(id, "history update target not found");
            return Ok(());
        };

        if let Some(name) = update.name {
            record.name = name;
        }
        if let Some(data_url) = update.data_url {
            record.size = data_url.len() as u64;
            record.data_url = data_url;
        }
        if let Some(dimensions) = update.dimensions {
            record.dimensions = dimensions;
        }
        record.modified_at = epoch_millis();

        self.persist(&records)
    }

    /// Removes the record with `id`; a missing id is a silent no-op.
    pub fn delete(&self, id: &str) -> StorageResult<()> {
        let mut records = self.list();
        let before = records.len();
        records.retain(|record| record.id != id);
        if records.len() == before {
            tracing::debug!(id, "history delete target not found");
            return Ok(());
        }
        self.persist(&records)
    }

    fn persist(&self, records: &[HistoryRecord]) -> StorageResult<()> {
        let raw = serde_json::to_string(records).map_err(|source| StorageError::Encode {
            key: HISTORY_STORAGE_KEY.to_string(),
            source,
        })?;
        self.store.set(HISTORY_STORAGE_KEY, &raw)
    }
}

/// Case-insensitive name search plus ordering, for gallery views.
pub fn query_records(records: &[HistoryRecord], term: &str, sort: HistorySort) -> Vec<HistoryRecord> {
    let needle = term.to_lowercase();
    let mut matches: Vec<HistoryRecord> = records
        .iter()
        .filter(|record| record.name.to_lowercase().contains(&needle))
        .cloned()
        .collect();
    sort_records(&mut matches, sort);
    matches
}

pub fn sort_records(records: &mut [HistoryRecord], sort: HistorySort) {
    match sort {
        HistorySort::Date => records.sort_by(|a, b| b.modified_at.cmp(&a.modified_at)),
        HistorySort::Name => records.sort_by(|a, b| a.name.cmp(&b.name)),
        HistorySort::Size => records.sort_by(|a, b| b.size.cmp(&a.size)),
    }
}

pub fn format_file_size(bytes: u64) -> String {
    if bytes == 0 {
        return "0 Bytes".to_string();
    }
    let mut exponent = 0;
    let mut scaled = bytes;
    while scaled >= 1024 && exponent < FILE_SIZE_UNITS.len() - 1 {
        scaled /= 1024;
        exponent += 1;
    }
    let value = bytes as f64 / 1024f64.powi(exponent as i32);
    let rounded = (value * 100.0).round() / 100.0;
    format!("{rounded} {}", FILE_SIZE_UNITS[exponent])
}

fn epoch_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or(0)
}
