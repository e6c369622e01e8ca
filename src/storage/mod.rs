use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use thiserror::Error;

const APP_DATA_SUBDIR: &str = "shotpad";
const PICTURES_SUBDIR: &str = "Pictures";
const DEFAULT_FALLBACK_DOWNLOAD_NAME: &str = "download.png";
const ENTRY_FILE_EXTENSION: &str = "json";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("HOME environment variable is not set")]
    MissingHomeDirectory,
    #[error("storage key is empty")]
    EmptyKey,
    #[error("failed to encode value for key {key}: {source}")]
    Encode {
        key: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("storage io error: {0}")]
    Io(#[from] io::Error),
}

pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// String-valued key-value persistence behind the history and handoff layers.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> StorageResult<Option<String>>;
    fn set(&self, key: &str, value: &str) -> StorageResult<()>;
    fn remove(&self, key: &str) -> StorageResult<()>;
}

/// Stores each key as one file under a data directory.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    root: PathBuf,
}

impl JsonFileStore {
    pub const fn with_root(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn with_default_root() -> StorageResult<Self> {
        let root = default_data_root()?;
        fs::create_dir_all(&root)?;
        Ok(Self::with_root(root))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn entry_path(&self, key: &str) -> StorageResult<PathBuf> {
        if key.is_empty() {
            return Err(StorageError::EmptyKey);
        }
        let mut path = self.root.clone();
        path.push(format!("{key}.{ENTRY_FILE_EXTENSION}"));
        Ok(path)
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        let path = self.entry_path(key)?;
        match fs::read_to_string(&path) {
            Ok(contents) => Ok(Some(contents)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(StorageError::Io(err)),
        }
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        let path = self.entry_path(key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        // Stage next to the target so a failed write never truncates the live entry.
        let staged = path.with_extension(format!("{ENTRY_FILE_EXTENSION}.tmp"));
        fs::write(&staged, value)?;
        fs::rename(&staged, &path)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        let path = self.entry_path(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(StorageError::Io(err)),
        }
    }
}

/// Ephemeral store; clones share one backing map.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Rc<RefCell<HashMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        if key.is_empty() {
            return Err(StorageError::EmptyKey);
        }
        Ok(self.entries.borrow().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        if key.is_empty() {
            return Err(StorageError::EmptyKey);
        }
        self.entries
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        if key.is_empty() {
            return Err(StorageError::EmptyKey);
        }
        self.entries.borrow_mut().remove(key);
        Ok(())
    }
}

/// Writes finished exports into the user's pictures directory.
#[derive(Debug, Clone)]
pub struct DownloadSink {
    pictures_dir: PathBuf,
}

impl DownloadSink {
    pub const fn with_dir(pictures_dir: PathBuf) -> Self {
        Self { pictures_dir }
    }

    pub fn with_default_dir() -> StorageResult<Self> {
        let home = std::env::var("HOME").map_err(|_| StorageError::MissingHomeDirectory)?;
        let mut pictures_dir = PathBuf::from(home);
        pictures_dir.push(PICTURES_SUBDIR);
        fs::create_dir_all(&pictures_dir)?;
        Ok(Self::with_dir(pictures_dir))
    }

    pub fn pictures_dir(&self) -> &Path {
        &self.pictures_dir
    }

    pub fn write_png(&self, file_name: &str, png_bytes: &[u8]) -> StorageResult<PathBuf> {
        let mut path = self.pictures_dir.clone();
        path.push(sanitize_download_name(file_name));
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, png_bytes)?;
        Ok(path)
    }
}

fn sanitize_download_name(file_name: &str) -> String {
    let cleaned = file_name
        .trim()
        .replace(['/', '\\'], "-")
        .trim_matches('.')
        .to_string();
    if cleaned.is_empty() {
        return DEFAULT_FALLBACK_DOWNLOAD_NAME.to_string();
    }
    if is_png_name(&cleaned) {
        cleaned
    } else {
        format!("{cleaned}.png")
    }
}

fn is_png_name(name: &str) -> bool {
    Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("png"))
}

fn default_data_root() -> StorageResult<PathBuf> {
    if let Some(xdg) = std::env::var_os("XDG_DATA_HOME").filter(|dir| !dir.is_empty()) {
        let mut root = PathBuf::from(xdg);
        root.push(APP_DATA_SUBDIR);
        return Ok(root);
    }

    let home = std::env::var("HOME").map_err(|_| StorageError::MissingHomeDirectory)?;
    let mut root = PathBuf::from(home);
    root.push(".local/share");
    root.push(APP_DATA_SUBDIR);
    Ok(root)
}
