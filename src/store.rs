//! Non-volatile key/value settings and compass card persistence.

use std::collections::{BTreeMap, HashMap};
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::card::CompassCard;
use crate::config::COMPASS_CARD_KEY;
use crate::error::StoreError;

/// Byte values stored under string keys.
pub trait CardStore {
    fn put(&mut self, key: &str, bytes: &[u8]) -> Result<(), StoreError>;

    /// `Ok(None)` when nothing was stored under `key`.
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;
}

/// In-process store, lost on exit.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: HashMap<String, Vec<u8>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CardStore for MemoryStore {
    fn put(&mut self, key: &str, bytes: &[u8]) -> Result<(), StoreError> {
        self.values.insert(key.to_string(), bytes.to_vec());
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.values.get(key).cloned())
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Settings {
    values: BTreeMap<String, Vec<u8>>,
}

/// Settings kept as one JSON file.
///
/// Every `put` writes the whole file next to the old one and renames it into
/// place, so an interrupted write leaves the previous settings readable.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<Settings, StoreError> {
        if !self.path.exists() {
            return Ok(Settings::default());
        }
        let json = fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&json)?)
    }

    /// Sibling of the settings file that new contents are staged in.
    fn staging_path(&self) -> PathBuf {
        let mut name = OsString::from(self.path.as_os_str());
        name.push(".tmp");
        PathBuf::from(name)
    }
}

impl CardStore for FileStore {
    fn put(&mut self, key: &str, bytes: &[u8]) -> Result<(), StoreError> {
        let mut settings = self.load()?;
        settings.values.insert(key.to_string(), bytes.to_vec());
        let json = serde_json::to_string_pretty(&settings)?;

        let staging = self.staging_path();
        let mut file = File::create(&staging)?;
        file.write_all(json.as_bytes())?;
        file.sync_all()?;
        drop(file);
        fs::rename(&staging, &self.path)?;
        debug!("stored {} bytes under {key:?} in {}", bytes.len(), self.path.display());
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.load()?.values.remove(key))
    }
}

impl CompassCard {
    pub fn save(&self, store: &mut impl CardStore) -> Result<(), StoreError> {
        store.put(COMPASS_CARD_KEY, &self.to_bytes())?;
        info!("compass card saved");
        Ok(())
    }

    /// Load the saved card. Fails with [`StoreError::Missing`] if none was
    /// ever saved.
    pub fn load(store: &impl CardStore) -> Result<Self, StoreError> {
        let bytes = store
            .get(COMPASS_CARD_KEY)?
            .ok_or_else(|| StoreError::Missing(COMPASS_CARD_KEY.to_string()))?;
        CompassCard::from_bytes(&bytes)
    }
}
