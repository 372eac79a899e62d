// crates/client/src/store.rs
//! Local stats persistence for the offline award path.
//!
//! The store is injected into [`crate::AwardProcessor`] so embedders and
//! tests pick their own backing; updates are read-modify-write under one
//! lock so concurrent awards cannot lose credit.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use ailab_types::LocalStats;

use crate::error::StoreError;

pub trait StatsStore: Send + Sync {
    fn load(&self) -> Result<LocalStats, StoreError>;

    /// Apply `f` to the current record atomically and persist the result.
    fn update(&self, f: &mut dyn FnMut(&mut LocalStats)) -> Result<LocalStats, StoreError>;
}

/// In-memory store for tests and short-lived embedders.
#[derive(Debug, Default)]
pub struct MemoryStatsStore {
    inner: Mutex<LocalStats>,
}

impl MemoryStatsStore {
    pub fn new(stats: LocalStats) -> Self {
        Self { inner: Mutex::new(stats) }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, LocalStats> {
        // A poisoned lock still holds a valid record.
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl StatsStore for MemoryStatsStore {
    fn load(&self) -> Result<LocalStats, StoreError> {
        Ok(self.lock().clone())
    }

    fn update(&self, f: &mut dyn FnMut(&mut LocalStats)) -> Result<LocalStats, StoreError> {
        let mut guard = self.lock();
        f(&mut guard);
        Ok(guard.clone())
    }
}

/// JSON file store under the user data directory.
///
/// A missing file reads as the default record; the file is created on the
/// first update.
#[derive(Debug)]
pub struct JsonStatsStore {
    path: PathBuf,
    guard: Mutex<()>,
}

impl JsonStatsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), guard: Mutex::new(()) }
    }

    /// `<data dir>/ailab/stats.json`.
    pub fn default_location() -> Result<Self, StoreError> {
        let dir = dirs::data_dir().ok_or(StoreError::NoDataDir)?;
        Ok(Self::new(dir.join("ailab").join("stats.json")))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<LocalStats, StoreError> {
        let bytes = match std::fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(LocalStats::default());
            }
            Err(e) => return Err(StoreError::Io { path: self.path.clone(), source: e }),
        };
        serde_json::from_slice(&bytes).map_err(|e| StoreError::Malformed {
            path: self.path.clone(),
            message: e.to_string(),
        })
    }

    fn write(&self, stats: &LocalStats) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| StoreError::Io { path: parent.to_path_buf(), source: e })?;
        }
        let json = serde_json::to_vec_pretty(stats).map_err(|e| StoreError::Malformed {
            path: self.path.clone(),
            message: e.to_string(),
        })?;
        std::fs::write(&self.path, json)
            .map_err(|e| StoreError::Io { path: self.path.clone(), source: e })
    }
}

impl StatsStore for JsonStatsStore {
    fn load(&self) -> Result<LocalStats, StoreError> {
        self.read()
    }

    fn update(&self, f: &mut dyn FnMut(&mut LocalStats)) -> Result<LocalStats, StoreError> {
        let _guard = match self.guard.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let mut stats = self.read()?;
        f(&mut stats);
        self.write(&stats)?;
        Ok(stats)
    }
}
