//! Hot-reloadable owner of the active profile snapshot.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::SystemTime;

use super::{ConfigValidationError, RegistrySnapshot, TerrainDocument, TerrainProfile};

/// Holds the active [`RegistrySnapshot`] and swaps it atomically on reload.
///
/// Readers clone the `Arc` and keep a consistent view for as long as they
/// hold it; a concurrent reload never mutates a snapshot in place.
#[derive(Debug)]
pub struct ProfileRegistry {
    current: RwLock<Arc<RegistrySnapshot>>,
    source: Option<PathBuf>,
    /// Modification time of the last document read from `source`. Held for
    /// the whole read-and-swap so swaps happen in modification order.
    last_modified: Mutex<Option<SystemTime>>,
    /// Set while `source` cannot be stat'ed, so the failure is logged once.
    source_unreadable: AtomicBool,
}

impl ProfileRegistry {
    /// Registry over an in-process document. [`refresh`](Self::refresh) is a no-op.
    pub fn from_document(doc: &TerrainDocument) -> Result<Self, ConfigValidationError> {
        let mut snapshot = RegistrySnapshot::from_document(doc)?;
        snapshot.version = 1;
        tracing::info!(
            profiles = snapshot.len(),
            "Terrain profiles loaded (version 1)"
        );
        Ok(Self {
            current: RwLock::new(Arc::new(snapshot)),
            source: None,
            last_modified: Mutex::new(None),
            source_unreadable: AtomicBool::new(false),
        })
    }

    /// Registry over a RON document held in memory.
    pub fn from_ron(text: &str) -> Result<Self, ConfigValidationError> {
        Self::from_document(&TerrainDocument::from_ron(text)?)
    }

    /// Registry backed by a file; [`refresh`](Self::refresh) re-reads it
    /// whenever its modification time advances.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigValidationError> {
        let path = path.as_ref();
        let modified = modified_time(path)?;
        let text = read_source(path)?;
        let mut registry = Self::from_ron(&text)?;
        registry.source = Some(path.to_path_buf());
        *registry
            .last_modified
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner) = Some(modified);
        Ok(registry)
    }

    /// The active snapshot.
    pub fn snapshot(&self) -> Arc<RegistrySnapshot> {
        Arc::clone(&self.current.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Version of the active snapshot. Starts at 1 and grows by one per
    /// successful reload.
    pub fn version(&self) -> u64 {
        self.snapshot().version()
    }

    /// Backing file, if any.
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// Looks up a profile in the active snapshot.
    pub fn resolve(&self, name: &str) -> Option<Arc<TerrainProfile>> {
        self.snapshot().resolve(name)
    }

    /// Biome name chosen by the active snapshot for a climate sample.
    pub fn match_biome(
        &self,
        elevation: f64,
        temperature: f64,
        moisture: f64,
        jitter: f64,
    ) -> Option<String> {
        self.snapshot()
            .match_biome(elevation, temperature, moisture, jitter)
            .map(str::to_owned)
    }

    /// Validate `doc` and, if it passes, make it the active snapshot.
    ///
    /// Returns the new version. On error the active snapshot is untouched.
    pub fn reload(&self, doc: &TerrainDocument) -> Result<u64, ConfigValidationError> {
        let mut snapshot = RegistrySnapshot::from_document(doc)?;
        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
        snapshot.version = current.version() + 1;
        let version = snapshot.version;
        tracing::info!(
            profiles = snapshot.len(),
            "Terrain profiles swapped (version {version})"
        );
        *current = Arc::new(snapshot);
        Ok(version)
    }

    /// Parse and [`reload`](Self::reload) a RON document.
    pub fn reload_from_ron(&self, text: &str) -> Result<u64, ConfigValidationError> {
        self.reload(&TerrainDocument::from_ron(text)?)
    }

    /// Re-read the backing file if its modification time has advanced.
    ///
    /// Returns `Ok(true)` when a new snapshot became active. The observed
    /// modification time is remembered even when the new document is
    /// rejected, so a broken file is reported once rather than on every call.
    /// Concurrent callers are serialised, so an older document never replaces
    /// a newer one.
    pub fn refresh(&self) -> Result<bool, ConfigValidationError> {
        let Some(path) = self.source.as_deref() else {
            return Ok(false);
        };
        let mut last = self
            .last_modified
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let modified = match modified_time(path) {
            Ok(modified) => {
                self.source_unreadable.store(false, Ordering::Relaxed);
                modified
            }
            Err(err) => {
                if !self.source_unreadable.swap(true, Ordering::Relaxed) {
                    tracing::warn!("Terrain profiles unavailable: {err}");
                }
                return Err(err);
            }
        };
        if last.is_some_and(|seen| modified <= seen) {
            return Ok(false);
        }
        *last = Some(modified);

        read_source(path)
            .and_then(|text| self.reload_from_ron(&text))
            .inspect_err(|err| {
                tracing::warn!("Rejected terrain profiles from {}: {err}", path.display());
            })?;
        Ok(true)
    }
}

fn modified_time(path: &Path) -> Result<SystemTime, ConfigValidationError> {
    std::fs::metadata(path)
        .and_then(|meta| meta.modified())
        .map_err(|source| ConfigValidationError::Read {
            path: path.to_path_buf(),
            source,
        })
}

fn read_source(path: &Path) -> Result<String, ConfigValidationError> {
    std::fs::read_to_string(path).map_err(|source| ConfigValidationError::Read {
        path: path.to_path_buf(),
        source,
    })
}
