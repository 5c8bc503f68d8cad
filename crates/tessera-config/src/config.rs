//! Configuration structs with sensible defaults and RON persistence.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// File name of the engine configuration inside the config directory.
pub const CONFIG_FILE_NAME: &str = "engine.ron";

/// Top-level engine configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// World identity: seed and terrain profile document.
    pub world: WorldConfig,
    /// Chunk cache settings.
    pub cache: CacheConfig,
    /// Background generation pool settings.
    pub workers: WorkerConfig,
    /// Debug/development settings.
    pub debug: DebugConfig,
}

/// World settings shared by every chunk request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WorldConfig {
    /// World seed. Identical seeds and profiles reproduce identical terrain.
    pub seed: u32,
    /// Path to the terrain profile document (`terrain_types` +
    /// `generation_parameters`). Relative paths resolve against the config
    /// directory.
    pub profile_path: PathBuf,
}

/// Which entry a full cache gives up on insertion.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum CachePolicy {
    /// Evict the entry inserted longest ago (FIFO).
    InsertionOrder,
    /// Evict the entry read or written longest ago.
    #[default]
    LeastRecentlyUsed,
}

/// Chunk cache configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum number of chunks held in memory. `0` disables caching.
    pub capacity: usize,
    /// Eviction policy once `capacity` is reached.
    pub policy: CachePolicy,
}

/// Worker pool configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WorkerConfig {
    /// Number of generation threads. `0` picks a count from the CPU cores.
    pub threads: usize,
    /// Maximum queued requests before submissions are rejected.
    pub max_concurrent: usize,
    /// Capacity of the completed-chunk channel.
    pub result_capacity: usize,
}

/// Debug/development configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DebugConfig {
    /// Log level override (e.g., "debug", "info", "warn").
    pub log_level: String,
    /// Write a JSON log file next to the config in debug builds.
    pub log_to_file: bool,
}

// --- Default implementations ---

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            seed: 12345,
            profile_path: PathBuf::from("terrain.ron"),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: 256,
            policy: CachePolicy::default(),
        }
    }
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            threads: 0,
            max_concurrent: 64,
            result_capacity: 128,
        }
    }
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_to_file: true,
        }
    }
}

impl Config {
    /// Read `engine.ron` from `config_dir`, writing the defaults there first
    /// if the file does not exist yet.
    pub fn load_or_create(config_dir: &Path) -> Result<Self, ConfigError> {
        let path = config_dir.join(CONFIG_FILE_NAME);
        if !path.exists() {
            let config = Config::default();
            config.save(config_dir)?;
            log::info!("Wrote default engine settings to {}", path.display());
            return Ok(config);
        }

        let config = Self::read(&path)?;
        log::info!("Engine settings loaded from {}", path.display());
        Ok(config)
    }

    /// Write `engine.ron` into `config_dir`, creating the directory.
    pub fn save(&self, config_dir: &Path) -> Result<(), ConfigError> {
        let path = config_dir.join(CONFIG_FILE_NAME);
        let write_err = |source| ConfigError::Write {
            path: path.clone(),
            source,
        };
        std::fs::create_dir_all(config_dir).map_err(write_err)?;

        let pretty = ron::ser::PrettyConfig::new()
            .depth_limit(2)
            .struct_names(false)
            .separate_tuple_members(false);
        let text = ron::ser::to_string_pretty(self, pretty)?;
        std::fs::write(&path, text).map_err(write_err)
    }

    /// Reject settings that parse but cannot drive an engine.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.world.profile_path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid {
                field: "world.profile_path",
                reason: "must name a file".to_owned(),
            });
        }
        if self.workers.max_concurrent == 0 {
            return Err(ConfigError::Invalid {
                field: "workers.max_concurrent",
                reason: "must allow at least one queued request".to_owned(),
            });
        }
        if self.workers.result_capacity == 0 {
            return Err(ConfigError::Invalid {
                field: "workers.result_capacity",
                reason: "must hold at least one result".to_owned(),
            });
        }
        Ok(())
    }

    fn read(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Config = ron::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Resolve the terrain profile document path against `config_dir`.
    ///
    /// Absolute paths are returned unchanged.
    pub fn profile_path(&self, config_dir: &Path) -> PathBuf {
        if self.world.profile_path.is_absolute() {
            self.world.profile_path.clone()
        } else {
            config_dir.join(&self.world.profile_path)
        }
    }

    /// Default configuration directory (`<platform config dir>/tessera`).
    pub fn default_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("tessera"))
    }
}
