//! The terrain engine: one world seed, one profile registry and one chunk
//! cache, passed explicitly to whoever generates terrain.

use std::path::Path;
use std::sync::Arc;

use tessera_config::Config;

use crate::biome::BiomeDescriptor;
use crate::cache::{CacheStats, ChunkCache, EvictionPolicy};
use crate::chunk::{Chunk, ChunkKey};
use crate::error::TerrainError;
use crate::generator::{ChunkGenerator, validate_request};
use crate::profile::{ConfigValidationError, ProfileRegistry};
use crate::raster::HeightmapImage;

/// Tunables of a [`TerrainEngine`] beyond the seed and profiles.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EngineOptions {
    /// Maximum cached chunks. `0` disables caching.
    pub cache_capacity: usize,
    pub eviction_policy: EvictionPolicy,
    /// Check the profile source for changes before each request.
    pub hot_reload: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            cache_capacity: 256,
            eviction_policy: EvictionPolicy::default(),
            hot_reload: true,
        }
    }
}

/// Generates, caches and rasterises chunks.
///
/// Safe to share between threads; every method takes `&self`.
#[derive(Debug)]
pub struct TerrainEngine {
    generator: ChunkGenerator,
    registry: Arc<ProfileRegistry>,
    cache: ChunkCache,
    options: EngineOptions,
}

impl TerrainEngine {
    pub fn new(seed: u32, registry: impl Into<Arc<ProfileRegistry>>, options: EngineOptions) -> Self {
        let registry = registry.into();
        tracing::info!(
            seed,
            profiles = registry.snapshot().len(),
            cache_capacity = options.cache_capacity,
            "Terrain engine ready"
        );
        Self {
            generator: ChunkGenerator::new(seed),
            registry,
            cache: ChunkCache::new(options.cache_capacity, options.eviction_policy),
            options,
        }
    }

    /// Build an engine from application settings. The profile path is
    /// resolved relative to `config_dir`.
    pub fn from_config(config: &Config, config_dir: &Path) -> Result<Self, ConfigValidationError> {
        let registry = ProfileRegistry::load(config.profile_path(config_dir))?;
        let options = EngineOptions {
            cache_capacity: config.cache.capacity,
            eviction_policy: config.cache.policy.into(),
            ..EngineOptions::default()
        };
        Ok(Self::new(config.world.seed, registry, options))
    }

    pub fn seed(&self) -> u32 {
        self.generator.seed()
    }

    pub fn registry(&self) -> &Arc<ProfileRegistry> {
        &self.registry
    }

    pub fn options(&self) -> EngineOptions {
        self.options
    }

    /// Pick up a changed profile file, if any. A rejected document is logged
    /// and the active profiles stay in place.
    pub fn refresh_profiles(&self) -> bool {
        match self.registry.refresh() {
            Ok(changed) => changed,
            Err(err) => {
                tracing::debug!("Keeping terrain profiles version {}: {err}", self.registry.version());
                false
            }
        }
    }

    /// Chunk `(x, z)` with `size × size` samples, from the cache when a chunk
    /// built from the active profiles is there.
    ///
    /// # Errors
    ///
    /// See [`ChunkGenerator::generate`].
    pub fn generate_chunk(&self, x: i64, z: i64, size: usize) -> Result<Arc<Chunk>, TerrainError> {
        validate_request(x, z, size)?;
        if self.options.hot_reload {
            self.refresh_profiles();
        }

        let snapshot = self.registry.snapshot();
        let key = ChunkKey::new(x, z, size);
        let version = snapshot.version();
        if let Some(chunk) = self.cache.get_where(&key, |c| c.config_version == version) {
            return Ok(chunk);
        }

        let chunk = Arc::new(self.generator.generate(&snapshot, x, z, size)?);
        self.cache.put(Arc::clone(&chunk));
        Ok(chunk)
    }

    /// Generate without touching the cache.
    pub fn generate_uncached(&self, x: i64, z: i64, size: usize) -> Result<Chunk, TerrainError> {
        self.generator.generate(&self.registry.snapshot(), x, z, size)
    }

    /// Raw RGBA bytes of a chunk's heightmap, `size * size * 4` long.
    pub fn generate_heightmap_image(&self, chunk: &Chunk) -> Vec<u8> {
        HeightmapImage::encode(chunk).into_bytes()
    }

    /// Biome of chunk `(x, z)` under the active profiles.
    pub fn classify(&self, x: i64, z: i64) -> Result<BiomeDescriptor, TerrainError> {
        self.generator
            .classifier()
            .classify(x, z, &self.registry.snapshot())
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }
}
