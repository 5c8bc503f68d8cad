//! Procedural terrain heightmaps for a chunked world: noise synthesis, biome
//! classification, data-driven terrain profiles, seam-free chunk generation,
//! post-processing, caching, and raster encoding.

mod async_generation;
mod biome;
mod blend;
mod cache;
mod chunk;
mod engine;
mod error;
mod generator;
mod postprocess;
mod raster;

pub mod noise;
pub mod profile;
pub mod seed;

pub use async_generation::{ChunkRequest, ChunkWorkerPool, GeneratedChunk};
pub use biome::{BiomeClassifier, BiomeDescriptor, ClimateSample};
pub use blend::{AxisBlend, EdgeBlender};
pub use cache::{CacheStats, ChunkCache, EvictionPolicy};
pub use chunk::{Chunk, ChunkKey, HeightGrid};
pub use engine::{EngineOptions, TerrainEngine};
pub use error::TerrainError;
pub use generator::{ChunkField, ChunkGenerator, MAX_CHUNK_SIZE, chunk_origin};
pub use postprocess::{EROSION_RATE, PostProcessor};
pub use profile::{
    BiomeCondition, BiomeConditions, ConfigValidationError, GenerationParameters, HeightRange,
    ProfileRegistry, ProfileSpec, RegistrySnapshot, TerrainDocument, TerrainProfile,
};
pub use raster::{HeightmapImage, RasterError};
