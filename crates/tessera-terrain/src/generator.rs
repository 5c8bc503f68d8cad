//! Chunk generation: per-chunk height fields, seam blending, and
//! post-processing into a finished [`Chunk`].

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::biome::{BiomeClassifier, BiomeDescriptor};
use crate::blend::{EdgeBlender, Neighbourhood};
use crate::chunk::Chunk;
use crate::error::TerrainError;
use crate::noise::NoiseSource;
use crate::postprocess::PostProcessor;
use crate::profile::{HeightRange, RegistrySnapshot, TerrainProfile};
use crate::seed::{algorithm_seed, chunk_hash, det_cos, det_sin};

/// Largest accepted chunk edge length.
pub const MAX_CHUNK_SIZE: usize = 4096;

/// World coordinates stay exactly representable in an `f64` below this.
const MAX_WORLD_COORD: i64 = 1 << 52;

const VARIATION_FREQ_X: f64 = 0.7;
const VARIATION_FREQ_Z: f64 = 1.3;
const LOCAL_FREQUENCY: f64 = 0.15;
const LOCAL_SEED_SALT: u32 = 0x5EED_0C41;

/// World coordinate of cell `(0, 0)` of a chunk.
///
/// Chunks share their edge samples: the stride between chunk origins is
/// `size - 1`, so the last column of chunk `x` and the first column of chunk
/// `x + 1` are the same world points.
pub fn chunk_origin(chunk_x: i64, chunk_z: i64, size: usize) -> (i64, i64) {
    let stride = chunk_stride(size);
    (chunk_x * stride, chunk_z * stride)
}

fn chunk_stride(size: usize) -> i64 {
    size.saturating_sub(1).max(1) as i64
}

pub(crate) fn validate_request(chunk_x: i64, chunk_z: i64, size: usize) -> Result<(), TerrainError> {
    if size == 0 {
        return Err(TerrainError::InvalidChunkRequest(
            "chunk size must be positive".to_owned(),
        ));
    }
    if size > MAX_CHUNK_SIZE {
        return Err(TerrainError::InvalidChunkRequest(format!(
            "chunk size {size} exceeds maximum {MAX_CHUNK_SIZE}"
        )));
    }
    // The neighbour ring reaches one chunk further out on each axis.
    let stride = chunk_stride(size);
    for (axis, coord) in [("x", chunk_x), ("z", chunk_z)] {
        let reach = coord
            .checked_abs()
            .and_then(|c| c.checked_add(1))
            .and_then(|c| c.checked_mul(stride))
            .and_then(|c| c.checked_add(size as i64));
        if reach.is_none_or(|r| r > MAX_WORLD_COORD) {
            return Err(TerrainError::InvalidChunkRequest(format!(
                "chunk {axis} coordinate {coord} is outside the representable world"
            )));
        }
    }
    Ok(())
}

/// The height function of one chunk before blending: its biome, profile,
/// seeds and per-chunk variation are fixed, and any world point can be
/// evaluated.
#[derive(Debug)]
pub struct ChunkField {
    chunk_x: i64,
    chunk_z: i64,
    biome: BiomeDescriptor,
    profile: Arc<TerrainProfile>,
    chunk_seed: u32,
    /// One noise source per profile algorithm, seeded with its sub-seed.
    sources: Vec<NoiseSource>,
    local: NoiseSource,
    variation: f64,
    local_amplitude: f64,
}

impl ChunkField {
    /// Classify chunk `(chunk_x, chunk_z)` and bind its profile and seeds.
    ///
    /// # Errors
    ///
    /// [`TerrainError::ProfileNotFound`] when the chunk's biome has no
    /// profile in `snapshot`.
    pub fn build(
        classifier: &BiomeClassifier,
        snapshot: &RegistrySnapshot,
        chunk_x: i64,
        chunk_z: i64,
    ) -> Result<Self, TerrainError> {
        let biome = classifier.classify(chunk_x, chunk_z, snapshot)?;
        let profile = snapshot
            .resolve(&biome.name)
            .ok_or_else(|| TerrainError::ProfileNotFound(biome.name.clone()))?;
        let params = snapshot.parameters();

        let chunk_seed = chunk_hash(chunk_x, chunk_z, classifier.seed());
        let sources = (0..profile.algorithms().len())
            .map(|i| NoiseSource::new(algorithm_seed(chunk_seed, &params.seed_multipliers, i)))
            .collect();

        let span = profile.height_range().span();
        let variation = det_sin(chunk_x as f64 * VARIATION_FREQ_X)
            * det_cos(chunk_z as f64 * VARIATION_FREQ_Z)
            * params.chunk_variation_strength
            * span;

        Ok(Self {
            chunk_x,
            chunk_z,
            biome,
            profile,
            chunk_seed,
            sources,
            local: NoiseSource::new(chunk_seed ^ LOCAL_SEED_SALT),
            variation,
            local_amplitude: params.local_variation_strength * span,
        })
    }

    /// Chunk coordinate this field belongs to.
    pub fn coords(&self) -> (i64, i64) {
        (self.chunk_x, self.chunk_z)
    }

    /// Classified biome.
    pub fn biome(&self) -> &BiomeDescriptor {
        &self.biome
    }

    /// Resolved profile.
    pub fn profile(&self) -> &Arc<TerrainProfile> {
        &self.profile
    }

    /// Height range of the resolved profile.
    pub fn height_range(&self) -> HeightRange {
        self.profile.height_range()
    }

    /// `chunk_hash(x, z, seed)`.
    pub fn chunk_seed(&self) -> u32 {
        self.chunk_seed
    }

    /// Height at a world point, clamped to the profile's range.
    pub fn height_at(&self, world_x: f64, world_z: f64) -> f64 {
        let range = self.profile.height_range();
        let span = range.span();

        let mut height = range.min;
        for (algorithm, source) in self.profile.algorithms().iter().zip(&self.sources) {
            height += algorithm.contribution(source, world_x, world_z, span);
        }
        height += self.variation;
        height += (self.local.sample(world_x, world_z, LOCAL_FREQUENCY) - 0.5) * self.local_amplitude;

        range.clamp(height)
    }
}

/// Builds chunks for one world seed.
///
/// Stateless apart from the id counter: the output depends only on the seed,
/// the request and the snapshot passed in.
#[derive(Debug)]
pub struct ChunkGenerator {
    classifier: BiomeClassifier,
    next_id: AtomicU64,
}

impl ChunkGenerator {
    /// Creates a generator for the given world seed.
    pub fn new(seed: u32) -> Self {
        Self {
            classifier: BiomeClassifier::new(seed),
            next_id: AtomicU64::new(1),
        }
    }

    /// World seed.
    pub fn seed(&self) -> u32 {
        self.classifier.seed()
    }

    /// The biome classifier used for every chunk.
    pub fn classifier(&self) -> &BiomeClassifier {
        &self.classifier
    }

    /// The unblended field of a chunk.
    pub fn field(
        &self,
        snapshot: &RegistrySnapshot,
        chunk_x: i64,
        chunk_z: i64,
    ) -> Result<ChunkField, TerrainError> {
        ChunkField::build(&self.classifier, snapshot, chunk_x, chunk_z)
    }

    /// Generate chunk `(chunk_x, chunk_z)` with `size × size` samples.
    ///
    /// Neighbour fields for blending are rebuilt from `snapshot`, never read
    /// from a cache, so the result is the same whether or not neighbours were
    /// generated before.
    ///
    /// # Errors
    ///
    /// - [`TerrainError::InvalidChunkRequest`] for a size outside
    ///   `1..=MAX_CHUNK_SIZE` or a coordinate too far from the origin.
    /// - [`TerrainError::ProfileNotFound`] when the chunk or a blended
    ///   neighbour classifies to a biome without a profile.
    pub fn generate(
        &self,
        snapshot: &RegistrySnapshot,
        chunk_x: i64,
        chunk_z: i64,
        size: usize,
    ) -> Result<Chunk, TerrainError> {
        validate_request(chunk_x, chunk_z, size)?;

        let params = snapshot.parameters();
        let blender = EdgeBlender::new(params.edge_blend_margin, size);
        let neighbourhood =
            Neighbourhood::build(chunk_x, chunk_z, blender.is_active(), |x, z| {
                self.field(snapshot, x, z)
            })?;
        debug_assert_eq!(neighbourhood.has_ring(), blender.is_active());

        let blended = blender.blend(&neighbourhood);
        let height_grid = PostProcessor::from_parameters(params).apply(blended);

        let centre = neighbourhood.centre();
        let chunk = Chunk {
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            x: chunk_x,
            z: chunk_z,
            size,
            height_grid,
            biome: centre.biome().clone(),
            height_range: centre.height_range(),
            generated_at: unix_millis(),
            config_version: snapshot.version(),
        };
        tracing::debug!(
            x = chunk_x,
            z = chunk_z,
            size,
            biome = %chunk.biome.name,
            "Generated chunk"
        );
        Ok(chunk)
    }
}

fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::ProfileRegistry;
    use crate::seed::hash_height_grid;

    const MOUNTAIN: &str = r#"(
        generation_parameters: (edge_blend_margin: 8),
        terrain_types: {
            "mountain": (
                height_range: (50.0, 800.0),
                noise_algorithms: [(kind: mountain_spine, frequency: 0.01, octaves: 8)],
                conditions: Default,
            ),
        },
    )"#;

    const MIXED: &str = r#"(
        generation_parameters: (edge_blend_margin: 6, biome_scale: 0.4),
        terrain_types: {
            "highland": (
                height_range: (200.0, 900.0),
                noise_algorithms: [
                    (kind: ridged, frequency: 0.02, octaves: 5),
                    (kind: detail, frequency: 0.3, amplitude_factor: 0.05),
                ],
                conditions: Match(elevation: (0.5, 1.0)),
            ),
            "lowland": (
                height_range: (0.0, 150.0),
                noise_algorithms: [
                    (kind: rolling_hills, frequency: 0.03),
                    (kind: water_channels, frequency: 0.02, amplitude_factor: -0.3),
                ],
                conditions: Default,
            ),
        },
    )"#;

    fn snapshot(text: &str) -> Arc<RegistrySnapshot> {
        ProfileRegistry::from_ron(text).unwrap().snapshot()
    }

    #[test]
    fn test_chunk_origin_shares_edges() {
        assert_eq!(chunk_origin(0, 0, 64), (0, 0));
        assert_eq!(chunk_origin(1, -1, 64), (63, -63));
        assert_eq!(chunk_origin(3, 2, 1), (3, 2));
    }

    #[test]
    fn test_zero_and_oversized_requests_rejected() {
        let snap = snapshot(MOUNTAIN);
        let generator = ChunkGenerator::new(1);
        for size in [0, MAX_CHUNK_SIZE + 1] {
            assert!(matches!(
                generator.generate(&snap, 0, 0, size),
                Err(TerrainError::InvalidChunkRequest(_))
            ));
        }
    }

    #[test]
    fn test_far_coordinates_rejected() {
        let snap = snapshot(MOUNTAIN);
        let generator = ChunkGenerator::new(1);
        assert!(matches!(
            generator.generate(&snap, i64::MIN, 0, 16),
            Err(TerrainError::InvalidChunkRequest(_))
        ));
        assert!(matches!(
            generator.generate(&snap, 0, 1 << 50, 16),
            Err(TerrainError::InvalidChunkRequest(_))
        ));
    }

    #[test]
    fn test_generation_is_deterministic() {
        let snap = snapshot(MIXED);
        let a = ChunkGenerator::new(12345).generate(&snap, 3, -2, 32).unwrap();
        let b = ChunkGenerator::new(12345).generate(&snap, 3, -2, 32).unwrap();
        assert_eq!(hash_height_grid(&a.height_grid), hash_height_grid(&b.height_grid));
        assert_eq!(a.biome, b.biome);
    }

    #[test]
    fn test_different_seeds_differ() {
        let snap = snapshot(MOUNTAIN);
        let a = ChunkGenerator::new(1).generate(&snap, 0, 0, 16).unwrap();
        let b = ChunkGenerator::new(2).generate(&snap, 0, 0, 16).unwrap();
        assert_ne!(hash_height_grid(&a.height_grid), hash_height_grid(&b.height_grid));
    }

    #[test]
    fn test_single_profile_stays_in_range() {
        let snap = snapshot(MOUNTAIN);
        let generator = ChunkGenerator::new(12345);
        for (x, z) in [(0, 0), (1, 0), (-4, 7)] {
            let chunk = generator.generate(&snap, x, z, 32).unwrap();
            let (lo, hi) = chunk.height_grid.min_max().unwrap();
            assert!(lo >= 50.0 && hi <= 800.0, "({x}, {z}) spans [{lo}, {hi}]");
            assert_eq!(chunk.height_range, HeightRange::new(50.0, 800.0));
        }
    }

    #[test]
    fn test_mixed_biomes_stay_within_hull() {
        let snap = snapshot(MIXED);
        let generator = ChunkGenerator::new(77);
        for x in -3..3 {
            for z in -3..3 {
                let chunk = generator.generate(&snap, x, z, 16).unwrap();
                let (lo, hi) = chunk.height_grid.min_max().unwrap();
                assert!(lo >= 0.0 && hi <= 900.0, "({x}, {z}) spans [{lo}, {hi}]");
            }
        }
    }

    #[test]
    fn test_seams_match_bitwise_across_biomes() {
        let snap = snapshot(MIXED);
        let generator = ChunkGenerator::new(2024);
        let size = 24;
        let last = size - 1;
        for x in -2..2 {
            for z in -2..2 {
                let here = generator.generate(&snap, x, z, size).unwrap();
                let east = generator.generate(&snap, x + 1, z, size).unwrap();
                let south = generator.generate(&snap, x, z + 1, size).unwrap();
                for i in 0..size {
                    assert_eq!(
                        here.height_grid[i][last].to_bits(),
                        east.height_grid[i][0].to_bits(),
                        "x seam at chunk ({x}, {z}) row {i}"
                    );
                    assert_eq!(
                        here.height_grid[last][i].to_bits(),
                        south.height_grid[0][i].to_bits(),
                        "z seam at chunk ({x}, {z}) column {i}"
                    );
                }
            }
        }
    }

    #[test]
    fn test_zero_margin_skips_neighbours() {
        let text = MOUNTAIN.replace("edge_blend_margin: 8", "edge_blend_margin: 0");
        let snap = snapshot(&text);
        let generator = ChunkGenerator::new(5);
        let chunk = generator.generate(&snap, 2, 2, 8).unwrap();
        let field = generator.field(&snap, 2, 2).unwrap();
        let (ox, oz) = chunk_origin(2, 2, 8);
        assert_eq!(chunk.height_grid.get(0, 0), field.height_at(ox as f64, oz as f64));
    }

    #[test]
    fn test_ids_are_unique_and_version_recorded() {
        let snap = snapshot(MOUNTAIN);
        let generator = ChunkGenerator::new(5);
        let a = generator.generate(&snap, 0, 0, 4).unwrap();
        let b = generator.generate(&snap, 0, 0, 4).unwrap();
        assert_ne!(a.id, b.id);
        assert_eq!(a.config_version, snap.version());
        assert_eq!(a.height_grid, b.height_grid);
    }

    #[test]
    fn test_single_cell_chunk() {
        let snap = snapshot(MOUNTAIN);
        let chunk = ChunkGenerator::new(5).generate(&snap, -1, 1, 1).unwrap();
        assert_eq!(chunk.height_grid.size(), 1);
    }

    #[test]
    fn test_subseeds_follow_multipliers() {
        let snap = snapshot(MIXED);
        let generator = ChunkGenerator::new(9);
        let field = generator.field(&snap, 1, 1).unwrap();
        let multipliers = &snap.parameters().seed_multipliers;
        for (i, source) in field.sources.iter().enumerate() {
            assert_eq!(source.seed(), algorithm_seed(field.chunk_seed(), multipliers, i));
        }
    }
}
