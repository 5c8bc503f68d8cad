//! Biome classification: large-scale climate fields sampled per chunk and
//! matched against the profile predicates of a registry snapshot.

use serde::Serialize;

use crate::error::TerrainError;
use crate::noise::{FractalParams, NoiseSource};
use crate::profile::RegistrySnapshot;
use crate::seed::chunk_jitter;

const TEMPERATURE_SEED_OFFSET: u32 = 0xDEAD_BEEF;
const MOISTURE_SEED_OFFSET: u32 = 0x0BAD_F00D;

/// Keeps chunk centres off the integer noise lattice, where Perlin is zero.
const LATTICE_OFFSET_X: f64 = 0.37;
const LATTICE_OFFSET_Z: f64 = 0.61;

const CLIMATE_OCTAVES: FractalParams = FractalParams {
    octaves: 3,
    lacunarity: 2.0,
    persistence: 0.5,
};

/// The four classification inputs of a chunk, each in `[0, 1]`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct ClimateSample {
    pub elevation: f64,
    pub temperature: f64,
    pub moisture: f64,
    /// Deterministic per-chunk hash, normalised.
    pub jitter: f64,
}

/// The biome a chunk was classified as, with the climate that selected it.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BiomeDescriptor {
    pub name: String,
    pub elevation: f64,
    pub temperature: f64,
    pub moisture: f64,
    pub jitter: f64,
}

impl BiomeDescriptor {
    fn new(name: &str, sample: ClimateSample) -> Self {
        Self {
            name: name.to_owned(),
            elevation: sample.elevation,
            temperature: sample.temperature,
            moisture: sample.moisture,
            jitter: sample.jitter,
        }
    }
}

/// Samples three decorrelated climate fields for a world seed.
///
/// Holds no mutable state: classification of a chunk depends only on the
/// seed, the coordinate and the snapshot passed in.
#[derive(Clone, Debug)]
pub struct BiomeClassifier {
    seed: u32,
    elevation: NoiseSource,
    temperature: NoiseSource,
    moisture: NoiseSource,
}

impl BiomeClassifier {
    /// Creates a classifier for the given world seed.
    ///
    /// Each field uses its own seed derived from `seed`, so the fields are
    /// uncorrelated.
    pub fn new(seed: u32) -> Self {
        Self {
            seed,
            elevation: NoiseSource::new(seed),
            temperature: NoiseSource::new(seed.wrapping_add(TEMPERATURE_SEED_OFFSET)),
            moisture: NoiseSource::new(seed.wrapping_add(MOISTURE_SEED_OFFSET)),
        }
    }

    /// World seed.
    pub fn seed(&self) -> u32 {
        self.seed
    }

    /// Climate of a chunk. `biome_scale` maps chunk coordinates into the
    /// climate fields; smaller values make biome regions span more chunks.
    pub fn sample_fields(&self, chunk_x: i64, chunk_z: i64, biome_scale: f64) -> ClimateSample {
        let u = chunk_x as f64 + LATTICE_OFFSET_X;
        let v = chunk_z as f64 + LATTICE_OFFSET_Z;
        ClimateSample {
            elevation: self.elevation.fractal(u, v, biome_scale, &CLIMATE_OCTAVES),
            temperature: self.temperature.fractal(u, v, biome_scale, &CLIMATE_OCTAVES),
            moisture: self.moisture.fractal(u, v, biome_scale, &CLIMATE_OCTAVES),
            jitter: chunk_jitter(chunk_x, chunk_z, self.seed),
        }
    }

    /// Classify a chunk against a snapshot's profiles.
    ///
    /// # Errors
    ///
    /// [`TerrainError::ProfileNotFound`] when no predicate matches and the
    /// snapshot has no default profile.
    pub fn classify(
        &self,
        chunk_x: i64,
        chunk_z: i64,
        snapshot: &RegistrySnapshot,
    ) -> Result<BiomeDescriptor, TerrainError> {
        let sample = self.sample_fields(chunk_x, chunk_z, snapshot.parameters().biome_scale);
        match snapshot.match_sample(&sample) {
            Some(name) => Ok(BiomeDescriptor::new(name, sample)),
            None => Err(TerrainError::ProfileNotFound(format!(
                "climate(e={:.3}, t={:.3}, m={:.3}, j={:.3}) at chunk ({chunk_x}, {chunk_z})",
                sample.elevation, sample.temperature, sample.moisture, sample.jitter
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::ProfileRegistry;

    const PROFILES: &str = r#"(
        terrain_types: {
            "highland": (
                height_range: (100.0, 600.0),
                noise_algorithms: [(kind: ridged, frequency: 0.01)],
                conditions: Match(elevation: (0.55, 1.0)),
            ),
            "plains": (
                height_range: (0.0, 100.0),
                noise_algorithms: [(kind: gentle_hills, frequency: 0.02)],
                conditions: Default,
            ),
        },
    )"#;

    fn snapshot() -> std::sync::Arc<RegistrySnapshot> {
        ProfileRegistry::from_ron(PROFILES).unwrap().snapshot()
    }

    #[test]
    fn test_fields_within_unit_range() {
        let classifier = BiomeClassifier::new(12345);
        for x in -20..20 {
            for z in -20..20 {
                let s = classifier.sample_fields(x, z, 0.05);
                for v in [s.elevation, s.temperature, s.moisture, s.jitter] {
                    assert!((0.0..=1.0).contains(&v), "{v} out of range at ({x}, {z})");
                }
            }
        }
    }

    #[test]
    fn test_classification_independent_of_call_order() {
        let snap = snapshot();
        let a = BiomeClassifier::new(99);
        let b = BiomeClassifier::new(99);
        let coords: Vec<(i64, i64)> = (-5..5).flat_map(|x| (-5..5).map(move |z| (x, z))).collect();

        let forward: Vec<_> = coords
            .iter()
            .map(|&(x, z)| a.classify(x, z, &snap).unwrap())
            .collect();
        let backward: Vec<_> = coords
            .iter()
            .rev()
            .map(|&(x, z)| b.classify(x, z, &snap).unwrap())
            .collect();
        let backward: Vec<_> = backward.into_iter().rev().collect();
        assert_eq!(forward, backward);
    }

    #[test]
    fn test_fields_are_decorrelated() {
        let classifier = BiomeClassifier::new(7);
        let differing = (0..50)
            .filter(|&i| {
                let s = classifier.sample_fields(i * 3, -i, 0.05);
                (s.elevation - s.temperature).abs() > 1e-9 && (s.temperature - s.moisture).abs() > 1e-9
            })
            .count();
        assert!(differing > 45, "only {differing}/50 samples differ");
    }

    #[test]
    fn test_jitter_matches_chunk_hash() {
        let classifier = BiomeClassifier::new(12345);
        let s = classifier.sample_fields(0, 0, 0.05);
        assert_eq!(s.jitter, 12345.0 / f64::from(u32::MAX));
    }

    #[test]
    fn test_classify_reports_climate_in_descriptor() {
        let snap = snapshot();
        let classifier = BiomeClassifier::new(3);
        let descriptor = classifier.classify(4, -2, &snap).unwrap();
        let sample = classifier.sample_fields(4, -2, snap.parameters().biome_scale);
        assert_eq!(descriptor.elevation, sample.elevation);
        assert_eq!(descriptor.jitter, sample.jitter);
        let expected = if sample.elevation >= 0.55 { "highland" } else { "plains" };
        assert_eq!(descriptor.name, expected);
    }

    #[test]
    fn test_unmatched_without_default_is_profile_not_found() {
        let registry = ProfileRegistry::from_ron(
            r#"(terrain_types: {
                "nowhere": (
                    height_range: (0.0, 1.0),
                    noise_algorithms: [(kind: detail, frequency: 0.5)],
                    conditions: Match(jitter: (2.0, 3.0)),
                ),
            })"#,
        )
        .unwrap();
        let err = BiomeClassifier::new(1)
            .classify(0, 0, &registry.snapshot())
            .unwrap_err();
        assert!(matches!(err, TerrainError::ProfileNotFound(_)));
    }
}
