//! Validated, immutable profile sets.

use std::sync::Arc;

use hashbrown::HashMap;

use super::{
    BiomeCondition, ConfigValidationError, GenerationParameters, HeightRange, ProfileSpec,
    TerrainDocument,
};
use crate::biome::ClimateSample;
use crate::noise::{CompiledAlgorithm, NoiseAlgorithmSpec};

/// One biome's terrain recipe, with its algorithms compiled.
#[derive(Debug)]
pub struct TerrainProfile {
    name: String,
    height_range: HeightRange,
    specs: Vec<NoiseAlgorithmSpec>,
    algorithms: Vec<CompiledAlgorithm>,
    condition: BiomeCondition,
}

impl TerrainProfile {
    /// Validate a document entry and compile its algorithms.
    pub fn compile(name: &str, spec: &ProfileSpec) -> Result<Self, ConfigValidationError> {
        let invalid = |reason: String| ConfigValidationError::Invalid {
            profile: name.to_owned(),
            reason,
        };

        if !spec.height_range.is_valid() {
            return Err(invalid(format!(
                "height_range ({}, {}) must be finite with min < max",
                spec.height_range.min, spec.height_range.max
            )));
        }
        if spec.noise_algorithms.is_empty() {
            return Err(invalid("noise_algorithms is empty".to_owned()));
        }
        if let BiomeCondition::Match(conditions) = &spec.conditions
            && let Some((field, (lo, hi))) = conditions.invalid_bound()
        {
            return Err(invalid(format!(
                "{field} bounds ({lo}, {hi}) must be finite with min <= max"
            )));
        }

        let algorithms = spec
            .noise_algorithms
            .iter()
            .enumerate()
            .map(|(index, algo)| {
                CompiledAlgorithm::compile(algo).map_err(|source| {
                    ConfigValidationError::Algorithm {
                        profile: name.to_owned(),
                        index,
                        source,
                    }
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            name: name.to_owned(),
            height_range: spec.height_range,
            specs: spec.noise_algorithms.clone(),
            algorithms,
            condition: spec.conditions.clone(),
        })
    }

    /// Biome name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Inclusive height bounds.
    pub fn height_range(&self) -> HeightRange {
        self.height_range
    }

    /// Compiled algorithms, in document order.
    pub fn algorithms(&self) -> &[CompiledAlgorithm] {
        &self.algorithms
    }

    /// The algorithm specs as written in the document.
    pub fn specs(&self) -> &[NoiseAlgorithmSpec] {
        &self.specs
    }

    /// Selection condition.
    pub fn condition(&self) -> &BiomeCondition {
        &self.condition
    }

    /// Whether this is the fallback profile.
    pub fn is_default(&self) -> bool {
        self.condition.is_default()
    }
}

/// A complete, validated profile set plus its generation parameters.
///
/// Snapshots never change after construction; a reload builds a new one.
#[derive(Debug)]
pub struct RegistrySnapshot {
    pub(super) version: u64,
    profiles: Vec<Arc<TerrainProfile>>,
    name_to_index: HashMap<String, usize>,
    default_index: Option<usize>,
    parameters: GenerationParameters,
}

impl RegistrySnapshot {
    /// Validate and compile a whole document.
    pub fn from_document(doc: &TerrainDocument) -> Result<Self, ConfigValidationError> {
        validate_parameters(&doc.generation_parameters)?;
        if doc.terrain_types.is_empty() {
            return Err(ConfigValidationError::Empty);
        }

        let mut profiles: Vec<Arc<TerrainProfile>> = Vec::with_capacity(doc.terrain_types.len());
        let mut name_to_index = HashMap::with_capacity(doc.terrain_types.len());
        let mut default_index: Option<usize> = None;

        for (name, spec) in &doc.terrain_types {
            if name_to_index.contains_key(name) {
                return Err(ConfigValidationError::DuplicateName(name.clone()));
            }
            let profile = TerrainProfile::compile(name, spec)?;
            let index = profiles.len();
            if profile.is_default() {
                if let Some(first) = default_index {
                    return Err(ConfigValidationError::MultipleDefaults {
                        first: profiles[first].name.clone(),
                        second: name.clone(),
                    });
                }
                default_index = Some(index);
            }
            name_to_index.insert(name.clone(), index);
            profiles.push(Arc::new(profile));
        }

        Ok(Self {
            version: 0,
            profiles,
            name_to_index,
            default_index,
            parameters: doc.generation_parameters.clone(),
        })
    }

    /// Monotonic version assigned by the registry when this snapshot was
    /// activated. `0` for snapshots built outside a registry.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Generation parameters of this configuration.
    pub fn parameters(&self) -> &GenerationParameters {
        &self.parameters
    }

    /// Profiles in document order.
    pub fn profiles(&self) -> &[Arc<TerrainProfile>] {
        &self.profiles
    }

    /// Number of profiles.
    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    /// Always `false` for a validated snapshot.
    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    /// Looks up a profile by biome name.
    pub fn resolve(&self, name: &str) -> Option<Arc<TerrainProfile>> {
        self.name_to_index
            .get(name)
            .map(|&index| Arc::clone(&self.profiles[index]))
    }

    /// The fallback profile, if one is marked `Default`.
    pub fn default_profile(&self) -> Option<&Arc<TerrainProfile>> {
        self.default_index.map(|index| &self.profiles[index])
    }

    /// First profile whose predicate accepts the sample, else the default.
    pub fn match_sample(&self, sample: &ClimateSample) -> Option<&str> {
        self.profiles
            .iter()
            .find(|profile| profile.condition.matches(sample))
            .or_else(|| self.default_profile())
            .map(|profile| profile.name())
    }

    /// [`match_sample`](Self::match_sample) over loose climate values.
    pub fn match_biome(
        &self,
        elevation: f64,
        temperature: f64,
        moisture: f64,
        jitter: f64,
    ) -> Option<&str> {
        self.match_sample(&ClimateSample {
            elevation,
            temperature,
            moisture,
            jitter,
        })
    }
}

fn validate_parameters(params: &GenerationParameters) -> Result<(), ConfigValidationError> {
    let invalid = |reason: String| Err(ConfigValidationError::InvalidParameters(reason));

    if params.seed_multipliers.is_empty() {
        return invalid("seed_multipliers must not be empty".to_owned());
    }
    for (field, value) in [
        ("chunk_variation_strength", params.chunk_variation_strength),
        ("local_variation_strength", params.local_variation_strength),
    ] {
        if !value.is_finite() || value < 0.0 {
            return invalid(format!("{field} must be finite and non-negative, got {value}"));
        }
    }
    if !params.biome_scale.is_finite() || params.biome_scale <= 0.0 {
        return invalid(format!(
            "biome_scale must be finite and positive, got {}",
            params.biome_scale
        ));
    }
    Ok(())
}
