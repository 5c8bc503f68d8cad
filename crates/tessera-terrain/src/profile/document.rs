//! The on-disk terrain profile document.
//!
//! One RON document holds the `generation_parameters` block and the ordered
//! `terrain_types` mapping of biome name to profile. Map order is preserved:
//! it is the order in which biome conditions are tried.

use std::fmt;
use std::marker::PhantomData;

use ron::extensions::Extensions;
use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::BiomeCondition;
use crate::noise::NoiseAlgorithmSpec;

/// Inclusive `(min, max)` height bounds of a profile.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(from = "(f64, f64)", into = "(f64, f64)")]
pub struct HeightRange {
    /// Lowest height a cell may take.
    pub min: f64,
    /// Highest height a cell may take.
    pub max: f64,
}

impl HeightRange {
    /// Creates a new range. Ordering is checked at validation, not here.
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// `max - min`.
    pub fn span(&self) -> f64 {
        self.max - self.min
    }

    /// Clamp a height into the range.
    pub fn clamp(&self, height: f64) -> f64 {
        height.clamp(self.min, self.max)
    }

    /// Whether `height` lies within the range (inclusive).
    pub fn contains(&self, height: f64) -> bool {
        (self.min..=self.max).contains(&height)
    }

    /// Finite and strictly ordered.
    pub fn is_valid(&self) -> bool {
        self.min.is_finite() && self.max.is_finite() && self.min < self.max
    }

    /// Smallest range containing both `self` and `other`.
    pub fn union(&self, other: &HeightRange) -> HeightRange {
        HeightRange::new(self.min.min(other.min), self.max.max(other.max))
    }
}

impl From<(f64, f64)> for HeightRange {
    fn from((min, max): (f64, f64)) -> Self {
        Self { min, max }
    }
}

impl From<HeightRange> for (f64, f64) {
    fn from(range: HeightRange) -> Self {
        (range.min, range.max)
    }
}

/// Global knobs of the generation pipeline.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationParameters {
    /// Amplitude, as a fraction of the height span, of the smooth per-chunk
    /// variation term.
    pub chunk_variation_strength: f64,
    /// Amplitude, as a fraction of the height span, of the high-frequency
    /// per-chunk texture term.
    pub local_variation_strength: f64,
    /// Width in cells of the band along each border that is blended toward
    /// the neighbouring chunk. `0` disables blending.
    pub edge_blend_margin: usize,
    /// Multipliers cycled over a profile's algorithms to derive sub-seeds.
    pub seed_multipliers: Vec<i64>,
    /// Number of erosion passes after blending.
    pub erosion_iterations: u32,
    /// Number of 3×3 smoothing passes after erosion.
    pub smoothing_passes: u32,
    /// Chunk-to-climate-field scale. Smaller values give larger biomes.
    pub biome_scale: f64,
}

impl Default for GenerationParameters {
    fn default() -> Self {
        Self {
            chunk_variation_strength: 0.05,
            local_variation_strength: 0.01,
            edge_blend_margin: 8,
            seed_multipliers: vec![1, 7_919, 104_729, 1_299_709],
            erosion_iterations: 0,
            smoothing_passes: 0,
            biome_scale: 0.05,
        }
    }
}

/// One `terrain_types` entry as written in the document.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProfileSpec {
    /// Inclusive height bounds.
    pub height_range: HeightRange,
    /// Algorithms summed in order.
    pub noise_algorithms: Vec<NoiseAlgorithmSpec>,
    /// When this profile is selected.
    pub conditions: BiomeCondition,
}

/// The complete profile document.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TerrainDocument {
    /// Pipeline parameters; defaults apply when omitted.
    #[serde(default)]
    pub generation_parameters: GenerationParameters,
    /// Biome name to profile, in document order.
    #[serde(with = "ordered_map")]
    pub terrain_types: Vec<(String, ProfileSpec)>,
}

impl TerrainDocument {
    /// Parse a RON document.
    ///
    /// `implicit_some` and `unwrap_variant_newtypes` are enabled so optional
    /// tunables can be written bare (`octaves: 8`) and conditions as
    /// `Match(temperature: (0.0, 0.3))`.
    pub fn from_ron(text: &str) -> Result<Self, ron::error::SpannedError> {
        ron::Options::default()
            .with_default_extension(Extensions::IMPLICIT_SOME)
            .with_default_extension(Extensions::UNWRAP_VARIANT_NEWTYPES)
            .from_str(text)
    }

    /// Serialize back to pretty RON that [`from_ron`](Self::from_ron) accepts.
    ///
    /// The output starts with an `#![enable(..)]` header for the same
    /// extensions, so plain RON parsers read it too.
    pub fn to_ron(&self) -> Result<String, ron::Error> {
        let pretty = ron::ser::PrettyConfig::new()
            .extensions(Extensions::IMPLICIT_SOME | Extensions::UNWRAP_VARIANT_NEWTYPES);
        ron::ser::to_string_pretty(self, pretty)
    }
}

/// (De)serialize a `Vec<(String, T)>` as a map, keeping entry order and
/// duplicate keys (duplicates are rejected later, with the offending name).
mod ordered_map {
    use super::*;

    pub fn serialize<S, T>(entries: &[(String, T)], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
        T: Serialize,
    {
        serializer.collect_map(entries.iter().map(|(k, v)| (k, v)))
    }

    pub fn deserialize<'de, D, T>(deserializer: D) -> Result<Vec<(String, T)>, D::Error>
    where
        D: Deserializer<'de>,
        T: Deserialize<'de>,
    {
        deserializer.deserialize_map(OrderedVisitor(PhantomData))
    }

    struct OrderedVisitor<T>(PhantomData<T>);

    impl<'de, T: Deserialize<'de>> Visitor<'de> for OrderedVisitor<T> {
        type Value = Vec<(String, T)>;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a map of biome names to terrain profiles")
        }

        fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
            let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
            while let Some(entry) = map.next_entry::<String, T>()? {
                entries.push(entry);
            }
            Ok(entries)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::noise::AlgorithmKind;
    use crate::profile::BiomeConditions;

    const DOCUMENT: &str = r#"
        (
            generation_parameters: (
                edge_blend_margin: 4,
                seed_multipliers: [1, 31],
            ),
            terrain_types: {
                "tundra": (
                    height_range: (0.0, 60.0),
                    noise_algorithms: [
                        (kind: permafrost_bumps, frequency: 0.08, amplitude_factor: 0.3),
                    ],
                    conditions: Match(temperature: (0.0, 0.3)),
                ),
                "mountain": (
                    height_range: (50.0, 800.0),
                    noise_algorithms: [
                        (kind: mountain_spine, frequency: 0.01, octaves: 8),
                        (kind: detail, frequency: 0.2, amplitude_factor: 0.02, power: 2.0),
                    ],
                    conditions: Match(elevation: (0.6, 1.0)),
                ),
                "plains": (
                    height_range: (0.0, 120.0),
                    noise_algorithms: [(kind: fbm, frequency: 0.02)],
                    conditions: Default,
                ),
            },
        )
    "#;

    #[test]
    fn test_document_parses_in_order() {
        let doc = TerrainDocument::from_ron(DOCUMENT).unwrap();
        let names: Vec<_> = doc.terrain_types.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, ["tundra", "mountain", "plains"]);
    }

    #[test]
    fn test_parameters_merge_with_defaults() {
        let doc = TerrainDocument::from_ron(DOCUMENT).unwrap();
        let params = &doc.generation_parameters;
        assert_eq!(params.edge_blend_margin, 4);
        assert_eq!(params.seed_multipliers, vec![1, 31]);
        assert_eq!(params.biome_scale, GenerationParameters::default().biome_scale);
    }

    #[test]
    fn test_algorithm_fields_parse() {
        let doc = TerrainDocument::from_ron(DOCUMENT).unwrap();
        let mountain = &doc.terrain_types[1].1;
        assert_eq!(mountain.height_range, HeightRange::new(50.0, 800.0));
        assert_eq!(mountain.noise_algorithms[0].kind, AlgorithmKind::MountainSpine);
        assert_eq!(mountain.noise_algorithms[0].octaves, Some(8));
        assert_eq!(mountain.noise_algorithms[0].amplitude_factor, 1.0);
        assert_eq!(mountain.noise_algorithms[1].power, Some(2.0));
        assert_eq!(
            mountain.conditions,
            BiomeCondition::Match(BiomeConditions {
                elevation: Some((0.6, 1.0)),
                ..Default::default()
            })
        );
    }

    #[test]
    fn test_unknown_algorithm_kind_is_parse_error() {
        let text = DOCUMENT.replace("permafrost_bumps", "lava_lakes");
        assert!(TerrainDocument::from_ron(&text).is_err());
    }

    #[test]
    fn test_document_roundtrips_through_ron() {
        let doc = TerrainDocument::from_ron(DOCUMENT).unwrap();
        let text = doc.to_ron().unwrap();
        assert!(text.starts_with("#![enable("));
        assert!(!text.contains("Match(("));
        let reparsed = TerrainDocument::from_ron(&text).unwrap();
        assert_eq!(doc, reparsed);
        // The header makes the output readable without preset extensions.
        let plain: TerrainDocument = ron::from_str(&text).unwrap();
        assert_eq!(doc, plain);
    }

    #[test]
    fn test_height_range_helpers() {
        let range = HeightRange::new(50.0, 800.0);
        assert_eq!(range.span(), 750.0);
        assert_eq!(range.clamp(900.0), 800.0);
        assert!(range.contains(50.0));
        assert!(!range.contains(49.9));
        assert!(!HeightRange::new(5.0, 5.0).is_valid());
        assert_eq!(
            range.union(&HeightRange::new(0.0, 80.0)),
            HeightRange::new(0.0, 800.0)
        );
    }
}
