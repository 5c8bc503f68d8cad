//! Biome predicates over the climate sample of a chunk.

use serde::{Deserialize, Serialize};

use crate::biome::ClimateSample;

/// Inclusive `(min, max)` bounds on one climate field.
pub type Bounds = (f64, f64);

/// When a profile is selected for a chunk.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum BiomeCondition {
    /// Fallback profile used when no predicate matches.
    Default,
    /// Selected when every present bound contains the sample.
    Match(BiomeConditions),
}

impl BiomeCondition {
    /// Whether this is the fallback profile.
    pub fn is_default(&self) -> bool {
        matches!(self, BiomeCondition::Default)
    }

    /// Whether a predicate profile accepts the sample. The default never
    /// matches here; it is consulted only after every predicate fails.
    pub fn matches(&self, sample: &ClimateSample) -> bool {
        match self {
            BiomeCondition::Default => false,
            BiomeCondition::Match(conditions) => conditions.matches(sample),
        }
    }
}

/// Optional bounds over the four classification inputs. An absent bound
/// matches everything.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BiomeConditions {
    pub elevation: Option<Bounds>,
    pub temperature: Option<Bounds>,
    pub moisture: Option<Bounds>,
    pub jitter: Option<Bounds>,
}

impl BiomeConditions {
    /// All present bounds contain the corresponding field.
    pub fn matches(&self, sample: &ClimateSample) -> bool {
        within(self.elevation, sample.elevation)
            && within(self.temperature, sample.temperature)
            && within(self.moisture, sample.moisture)
            && within(self.jitter, sample.jitter)
    }

    /// The first bound that is not finite and ordered, by field name.
    pub(crate) fn invalid_bound(&self) -> Option<(&'static str, Bounds)> {
        [
            ("elevation", self.elevation),
            ("temperature", self.temperature),
            ("moisture", self.moisture),
            ("jitter", self.jitter),
        ]
        .into_iter()
        .find_map(|(field, bounds)| {
            bounds
                .filter(|(lo, hi)| !(lo.is_finite() && hi.is_finite() && lo <= hi))
                .map(|b| (field, b))
        })
    }
}

fn within(bounds: Option<Bounds>, value: f64) -> bool {
    bounds.is_none_or(|(lo, hi)| value >= lo && value <= hi)
}
