//! The noise-algorithm catalogue.
//!
//! A profile lists [`NoiseAlgorithmSpec`]s. At load time each spec is compiled
//! into a [`CompiledAlgorithm`]: one concrete [`HeightAlgorithm`] type per
//! [`AlgorithmKind`] plus the shared post-evaluation [`Modifiers`]. Unknown
//! kinds never reach this point; serde rejects them while parsing.

use std::f64::consts::TAU;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::{FractalParams, NoiseSource, RidgeParams, fold_ridge};
use crate::seed::{det_pow, det_sin};

/// Upper bound on octaves accepted from configuration.
pub const MAX_OCTAVES: u32 = 16;

/// Noise algorithm kinds available to terrain profiles.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlgorithmKind {
    /// Ridged multi-octave noise with sharp crests.
    Ridged,
    /// Fractal Brownian motion.
    #[serde(alias = "fbm")]
    Fractal,
    /// Wind-aligned, warped sand dune bands.
    Dune,
    /// Smoothstepped low-octave fBm.
    RollingHills,
    /// A nearly flat plateau around the middle of the range.
    FlatBase,
    /// Sparse isolated mounds.
    MoundSpots,
    /// Anisotropic fBm stretched along the wind axis.
    Windswept,
    /// Small frost-heave bumps.
    PermafrostBumps,
    /// Low, waterlogged ground with shallow undulation.
    BogBase,
    /// Narrow meandering channels; pair with a negative amplitude to carve.
    WaterChannels,
    /// Soft, low-persistence hills.
    GentleHills,
    /// Rare, steep mountain chains.
    MountainSpine,
    /// Broad ridged uplands mixed with continental swells.
    ContinentalRidges,
    /// Very rare massive plateaus.
    MassiveElevation,
    /// Single high-frequency sample for fine texture.
    Detail,
}

/// One entry of a profile's algorithm list, as written in the config document.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NoiseAlgorithmSpec {
    /// Which algorithm to evaluate.
    pub kind: AlgorithmKind,
    /// Base sampling frequency in cycles per world unit.
    pub frequency: f64,
    /// Fraction of the profile's height span this algorithm may contribute.
    /// Negative values carve.
    #[serde(default = "default_amplitude_factor")]
    pub amplitude_factor: f64,
    /// Octave count for fractal kinds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub octaves: Option<u32>,
    /// Exponent applied to the shaped value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub power: Option<f64>,
    /// Fold every octave of a `fractal` into ridges.
    #[serde(default)]
    pub ridged: bool,
    /// Fold the shaped value around its midpoint (`|2v - 1|`).
    #[serde(default)]
    pub absolute: bool,
    /// Subtracted from the shaped value, clamping at zero.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold: Option<f64>,
    /// Exponent applied to each folded ridge octave.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ridge_sharpness: Option<f64>,
    /// Ridge fold offset; `1.0` is the classic `1 - |2n - 1|`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ridge_offset: Option<f64>,
    /// Multiplier applied by the relief kinds before saturating at 1.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elevation_bias: Option<f64>,
    /// Frequency multiplier between octaves.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lacunarity: Option<f64>,
    /// Weight multiplier between octaves.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub persistence: Option<f64>,
}

fn default_amplitude_factor() -> f64 {
    1.0
}

impl NoiseAlgorithmSpec {
    /// A spec of the given kind with every optional field unset.
    pub fn new(kind: AlgorithmKind, frequency: f64, amplitude_factor: f64) -> Self {
        Self {
            kind,
            frequency,
            amplitude_factor,
            octaves: None,
            power: None,
            ridged: false,
            absolute: false,
            threshold: None,
            ridge_sharpness: None,
            ridge_offset: None,
            elevation_bias: None,
            lacunarity: None,
            persistence: None,
        }
    }

    fn fractal_params(&self, default_octaves: u32, default_persistence: f64) -> FractalParams {
        FractalParams {
            octaves: self.octaves.unwrap_or(default_octaves),
            lacunarity: self.lacunarity.unwrap_or(2.0),
            persistence: self.persistence.unwrap_or(default_persistence),
        }
    }

    fn ridge_params(&self, default_sharpness: f64) -> RidgeParams {
        RidgeParams {
            offset: self.ridge_offset.unwrap_or(1.0),
            sharpness: self.ridge_sharpness.unwrap_or(default_sharpness),
        }
    }
}

/// Reasons an algorithm spec is rejected at load time.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AlgorithmError {
    /// Frequency must be finite and strictly positive.
    #[error("frequency must be finite and positive, got {0}")]
    Frequency(f64),
    /// Octave count outside `1..=MAX_OCTAVES`.
    #[error("octaves must be within 1..={MAX_OCTAVES}, got {0}")]
    Octaves(u32),
    /// A numeric tunable is NaN or infinite.
    #[error("{field} must be finite, got {value}")]
    NonFinite {
        /// Name of the offending field.
        field: &'static str,
        /// The rejected value.
        value: f64,
    },
    /// An exponent that must be positive is not.
    #[error("{field} must be positive, got {value}")]
    NonPositive {
        /// Name of the offending field.
        field: &'static str,
        /// The rejected value.
        value: f64,
    },
}

/// Shape function of one algorithm kind.
///
/// `noise` is the synthesizer seeded with the algorithm's sub-seed; the
/// result is a raw shape value in `[0, 1]` before [`Modifiers`] apply.
pub trait HeightAlgorithm: Send + Sync + fmt::Debug {
    /// Evaluate the shape at a world coordinate.
    fn evaluate(&self, noise: &NoiseSource, world_x: f64, world_z: f64) -> f64;
}

/// Post-evaluation modifiers, applied in fixed order: power, absolute, threshold.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Modifiers {
    /// `v.max(0)^power`.
    pub power: Option<f64>,
    /// `|2v - 1|`.
    pub absolute: bool,
    /// `max(0, v - threshold)`.
    pub threshold: Option<f64>,
}

impl Modifiers {
    /// Apply the modifiers to a shaped value.
    pub fn apply(&self, mut value: f64) -> f64 {
        if let Some(power) = self.power {
            value = det_pow(value.max(0.0), power);
        }
        if self.absolute {
            value = (2.0 * value - 1.0).abs();
        }
        if let Some(threshold) = self.threshold {
            value = (value - threshold).max(0.0);
        }
        value
    }
}

/// An algorithm spec validated and bound to its concrete shape type.
#[derive(Debug)]
pub struct CompiledAlgorithm {
    kind: AlgorithmKind,
    shape: Box<dyn HeightAlgorithm>,
    modifiers: Modifiers,
    amplitude_factor: f64,
}

impl CompiledAlgorithm {
    /// Validate a spec and build its shape.
    pub fn compile(spec: &NoiseAlgorithmSpec) -> Result<Self, AlgorithmError> {
        validate(spec)?;
        Ok(Self {
            kind: spec.kind,
            shape: build_shape(spec),
            modifiers: Modifiers {
                power: spec.power,
                absolute: spec.absolute,
                threshold: spec.threshold,
            },
            amplitude_factor: spec.amplitude_factor,
        })
    }

    /// The kind this algorithm was compiled from.
    pub fn kind(&self) -> AlgorithmKind {
        self.kind
    }

    /// Shaped and modified value in `[0, 1]`, before amplitude scaling.
    pub fn shaped(&self, noise: &NoiseSource, world_x: f64, world_z: f64) -> f64 {
        self.modifiers.apply(self.shape.evaluate(noise, world_x, world_z))
    }

    /// Height contribution: shaped value times amplitude factor times `span`.
    pub fn contribution(
        &self,
        noise: &NoiseSource,
        world_x: f64,
        world_z: f64,
        span: f64,
    ) -> f64 {
        self.shaped(noise, world_x, world_z) * self.amplitude_factor * span
    }
}

fn validate(spec: &NoiseAlgorithmSpec) -> Result<(), AlgorithmError> {
    if !spec.frequency.is_finite() || spec.frequency <= 0.0 {
        return Err(AlgorithmError::Frequency(spec.frequency));
    }
    if let Some(octaves) = spec.octaves
        && !(1..=MAX_OCTAVES).contains(&octaves)
    {
        return Err(AlgorithmError::Octaves(octaves));
    }

    let finite = [
        ("amplitude_factor", Some(spec.amplitude_factor)),
        ("threshold", spec.threshold),
        ("ridge_offset", spec.ridge_offset),
        ("elevation_bias", spec.elevation_bias),
        ("lacunarity", spec.lacunarity),
        ("persistence", spec.persistence),
    ];
    for (field, value) in finite {
        if let Some(value) = value
            && !value.is_finite()
        {
            return Err(AlgorithmError::NonFinite { field, value });
        }
    }

    let positive = [
        ("power", spec.power),
        ("ridge_sharpness", spec.ridge_sharpness),
    ];
    for (field, value) in positive {
        if let Some(value) = value
            && !(value.is_finite() && value > 0.0)
        {
            return Err(AlgorithmError::NonPositive { field, value });
        }
    }
    Ok(())
}

fn build_shape(spec: &NoiseAlgorithmSpec) -> Box<dyn HeightAlgorithm> {
    let frequency = spec.frequency;
    match spec.kind {
        AlgorithmKind::Ridged => Box::new(Ridged {
            frequency,
            octaves: spec.fractal_params(6, 0.5),
            ridge: spec.ridge_params(1.0),
        }),
        AlgorithmKind::Fractal => Box::new(Fractal {
            frequency,
            octaves: spec.fractal_params(4, 0.5),
            ridge: spec.ridged.then(|| spec.ridge_params(1.0)),
        }),
        AlgorithmKind::Dune => Box::new(Dune { frequency }),
        AlgorithmKind::RollingHills => Box::new(RollingHills {
            frequency,
            octaves: spec.fractal_params(3, 0.5),
        }),
        AlgorithmKind::FlatBase => Box::new(FlatBase { frequency }),
        AlgorithmKind::MoundSpots => Box::new(MoundSpots { frequency }),
        AlgorithmKind::Windswept => Box::new(Windswept {
            frequency,
            octaves: spec.fractal_params(4, 0.5),
        }),
        AlgorithmKind::PermafrostBumps => Box::new(PermafrostBumps { frequency }),
        AlgorithmKind::BogBase => Box::new(BogBase { frequency }),
        AlgorithmKind::WaterChannels => Box::new(WaterChannels {
            frequency,
            octaves: spec.fractal_params(2, 0.5),
        }),
        AlgorithmKind::GentleHills => Box::new(GentleHills {
            frequency,
            octaves: spec.fractal_params(2, 0.4),
        }),
        AlgorithmKind::MountainSpine => Box::new(MountainSpine {
            frequency,
            octaves: spec.fractal_params(6, 0.5),
            bias: spec.elevation_bias.unwrap_or(MountainSpine::DEFAULT_BIAS),
        }),
        AlgorithmKind::ContinentalRidges => Box::new(ContinentalRidges {
            frequency,
            octaves: spec.fractal_params(5, 0.5),
            bias: spec.elevation_bias.unwrap_or(ContinentalRidges::DEFAULT_BIAS),
        }),
        AlgorithmKind::MassiveElevation => Box::new(MassiveElevation {
            frequency,
            octaves: spec.fractal_params(4, 0.5),
            bias: spec.elevation_bias.unwrap_or(MassiveElevation::DEFAULT_BIAS),
        }),
        AlgorithmKind::Detail => Box::new(Detail { frequency }),
    }
}

#[inline]
fn smoothstep(v: f64) -> f64 {
    let v = v.clamp(0.0, 1.0);
    v * v * (3.0 - 2.0 * v)
}

// ---------------------------------------------------------------------------
// Catalogue
// ---------------------------------------------------------------------------

/// Ridged multi-octave noise.
#[derive(Debug)]
struct Ridged {
    frequency: f64,
    octaves: FractalParams,
    ridge: RidgeParams,
}

impl HeightAlgorithm for Ridged {
    fn evaluate(&self, noise: &NoiseSource, x: f64, z: f64) -> f64 {
        noise.ridged(x, z, self.frequency, &self.octaves, &self.ridge)
    }
}

/// Plain fBm, optionally ridged per octave.
#[derive(Debug)]
struct Fractal {
    frequency: f64,
    octaves: FractalParams,
    ridge: Option<RidgeParams>,
}

impl HeightAlgorithm for Fractal {
    fn evaluate(&self, noise: &NoiseSource, x: f64, z: f64) -> f64 {
        match &self.ridge {
            Some(ridge) => noise.ridged(x, z, self.frequency, &self.octaves, ridge),
            None => noise.fractal(x, z, self.frequency, &self.octaves),
        }
    }
}

/// Sand dunes: sine bands along a fixed wind direction, domain-warped by a
/// low-frequency sample so crests meander.
#[derive(Debug)]
struct Dune {
    frequency: f64,
}

impl HeightAlgorithm for Dune {
    fn evaluate(&self, noise: &NoiseSource, x: f64, z: f64) -> f64 {
        let warp = noise.sample(x, z, self.frequency * 0.5);
        let along = (x * 0.8 + z * 0.6) * self.frequency;
        let band = det_sin(along * TAU + warp * 4.0) * 0.5 + 0.5;
        0.8 * band * band + 0.2 * warp
    }
}

#[derive(Debug)]
struct RollingHills {
    frequency: f64,
    octaves: FractalParams,
}

impl HeightAlgorithm for RollingHills {
    fn evaluate(&self, noise: &NoiseSource, x: f64, z: f64) -> f64 {
        smoothstep(noise.fractal(x, z, self.frequency, &self.octaves))
    }
}

/// Nearly flat ground within `[0.45, 0.55]`.
#[derive(Debug)]
struct FlatBase {
    frequency: f64,
}

impl HeightAlgorithm for FlatBase {
    fn evaluate(&self, noise: &NoiseSource, x: f64, z: f64) -> f64 {
        0.5 + (noise.sample(x, z, self.frequency) - 0.5) * 0.1
    }
}

/// Isolated mounds where base noise rises above a fixed cutoff.
#[derive(Debug)]
struct MoundSpots {
    frequency: f64,
}

impl MoundSpots {
    const CUTOFF: f64 = 0.6;
}

impl HeightAlgorithm for MoundSpots {
    fn evaluate(&self, noise: &NoiseSource, x: f64, z: f64) -> f64 {
        let v = noise.sample(x, z, self.frequency);
        smoothstep((v - Self::CUTOFF) / (1.0 - Self::CUTOFF))
    }
}

/// fBm stretched 1:0.3 along z, with a soft ridge fold mixed in.
#[derive(Debug)]
struct Windswept {
    frequency: f64,
    octaves: FractalParams,
}

impl HeightAlgorithm for Windswept {
    fn evaluate(&self, noise: &NoiseSource, x: f64, z: f64) -> f64 {
        let v = noise.fractal(x, z * 0.3, self.frequency, &self.octaves);
        0.7 * v + 0.3 * fold_ridge(v, &RidgeParams::default())
    }
}

#[derive(Debug)]
struct PermafrostBumps {
    frequency: f64,
}

impl HeightAlgorithm for PermafrostBumps {
    fn evaluate(&self, noise: &NoiseSource, x: f64, z: f64) -> f64 {
        let a = noise.sample(x, z, self.frequency);
        let b = noise.sample(x, z, self.frequency * 2.3);
        let heave = ((a * 0.6 + b * 0.4) - 0.5).max(0.0) * 2.0;
        heave.sqrt().min(1.0)
    }
}

/// Low ground: cubic falloff keeps most of the bog near the bottom.
#[derive(Debug)]
struct BogBase {
    frequency: f64,
}

impl HeightAlgorithm for BogBase {
    fn evaluate(&self, noise: &NoiseSource, x: f64, z: f64) -> f64 {
        let v = noise.sample(x, z, self.frequency);
        0.1 + 0.4 * v * v * v
    }
}

/// Channels follow the midpoint contour of a two-octave field.
#[derive(Debug)]
struct WaterChannels {
    frequency: f64,
    octaves: FractalParams,
}

impl HeightAlgorithm for WaterChannels {
    fn evaluate(&self, noise: &NoiseSource, x: f64, z: f64) -> f64 {
        let v = noise.fractal(x, z, self.frequency, &self.octaves);
        let closeness = 1.0 - (2.0 * v - 1.0).abs();
        det_pow(closeness, 8.0)
    }
}

#[derive(Debug)]
struct GentleHills {
    frequency: f64,
    octaves: FractalParams,
}

impl HeightAlgorithm for GentleHills {
    fn evaluate(&self, noise: &NoiseSource, x: f64, z: f64) -> f64 {
        0.25 + 0.5 * noise.fractal(x, z, self.frequency, &self.octaves)
    }
}

/// `min(1, ridged(sharpness 2)^3 * bias)`.
#[derive(Debug)]
struct MountainSpine {
    frequency: f64,
    octaves: FractalParams,
    bias: f64,
}

impl MountainSpine {
    const EXPONENT: f64 = 3.0;
    const DEFAULT_BIAS: f64 = 1.8;
    const RIDGE: RidgeParams = RidgeParams {
        offset: 1.0,
        sharpness: 2.0,
    };
}

impl HeightAlgorithm for MountainSpine {
    fn evaluate(&self, noise: &NoiseSource, x: f64, z: f64) -> f64 {
        let r = noise.ridged(x, z, self.frequency, &self.octaves, &Self::RIDGE);
        (det_pow(r, Self::EXPONENT) * self.bias).clamp(0.0, 1.0)
    }
}

/// `min(1, (0.6 * ridged + 0.4 * fractal(f / 2))^4 * bias)`.
#[derive(Debug)]
struct ContinentalRidges {
    frequency: f64,
    octaves: FractalParams,
    bias: f64,
}

impl ContinentalRidges {
    const EXPONENT: f64 = 4.0;
    const DEFAULT_BIAS: f64 = 2.2;
}

impl HeightAlgorithm for ContinentalRidges {
    fn evaluate(&self, noise: &NoiseSource, x: f64, z: f64) -> f64 {
        let ridge = noise.ridged(x, z, self.frequency, &self.octaves, &RidgeParams::default());
        let swell = noise.fractal(x, z, self.frequency * 0.5, &self.octaves);
        let mixed = 0.6 * ridge + 0.4 * swell;
        (det_pow(mixed, Self::EXPONENT) * self.bias).clamp(0.0, 1.0)
    }
}

/// `min(1, fractal^4.5 * bias)`.
#[derive(Debug)]
struct MassiveElevation {
    frequency: f64,
    octaves: FractalParams,
    bias: f64,
}

impl MassiveElevation {
    const EXPONENT: f64 = 4.5;
    const DEFAULT_BIAS: f64 = 3.0;
}

impl HeightAlgorithm for MassiveElevation {
    fn evaluate(&self, noise: &NoiseSource, x: f64, z: f64) -> f64 {
        let v = noise.fractal(x, z, self.frequency, &self.octaves);
        (det_pow(v, Self::EXPONENT) * self.bias).clamp(0.0, 1.0)
    }
}

#[derive(Debug)]
struct Detail {
    frequency: f64,
}

impl HeightAlgorithm for Detail {
    fn evaluate(&self, noise: &NoiseSource, x: f64, z: f64) -> f64 {
        noise.sample(x, z, self.frequency)
    }
}
