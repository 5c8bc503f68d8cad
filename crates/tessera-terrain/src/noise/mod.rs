//! Noise synthesis: a seeded base sampler and the fractal evaluators built on it.
//!
//! Every value produced here lies in `[0, 1]`. The base sampler is 2D Perlin
//! gradient noise normalised as `n * 0.5 + 0.5` and clamped, so a given
//! `(x, z, frequency, seed)` always maps to the same sample.

mod algorithm;

pub use algorithm::{
    AlgorithmError, AlgorithmKind, CompiledAlgorithm, HeightAlgorithm, Modifiers,
    NoiseAlgorithmSpec,
};

use noise::{NoiseFn, Perlin};

/// Coordinate shift applied per octave so successive octaves of the same
/// permutation table do not share lattice zeros.
const OCTAVE_SHIFT: f64 = 31.416;

/// Octave configuration for fractal evaluators.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FractalParams {
    /// Number of layers summed. At least 1.
    pub octaves: u32,
    /// Frequency multiplier between successive octaves.
    pub lacunarity: f64,
    /// Weight multiplier between successive octaves.
    pub persistence: f64,
}

impl Default for FractalParams {
    fn default() -> Self {
        Self {
            octaves: 4,
            lacunarity: 2.0,
            persistence: 0.5,
        }
    }
}

/// Per-octave fold applied by [`NoiseSource::ridged`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RidgeParams {
    /// Folded octave is `(offset - |2n - 1|).clamp(0, 1)`; `1.0` gives the
    /// classic `1 - |2n - 1|`.
    pub offset: f64,
    /// Exponent applied to each folded octave. Higher values give sharper crests.
    pub sharpness: f64,
}

impl Default for RidgeParams {
    fn default() -> Self {
        Self {
            offset: 1.0,
            sharpness: 1.0,
        }
    }
}

/// A seeded coherent-noise sampler.
///
/// Cheap to clone. Construction builds the Perlin permutation table, so
/// callers evaluating many points hold one source per seed.
#[derive(Clone, Debug)]
pub struct NoiseSource {
    perlin: Perlin,
    seed: u32,
}

impl NoiseSource {
    /// Create a sampler for the given seed.
    pub fn new(seed: u32) -> Self {
        Self {
            perlin: Perlin::new(seed),
            seed,
        }
    }

    /// The seed this source was built with.
    pub fn seed(&self) -> u32 {
        self.seed
    }

    /// Sample base noise at `(x * frequency, z * frequency)`, in `[0, 1]`.
    #[inline]
    pub fn sample(&self, x: f64, z: f64, frequency: f64) -> f64 {
        self.sample_scaled(x * frequency, z * frequency)
    }

    #[inline]
    fn sample_scaled(&self, u: f64, v: f64) -> f64 {
        let n = self.perlin.get([u, v]);
        (n * 0.5 + 0.5).clamp(0.0, 1.0)
    }

    /// Fractal Brownian motion: octaves at `frequency * lacunarity^i` weighted
    /// `persistence^i`, normalised by the total weight.
    pub fn fractal(&self, x: f64, z: f64, frequency: f64, params: &FractalParams) -> f64 {
        self.accumulate(x, z, frequency, params, |n| n)
    }

    /// Ridged fractal: as [`fractal`](Self::fractal) with every octave folded
    /// around its midpoint before summation.
    pub fn ridged(
        &self,
        x: f64,
        z: f64,
        frequency: f64,
        params: &FractalParams,
        ridge: &RidgeParams,
    ) -> f64 {
        self.accumulate(x, z, frequency, params, |n| fold_ridge(n, ridge))
    }

    fn accumulate(
        &self,
        x: f64,
        z: f64,
        frequency: f64,
        params: &FractalParams,
        shape: impl Fn(f64) -> f64,
    ) -> f64 {
        let mut total = 0.0;
        let mut weight_sum = 0.0;
        let mut freq = frequency;
        let mut weight = 1.0;

        for octave in 0..params.octaves.max(1) {
            let shift = f64::from(octave) * OCTAVE_SHIFT;
            let n = self.sample_scaled(x * freq + shift, z * freq - shift);
            total += shape(n) * weight;
            weight_sum += weight;

            freq *= params.lacunarity;
            weight *= params.persistence;
        }

        if weight_sum > 0.0 {
            (total / weight_sum).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }
}

/// Fold a `[0, 1]` sample into a ridge: `(offset - |2n - 1|).clamp(0, 1)^sharpness`.
#[inline]
pub fn fold_ridge(n: f64, ridge: &RidgeParams) -> f64 {
    let folded = (ridge.offset - (2.0 * n - 1.0).abs()).clamp(0.0, 1.0);
    if ridge.sharpness == 1.0 {
        folded
    } else {
        crate::seed::det_pow(folded, ridge.sharpness)
    }
}

/// Sample base noise without keeping a source around.
///
/// Equivalent to `NoiseSource::new(seed).sample(x, z, frequency)`.
pub fn sample(x: f64, z: f64, frequency: f64, seed: u32) -> f64 {
    NoiseSource::new(seed).sample(x, z, frequency)
}
