//! Erosion and smoothing passes over a blended grid.
//!
//! Every pass reads the complete output of the previous pass and writes a
//! fresh grid. Border rows and columns are copied unchanged so the seams
//! produced by blending survive post-processing.

use crate::chunk::HeightGrid;
use crate::profile::GenerationParameters;

/// Fraction of the excess over the neighbour mean removed per erosion pass.
pub const EROSION_RATE: f64 = 0.1;

/// Erosion followed by smoothing, each a fixed number of passes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PostProcessor {
    pub erosion_iterations: u32,
    pub smoothing_passes: u32,
}

impl PostProcessor {
    pub fn new(erosion_iterations: u32, smoothing_passes: u32) -> Self {
        Self {
            erosion_iterations,
            smoothing_passes,
        }
    }

    pub fn from_parameters(params: &GenerationParameters) -> Self {
        Self::new(params.erosion_iterations, params.smoothing_passes)
    }

    /// No passes configured.
    pub fn is_noop(&self) -> bool {
        self.erosion_iterations == 0 && self.smoothing_passes == 0
    }

    /// Run all erosion passes, then all smoothing passes.
    pub fn apply(&self, mut grid: HeightGrid) -> HeightGrid {
        for _ in 0..self.erosion_iterations {
            grid = erode(&grid);
        }
        for _ in 0..self.smoothing_passes {
            grid = smooth(&grid);
        }
        grid
    }
}

/// One erosion pass: an interior cell above the mean of its four orthogonal
/// neighbours moves [`EROSION_RATE`] of the way toward that mean.
pub fn erode(input: &HeightGrid) -> HeightGrid {
    map_interior(input, |cx, cz| {
        let h = input.get(cx, cz);
        let mean = (input.get(cx - 1, cz)
            + input.get(cx + 1, cz)
            + input.get(cx, cz - 1)
            + input.get(cx, cz + 1))
            / 4.0;
        if h > mean {
            // Never undershoot the mean through rounding.
            (h - (h - mean) * EROSION_RATE).max(mean)
        } else {
            h
        }
    })
}

/// One smoothing pass: 3×3 box blur of interior cells.
pub fn smooth(input: &HeightGrid) -> HeightGrid {
    map_interior(input, |cx, cz| {
        let mut sum = 0.0;
        let mut lo = f64::INFINITY;
        let mut hi = f64::NEG_INFINITY;
        for z in cz - 1..=cz + 1 {
            for x in cx - 1..=cx + 1 {
                let h = input.get(x, z);
                sum += h;
                lo = lo.min(h);
                hi = hi.max(h);
            }
        }
        (sum / 9.0).clamp(lo, hi)
    })
}

fn map_interior(input: &HeightGrid, f: impl Fn(usize, usize) -> f64) -> HeightGrid {
    HeightGrid::from_fn(input.size(), |cx, cz| {
        if input.is_border(cx, cz) {
            input.get(cx, cz)
        } else {
            f(cx, cz)
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spike(size: usize, height: f64) -> HeightGrid {
        let mid = size / 2;
        HeightGrid::from_fn(size, |cx, cz| if cx == mid && cz == mid { height } else { 0.0 })
    }

    #[test]
    fn test_noop_returns_input() {
        let grid = spike(5, 10.0);
        let processor = PostProcessor::default();
        assert!(processor.is_noop());
        assert_eq!(processor.apply(grid.clone()), grid);
    }

    #[test]
    fn test_erosion_lowers_peak_by_rate() {
        let eroded = erode(&spike(5, 10.0));
        assert!((eroded.get(2, 2) - 9.0).abs() < 1e-12);
        // Below their neighbour mean, so unchanged.
        assert_eq!(eroded.get(1, 2), 0.0);
    }

    #[test]
    fn test_erosion_keeps_valley_floor() {
        let eroded = erode(&spike(5, -10.0));
        assert_eq!(eroded.get(2, 2), -10.0);
        // Each rim cell sits above its neighbour mean of -2.5 and moves a
        // tenth of the way down.
        for (cx, cz) in [(1, 2), (3, 2), (2, 1), (2, 3)] {
            assert!((eroded.get(cx, cz) + 0.25).abs() < 1e-12, "({cx}, {cz})");
        }
        assert_eq!(eroded.get(1, 1), 0.0);
    }

    #[test]
    fn test_smoothing_box_blur() {
        let smoothed = smooth(&spike(5, 9.0));
        assert!((smoothed.get(2, 2) - 1.0).abs() < 1e-12);
        assert!((smoothed.get(1, 1) - 1.0).abs() < 1e-12);
        assert_eq!(smoothed.get(0, 0), 0.0);
    }

    #[test]
    fn test_borders_untouched() {
        let grid = HeightGrid::from_fn(6, |cx, cz| (cx * 7 + cz * 13) as f64 % 5.0);
        let processed = PostProcessor::new(3, 2).apply(grid.clone());
        for i in 0..6 {
            assert_eq!(processed.get(i, 0), grid.get(i, 0));
            assert_eq!(processed.get(i, 5), grid.get(i, 5));
            assert_eq!(processed.get(0, i), grid.get(0, i));
            assert_eq!(processed.get(5, i), grid.get(5, i));
        }
    }

    #[test]
    fn test_smoothing_reads_previous_output() {
        let mut grid = HeightGrid::new(6);
        grid.set(2, 2, 9.0);
        let smoothed = smooth(&grid);
        for cz in 1..5 {
            for cx in 1..5 {
                let expected = if cx <= 3 && cz <= 3 { 1.0 } else { 0.0 };
                assert!(
                    (smoothed.get(cx, cz) - expected).abs() < 1e-12,
                    "({cx}, {cz}) = {}",
                    smoothed.get(cx, cz)
                );
            }
        }
    }

    #[test]
    fn test_erosion_reads_previous_output() {
        // Two equal peaks side by side erode identically; updating in place
        // would let the first lowered peak pull down the second.
        let mut grid = HeightGrid::new(6);
        grid.set(2, 2, 10.0);
        grid.set(3, 2, 10.0);
        let eroded = erode(&grid);
        assert!((eroded.get(2, 2) - 9.25).abs() < 1e-12);
        assert_eq!(eroded.get(2, 2), eroded.get(3, 2));
    }

    #[test]
    fn test_tiny_grids_are_all_border() {
        for size in [1, 2] {
            let grid = HeightGrid::from_fn(size, |cx, _| cx as f64);
            assert_eq!(PostProcessor::new(2, 2).apply(grid.clone()), grid);
        }
    }

    #[test]
    fn test_never_widens_range() {
        let grid = HeightGrid::from_fn(8, |cx, cz| 50.0 + ((cx * 31 + cz * 17) % 11) as f64 * 75.0);
        let (lo, hi) = grid.min_max().unwrap();
        let processed = PostProcessor::new(4, 4).apply(grid);
        let (plo, phi) = processed.min_max().unwrap();
        assert!(plo >= lo && phi <= hi);
    }
}
