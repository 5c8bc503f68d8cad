//! Generated chunk data: the square height grid and its metadata.

use std::ops::Index;

use serde::ser::SerializeSeq;
use serde::{Serialize, Serializer};

use crate::biome::BiomeDescriptor;
use crate::profile::HeightRange;

/// Cache key of a chunk: its grid coordinate and edge length.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ChunkKey {
    /// Chunk-grid X coordinate.
    pub x: i64,
    /// Chunk-grid Z coordinate.
    pub z: i64,
    /// Samples per edge.
    pub size: usize,
}

impl ChunkKey {
    /// Creates a new chunk key.
    pub fn new(x: i64, z: i64, size: usize) -> Self {
        Self { x, z, size }
    }
}

/// A `size × size` grid of heights stored row-major (row = z, column = x).
///
/// Indexing with `grid[row]` yields the row slice, so `grid[row][col]`
/// reads one cell. Serializes as nested arrays of rows.
#[derive(Clone, Debug, PartialEq)]
pub struct HeightGrid {
    size: usize,
    cells: Vec<f64>,
}

impl HeightGrid {
    /// A zero-filled grid.
    pub fn new(size: usize) -> Self {
        Self {
            size,
            cells: vec![0.0; size * size],
        }
    }

    /// Build a grid by evaluating `f(cx, cz)` for every cell.
    pub fn from_fn(size: usize, mut f: impl FnMut(usize, usize) -> f64) -> Self {
        let mut cells = Vec::with_capacity(size * size);
        for cz in 0..size {
            for cx in 0..size {
                cells.push(f(cx, cz));
            }
        }
        Self { size, cells }
    }

    /// Samples per edge.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Height at column `cx`, row `cz`.
    ///
    /// # Panics
    ///
    /// Panics if either index is `>= size`.
    #[inline]
    pub fn get(&self, cx: usize, cz: usize) -> f64 {
        self.cells[cz * self.size + cx]
    }

    /// Overwrite the height at column `cx`, row `cz`.
    ///
    /// # Panics
    ///
    /// Panics if either index is `>= size`.
    #[inline]
    pub fn set(&mut self, cx: usize, cz: usize, value: f64) {
        self.cells[cz * self.size + cx] = value;
    }

    /// One row (fixed z) as a slice.
    pub fn row(&self, cz: usize) -> &[f64] {
        &self.cells[cz * self.size..(cz + 1) * self.size]
    }

    /// Iterate over rows in z order.
    pub fn rows(&self) -> impl Iterator<Item = &[f64]> {
        self.cells.chunks_exact(self.size.max(1))
    }

    /// All cells in row-major order.
    pub fn as_slice(&self) -> &[f64] {
        &self.cells
    }

    /// Smallest and largest cell value, or `None` for an empty grid.
    pub fn min_max(&self) -> Option<(f64, f64)> {
        self.cells.iter().fold(None, |acc, &h| match acc {
            None => Some((h, h)),
            Some((lo, hi)) => Some((lo.min(h), hi.max(h))),
        })
    }

    /// Whether `(cx, cz)` lies on the outermost ring of the grid.
    pub fn is_border(&self, cx: usize, cz: usize) -> bool {
        cx == 0 || cz == 0 || cx + 1 == self.size || cz + 1 == self.size
    }
}

impl Index<usize> for HeightGrid {
    type Output = [f64];

    fn index(&self, row: usize) -> &[f64] {
        self.row(row)
    }
}

impl Serialize for HeightGrid {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.size))?;
        for row in self.rows() {
            seq.serialize_element(row)?;
        }
        seq.end()
    }
}

/// A generated terrain chunk. Immutable once returned by the generator.
#[derive(Clone, Debug, Serialize)]
pub struct Chunk {
    /// Generation-local identifier; unique within one engine.
    pub id: u64,
    /// Chunk-grid X coordinate.
    pub x: i64,
    /// Chunk-grid Z coordinate.
    pub z: i64,
    /// Samples per edge.
    pub size: usize,
    /// Final heights after blending and post-processing.
    pub height_grid: HeightGrid,
    /// Biome this chunk was classified as.
    pub biome: BiomeDescriptor,
    /// Height range of the resolved profile.
    pub height_range: HeightRange,
    /// Creation time, in milliseconds since the Unix epoch.
    pub generated_at: u64,
    /// Registry version the chunk was generated from.
    pub config_version: u64,
}

impl Chunk {
    /// Cache key of this chunk.
    pub fn key(&self) -> ChunkKey {
        ChunkKey::new(self.x, self.z, self.size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_fn_is_row_major() {
        let grid = HeightGrid::from_fn(3, |cx, cz| (cz * 10 + cx) as f64);
        assert_eq!(grid.as_slice(), &[0.0, 1.0, 2.0, 10.0, 11.0, 12.0, 20.0, 21.0, 22.0]);
        assert_eq!(grid[1][2], 12.0);
        assert_eq!(grid.get(2, 1), 12.0);
    }

    #[test]
    fn test_set_and_get() {
        let mut grid = HeightGrid::new(4);
        grid.set(3, 0, 5.5);
        assert_eq!(grid.get(3, 0), 5.5);
        assert_eq!(grid[0][3], 5.5);
    }

    #[test]
    fn test_min_max() {
        let grid = HeightGrid::from_fn(2, |cx, cz| (cx as f64) - (cz as f64) * 3.0);
        assert_eq!(grid.min_max(), Some((-3.0, 1.0)));
        assert_eq!(HeightGrid::new(0).min_max(), None);
    }

    #[test]
    fn test_border_detection() {
        let grid = HeightGrid::new(4);
        assert!(grid.is_border(0, 2));
        assert!(grid.is_border(3, 1));
        assert!(grid.is_border(1, 3));
        assert!(!grid.is_border(1, 2));
    }

    #[test]
    fn test_grid_serializes_as_nested_rows() {
        let grid = HeightGrid::from_fn(2, |cx, cz| (cz * 2 + cx) as f64);
        let json = serde_json::to_string(&grid).unwrap();
        assert_eq!(json, "[[0.0,1.0],[2.0,3.0]]");
    }
}
