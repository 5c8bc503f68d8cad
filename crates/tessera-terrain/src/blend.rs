//! Seam blending between a chunk and its neighbours.
//!
//! Adjacent chunks share their edge samples (see
//! [`chunk_origin`](crate::chunk_origin)). Within `margin` cells of a border
//! each cell mixes its own chunk field with the neighbouring chunk's field at
//! the same world point. At the border the mix is exactly half and half, and
//! the terms are summed in an order fixed by absolute chunk coordinate, so
//! both chunks compute the same bits for every shared sample.

use crate::chunk::HeightGrid;
use crate::generator::{ChunkField, chunk_origin};
use crate::profile::HeightRange;

/// Blend decision for one axis of one cell.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AxisBlend {
    /// Weight of the chunk's own field on this axis, in `[0.5, 1.0]`.
    pub self_weight: f64,
    /// Chunk offset (`-1` or `1`) of the neighbour blended toward, `0` when
    /// the cell is outside the margin.
    pub toward: i64,
}

impl AxisBlend {
    const UNBLENDED: AxisBlend = AxisBlend {
        self_weight: 1.0,
        toward: 0,
    };

    /// Weight of the neighbour on this axis.
    pub fn neighbour_weight(&self) -> f64 {
        1.0 - self.self_weight
    }
}

/// The 3×3 block of chunk fields centred on the chunk being generated.
///
/// Built either with the full ring of eight neighbours or with the centre
/// alone; a centre-only neighbourhood answers every offset with the centre.
#[derive(Debug)]
pub struct Neighbourhood {
    chunk_x: i64,
    chunk_z: i64,
    /// Row-major by `(dz, dx)`, or just the centre.
    fields: Vec<ChunkField>,
}

impl Neighbourhood {
    /// Collect fields for chunk `(chunk_x, chunk_z)`, including the ring of
    /// neighbours when `with_ring` is set.
    pub fn build<E>(
        chunk_x: i64,
        chunk_z: i64,
        with_ring: bool,
        mut field: impl FnMut(i64, i64) -> Result<ChunkField, E>,
    ) -> Result<Self, E> {
        let fields = if with_ring {
            let mut fields = Vec::with_capacity(9);
            for dz in -1..=1 {
                for dx in -1..=1 {
                    fields.push(field(chunk_x + dx, chunk_z + dz)?);
                }
            }
            fields
        } else {
            vec![field(chunk_x, chunk_z)?]
        };
        Ok(Self {
            chunk_x,
            chunk_z,
            fields,
        })
    }

    /// The field at offset `(dx, dz)`, each in `-1..=1`.
    pub fn get(&self, dx: i64, dz: i64) -> &ChunkField {
        if self.fields.len() == 1 {
            return &self.fields[0];
        }
        debug_assert!((-1..=1).contains(&dx) && (-1..=1).contains(&dz));
        &self.fields[((dz + 1) * 3 + (dx + 1)) as usize]
    }

    /// The centre chunk's field.
    pub fn centre(&self) -> &ChunkField {
        self.get(0, 0)
    }

    /// Whether the neighbour ring was built.
    pub fn has_ring(&self) -> bool {
        self.fields.len() == 9
    }
}

/// Mixes a chunk's field with its neighbours near the borders.
#[derive(Clone, Copy, Debug)]
pub struct EdgeBlender {
    margin: usize,
    size: usize,
}

impl EdgeBlender {
    /// Blender for `size`-cell chunks with a `margin`-cell blend band.
    pub fn new(margin: usize, size: usize) -> Self {
        Self { margin, size }
    }

    /// Whether any cell will be blended. A zero margin or a single-cell
    /// chunk disables blending.
    pub fn is_active(&self) -> bool {
        self.margin > 0 && self.size > 1
    }

    /// Blend weight for a cell index along one axis.
    ///
    /// With `d` the distance to the nearest border, the self weight is
    /// `0.5 + 0.5 * min(d / margin, 1)`. A cell equidistant from both borders
    /// blends toward the negative side.
    pub fn axis(&self, index: usize) -> AxisBlend {
        if !self.is_active() {
            return AxisBlend::UNBLENDED;
        }
        let last = self.size - 1;
        let from_end = last.saturating_sub(index);
        let (distance, toward) = if index <= from_end {
            (index, -1)
        } else {
            (from_end, 1)
        };
        if distance >= self.margin {
            return AxisBlend::UNBLENDED;
        }
        AxisBlend {
            self_weight: 0.5 + 0.5 * (distance as f64 / self.margin as f64),
            toward,
        }
    }

    /// Produce the blended grid of the neighbourhood's centre chunk.
    ///
    /// The neighbourhood must carry its ring whenever the blender
    /// [`is_active`](Self::is_active); otherwise only the centre is read.
    pub fn blend(&self, neighbourhood: &Neighbourhood) -> HeightGrid {
        let centre = neighbourhood.centre();
        let (chunk_x, chunk_z) = (neighbourhood.chunk_x, neighbourhood.chunk_z);
        let (origin_x, origin_z) = chunk_origin(chunk_x, chunk_z, self.size);

        HeightGrid::from_fn(self.size, |cx, cz| {
            let world_x = (origin_x + cx as i64) as f64;
            let world_z = (origin_z + cz as i64) as f64;
            let (ax, az) = (self.axis(cx), self.axis(cz));
            if ax.toward == 0 && az.toward == 0 {
                return centre.height_at(world_x, world_z);
            }

            // (absolute chunk x, absolute chunk z, offset x, offset z, weight)
            let mut terms = [(0_i64, 0_i64, 0_i64, 0_i64, 0.0_f64); 4];
            let mut count = 0;
            for (dx, wx) in [(0, ax.self_weight), (ax.toward, ax.neighbour_weight())] {
                for (dz, wz) in [(0, az.self_weight), (az.toward, az.neighbour_weight())] {
                    let weight = wx * wz;
                    if weight > 0.0 {
                        terms[count] = (chunk_x + dx, chunk_z + dz, dx, dz, weight);
                        count += 1;
                    }
                }
            }
            let terms = &mut terms[..count];
            terms.sort_by_key(|&(abs_x, abs_z, ..)| (abs_x, abs_z));

            let mut height = 0.0;
            let mut hull: Option<HeightRange> = None;
            for &(_, _, dx, dz, weight) in terms.iter() {
                let field = neighbourhood.get(dx, dz);
                height += weight * field.height_at(world_x, world_z);
                let range = field.height_range();
                hull = Some(hull.map_or(range, |h| h.union(&range)));
            }
            hull.map_or(height, |h| h.clamp(height))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inactive_blender_is_unblended() {
        for blender in [EdgeBlender::new(0, 64), EdgeBlender::new(8, 1)] {
            assert!(!blender.is_active());
            assert_eq!(blender.axis(0), AxisBlend::UNBLENDED);
        }
    }

    #[test]
    fn test_border_cells_split_evenly() {
        let blender = EdgeBlender::new(8, 64);
        assert_eq!(
            blender.axis(0),
            AxisBlend {
                self_weight: 0.5,
                toward: -1
            }
        );
        assert_eq!(
            blender.axis(63),
            AxisBlend {
                self_weight: 0.5,
                toward: 1
            }
        );
    }

    #[test]
    fn test_weight_grows_linearly_to_margin() {
        let blender = EdgeBlender::new(8, 64);
        assert_eq!(blender.axis(4).self_weight, 0.75);
        assert_eq!(blender.axis(59).self_weight, 0.75);
        assert_eq!(blender.axis(8), AxisBlend::UNBLENDED);
        assert_eq!(blender.axis(55), AxisBlend::UNBLENDED);
        assert_eq!(blender.axis(32), AxisBlend::UNBLENDED);
    }

    #[test]
    fn test_midpoint_tie_blends_toward_negative_side() {
        let blender = EdgeBlender::new(8, 5);
        assert_eq!(blender.axis(2).toward, -1);
        assert_eq!(blender.axis(3).toward, 1);
    }
}
