//! One grid of the hierarchy: folding and cell index math.

/// A single grid level.
///
/// Cells of level `n` are `2^n` times wider than level 0 and there are half
/// as many per axis. Coordinates fold by mirroring, so cell `side - 1` is
/// adjacent to the cell one period further out rather than to cell `0`.
#[derive(Debug, Clone)]
pub(crate) struct Level {
    /// Word index of this level's first cell.
    pub base: usize,
    /// Cells per axis.
    pub side: u32,
    /// `side - 1`.
    pub mask: u32,
    /// `log2(side)`.
    pub log: u32,
    /// `1 / cell_size` for this level.
    pub inverse_cell_size: f32,
    /// Live entities bucketed in this level.
    pub len: u32,
}

impl Level {
    pub fn new(base: usize, side: u32, cell_size: u64) -> Self {
        #[allow(clippy::cast_precision_loss)]
        let inverse_cell_size = 1.0 / cell_size as f32;
        Self {
            base,
            side,
            mask: side - 1,
            log: side.trailing_zeros(),
            inverse_cell_size,
            len: 0,
        }
    }

    /// Number of cells in this level for `dims` dimensions.
    #[inline]
    pub fn cell_count(&self, dims: usize) -> usize {
        (self.side as usize).pow(dims as u32)
    }

    /// Unfolded cell coordinate of `x` (sign dropped).
    #[inline]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn raw(&self, x: f32) -> u32 {
        (x.abs() * self.inverse_cell_size) as u32
    }

    /// Folds an unfolded cell coordinate into `[0, side)`.
    #[inline]
    pub fn fold_raw(&self, raw: u32) -> u32 {
        if raw & self.side != 0 {
            self.mask - (raw & self.mask)
        } else {
            raw & self.mask
        }
    }

    /// Folded cell coordinate of `x`.
    #[inline]
    pub fn fold(&self, x: f32) -> u32 {
        self.fold_raw(self.raw(x))
    }

    /// Cell index of folded per-axis coordinates.
    #[inline]
    pub fn index<const D: usize>(&self, coords: [u32; D]) -> u32 {
        coords
            .iter()
            .enumerate()
            .fold(0, |acc, (axis, &c)| acc | (c << (self.log * axis as u32)))
    }

    /// Per-axis coordinates of a cell index.
    #[inline]
    pub fn coords<const D: usize>(&self, index: u32) -> [u32; D] {
        let mut coords = [0; D];
        for (axis, c) in coords.iter_mut().enumerate() {
            *c = (index >> (self.log * axis as u32)) & self.mask;
        }
        coords
    }

    /// Cell index containing `position`.
    #[inline]
    pub fn cell_of<const D: usize>(&self, position: [f32; D]) -> u32 {
        self.index(position.map(|x| self.fold(x)))
    }

    /// Applies a `-1..=1` step per axis, or `None` if it leaves the grid.
    #[inline]
    pub fn step<const D: usize>(&self, coords: [u32; D], offset: [i32; D]) -> Option<[u32; D]> {
        let mut out = coords;
        for (c, &o) in out.iter_mut().zip(offset.iter()) {
            *c = c.checked_add_signed(o)?;
            if *c > self.mask {
                return None;
            }
        }
        Some(out)
    }
}

/// Neighbour offsets in `{-1, 0, 1}^D`.
///
/// `forward` holds the half of the non-zero offsets whose highest non-zero
/// component is `+1`; together with the cell itself it visits every
/// unordered same-level pair once. `around` holds all `3^D` offsets.
#[derive(Debug, Clone)]
pub(crate) struct Neighbourhood<const D: usize> {
    pub forward: Vec<[i32; D]>,
    pub around: Vec<[i32; D]>,
}

impl<const D: usize> Neighbourhood<D> {
    pub fn new() -> Self {
        let total = 3usize.pow(D as u32);
        let mut around = Vec::with_capacity(total);
        for mut n in 0..total {
            let mut offset = [0i32; D];
            for o in &mut offset {
                #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
                let digit = (n % 3) as i32;
                *o = digit - 1;
                n /= 3;
            }
            around.push(offset);
        }
        let forward = around
            .iter()
            .copied()
            .filter(|offset| offset.iter().rev().find(|&&o| o != 0) == Some(&1))
            .collect();
        Self { forward, around }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fold_mirrors_each_period() {
        let level = Level::new(0, 16, 4);
        assert_eq!(level.fold(0.0), 0);
        assert_eq!(level.fold(20.0), 5);
        assert_eq!(level.fold(63.9), 15);
        // one period out the grid runs backwards
        assert_eq!(level.fold(64.0), 15);
        assert_eq!(level.fold(127.9), 0);
        assert_eq!(level.fold(128.0), 0);
        assert_eq!(level.fold(-20.0), 5);
    }

    #[test]
    fn test_index_round_trips_coords() {
        let level = Level::new(0, 8, 1);
        let index = level.index([3, 5, 7]);
        assert_eq!(index, 3 | (5 << 3) | (7 << 6));
        assert_eq!(level.coords::<3>(index), [3, 5, 7]);
    }

    #[test]
    fn test_step_stays_inside_grid() {
        let level = Level::new(0, 4, 1);
        assert_eq!(level.step([0, 3], [1, -1]), Some([1, 2]));
        assert_eq!(level.step([0, 3], [-1, 0]), None);
        assert_eq!(level.step([0, 3], [0, 1]), None);
    }

    #[test]
    fn test_forward_half_two_dimensions() {
        let hood = Neighbourhood::<2>::new();
        assert_eq!(hood.around.len(), 9);
        let mut forward = hood.forward.clone();
        forward.sort_unstable();
        assert_eq!(forward, vec![[-1, 1], [0, 1], [1, 0], [1, 1]]);
    }

    #[test]
    fn test_forward_half_is_half_of_neighbours() {
        assert_eq!(Neighbourhood::<1>::new().forward, vec![[1]]);
        assert_eq!(Neighbourhood::<3>::new().forward.len(), 13);
    }
}
