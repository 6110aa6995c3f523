//! # Reference Grid Engine
//!
//! The hierarchical grid behind [`EngineModule`].
//!
//! ## Memory Layout
//!
//! ```text
//! word 0                                  head
//! | level 0 cells | level 1 cells | ... | slot 0 | slot 1 | ... | slot max |
//! ```
//!
//! Each cell holds the id of the first entity in it (`0` = empty). Entities
//! in a cell form a doubly linked list through their records. Vacant slots
//! are threaded into a free list through their `next` field.
//!
//! ## Traversal
//!
//! - **collide** visits every entity once. Same-level candidates come from
//!   the rest of its own cell and the forward half of the neighbouring cells;
//!   coarser-level candidates come from the full neighbourhood of the covering
//!   cell on each non-empty coarser level. Candidates are reported only when
//!   the spheres overlap (`d <= r1 + r2`).
//! - **query** maps the box onto a folded cell range per axis, widens it by
//!   one cell on each level and reports every entity whose sphere touches the
//!   box.

mod level;
mod records;

use crate::abi::{
    record_stride, EngineImports, EngineModule, POSITION_CHANGED, RADIUS_CHANGED, REMOVE, VACANT,
};
use crate::error::{EngineError, EngineResult};
use crate::memory::LinearMemory;

use level::{Level, Neighbourhood};
use records::Records;

/// Reference engine module for `D` dimensions (1 to 3).
#[derive(Debug)]
pub struct GridEngine<const D: usize> {
    memory: LinearMemory,
    state: Option<GridState<D>>,
}

impl<const D: usize> GridEngine<D> {
    /// Creates an engine with empty memory. Grow memory, then call `init`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            memory: LinearMemory::default(),
            state: None,
        }
    }

    /// Number of live entities.
    #[must_use]
    pub fn len(&self) -> u32 {
        self.state.as_ref().map_or(0, |state| state.live)
    }

    /// Returns true if no entity is live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn parts(&mut self) -> EngineResult<(&mut GridState<D>, &mut LinearMemory)> {
        let state = self.state.as_mut().ok_or(EngineError::Uninitialized)?;
        Ok((state, &mut self.memory))
    }
}

impl<const D: usize> Default for GridEngine<D> {
    fn default() -> Self {
        Self::new()
    }
}

/// Cells per axis of every level, finest first.
fn level_sides(side: u32) -> Vec<u32> {
    let mut sides = vec![side];
    let mut current = side >> 1;
    while current >= 2 {
        sides.push(current);
        current >>= 1;
    }
    sides
}

fn cells_len<const D: usize>(side: u32) -> usize {
    level_sides(side)
        .into_iter()
        .map(|s| (s as usize).saturating_pow(D as u32))
        .fold(0, usize::saturating_add)
}

impl<const D: usize> EngineModule<D> for GridEngine<D> {
    fn memory(&self) -> &LinearMemory {
        &self.memory
    }

    fn memory_mut(&mut self) -> &mut LinearMemory {
        &mut self.memory
    }

    fn sizing(&self, side: u32, max_entities: u32) -> usize {
        let slots = (max_entities as usize).saturating_add(1);
        cells_len::<D>(side)
            .saturating_add(slots.saturating_mul(record_stride(D)))
            .saturating_mul(4)
    }

    fn init(&mut self, side: u32, cell_size: u32, max_entities: u32) -> EngineResult<usize> {
        if !(1..=3).contains(&D) {
            return Err(EngineError::UnsupportedDimension(D));
        }
        if self.state.is_some() {
            return Err(EngineError::AlreadyInitialized);
        }
        if !side.is_power_of_two() {
            return Err(EngineError::NotPowerOfTwo { name: "side", value: side });
        }
        if !cell_size.is_power_of_two() {
            return Err(EngineError::NotPowerOfTwo {
                name: "cell_size",
                value: cell_size,
            });
        }
        let required = self.sizing(side, max_entities);
        if self.memory.byte_len() < required {
            return Err(EngineError::OutOfMemory {
                required,
                available: self.memory.byte_len(),
            });
        }

        let mut levels = Vec::new();
        let mut base = 0;
        let mut level_cell_size = u64::from(cell_size);
        for level_side in level_sides(side) {
            let level = Level::new(base, level_side, level_cell_size);
            base += level.cell_count(D);
            levels.push(level);
            level_cell_size <<= 1;
        }
        let head = base;
        self.memory.words_mut()[..required / 4].fill(0);

        #[allow(clippy::cast_precision_loss)]
        let grid_size = (u64::from(side) * u64::from(cell_size)) as f32;
        tracing::debug!(
            "grid engine init: {}D, side {side}, cell {cell_size}, {} levels, {required} bytes",
            D,
            levels.len()
        );
        self.state = Some(GridState {
            levels,
            records: Records { head },
            hood: Neighbourhood::new(),
            cell_size,
            grid_size,
            inverse_grid_size: 1.0 / grid_size,
            capacity: max_entities.saturating_add(1),
            used: 1,
            free: 0,
            live: 0,
        });
        Ok(head * 4)
    }

    fn insert(&mut self, position: [f32; D], radius: f32, reference: u32) -> EngineResult<()> {
        let (state, memory) = self.parts()?;
        state.insert(memory, position, radius, reference)
    }

    fn update(&mut self, imports: &mut dyn EngineImports) -> EngineResult<()> {
        let (state, memory) = self.parts()?;
        state.update(memory, imports);
        Ok(())
    }

    fn collide(&mut self, imports: &mut dyn EngineImports) -> EngineResult<()> {
        let (state, memory) = self.parts()?;
        state.collide(memory, imports);
        Ok(())
    }

    fn query(
        &mut self,
        min: [f32; D],
        max: [f32; D],
        imports: &mut dyn EngineImports,
    ) -> EngineResult<()> {
        let (state, memory) = self.parts()?;
        for axis in 0..D {
            if !(min[axis] <= max[axis]) {
                return Err(EngineError::InvertedBounds { axis });
            }
        }
        state.query(memory, min, max, imports);
        Ok(())
    }
}

#[derive(Debug)]
struct GridState<const D: usize> {
    levels: Vec<Level>,
    records: Records<D>,
    hood: Neighbourhood<D>,
    cell_size: u32,
    grid_size: f32,
    inverse_grid_size: f32,
    /// Slots including the sentinel.
    capacity: u32,
    /// First never-used slot.
    used: u32,
    /// Head of the vacant slot list.
    free: u32,
    live: u32,
}

impl<const D: usize> GridState<D> {
    /// Finest level whose cells are wider than the entity's diameter.
    fn level_for(&self, radius: f32) -> usize {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let rounded = (radius + radius) as u32;
        if rounded < self.cell_size {
            return 0;
        }
        let level = (31 - rounded.leading_zeros()) - self.cell_size.trailing_zeros() + 1;
        (level as usize).min(self.levels.len() - 1)
    }

    fn bucket(&mut self, memory: &mut LinearMemory, id: u32) {
        let level = &mut self.levels[self.records.grid(memory, id)];
        let cell = level.cell_of(self.records.position(memory, id));
        self.records.set_cell(memory, id, cell);
        self.records.link(memory, level.base + cell as usize, id);
        level.len += 1;
    }

    fn unbucket(&mut self, memory: &mut LinearMemory, id: u32) {
        let level = &mut self.levels[self.records.grid(memory, id)];
        let root = level.base + self.records.cell(memory, id) as usize;
        self.records.unlink(memory, root, id);
        level.len -= 1;
    }

    fn insert(
        &mut self,
        memory: &mut LinearMemory,
        position: [f32; D],
        radius: f32,
        reference: u32,
    ) -> EngineResult<()> {
        let id = if self.free != 0 {
            let id = self.free;
            self.free = self.records.next(memory, id);
            id
        } else if self.used < self.capacity {
            self.used += 1;
            self.used - 1
        } else {
            return Err(EngineError::CapacityExhausted {
                capacity: self.capacity - 1,
            });
        };
        self.records.set_grid(memory, id, self.level_for(radius));
        self.records.set_reference(memory, id, reference);
        self.records.set_position(memory, id, position);
        self.records.set_radius(memory, id, radius);
        self.bucket(memory, id);
        self.live += 1;
        Ok(())
    }

    fn release(&mut self, memory: &mut LinearMemory, id: u32) {
        self.unbucket(memory, id);
        self.records.set_cell(memory, id, VACANT);
        self.records.set_next(memory, id, self.free);
        self.free = id;
        self.live -= 1;
    }

    /// Re-buckets after a position change, if the cell changed.
    fn relocate(&mut self, memory: &mut LinearMemory, id: u32) {
        let level = &self.levels[self.records.grid(memory, id)];
        let cell = level.cell_of(self.records.position(memory, id));
        if cell != self.records.cell(memory, id) {
            self.unbucket(memory, id);
            self.bucket(memory, id);
        }
    }

    /// Re-grades after a radius change, if the level changed.
    fn regrade(&mut self, memory: &mut LinearMemory, id: u32) {
        let level = self.level_for(self.records.radius(memory, id));
        if level != self.records.grid(memory, id) {
            self.unbucket(memory, id);
            self.records.set_grid(memory, id, level);
            self.bucket(memory, id);
        }
    }

    fn update(&mut self, memory: &mut LinearMemory, imports: &mut dyn EngineImports) {
        let mut removed = 0u32;
        for id in 1..self.used {
            if self.records.is_vacant(memory, id) {
                continue;
            }
            let flags = imports.on_update(memory, id);
            if flags & REMOVE != 0 {
                self.release(memory, id);
                removed += 1;
                continue;
            }
            if flags & POSITION_CHANGED != 0 {
                self.relocate(memory, id);
            }
            if flags & RADIUS_CHANGED != 0 {
                self.regrade(memory, id);
            }
        }
        tracing::trace!("update pass: {} live, {removed} removed", self.live);
    }

    fn overlaps(&self, memory: &LinearMemory, a: u32, b: u32) -> bool {
        let pa = self.records.position(memory, a);
        let pb = self.records.position(memory, b);
        let reach = self.records.radius(memory, a) + self.records.radius(memory, b);
        let distance_sq: f32 = pa.iter().zip(pb.iter()).map(|(x, y)| (x - y) * (x - y)).sum();
        distance_sq <= reach * reach
    }

    /// Tests `a` against every entity in the list starting at `first`.
    fn collide_chain(
        &self,
        memory: &mut LinearMemory,
        imports: &mut dyn EngineImports,
        a: u32,
        first: u32,
    ) -> u32 {
        let mut hits = 0;
        let mut b = first;
        while b != 0 {
            if self.overlaps(memory, a, b) {
                imports.on_collision(memory, a, b);
                hits += 1;
            }
            b = self.records.next(memory, b);
        }
        hits
    }

    fn collide(&self, memory: &mut LinearMemory, imports: &mut dyn EngineImports) {
        let mut hits = 0u32;
        for a in 1..self.used {
            if self.records.is_vacant(memory, a) {
                continue;
            }
            let own = self.records.grid(memory, a);
            let level = &self.levels[own];
            let coords = level.coords::<D>(self.records.cell(memory, a));

            let rest = self.records.next(memory, a);
            hits += self.collide_chain(memory, imports, a, rest);
            for &offset in &self.hood.forward {
                if let Some(near) = level.step(coords, offset) {
                    let first = memory.word(level.base + level.index(near) as usize);
                    hits += self.collide_chain(memory, imports, a, first);
                }
            }

            for (index, coarser) in self.levels.iter().enumerate().skip(own + 1) {
                if coarser.len == 0 {
                    continue;
                }
                let shift = (index - own) as u32;
                let covering = coords.map(|c| c >> shift);
                for &offset in &self.hood.around {
                    if let Some(near) = coarser.step(covering, offset) {
                        let first = memory.word(coarser.base + coarser.index(near) as usize);
                        hits += self.collide_chain(memory, imports, a, first);
                    }
                }
            }
        }
        tracing::trace!("collide pass: {hits} pairs");
    }

    /// Folded level-0 cell range covering `[lo, hi]` on one axis.
    fn fold_range(&self, lo: f32, hi: f32) -> (u32, u32) {
        let level = &self.levels[0];
        let (lo, hi) = if lo < 0.0 {
            // shift by a whole number of mirror periods
            let shift = ((-lo * self.inverse_grid_size).floor() * 2.0 + 2.0) * self.grid_size;
            (lo + shift, hi + shift)
        } else {
            (lo, hi)
        };
        let segment_start = (lo * self.inverse_grid_size).floor() * self.grid_size;
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let folds = ((hi - segment_start) * self.inverse_grid_size) as u32;
        match folds {
            0 => {
                let a = level.fold(lo);
                let b = level.fold(hi);
                (a.min(b), a.max(b))
            }
            1 => {
                let raw = level.raw(lo);
                let end = level.fold(hi);
                if raw & level.side != 0 {
                    (0, level.fold_raw(raw).max(end))
                } else {
                    ((raw & level.mask).min(end), level.mask)
                }
            }
            _ => (0, level.mask),
        }
    }

    fn touches(&self, memory: &LinearMemory, id: u32, min: &[f32; D], max: &[f32; D]) -> bool {
        let position = self.records.position(memory, id);
        let radius = self.records.radius(memory, id);
        let distance_sq: f32 = (0..D)
            .map(|axis| {
                let p = position[axis];
                let d = p - p.clamp(min[axis], max[axis]);
                d * d
            })
            .sum();
        distance_sq <= radius * radius
    }

    fn query(
        &self,
        memory: &mut LinearMemory,
        min: [f32; D],
        max: [f32; D],
        imports: &mut dyn EngineImports,
    ) {
        let mut ranges = [(0u32, 0u32); D];
        for (axis, range) in ranges.iter_mut().enumerate() {
            *range = self.fold_range(min[axis], max[axis]);
        }

        let mut found = 0u32;
        for (index, level) in self.levels.iter().enumerate() {
            if level.len == 0 {
                continue;
            }
            let shift = index as u32;
            let lo = ranges.map(|(start, _)| (start >> shift).saturating_sub(1));
            let hi = ranges.map(|(_, end)| ((end >> shift) + 1).min(level.mask));
            for_each_cell(lo, hi, |cell| {
                let mut id = memory.word(level.base + level.index(cell) as usize);
                while id != 0 {
                    if self.touches(memory, id, &min, &max) {
                        imports.on_query(memory, id);
                        found += 1;
                    }
                    id = self.records.next(memory, id);
                }
            });
        }
        tracing::trace!("query pass: {found} entities");
    }
}

/// Visits every cell coordinate in the inclusive box `[lo, hi]`.
fn for_each_cell<const D: usize>(lo: [u32; D], hi: [u32; D], mut visit: impl FnMut([u32; D])) {
    let mut cursor = lo;
    loop {
        visit(cursor);
        let mut axis = 0;
        loop {
            if axis == D {
                return;
            }
            if cursor[axis] < hi[axis] {
                cursor[axis] += 1;
                break;
            }
            cursor[axis] = lo[axis];
            axis += 1;
        }
    }
}
