//! Entity records in linear memory.
//!
//! Thin accessors over the record layout plus the per-cell intrusive lists.
//! Slot `0` is the sentinel: it is never handed out and `0` doubles as the
//! list terminator.

use crate::abi::{
    field_radius, record_stride, FIELD_CELL, FIELD_GRID, FIELD_NEXT, FIELD_POSITION, FIELD_PREV,
    FIELD_REFERENCE, VACANT,
};
use crate::memory::LinearMemory;

/// Location of the record array inside linear memory.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Records<const D: usize> {
    /// Word index of slot 0.
    pub head: usize,
}

impl<const D: usize> Records<D> {
    const STRIDE: usize = record_stride(D);

    #[inline]
    fn at(self, id: u32, field: usize) -> usize {
        self.head + id as usize * Self::STRIDE + field
    }

    #[inline]
    pub fn cell(self, memory: &LinearMemory, id: u32) -> u32 {
        memory.word(self.at(id, FIELD_CELL))
    }

    #[inline]
    pub fn set_cell(self, memory: &mut LinearMemory, id: u32, cell: u32) {
        memory.set_word(self.at(id, FIELD_CELL), cell);
    }

    #[inline]
    pub fn is_vacant(self, memory: &LinearMemory, id: u32) -> bool {
        self.cell(memory, id) == VACANT
    }

    #[inline]
    pub fn grid(self, memory: &LinearMemory, id: u32) -> usize {
        memory.word(self.at(id, FIELD_GRID)) as usize
    }

    #[inline]
    pub fn set_grid(self, memory: &mut LinearMemory, id: u32, grid: usize) {
        #[allow(clippy::cast_possible_truncation)]
        let grid = grid as u32;
        memory.set_word(self.at(id, FIELD_GRID), grid);
    }

    #[inline]
    pub fn next(self, memory: &LinearMemory, id: u32) -> u32 {
        memory.word(self.at(id, FIELD_NEXT))
    }

    #[inline]
    pub fn set_next(self, memory: &mut LinearMemory, id: u32, next: u32) {
        memory.set_word(self.at(id, FIELD_NEXT), next);
    }

    #[inline]
    pub fn prev(self, memory: &LinearMemory, id: u32) -> u32 {
        memory.word(self.at(id, FIELD_PREV))
    }

    #[inline]
    pub fn set_prev(self, memory: &mut LinearMemory, id: u32, prev: u32) {
        memory.set_word(self.at(id, FIELD_PREV), prev);
    }

    #[inline]
    pub fn set_reference(self, memory: &mut LinearMemory, id: u32, reference: u32) {
        memory.set_word(self.at(id, FIELD_REFERENCE), reference);
    }

    #[inline]
    pub fn position(self, memory: &LinearMemory, id: u32) -> [f32; D] {
        let start = self.at(id, FIELD_POSITION);
        let mut position = [0.0; D];
        position.copy_from_slice(&memory.floats()[start..start + D]);
        position
    }

    #[inline]
    pub fn set_position(self, memory: &mut LinearMemory, id: u32, position: [f32; D]) {
        let start = self.at(id, FIELD_POSITION);
        memory.floats_mut()[start..start + D].copy_from_slice(&position);
    }

    #[inline]
    pub fn radius(self, memory: &LinearMemory, id: u32) -> f32 {
        memory.float(self.at(id, field_radius(D)))
    }

    #[inline]
    pub fn set_radius(self, memory: &mut LinearMemory, id: u32, radius: f32) {
        memory.set_float(self.at(id, field_radius(D)), radius);
    }

    /// Pushes `id` onto the front of the list rooted at word `root`.
    pub fn link(self, memory: &mut LinearMemory, root: usize, id: u32) {
        let first = memory.word(root);
        self.set_next(memory, id, first);
        if first != 0 {
            self.set_prev(memory, first, id);
        }
        self.set_prev(memory, id, 0);
        memory.set_word(root, id);
    }

    /// Unlinks `id` from the list rooted at word `root`.
    pub fn unlink(self, memory: &mut LinearMemory, root: usize, id: u32) {
        let next = self.next(memory, id);
        let prev = self.prev(memory, id);
        if prev == 0 {
            memory.set_word(root, next);
        } else {
            self.set_next(memory, prev, next);
        }
        if next != 0 {
            self.set_prev(memory, next, prev);
        }
    }
}
