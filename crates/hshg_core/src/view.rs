//! Memory view adapter.
//!
//! Presents engine memory as typed entity records. Record `id` starts at
//! word `offset(id) = head + id * STRIDE + HEADER`, where `STRIDE` and
//! `HEADER` are fixed by the engine ABI.
//!
//! # Memory Layout
//!
//! ```text
//! offset(id) + 0          reference (u32)
//! offset(id) + 1 .. 1+D   position  (f32 x D)
//! offset(id) + 1+D        radius    (f32)
//! ```

use hshg_engine::{record_stride, LinearMemory, RECORD_HEADER};

/// Position and radius of one entity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Geometry<const D: usize> {
    /// Centre.
    pub position: [f32; D],
    /// Radius.
    pub radius: f32,
}

/// Where records live inside engine memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordLayout {
    head: usize,
    stride: usize,
}

impl RecordLayout {
    /// Builds the layout from the byte offset returned by engine `init`.
    #[must_use]
    pub const fn new(head_bytes: usize, dims: usize) -> Self {
        Self {
            head: head_bytes / 4,
            stride: record_stride(dims),
        }
    }

    /// Word offset of the host-visible part of record `id`.
    #[inline]
    #[must_use]
    pub const fn offset(&self, id: u32) -> usize {
        self.head + id as usize * self.stride + RECORD_HEADER
    }
}

/// Typed access to entity records for one engine callback.
pub struct MemoryView<'m, const D: usize> {
    memory: &'m mut LinearMemory,
    layout: RecordLayout,
}

impl<'m, const D: usize> MemoryView<'m, D> {
    /// Wraps engine memory.
    pub fn new(memory: &'m mut LinearMemory, layout: RecordLayout) -> Self {
        Self { memory, layout }
    }

    /// Stored reference of record `id`.
    #[inline]
    #[must_use]
    pub fn reference(&self, id: u32) -> u32 {
        self.memory.word(self.layout.offset(id))
    }

    /// Overwrites the reference of record `id`.
    #[inline]
    pub fn set_reference(&mut self, id: u32, reference: u32) {
        self.memory.set_word(self.layout.offset(id), reference);
    }

    /// Committed geometry of record `id`.
    #[inline]
    #[must_use]
    pub fn geometry(&self, id: u32) -> Geometry<D> {
        let start = self.layout.offset(id) + 1;
        let floats = &self.memory.floats()[start..=start + D];
        let mut position = [0.0; D];
        position.copy_from_slice(&floats[..D]);
        Geometry {
            position,
            radius: floats[D],
        }
    }

    /// Overwrites the geometry of record `id`.
    #[inline]
    pub fn set_geometry(&mut self, id: u32, geometry: &Geometry<D>) {
        let start = self.layout.offset(id) + 1;
        let floats = &mut self.memory.floats_mut()[start..=start + D];
        floats[..D].copy_from_slice(&geometry.position);
        floats[D] = geometry.radius;
    }
}
