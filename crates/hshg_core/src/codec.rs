//! Packed entity record codec.
//!
//! In the packed encoding an entity *is* its engine record: reading one
//! copies the shared fields out, writing one copies them back.

use crate::storage::Body;
use crate::view::{Geometry, MemoryView};

/// An entity stored directly in engine memory.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PackedEntity<const D: usize> {
    /// Opaque application payload.
    pub reference: u32,
    /// Centre.
    pub position: [f32; D],
    /// Radius.
    pub radius: f32,
}

impl<const D: usize> PackedEntity<D> {
    /// Decodes record `id`.
    #[must_use]
    pub fn read(view: &MemoryView<'_, D>, id: u32) -> Self {
        let Geometry { position, radius } = view.geometry(id);
        Self {
            reference: view.reference(id),
            position,
            radius,
        }
    }

    /// Encodes into record `id`.
    pub fn write(&self, view: &mut MemoryView<'_, D>, id: u32) {
        view.set_reference(id, self.reference);
        view.set_geometry(id, &self.geometry());
    }
}

impl<const D: usize> Body<D> for PackedEntity<D> {
    #[inline]
    fn position(&self) -> [f32; D] {
        self.position
    }

    #[inline]
    fn radius(&self) -> f32 {
        self.radius
    }
}
