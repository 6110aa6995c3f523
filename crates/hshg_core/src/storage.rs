//! # Entity Storage
//!
//! The single seam between dispatch and the two entity encodings.
//!
//! | Operation     | Packed                         | Indirect                          |
//! |---------------|--------------------------------|-----------------------------------|
//! | `materialize` | copy record out of memory      | look up host object by reference  |
//! | `persist`     | write whole record back        | write geometry into engine copy   |
//! | `release`     | nothing                        | free the host id                  |

use std::marker::PhantomData;
use std::ops::{Deref, DerefMut};

use crate::allocator::IdAllocator;
use crate::codec::PackedEntity;
use crate::view::{Geometry, MemoryView};

/// Anything with a centre and a radius.
pub trait Body<const D: usize> {
    /// Centre.
    fn position(&self) -> [f32; D];

    /// Radius.
    fn radius(&self) -> f32;

    /// Centre and radius together.
    #[inline]
    fn geometry(&self) -> Geometry<D> {
        Geometry {
            position: self.position(),
            radius: self.radius(),
        }
    }
}

/// How entities are held while the engine calls back into the host.
pub trait EntityStorage<const D: usize> {
    /// The entity type callbacks see.
    type Entity: Body<D> + 'static;

    /// A materialized entity, borrowed from the storage or detached from it.
    type Handle<'s>: DerefMut<Target = Self::Entity>
    where
        Self: 's;

    /// Creates storage for up to `max_entities` live entities.
    fn with_capacity(max_entities: u32) -> Self;

    /// Number of live entities the storage tracks, if it tracks them.
    fn tracked(&self) -> Option<usize>;

    /// Produces the entity behind engine record `id`.
    fn materialize<'s>(
        &'s mut self,
        view: &MemoryView<'_, D>,
        id: u32,
    ) -> Option<Self::Handle<'s>>;

    /// Produces two distinct entities with disjoint mutable access.
    fn materialize_pair<'s>(
        &'s mut self,
        view: &MemoryView<'_, D>,
        a: u32,
        b: u32,
    ) -> Option<(Self::Handle<'s>, Self::Handle<'s>)>;

    /// Writes the entity's changes into engine record `id`.
    fn persist(view: &mut MemoryView<'_, D>, id: u32, entity: &Self::Entity);

    /// Drops whatever the host holds for engine record `id`.
    fn release(&mut self, view: &MemoryView<'_, D>, id: u32);
}

/// A copy of a packed record, detached from engine memory.
#[derive(Debug)]
pub struct Detached<E>(E);

impl<E> Deref for Detached<E> {
    type Target = E;

    fn deref(&self) -> &E {
        &self.0
    }
}

impl<E> DerefMut for Detached<E> {
    fn deref_mut(&mut self) -> &mut E {
        &mut self.0
    }
}

/// Packed encoding: the record is the entity.
#[derive(Debug, Default)]
pub struct PackedStorage<const D: usize>;

impl<const D: usize> EntityStorage<D> for PackedStorage<D> {
    type Entity = PackedEntity<D>;
    type Handle<'s> = Detached<PackedEntity<D>>
    where
        Self: 's;

    fn with_capacity(_max_entities: u32) -> Self {
        Self
    }

    fn tracked(&self) -> Option<usize> {
        None
    }

    fn materialize<'s>(
        &'s mut self,
        view: &MemoryView<'_, D>,
        id: u32,
    ) -> Option<Self::Handle<'s>> {
        Some(Detached(PackedEntity::read(view, id)))
    }

    fn materialize_pair<'s>(
        &'s mut self,
        view: &MemoryView<'_, D>,
        a: u32,
        b: u32,
    ) -> Option<(Self::Handle<'s>, Self::Handle<'s>)> {
        if a == b {
            return None;
        }
        Some((
            Detached(PackedEntity::read(view, a)),
            Detached(PackedEntity::read(view, b)),
        ))
    }

    fn persist(view: &mut MemoryView<'_, D>, id: u32, entity: &PackedEntity<D>) {
        entity.write(view, id);
    }

    fn release(&mut self, _view: &MemoryView<'_, D>, _id: u32) {}
}

/// Indirect encoding: host objects in an id table, referenced by id.
///
/// The engine record's reference field holds the table id, so engine slot
/// ids and host ids are independent.
#[derive(Debug)]
pub struct IndirectStorage<const D: usize, T> {
    table: IdAllocator<T>,
    _dims: PhantomData<[f32; D]>,
}

impl<const D: usize, T> IndirectStorage<D, T> {
    /// Stores a new entity, returning its host id.
    pub fn admit(&mut self, entity: T) -> u32 {
        self.table.alloc(entity)
    }

    /// Removes an entity by host id.
    pub fn evict(&mut self, id: u32) -> Option<T> {
        self.table.free(id)
    }

    /// The backing id table.
    #[must_use]
    pub fn table(&self) -> &IdAllocator<T> {
        &self.table
    }
}

impl<const D: usize, T: Body<D> + 'static> EntityStorage<D> for IndirectStorage<D, T> {
    type Entity = T;
    type Handle<'s> = &'s mut T
    where
        Self: 's;

    fn with_capacity(max_entities: u32) -> Self {
        Self {
            table: IdAllocator::with_capacity(max_entities as usize),
            _dims: PhantomData,
        }
    }

    fn tracked(&self) -> Option<usize> {
        Some(self.table.len())
    }

    fn materialize<'s>(
        &'s mut self,
        view: &MemoryView<'_, D>,
        id: u32,
    ) -> Option<Self::Handle<'s>> {
        self.table.get_mut(view.reference(id))
    }

    fn materialize_pair<'s>(
        &'s mut self,
        view: &MemoryView<'_, D>,
        a: u32,
        b: u32,
    ) -> Option<(Self::Handle<'s>, Self::Handle<'s>)> {
        self.table.pair_mut(view.reference(a), view.reference(b))
    }

    fn persist(view: &mut MemoryView<'_, D>, id: u32, entity: &T) {
        view.set_geometry(id, &entity.geometry());
    }

    fn release(&mut self, view: &MemoryView<'_, D>, id: u32) {
        if self.table.free(view.reference(id)).is_none() {
            tracing::error!("release of engine record {id} with no live host entity");
        }
    }
}
