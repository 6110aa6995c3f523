//! # Callback Dispatch
//!
//! The engine-import side of one traversal pass.
//!
//! ## Update Protocol
//!
//! 1. Read the engine's committed geometry for the record
//! 2. Materialize the entity and hand it to the update callback
//! 3. If the callback removed it, release it and answer [`UpdateFlags::REMOVE`]
//! 4. Otherwise diff committed vs. current geometry, persist, answer the flags
//!
//! Collision callbacks may also move entities. Their changes are persisted
//! right after the callback and kept as pending flags. Once the collision
//! pass ends, a settle run through the engine's update answers
//! those flags without calling the application, so the engine re-buckets the
//! moved entities before any later pass.
//!
//! ## Radius
//!
//! Radii are never negative or NaN in engine memory. If a callback leaves an
//! invalid radius behind, the last committed radius is kept and a warning is
//! logged.

use std::ops::{BitOr, BitOrAssign, Deref, DerefMut};

use hshg_engine::{EngineImports, LinearMemory, POSITION_CHANGED, RADIUS_CHANGED, REMOVE};

use crate::storage::{Body, EntityStorage};
use crate::view::{Geometry, MemoryView, RecordLayout};

/// Dirty flags answered to the engine after an update callback.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateFlags(u32);

impl UpdateFlags {
    /// Nothing changed.
    pub const NONE: Self = Self(0);
    /// Position changed.
    pub const POSITION_CHANGED: Self = Self(POSITION_CHANGED);
    /// Radius changed.
    pub const RADIUS_CHANGED: Self = Self(RADIUS_CHANGED);
    /// Entity must be removed.
    pub const REMOVE: Self = Self(REMOVE);

    /// Flags describing the change from `committed` to `current`.
    ///
    /// The only place change detection happens.
    #[must_use]
    pub fn between<const D: usize>(committed: &Geometry<D>, current: &Geometry<D>) -> Self {
        let mut flags = Self::NONE;
        if committed.position != current.position {
            flags |= Self::POSITION_CHANGED;
        }
        if committed.radius != current.radius {
            flags |= Self::RADIUS_CHANGED;
        }
        flags
    }

    /// Raw ABI value.
    #[inline]
    #[must_use]
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Returns true if every flag in `other` is set.
    #[inline]
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Returns true if no flag is set.
    #[inline]
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for UpdateFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for UpdateFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

/// Returns true for radii the engine accepts: non-negative and not NaN.
#[inline]
#[must_use]
pub(crate) fn valid_radius(radius: f32) -> bool {
    radius >= 0.0
}

/// The entity's geometry, falling back to the committed radius if the
/// current one is invalid.
fn sanitized<const D: usize>(
    id: u32,
    committed: &Geometry<D>,
    current: Geometry<D>,
) -> Geometry<D> {
    if valid_radius(current.radius) {
        return current;
    }
    tracing::warn!(
        "engine record {id}: invalid radius {}, keeping {}",
        current.radius,
        committed.radius
    );
    Geometry {
        radius: committed.radius,
        ..current
    }
}

/// The entity being updated, plus the right to remove it.
///
/// Derefs to the entity. [`remove`](Self::remove) consumes the scope, so a
/// removed entity cannot be touched again within the same callback.
pub struct Updating<'a, E> {
    entity: &'a mut E,
    removed: &'a mut bool,
}

impl<E> Updating<'_, E> {
    /// Removes the entity once the callback returns.
    pub fn remove(self) {
        *self.removed = true;
    }
}

impl<E> Deref for Updating<'_, E> {
    type Target = E;

    fn deref(&self) -> &E {
        self.entity
    }
}

impl<E> DerefMut for Updating<'_, E> {
    fn deref_mut(&mut self) -> &mut E {
        self.entity
    }
}

/// Registered update callback.
pub(crate) type UpdateFn<E> = Box<dyn FnMut(Updating<'_, E>)>;
/// Registered collision callback.
pub(crate) type CollideFn<E> = Box<dyn FnMut(&mut E, &mut E)>;
/// Registered query callback.
pub(crate) type QueryFn<E> = Box<dyn FnMut(&E)>;

/// The three registered callbacks. Unset ones do nothing.
pub(crate) struct Callbacks<E> {
    pub update: UpdateFn<E>,
    pub collide: CollideFn<E>,
    pub query: QueryFn<E>,
}

impl<E: 'static> Default for Callbacks<E> {
    fn default() -> Self {
        Self {
            update: Box::new(|_: Updating<'_, E>| {}),
            collide: Box::new(|_: &mut E, _: &mut E| {}),
            query: Box::new(|_: &E| {}),
        }
    }
}

/// Which callback the current pass drives.
pub(crate) enum Pass<'p, E> {
    Update(&'p mut dyn FnMut(Updating<'_, E>)),
    Collide(&'p mut dyn FnMut(&mut E, &mut E)),
    Query(&'p mut dyn FnMut(&E)),
    /// Answers pending collision flags without calling the application.
    Settle,
}

impl<E> Pass<'_, E> {
    fn name(&self) -> &'static str {
        match self {
            Pass::Update(_) => "update",
            Pass::Collide(_) => "collide",
            Pass::Query(_) => "query",
            Pass::Settle => "settle",
        }
    }
}

/// Counters for one pass.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct PassStats {
    pub visited: u32,
    pub removed: u32,
    pub changed: u32,
}

/// Visitor lent to the engine for exactly one pass.
pub(crate) struct Dispatcher<'p, const D: usize, S: EntityStorage<D>> {
    storage: &'p mut S,
    layout: RecordLayout,
    pending: &'p mut [UpdateFlags],
    pass: Pass<'p, S::Entity>,
    stats: PassStats,
}

impl<'p, const D: usize, S: EntityStorage<D>> Dispatcher<'p, D, S> {
    pub fn new(
        storage: &'p mut S,
        layout: RecordLayout,
        pending: &'p mut [UpdateFlags],
        pass: Pass<'p, S::Entity>,
    ) -> Self {
        Self {
            storage,
            layout,
            pending,
            pass,
            stats: PassStats::default(),
        }
    }

    pub fn finish(self) -> PassStats {
        self.stats
    }

    fn misrouted(&self, import: &str) {
        tracing::error!(
            "engine called {import} during the {} pass, ignoring",
            self.pass.name()
        );
    }

    fn take_pending(&mut self, id: u32) -> UpdateFlags {
        self.pending
            .get_mut(id as usize)
            .map_or(UpdateFlags::NONE, std::mem::take)
    }

    fn mark_pending(&mut self, id: u32, flags: UpdateFlags) {
        if let Some(slot) = self.pending.get_mut(id as usize) {
            *slot |= flags;
        }
    }
}

impl<const D: usize, S: EntityStorage<D>> EngineImports for Dispatcher<'_, D, S> {
    fn on_update(&mut self, memory: &mut LinearMemory, id: u32) -> u32 {
        if matches!(self.pass, Pass::Settle) {
            let flags = self.take_pending(id);
            if !flags.is_empty() {
                self.stats.changed += 1;
            }
            return flags.bits();
        }
        if !matches!(self.pass, Pass::Update(_)) {
            self.misrouted("on_update");
            return 0;
        }
        let pending = self.take_pending(id);
        let mut view = MemoryView::<D>::new(memory, self.layout);
        let committed = view.geometry(id);
        let Pass::Update(callback) = &mut self.pass else {
            return 0;
        };
        let Some(mut entity) = self.storage.materialize(&view, id) else {
            tracing::error!("on_update for unknown engine record {id}");
            return 0;
        };
        self.stats.visited += 1;

        let mut removed = false;
        (*callback)(Updating {
            entity: &mut *entity,
            removed: &mut removed,
        });
        if removed {
            drop(entity);
            self.storage.release(&view, id);
            self.stats.removed += 1;
            return UpdateFlags::REMOVE.bits();
        }

        let current = entity.geometry();
        let settled = sanitized(id, &committed, current);
        let flags = UpdateFlags::between(&committed, &settled) | pending;
        S::persist(&mut view, id, &*entity);
        if settled != current {
            view.set_geometry(id, &settled);
        }
        if !flags.is_empty() {
            self.stats.changed += 1;
        }
        flags.bits()
    }

    fn on_collision(&mut self, memory: &mut LinearMemory, a: u32, b: u32) {
        let Pass::Collide(callback) = &mut self.pass else {
            self.misrouted("on_collision");
            return;
        };
        let mut view = MemoryView::<D>::new(memory, self.layout);
        let committed = [view.geometry(a), view.geometry(b)];
        let Some((mut first, mut second)) = self.storage.materialize_pair(&view, a, b) else {
            tracing::error!("on_collision for unknown engine records {a}, {b}");
            return;
        };
        self.stats.visited += 1;

        (*callback)(&mut *first, &mut *second);

        let mut changed = [UpdateFlags::NONE; 2];
        for (slot, (id, entity)) in [(a, &*first), (b, &*second)].into_iter().enumerate() {
            let current = entity.geometry();
            let settled = sanitized(id, &committed[slot], current);
            changed[slot] = UpdateFlags::between(&committed[slot], &settled);
            S::persist(&mut view, id, entity);
            if settled != current {
                view.set_geometry(id, &settled);
            }
        }
        drop((first, second));
        for (id, flags) in [(a, changed[0]), (b, changed[1])] {
            if !flags.is_empty() {
                self.stats.changed += 1;
                self.mark_pending(id, flags);
            }
        }
    }

    fn on_query(&mut self, memory: &mut LinearMemory, id: u32) {
        let Pass::Query(callback) = &mut self.pass else {
            self.misrouted("on_query");
            return;
        };
        let view = MemoryView::<D>::new(memory, self.layout);
        let Some(entity) = self.storage.materialize(&view, id) else {
            tracing::error!("on_query for unknown engine record {id}");
            return;
        };
        self.stats.visited += 1;
        (*callback)(&*entity);
    }
}
