//! # HSHG Facade
//!
//! Lifecycle and public surface of a hierarchical spatial hash grid.
//!
//! ## Construction
//!
//! 1. Validate the [`GridConfig`]
//! 2. Ask the engine how many bytes `(side, max_entities)` needs
//! 3. Grow engine memory to cover it
//! 4. `init` the engine and remember where the records start
//!
//! ## Passes
//!
//! [`update`](Hshg::update), [`collide`](Hshg::collide) and
//! [`query`](Hshg::query) each make one synchronous engine call (collide
//! adds a settle call when entities moved). The grid is mutably borrowed
//! for the whole pass, so callbacks cannot insert or start another pass.

use hshg_engine::{EngineModule, GridEngine};

use crate::config::GridConfig;
use crate::dispatch::{valid_radius, Callbacks, Dispatcher, Pass, UpdateFlags, Updating};
use crate::error::{HshgError, HshgResult};
use crate::storage::{Body, EntityStorage, IndirectStorage, PackedStorage};
use crate::view::{Geometry, RecordLayout};

/// Two-dimensional grid with entities packed into engine memory.
pub type Hshg2d = Hshg<2, PackedStorage<2>, GridEngine<2>>;

/// Three-dimensional grid over host-owned entities of type `T`.
pub type Hshg3d<T> = Hshg<3, IndirectStorage<3, T>, GridEngine<3>>;

/// A hierarchical spatial hash grid.
///
/// - `D` - number of dimensions
/// - `S` - entity encoding ([`PackedStorage`] or [`IndirectStorage`])
/// - `E` - engine module behind the ABI
pub struct Hshg<const D: usize, S: EntityStorage<D>, E: EngineModule<D> = GridEngine<D>> {
    engine: E,
    storage: S,
    callbacks: Callbacks<S::Entity>,
    /// Changes made during collisions, reported at the next update. Indexed
    /// by engine slot id.
    pending: Vec<UpdateFlags>,
    layout: RecordLayout,
    config: GridConfig,
    footprint: usize,
    live: u32,
}

impl<const D: usize, S: EntityStorage<D>> Hshg<D, S, GridEngine<D>> {
    /// Creates a grid backed by the reference engine.
    ///
    /// # Errors
    ///
    /// Returns [`HshgError::Configuration`] for an invalid config and
    /// [`HshgError::Engine`] if the engine cannot be prepared.
    pub fn new(config: GridConfig) -> HshgResult<Self> {
        Self::with_engine(config, GridEngine::new())
    }
}

impl<const D: usize, S: EntityStorage<D>, E: EngineModule<D>> Hshg<D, S, E> {
    /// Creates a grid on top of any engine module.
    ///
    /// # Errors
    ///
    /// As [`Hshg::new`].
    pub fn with_engine(config: GridConfig, mut engine: E) -> HshgResult<Self> {
        config.validate()?;
        let footprint = engine.sizing(config.side, config.max_entities);
        engine.memory_mut().reserve_bytes(footprint)?;
        let head = engine.init(config.side, config.cell_size, config.max_entities)?;
        tracing::debug!(
            "hshg ready: {}D, {footprint} bytes in {} pages, records at byte {head}",
            D,
            engine.memory().pages()
        );
        Ok(Self {
            engine,
            storage: S::with_capacity(config.max_entities),
            callbacks: Callbacks::default(),
            pending: vec![UpdateFlags::NONE; config.max_entities as usize + 1],
            layout: RecordLayout::new(head, D),
            config,
            footprint,
            live: 0,
        })
    }

    /// Engine memory footprint in bytes. Depends only on `side` and
    /// `max_entities`.
    #[inline]
    #[must_use]
    pub const fn mem(&self) -> usize {
        self.footprint
    }

    /// Number of live entities.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> u32 {
        self.live
    }

    /// Returns true if no entity is live.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Construction parameters.
    #[inline]
    #[must_use]
    pub const fn config(&self) -> &GridConfig {
        &self.config
    }

    /// The engine module.
    #[inline]
    #[must_use]
    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Sets the update callback. It may modify the entity, or remove it
    /// through [`Updating::remove`].
    pub fn set_update<F>(&mut self, callback: F)
    where
        F: FnMut(Updating<'_, S::Entity>) + 'static,
    {
        self.callbacks.update = Box::new(callback);
    }

    /// Sets the collision callback, called once per overlapping pair.
    pub fn set_collide<F>(&mut self, callback: F)
    where
        F: FnMut(&mut S::Entity, &mut S::Entity) + 'static,
    {
        self.callbacks.collide = Box::new(callback);
    }

    /// Sets the query callback, called once per entity touching the box.
    pub fn set_query<F>(&mut self, callback: F)
    where
        F: FnMut(&S::Entity) + 'static,
    {
        self.callbacks.query = Box::new(callback);
    }

    /// Runs the update callback on every live entity.
    ///
    /// # Errors
    ///
    /// Returns [`HshgError::Engine`] if the engine rejects the pass.
    pub fn update(&mut self) -> HshgResult<()> {
        let mut dispatcher = Dispatcher::<D, S>::new(
            &mut self.storage,
            self.layout,
            &mut self.pending,
            Pass::Update(&mut *self.callbacks.update),
        );
        self.engine.update(&mut dispatcher)?;
        let stats = dispatcher.finish();
        self.live -= stats.removed;
        if let Some(tracked) = self.storage.tracked() {
            debug_assert_eq!(tracked, self.live as usize);
        }
        tracing::trace!(
            "update: {} visited, {} changed, {} removed",
            stats.visited,
            stats.changed,
            stats.removed
        );
        Ok(())
    }

    /// Runs the collision callback on every overlapping pair.
    ///
    /// Geometry changes made here are written back immediately. If any
    /// entity moved or resized, a settle run through the engine's update
    /// re-buckets it before this returns, without calling the update
    /// callback.
    ///
    /// # Errors
    ///
    /// Returns [`HshgError::Engine`] if the engine rejects the pass.
    pub fn collide(&mut self) -> HshgResult<()> {
        let mut dispatcher = Dispatcher::<D, S>::new(
            &mut self.storage,
            self.layout,
            &mut self.pending,
            Pass::Collide(&mut *self.callbacks.collide),
        );
        self.engine.collide(&mut dispatcher)?;
        let stats = dispatcher.finish();
        tracing::trace!(
            "collide: {} pairs, {} entities changed",
            stats.visited,
            stats.changed
        );
        if stats.changed > 0 {
            let mut dispatcher = Dispatcher::<D, S>::new(
                &mut self.storage,
                self.layout,
                &mut self.pending,
                Pass::Settle,
            );
            self.engine.update(&mut dispatcher)?;
            tracing::trace!("settle: {} entities re-bucketed", dispatcher.finish().changed);
        }
        Ok(())
    }

    /// Runs the query callback on every entity touching the box
    /// `[min, max]`.
    ///
    /// # Errors
    ///
    /// Returns [`HshgError::Engine`] if `min > max` on some axis.
    pub fn query(&mut self, min: [f32; D], max: [f32; D]) -> HshgResult<()> {
        let mut dispatcher = Dispatcher::<D, S>::new(
            &mut self.storage,
            self.layout,
            &mut self.pending,
            Pass::Query(&mut *self.callbacks.query),
        );
        self.engine.query(min, max, &mut dispatcher)?;
        tracing::trace!("query: {} hits", dispatcher.finish().visited);
        Ok(())
    }

    /// Like [`query`](Self::query) but with a one-off callback.
    ///
    /// # Errors
    ///
    /// Returns [`HshgError::Engine`] if `min > max` on some axis.
    pub fn query_with<F>(&mut self, min: [f32; D], max: [f32; D], mut visit: F) -> HshgResult<()>
    where
        F: FnMut(&S::Entity),
    {
        let mut dispatcher = Dispatcher::<D, S>::new(
            &mut self.storage,
            self.layout,
            &mut self.pending,
            Pass::Query(&mut visit),
        );
        self.engine.query(min, max, &mut dispatcher)?;
        Ok(())
    }

    /// Collects every entity touching the box `[min, max]`.
    ///
    /// # Errors
    ///
    /// Returns [`HshgError::Engine`] if `min > max` on some axis.
    pub fn query_collect(&mut self, min: [f32; D], max: [f32; D]) -> HshgResult<Vec<S::Entity>>
    where
        S::Entity: Clone,
    {
        let mut found = Vec::new();
        self.query_with(min, max, |entity| found.push(entity.clone()))?;
        Ok(found)
    }

    fn admit_check(&self, radius: f32) -> HshgResult<()> {
        if !valid_radius(radius) {
            return Err(HshgError::InvalidRadius { radius });
        }
        if self.live >= self.config.max_entities {
            tracing::warn!(
                "insert refused: {} of {} entities live",
                self.live,
                self.config.max_entities
            );
            return Err(HshgError::CapacityExceeded {
                max_entities: self.config.max_entities,
            });
        }
        Ok(())
    }
}

impl<const D: usize, E: EngineModule<D>> Hshg<D, PackedStorage<D>, E> {
    /// Inserts an entity carrying an opaque `reference`.
    ///
    /// # Errors
    ///
    /// Returns [`HshgError::InvalidRadius`] for a negative or NaN radius and
    /// [`HshgError::CapacityExceeded`] once `max_entities` are live.
    pub fn insert(&mut self, position: [f32; D], radius: f32, reference: u32) -> HshgResult<()> {
        self.admit_check(radius)?;
        self.engine.insert(position, radius, reference)?;
        self.live += 1;
        Ok(())
    }
}

impl<const D: usize, T: Body<D> + 'static, E: EngineModule<D>> Hshg<D, IndirectStorage<D, T>, E> {
    /// Inserts a host-owned entity and returns its id.
    ///
    /// Ids are reused after removal, most recently freed first.
    ///
    /// # Errors
    ///
    /// Returns [`HshgError::InvalidRadius`] for a negative or NaN radius and
    /// [`HshgError::CapacityExceeded`] once `max_entities` are live.
    pub fn insert(&mut self, entity: T) -> HshgResult<u32> {
        let Geometry { position, radius } = entity.geometry();
        self.admit_check(radius)?;
        let id = self.storage.admit(entity);
        if let Err(err) = self.engine.insert(position, radius, id) {
            self.storage.evict(id);
            return Err(err.into());
        }
        self.live += 1;
        Ok(id)
    }

    /// Entity behind host id `id`.
    #[must_use]
    pub fn get(&self, id: u32) -> Option<&T> {
        self.storage.table().get(id)
    }

    /// Live entities with their host ids.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &T)> {
        self.storage.table().iter()
    }
}
