//! # Engine ABI
//!
//! The fixed contract between an engine module and its host.
//!
//! ## Record Layout
//!
//! Every entity slot is a run of `record_stride(D)` 32-bit words starting at
//! `head + id * stride`:
//!
//! ```text
//! [cell, grid, next, prev | reference, pos[0..D], radius]
//!  \___ engine private __/ \______ shared with host ______/
//! ```
//!
//! The host-visible part starts [`RECORD_HEADER`] words into the record. For
//! two dimensions this is the classic stride 8 / header 4 layout.

use crate::error::EngineResult;
use crate::memory::LinearMemory;

/// Update flag: the entity's position changed.
pub const POSITION_CHANGED: u32 = 1;

/// Update flag: the entity's radius changed.
pub const RADIUS_CHANGED: u32 = 2;

/// Update flag: the entity must be removed.
pub const REMOVE: u32 = 4;

/// Words of engine-private bookkeeping before the shared fields.
pub const RECORD_HEADER: usize = 4;

/// Word offset of the cell index inside a record.
pub const FIELD_CELL: usize = 0;
/// Word offset of the grid level inside a record.
pub const FIELD_GRID: usize = 1;
/// Word offset of the next-in-cell link inside a record.
pub const FIELD_NEXT: usize = 2;
/// Word offset of the previous-in-cell link inside a record.
pub const FIELD_PREV: usize = 3;
/// Word offset of the reference inside a record.
pub const FIELD_REFERENCE: usize = RECORD_HEADER;
/// Word offset of the first coordinate inside a record.
pub const FIELD_POSITION: usize = RECORD_HEADER + 1;

/// Cell value marking a vacant slot.
pub const VACANT: u32 = u32::MAX;

/// Record stride in words for `dims` dimensions.
#[inline]
#[must_use]
pub const fn record_stride(dims: usize) -> usize {
    RECORD_HEADER + 2 + dims
}

/// Word offset of the radius inside a record for `dims` dimensions.
#[inline]
#[must_use]
pub const fn field_radius(dims: usize) -> usize {
    FIELD_POSITION + dims
}

/// Callbacks the engine invokes during a traversal pass.
///
/// Ids are engine slot ids, never `0`. Each call gets the engine's memory so
/// the host can read the committed record and write changes back before
/// returning.
pub trait EngineImports {
    /// Called once per live entity during `update`.
    ///
    /// # Returns
    ///
    /// A bitwise OR of [`POSITION_CHANGED`], [`RADIUS_CHANGED`] and [`REMOVE`].
    fn on_update(&mut self, memory: &mut LinearMemory, id: u32) -> u32;

    /// Called once per overlapping pair during `collide`.
    fn on_collision(&mut self, memory: &mut LinearMemory, a: u32, b: u32);

    /// Called once per entity intersecting the box during `query`.
    fn on_query(&mut self, memory: &mut LinearMemory, id: u32);
}

/// The engine side of the ABI, for `D` dimensions.
pub trait EngineModule<const D: usize> {
    /// The engine's linear memory.
    fn memory(&self) -> &LinearMemory;

    /// The engine's linear memory, mutably (for growth before `init`).
    fn memory_mut(&mut self) -> &mut LinearMemory;

    /// Bytes of linear memory needed for `side` cells per axis and up to
    /// `max_entities` live entities.
    fn sizing(&self, side: u32, max_entities: u32) -> usize;

    /// Lays out cells and entity slots in memory.
    ///
    /// # Returns
    ///
    /// Byte offset of the entity record array (the header offset).
    ///
    /// # Errors
    ///
    /// Fails on bad parameters, a second `init`, or insufficient memory.
    fn init(&mut self, side: u32, cell_size: u32, max_entities: u32) -> EngineResult<usize>;

    /// Inserts an entity carrying an opaque `reference`.
    ///
    /// # Errors
    ///
    /// Fails before `init` or when every slot is in use.
    fn insert(&mut self, position: [f32; D], radius: f32, reference: u32) -> EngineResult<()>;

    /// Runs the update pass.
    ///
    /// # Errors
    ///
    /// Fails before `init`.
    fn update(&mut self, imports: &mut dyn EngineImports) -> EngineResult<()>;

    /// Runs the collision pass.
    ///
    /// # Errors
    ///
    /// Fails before `init`.
    fn collide(&mut self, imports: &mut dyn EngineImports) -> EngineResult<()>;

    /// Runs a box query.
    ///
    /// # Errors
    ///
    /// Fails before `init` or when `min > max` on some axis.
    fn query(
        &mut self,
        min: [f32; D],
        max: [f32; D],
        imports: &mut dyn EngineImports,
    ) -> EngineResult<()>;
}
