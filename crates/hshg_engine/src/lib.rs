//! # HSHG Engine
//!
//! Hierarchical spatial hash grid running over a page-granular linear memory.
//!
//! ## Design
//!
//! 1. **One grid per power-of-two cell size** - an entity lives in the finest
//!    grid whose cells are wider than its diameter
//! 2. **Folded coordinates** - world positions are mirrored onto a finite grid,
//!    so the arena has no edges and negative coordinates are valid
//! 3. **Shared records** - every entity record sits in linear memory where the
//!    host can read and patch it between engine callbacks
//!
//! The host talks to the engine only through [`EngineModule`] and supplies
//! callbacks through [`EngineImports`].
//!
//! ## Example
//!
//! ```rust,ignore
//! use hshg_engine::{EngineModule, GridEngine, LinearMemory};
//!
//! let mut engine = GridEngine::<2>::new();
//! let bytes = engine.sizing(16, 100);
//! engine.memory_mut().grow(LinearMemory::pages_for(bytes))?;
//! let head = engine.init(16, 4, 100)?;
//! engine.insert([10.0, 20.0], 5.0, 1)?;
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod abi;
pub mod error;
pub mod grid;
pub mod memory;

pub use abi::{
    record_stride, EngineImports, EngineModule, POSITION_CHANGED, RADIUS_CHANGED, RECORD_HEADER,
    REMOVE,
};
pub use error::{EngineError, EngineResult};
pub use grid::GridEngine;
pub use memory::{LinearMemory, MAX_PAGES, PAGE_SIZE};
