//! # HSHG Core
//!
//! Host-side bindings for the hierarchical spatial hash grid engine.
//!
//! The engine owns bucketing and traversal. This crate owns everything the
//! application sees: entity identity, the shared record codec, the
//! dirty/removal flag protocol and re-entrant callback dispatch.
//!
//! ## Entity Encodings
//!
//! 1. **Packed** ([`Hshg2d`]) - entity fields live directly in engine memory,
//!    the application identifies entities by an opaque `u32` reference
//! 2. **Indirect** ([`Hshg3d`]) - entities are host objects in a free-list
//!    table, the engine only stores their geometry and table id
//!
//! ## Example
//!
//! ```rust,ignore
//! use hshg_core::{GridConfig, Hshg2d};
//!
//! let mut grid = Hshg2d::new(GridConfig::new(16, 4, 100))?;
//! grid.insert([10.0, 20.0], 5.0, 1)?;
//! grid.insert([20.0, 0.0], 100.0, 2)?;
//!
//! grid.set_collide(|a, b| println!("{} hits {}", a.reference, b.reference));
//! grid.collide()?;
//!
//! grid.set_update(|mut entity| {
//!     entity.position[0] += 1.0;
//! });
//! grid.update()?;
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod allocator;
pub mod codec;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod hshg;
pub mod storage;
pub mod view;

pub use allocator::IdAllocator;
pub use codec::PackedEntity;
pub use config::GridConfig;
pub use dispatch::{UpdateFlags, Updating};
pub use error::{ConfigError, HshgError, HshgResult};
pub use hshg::{Hshg, Hshg2d, Hshg3d};
pub use storage::{Body, EntityStorage, IndirectStorage, PackedStorage};
pub use view::{Geometry, MemoryView, RecordLayout};

pub use hshg_engine::{EngineModule, GridEngine};
