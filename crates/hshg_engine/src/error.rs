//! # Engine Error Types
//!
//! All errors that can be reported across the engine ABI.

use thiserror::Error;

/// Errors that can occur inside the engine module.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// An operation other than `sizing`/`init` was called before `init`.
    #[error("engine used before init")]
    Uninitialized,

    /// `init` was called twice on the same module.
    #[error("engine already initialized")]
    AlreadyInitialized,

    /// A grid parameter was not a non-zero power of two.
    #[error("{name} must be a non-zero power of two, got {value}")]
    NotPowerOfTwo {
        /// Which parameter was rejected.
        name: &'static str,
        /// The rejected value.
        value: u32,
    },

    /// The engine only supports 1 to 3 dimensions.
    #[error("unsupported dimension count {0}")]
    UnsupportedDimension(usize),

    /// Linear memory is smaller than the layout needs.
    #[error("linear memory too small: need {required} bytes, have {available}")]
    OutOfMemory {
        /// Bytes required by the layout.
        required: usize,
        /// Bytes currently available.
        available: usize,
    },

    /// Every entity slot is in use.
    #[error("entity slots exhausted: capacity {capacity}")]
    CapacityExhausted {
        /// Number of usable slots.
        capacity: u32,
    },

    /// A query box had `min > max` (or NaN) on some axis.
    #[error("query bounds inverted on axis {axis}")]
    InvertedBounds {
        /// The offending axis.
        axis: usize,
    },

    /// Growing memory would exceed the addressable page limit.
    #[error("linear memory limit reached: {requested} pages requested, limit {limit}")]
    MemoryLimit {
        /// Total pages that would be in use after the grow.
        requested: usize,
        /// Hard page limit.
        limit: usize,
    },
}

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;
