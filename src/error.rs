//! Error types for pool operations
use thiserror::Error;

/// Result type for pool operations
pub type Result<T> = core::result::Result<T, PoolError>;

/// Errors reported by [`crate::SlotPool`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PoolError {
    /// The configured capacity is zero.
    #[error("capacity should be 1 or higher")]
    InvalidCapacity,

    /// The pool was built without any prototype.
    #[error("prototype set can not be empty")]
    EmptyPrototypes,

    /// A prototype failed validation and can not be cloned.
    #[error("prototype {index} is not valid")]
    InvalidPrototype {
        /// Position of the prototype in the prototype set
        index: usize,
    },

    /// Every slot is active and the pool does not preempt.
    #[error("pool is too small for current usage, all {capacity} elements are in use")]
    Exhausted {
        /// Capacity of the exhausted pool
        capacity: usize,
    },

    /// A slot that should hold an element is empty.
    #[error("slot {index} holds no element")]
    EmptySlot {
        /// Index of the empty slot
        index: usize,
    },

    /// A shared creation budget grants nothing per tick.
    #[error("shared creation budget allows no creation per tick")]
    ZeroBudget,

    /// A pending batch initialization was replaced by a new run.
    #[error("batch initialization was superseded by a new run")]
    Superseded,

    /// The pool has been disposed.
    #[error("pool is disposed")]
    Disposed,
}
