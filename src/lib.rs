#![doc = include_str!("../README.md")]
#![warn(missing_docs, missing_debug_implementations)]
mod activation;
mod batch;
mod config;
mod error;
mod slot_pool;
mod ticker;

pub use batch::*;
pub use config::*;
pub use error::*;
pub use slot_pool::*;
pub use ticker::*;

/// A trait defining the contract of an element stored in a [`SlotPool`].
///
/// New elements are produced by cloning one of the pool prototypes, so the
/// [`Clone`] implementation must return an independent instance that shares
/// no mutable state with the prototype or with other clones.
pub trait Poolable: Clone {
    /// Whether [`Self::reset`] should be called when a live slot is reused.
    ///
    /// The pool reads this once, at compile time. Leave it `false` for
    /// elements that are reused as-is.
    const RESETTABLE: bool = false;

    /// Restores the element to a state indistinguishable from a fresh clone.
    ///
    /// By default, this method do nothing. It is only called when
    /// [`Self::RESETTABLE`] is `true`, and never on a freshly created clone.
    #[inline(always)]
    fn reset(&mut self) {}

    /// Releases resources owned by the element.
    ///
    /// The pool calls this exactly once for every element it created, right
    /// before the element is dropped. By default, this method do nothing.
    #[inline(always)]
    fn release(&mut self) {}

    /// Validates that a prototype can be cloned.
    ///
    /// By default, this method always returns true. Override this method to
    /// reject prototypes whose backing resource is gone.
    #[inline(always)]
    fn is_valid(&self) -> bool {
        true
    }
}

/// An element with an active/inactive flag, used by
/// [`SlotPool::activate_next`] to tell slots in use from free ones.
///
/// What "active" means for the underlying resource (visible, connected,
/// simulated) is up to the implementor.
pub trait Activate {
    /// Returns `true` while the element is in use.
    fn is_active(&self) -> bool;

    /// Marks the element as in use or free.
    fn set_active(&mut self, active: bool);
}

/// An element that can be positioned when it is activated.
pub trait Placeable {
    /// Placement data, e.g. a position and a rotation.
    type Placement;

    /// Applies the placement to the element.
    fn place(&mut self, placement: Self::Placement);
}
