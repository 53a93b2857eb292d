use crate::{
    activation::Expiry, batch::BatchInit, Frame, PoolConfig, PoolError, Poolable, Result, Tickable,
};
use core::{cell::RefCell, fmt, time::Duration};
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::rc::Rc;
use tracing::{debug, trace, warn};

/// A fixed-capacity pool that hands out clones of its prototypes in
/// round-robin order.
///
/// Slots start empty and are filled lazily by [`Self::get_next`], eagerly by
/// [`Self::initialize`], or a few per tick by
/// [`Self::initialize_concurrent`]. Once every slot is live the pool keeps
/// cycling over the same elements instead of allocating new ones.
///
/// The pool is meant to be used from a single thread; share it with a
/// [`crate::Ticker`] through [`Self::to_rc`].
pub struct SlotPool<T: Poolable> {
    prototypes: Vec<T>,
    pub(crate) slots: Vec<Option<T>>,
    issued: u64,
    pub(crate) config: PoolConfig,
    rng: StdRng,
    pub(crate) clock: Duration,
    pub(crate) batch: Option<BatchInit>,
    pub(crate) initialized: usize,
    pub(crate) expiries: Vec<Expiry<T>>,
    disposed: bool,
}

impl<T: Poolable> SlotPool<T> {
    /// Creates a pool of `capacity` slots cloning a single prototype.
    ///
    /// No element is created until the pool is initialized or asked for one.
    pub fn new(prototype: T, capacity: usize) -> Result<Self> {
        Self::with_config(prototype, PoolConfig::with_capacity(capacity))
    }

    /// Creates a pool cloning a single prototype with a given configuration.
    pub fn with_config(prototype: T, config: PoolConfig) -> Result<Self> {
        Self::with_prototypes(vec![prototype], config)
    }

    /// Creates a pool that picks one of `prototypes` uniformly at random
    /// every time it fills a slot.
    pub fn with_prototypes(prototypes: Vec<T>, config: PoolConfig) -> Result<Self> {
        config.validate()?;
        if prototypes.is_empty() {
            return Err(PoolError::EmptyPrototypes);
        }
        if let Some(index) = prototypes.iter().position(|p| !p.is_valid()) {
            return Err(PoolError::InvalidPrototype { index });
        }
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let mut slots = Vec::with_capacity(config.capacity);
        slots.resize_with(config.capacity, || None);
        debug!(
            capacity = config.capacity,
            prototypes = prototypes.len(),
            resettable = T::RESETTABLE,
            "created slot pool"
        );
        Ok(SlotPool {
            prototypes,
            slots,
            issued: 0,
            config,
            rng,
            clock: Duration::ZERO,
            batch: None,
            initialized: 0,
            expiries: Vec::new(),
            disposed: false,
        })
    }

    /// Wraps the pool in a reference counted cell so it can be registered
    /// with a [`crate::Ticker`] and still be used by the caller.
    pub fn to_rc(self) -> Rc<RefCell<Self>> {
        Rc::new(RefCell::new(self))
    }

    /// Gets the number of slots in the pool.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Gets the configuration the pool was built with.
    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Gets the prototypes the pool clones from.
    pub fn prototypes(&self) -> &[T] {
        &self.prototypes
    }

    /// Gets the raw slot array, empty slots included.
    pub fn slots(&self) -> &[Option<T>] {
        &self.slots
    }

    /// Gets the element in slot `index`, if that slot has been filled.
    pub fn get(&self, index: usize) -> Option<&T> {
        self.slots.get(index).and_then(Option::as_ref)
    }

    /// Mutable version of [`Self::get`].
    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        self.slots.get_mut(index).and_then(Option::as_mut)
    }

    /// Iterates over live elements in slot order.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.slots.iter().flatten()
    }

    /// Gets the number of slots holding an element.
    pub fn live_count(&self) -> usize {
        self.iter().count()
    }

    /// Gets the slot index handed out last, or `None` before the first issue.
    pub fn cursor(&self) -> Option<usize> {
        self.issued
            .checked_sub(1)
            .map(|last| (last % self.slots.len() as u64) as usize)
    }

    /// Returns `true` once [`Self::dispose`] has run.
    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Gets the next element in round-robin order.
    ///
    /// An empty slot is filled with a clone of a random prototype. A live
    /// slot is reset first when the element type is
    /// [`Poolable::RESETTABLE`].
    pub fn get_next(&mut self) -> Result<&mut T> {
        let (index, _) = self.advance(true)?;
        self.slot_mut(index)
    }

    /// Moves the cursor one slot forward and makes sure that slot is live.
    ///
    /// Returns the slot index and whether the element was created by this
    /// call. A reused element is reset only when `reset` is set.
    pub(crate) fn advance(&mut self, reset: bool) -> Result<(usize, bool)> {
        self.ensure_usable()?;
        let index = (self.issued % self.slots.len() as u64) as usize;
        let fresh = self.slots[index].is_none();
        if fresh {
            let element = self.spawn()?;
            trace!(index, "filled empty slot on demand");
            self.slots[index] = Some(element);
        } else if reset && T::RESETTABLE {
            if let Some(element) = self.slots[index].as_mut() {
                element.reset();
            }
        }
        self.issued += 1;
        Ok((index, fresh))
    }

    pub(crate) fn slot_mut(&mut self, index: usize) -> Result<&mut T> {
        self.slots[index]
            .as_mut()
            .ok_or(PoolError::EmptySlot { index })
    }

    /// Moves the cursor back before the first slot.
    pub(crate) fn rewind(&mut self) {
        self.issued = 0;
    }

    /// Clones a randomly chosen prototype.
    pub(crate) fn spawn(&mut self) -> Result<T> {
        let index = match self.prototypes.len() {
            1 => 0,
            len => self.rng.random_range(0..len),
        };
        let prototype = &self.prototypes[index];
        if !prototype.is_valid() {
            return Err(PoolError::InvalidPrototype { index });
        }
        Ok(prototype.clone())
    }

    pub(crate) fn ensure_usable(&self) -> Result<()> {
        if self.disposed {
            return Err(PoolError::Disposed);
        }
        Ok(())
    }

    /// Releases every live element and stops pending work.
    ///
    /// Returns the number of elements released. Calling it again releases
    /// nothing; every other operation fails with [`PoolError::Disposed`]
    /// afterwards.
    pub fn dispose(&mut self) -> usize {
        if self.disposed {
            return 0;
        }
        self.disposed = true;
        if let Some(pending) = self.batch.take() {
            pending.finish(Err(PoolError::Disposed));
        }
        self.expiries.clear();
        let mut released = 0;
        for slot in self.slots.iter_mut() {
            if let Some(mut element) = slot.take() {
                element.release();
                released += 1;
            }
        }
        debug!(released, "disposed slot pool");
        released
    }
}

impl<T: Poolable> Tickable for SlotPool<T> {
    fn tick(&mut self, frame: &Frame) {
        if self.disposed {
            return;
        }
        self.clock = frame.now;
        self.fire_expiries();
        self.resume_initialization();
    }
}

/// Releases whatever is still live if the pool was never disposed.
impl<T: Poolable> Drop for SlotPool<T> {
    fn drop(&mut self) {
        if self.disposed {
            return;
        }
        let released = self.dispose();
        if released > 0 {
            warn!(released, "slot pool dropped without dispose");
        }
    }
}

impl<T: Poolable> fmt::Debug for SlotPool<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SlotPool")
            .field("capacity", &self.slots.len())
            .field("prototypes", &self.prototypes.len())
            .field("live", &self.live_count())
            .field("cursor", &self.cursor())
            .field("initialized", &self.initialized)
            .field("initializing", &self.batch.is_some())
            .field("pending_expiries", &self.expiries.len())
            .field("disposed", &self.disposed)
            .finish()
    }
}
