use crate::FrameBudget;
use core::{cell::RefCell, fmt, time::Duration};
use std::rc::{Rc, Weak};

/// A snapshot of the tick being processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Frame {
    /// Number of ticks since the driver started, 1 for the first tick
    pub index: u64,
    /// Time elapsed since the driver started
    pub now: Duration,
    /// Time elapsed since the previous tick
    pub delta: Duration,
}

/// Work that is resumed once per tick.
pub trait Tickable {
    /// Runs the pending work for `frame`.
    fn tick(&mut self, frame: &Frame);
}

/// A single-threaded tick driver.
///
/// Every call to [`Self::advance`] refills the shared [`FrameBudget`] and
/// then ticks each registered subscriber exactly once, in registration
/// order. Subscribers are held weakly; dropping the last strong handle
/// unregisters them.
pub struct Ticker {
    frame: Frame,
    budget: Rc<FrameBudget>,
    subscribers: Vec<Weak<RefCell<dyn Tickable>>>,
}

impl Ticker {
    /// Creates a driver whose shared budget allows `instantiate_limit`
    /// creations per tick.
    pub fn new(instantiate_limit: usize) -> Self {
        Ticker {
            frame: Frame::default(),
            budget: FrameBudget::shared(instantiate_limit),
            subscribers: Vec::new(),
        }
    }

    /// Gets the shared creation budget this driver refills.
    pub fn budget(&self) -> Rc<FrameBudget> {
        self.budget.clone()
    }

    /// Gets the last processed frame.
    pub fn frame(&self) -> Frame {
        self.frame
    }

    /// Gets the driver clock.
    pub fn now(&self) -> Duration {
        self.frame.now
    }

    /// Registers a subscriber, ticked after every subscriber registered
    /// before it.
    pub fn register<S: Tickable + 'static>(&mut self, subscriber: &Rc<RefCell<S>>) {
        let subscriber: Rc<RefCell<dyn Tickable>> = subscriber.clone();
        self.subscribers.push(Rc::downgrade(&subscriber));
    }

    /// Gets the number of subscribers still alive.
    pub fn len(&self) -> usize {
        self.subscribers
            .iter()
            .filter(|subscriber| subscriber.strong_count() > 0)
            .count()
    }

    /// Returns `true` if no subscriber is alive.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Moves the clock forward by `delta` and runs one tick.
    ///
    /// # Panics
    ///
    /// Panics if a subscriber is already borrowed when it is ticked.
    pub fn advance(&mut self, delta: Duration) -> Frame {
        self.frame = Frame {
            index: self.frame.index + 1,
            now: self.frame.now.saturating_add(delta),
            delta,
        };
        self.budget.reset();
        self.subscribers
            .retain(|subscriber| subscriber.strong_count() > 0);
        for subscriber in &self.subscribers {
            if let Some(subscriber) = subscriber.upgrade() {
                subscriber.borrow_mut().tick(&self.frame);
            }
        }
        self.frame
    }
}

/// Creates a driver with an unlimited creation budget.
impl Default for Ticker {
    fn default() -> Self {
        Self::new(usize::MAX)
    }
}

impl fmt::Debug for Ticker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ticker")
            .field("frame", &self.frame)
            .field("budget", &self.budget)
            .field("subscribers", &self.len())
            .finish()
    }
}
