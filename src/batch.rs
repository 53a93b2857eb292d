use crate::{PoolError, Poolable, Result, SlotPool};
use core::cell::Cell;
use std::rc::Rc;
use tracing::{debug, error, trace, warn};

/// A per-tick creation budget shared by every pool that opts into it.
///
/// The tick driver calls [`Self::reset`] once per tick; batch initializers
/// only ever take from it with [`Self::try_acquire`].
#[derive(Debug)]
pub struct FrameBudget {
    limit: usize,
    remaining: Cell<usize>,
}

impl FrameBudget {
    /// Creates a budget allowing `limit` creations per tick.
    pub fn new(limit: usize) -> Self {
        FrameBudget {
            limit,
            remaining: Cell::new(limit),
        }
    }

    /// Creates a budget ready to be shared between pools.
    pub fn shared(limit: usize) -> Rc<Self> {
        Rc::new(Self::new(limit))
    }

    /// Gets the number of creations allowed per tick.
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Gets the number of creations left in the current tick.
    pub fn remaining(&self) -> usize {
        self.remaining.get()
    }

    /// Takes one creation from the budget, returning `false` when the current
    /// tick has nothing left.
    pub fn try_acquire(&self) -> bool {
        match self.remaining.get() {
            0 => false,
            left => {
                self.remaining.set(left - 1);
                true
            }
        }
    }

    /// Refills the budget for a new tick.
    pub fn reset(&self) {
        self.remaining.set(self.limit);
    }
}

/// How [`SlotPool::initialize_concurrent`] spreads slot creation over ticks.
///
/// The default schedule creates every slot during the call.
#[derive(Debug, Clone, Default)]
pub struct InitSchedule {
    frame_step: u32,
    budget: Option<Rc<FrameBudget>>,
}

impl InitSchedule {
    /// Creates one slot, then waits `frame_step` ticks before the next one.
    pub fn every(frame_step: u32) -> Self {
        InitSchedule {
            frame_step,
            budget: None,
        }
    }

    /// Creates as many slots per tick as the shared budget allows.
    pub fn shared(budget: Rc<FrameBudget>) -> Self {
        InitSchedule {
            frame_step: 0,
            budget: Some(budget),
        }
    }

    /// Adds a shared budget on top of the frame step.
    pub fn with_budget(mut self, budget: Rc<FrameBudget>) -> Self {
        self.budget = Some(budget);
        self
    }

    /// Gets the number of idle ticks between two creations.
    pub fn frame_step(&self) -> u32 {
        self.frame_step
    }

    /// Gets the shared budget, if any.
    pub fn budget(&self) -> Option<&Rc<FrameBudget>> {
        self.budget.as_ref()
    }
}

/// Outcome of a batch initialization step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitProgress {
    /// More slots will be created on later ticks.
    Pending,
    /// Every slot has been created.
    Complete,
}

type Completion = Box<dyn FnOnce(Result<()>)>;

/// A suspended batch initialization run.
pub(crate) struct BatchInit {
    schedule: InitSchedule,
    next: usize,
    idle: u32,
    on_complete: Option<Completion>,
}

impl BatchInit {
    pub(crate) fn finish(mut self, outcome: Result<()>) {
        if let Some(on_complete) = self.on_complete.take() {
            on_complete(outcome);
        }
    }
}

impl<T: Poolable> SlotPool<T> {
    /// Fills every slot, front to back, with a fresh clone.
    ///
    /// Elements already living in a slot are released and replaced. Stops at
    /// the first prototype that fails validation and reports it. A pending
    /// batch run is cancelled and its callback receives
    /// [`PoolError::Superseded`].
    pub fn initialize(&mut self) -> Result<()> {
        self.ensure_usable()?;
        if let Some(pending) = self.batch.take() {
            warn!("eager initialization replaced a pending batch initialization");
            pending.finish(Err(PoolError::Superseded));
        }
        self.initialized = 0;
        for index in 0..self.capacity() {
            self.fill(index)?;
        }
        debug!(capacity = self.capacity(), "initialized slot pool");
        Ok(())
    }

    /// Fills every slot, front to back, spread over ticks according to
    /// `schedule`.
    ///
    /// The first step runs during this call; the rest runs from
    /// [`crate::Tickable::tick`]. Calling this again before the previous run
    /// completes starts over from slot 0, and the previous callback receives
    /// [`PoolError::Superseded`]. A shared budget with a zero limit is
    /// rejected with [`PoolError::ZeroBudget`].
    pub fn initialize_concurrent(&mut self, schedule: InitSchedule) -> Result<InitProgress> {
        self.start_batch(schedule, None)
    }

    /// Same as [`Self::initialize_concurrent`], calling `on_complete` once the
    /// run ends.
    ///
    /// The callback receives the error that stopped a run on a later tick.
    /// Errors hit during this call are returned instead and the callback is
    /// dropped. Disposing the pool first delivers [`PoolError::Disposed`].
    /// It runs while the pool is borrowed, so it must not call back
    /// into the pool.
    pub fn initialize_concurrent_with<F>(
        &mut self,
        schedule: InitSchedule,
        on_complete: F,
    ) -> Result<InitProgress>
    where
        F: FnOnce(Result<()>) + 'static,
    {
        self.start_batch(schedule, Some(Box::new(on_complete)))
    }

    /// Returns `true` once a batch run has filled every slot.
    pub fn is_initialized(&self) -> bool {
        self.initialized >= self.capacity()
    }

    /// Gets the number of slots filled by the current or last batch run.
    pub fn initialized_count(&self) -> usize {
        self.initialized
    }

    /// Returns `true` while a batch run waits for ticks.
    pub fn is_initializing(&self) -> bool {
        self.batch.is_some()
    }

    fn start_batch(
        &mut self,
        schedule: InitSchedule,
        on_complete: Option<Completion>,
    ) -> Result<InitProgress> {
        self.ensure_usable()?;
        if schedule.budget.as_ref().is_some_and(|budget| budget.limit() == 0) {
            return Err(PoolError::ZeroBudget);
        }
        if let Some(pending) = self.batch.take() {
            warn!("restarting a pending batch initialization");
            pending.finish(Err(PoolError::Superseded));
        }
        self.initialized = 0;
        let mut batch = BatchInit {
            schedule,
            next: 0,
            idle: 0,
            on_complete,
        };
        match self.step_batch(&mut batch)? {
            InitProgress::Pending => self.batch = Some(batch),
            InitProgress::Complete => {
                debug!(capacity = self.capacity(), "initialized slot pool");
                batch.finish(Ok(()));
            }
        }
        Ok(self.progress())
    }

    pub(crate) fn resume_initialization(&mut self) {
        let Some(mut batch) = self.batch.take() else {
            return;
        };
        match self.step_batch(&mut batch) {
            Ok(InitProgress::Pending) => self.batch = Some(batch),
            Ok(InitProgress::Complete) => {
                debug!(capacity = self.capacity(), "initialized slot pool");
                batch.finish(Ok(()));
            }
            Err(err) => {
                error!(error = %err, filled = batch.next, "batch initialization stopped");
                batch.finish(Err(err));
            }
        }
    }

    fn progress(&self) -> InitProgress {
        match self.batch {
            Some(_) => InitProgress::Pending,
            None => InitProgress::Complete,
        }
    }

    /// Runs one tick worth of a batch initialization.
    fn step_batch(&mut self, batch: &mut BatchInit) -> Result<InitProgress> {
        if batch.idle > 0 {
            batch.idle -= 1;
            if batch.idle > 0 {
                return Ok(InitProgress::Pending);
            }
        }
        while batch.next < self.capacity() {
            if let Some(budget) = &batch.schedule.budget {
                if !budget.try_acquire() {
                    return Ok(InitProgress::Pending);
                }
            }
            self.fill(batch.next)?;
            batch.next += 1;
            if batch.schedule.frame_step > 0 && batch.next < self.capacity() {
                batch.idle = batch.schedule.frame_step;
                return Ok(InitProgress::Pending);
            }
        }
        Ok(InitProgress::Complete)
    }

    /// Puts a fresh clone into slot `index`, releasing the element it replaces.
    fn fill(&mut self, index: usize) -> Result<()> {
        let element = self.spawn()?;
        if let Some(mut old) = self.slots[index].replace(element) {
            old.release();
        }
        self.initialized = index + 1;
        trace!(index, "filled slot");
        Ok(())
    }
}
