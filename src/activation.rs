use crate::{Activate, ExhaustionPolicy, Placeable, PoolError, Poolable, Result, SlotPool};
use core::time::Duration;
use tracing::warn;

/// A deferred deactivation of one slot.
pub(crate) struct Expiry<T> {
    deadline: Duration,
    index: usize,
    apply: fn(&mut T),
}

fn deactivate<T: Activate>(element: &mut T) {
    element.set_active(false);
}

impl<T: Poolable + Activate> SlotPool<T> {
    /// Activates the next inactive element in round-robin order.
    ///
    /// Up to [`Self::capacity`] slots are checked from the cursor. When every
    /// one of them is active the call fails with [`PoolError::Exhausted`], or
    /// takes over the oldest slot if the pool was configured with
    /// [`ExhaustionPolicy::Preempt`].
    ///
    /// A non-zero `expire_after` deactivates the element once the pool clock
    /// has moved that far. The deactivation can not be cancelled and still
    /// fires if the element has been handed out again in the meantime.
    pub fn activate_next(&mut self, expire_after: Duration) -> Result<&mut T> {
        let index = self.claim()?;
        self.finish_activation(index, expire_after)
    }

    /// Same as [`Self::activate_next`], placing the element before it is
    /// activated.
    pub fn activate_next_at(
        &mut self,
        placement: T::Placement,
        expire_after: Duration,
    ) -> Result<&mut T>
    where
        T: Placeable,
    {
        let index = self.claim()?;
        self.slot_mut(index)?.place(placement);
        self.finish_activation(index, expire_after)
    }

    /// Deactivates every live element and rewinds the cursor so the next
    /// issue starts from slot 0.
    ///
    /// Pending expiries are left as they are.
    pub fn deactivate_all(&mut self) -> Result<()> {
        self.ensure_usable()?;
        for element in self.slots.iter_mut().flatten() {
            element.set_active(false);
        }
        self.rewind();
        Ok(())
    }

    /// Finds the slot to activate and resets it for reuse.
    fn claim(&mut self) -> Result<usize> {
        let capacity = self.capacity();
        for _ in 0..capacity {
            let (index, fresh) = self.advance(false)?;
            let element = self.slot_mut(index)?;
            if fresh {
                element.set_active(false);
            } else if !element.is_active() {
                if T::RESETTABLE {
                    element.reset();
                }
            } else {
                continue;
            }
            return Ok(index);
        }
        match self.config.exhaustion {
            ExhaustionPolicy::Strict => {
                warn!(capacity, "every pooled element is active");
                Err(PoolError::Exhausted { capacity })
            }
            ExhaustionPolicy::Preempt => {
                let (index, _) = self.advance(true)?;
                let element = self.slot_mut(index)?;
                element.set_active(false);
                warn!(index, "preempted the oldest active element");
                Ok(index)
            }
        }
    }

    fn finish_activation(&mut self, index: usize, expire_after: Duration) -> Result<&mut T> {
        if !expire_after.is_zero() {
            self.expiries.push(Expiry {
                deadline: self.clock.saturating_add(expire_after),
                index,
                apply: deactivate::<T>,
            });
        }
        let element = self.slot_mut(index)?;
        element.set_active(true);
        Ok(element)
    }
}

impl<T: Poolable> SlotPool<T> {
    /// Gets the number of scheduled deactivations that have not fired yet.
    pub fn pending_expiries(&self) -> usize {
        self.expiries.len()
    }

    /// Applies every expiry whose deadline the pool clock has reached, in the
    /// order they were scheduled.
    pub(crate) fn fire_expiries(&mut self) {
        let now = self.clock;
        let slots = &mut self.slots;
        self.expiries.retain(|expiry| {
            if expiry.deadline > now {
                return true;
            }
            if let Some(element) = slots[expiry.index].as_mut() {
                (expiry.apply)(element);
            }
            false
        });
    }
}
