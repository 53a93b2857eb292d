//! Pool configuration types

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{PoolError, Result};

/// What [`crate::SlotPool::activate_next`] does when every slot is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ExhaustionPolicy {
    /// Fail with [`PoolError::Exhausted`].
    #[default]
    Strict,
    /// Deactivate the oldest issued slot and hand it out again.
    Preempt,
}

/// Configuration for a [`crate::SlotPool`]
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PoolConfig {
    /// Number of slots, fixed for the lifetime of the pool
    pub capacity: usize,
    /// Behaviour of activation when no slot is free
    pub exhaustion: ExhaustionPolicy,
    /// Seed for prototype selection; `None` seeds from the OS
    pub seed: Option<u64>,
}

impl PoolConfig {
    /// Creates a configuration with the given capacity and default policy.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            ..Self::default()
        }
    }

    /// Sets the exhaustion policy.
    pub fn exhaustion(mut self, exhaustion: ExhaustionPolicy) -> Self {
        self.exhaustion = exhaustion;
        self
    }

    /// Seeds prototype selection for reproducible runs.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Checks the configuration before a pool is built from it.
    pub fn validate(&self) -> Result<()> {
        if self.capacity < 1 {
            return Err(PoolError::InvalidCapacity);
        }
        Ok(())
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            capacity: 1,
            exhaustion: ExhaustionPolicy::Strict,
            seed: None,
        }
    }
}
