//! Spill configuration for the join and sort operators.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default memory budget: 64 MiB.
pub const DEFAULT_MEMORY_BUDGET: usize = 64 * 1024 * 1024;

/// What a spilling operator does when its input exceeds the memory budget
/// and no scratch directory is configured.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverflowPolicy {
    /// Run fully in memory anyway.
    #[default]
    InMemory,
    /// Fail with `Error::ResourceExhausted`.
    Fail,
}

/// Memory budget and scratch directory handed to the join and sort operators.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpillConfig {
    /// Estimated bytes an operator may hold in memory.
    #[serde(default = "default_memory_budget")]
    pub memory_budget: usize,
    /// Directory for bucket and run files. Spilling is refused without one.
    #[serde(default)]
    pub scratch_dir: Option<PathBuf>,
    /// Behaviour when the budget is exceeded and spilling is refused.
    #[serde(default)]
    pub overflow: OverflowPolicy,
}

fn default_memory_budget() -> usize {
    DEFAULT_MEMORY_BUDGET
}

impl Default for SpillConfig {
    fn default() -> Self {
        Self {
            memory_budget: DEFAULT_MEMORY_BUDGET,
            scratch_dir: None,
            overflow: OverflowPolicy::default(),
        }
    }
}

impl SpillConfig {
    /// Creates a configuration with the given budget and no scratch directory.
    pub fn new(memory_budget: usize) -> Self {
        Self {
            memory_budget,
            ..Self::default()
        }
    }

    /// Sets the memory budget.
    pub fn memory_budget(mut self, bytes: usize) -> Self {
        self.memory_budget = bytes;
        self
    }

    /// Sets the scratch directory.
    pub fn scratch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scratch_dir = Some(dir.into());
        self
    }

    /// Sets the overflow policy.
    pub fn overflow(mut self, policy: OverflowPolicy) -> Self {
        self.overflow = policy;
        self
    }

    /// Returns the scratch directory, if spilling is allowed.
    pub fn spill_dir(&self) -> Option<&Path> {
        self.scratch_dir.as_deref()
    }

    /// Returns true if `bytes` fits the budget.
    #[inline]
    pub fn fits(&self, bytes: usize) -> bool {
        bytes <= self.memory_budget
    }
}
