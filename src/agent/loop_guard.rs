//! Loop guard for the agent/tools cycle.
//!
//! Bounds the number of model turns per run and notices when the model keeps
//! asking for the exact same tool batch.

use crate::error::{Error, Result};
use crate::tools::ToolCall;

/// Counts model turns and remembers the previous tool batch.
pub struct LoopGuard {
    /// Model turns taken so far in this run.
    hops: u32,
    /// Upper bound on model turns.
    max_hops: u32,
    /// (name, arguments) of the last batch, ids excluded.
    last_batch: Option<Vec<(String, String)>>,
    /// Consecutive identical batches seen.
    repeats: u32,
}

impl LoopGuard {
    /// Create a new guard allowing `max_hops` model turns.
    pub fn new(max_hops: u32) -> Self {
        Self {
            hops: 0,
            max_hops,
            last_batch: None,
            repeats: 0,
        }
    }

    /// Record a model turn. Fails once the budget is spent.
    pub fn hop(&mut self) -> Result<u32> {
        if self.hops >= self.max_hops {
            return Err(Error::MaxHopsExceeded(self.max_hops));
        }
        self.hops += 1;
        Ok(self.hops)
    }

    /// Model turns taken so far.
    pub fn hops(&self) -> u32 {
        self.hops
    }

    /// Record a tool batch. Returns how many times in a row the identical
    /// batch has now been requested (1 for a fresh batch).
    pub fn record_batch(&mut self, calls: &[ToolCall]) -> u32 {
        let batch: Vec<(String, String)> = calls
            .iter()
            .map(|c| (c.name.clone(), c.arguments.to_string()))
            .collect();

        if self.last_batch.as_ref() == Some(&batch) {
            self.repeats += 1;
        } else {
            self.last_batch = Some(batch);
            self.repeats = 1;
        }
        self.repeats
    }
}

impl Default for LoopGuard {
    fn default() -> Self {
        Self::new(25)
    }
}
