use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use skein_core::error::Result;
use skein_core::traits::JoinStrategy;
use skein_core::types::{Arrival, Payload, Results};

#[derive(Debug, Default)]
struct RunState {
    results: Results,
    buffers: HashMap<String, Vec<Arrival>>,
}

/// Shared mutable state of one run: the last output of every node and the
/// FIFO input buffer of every node.
///
/// Every accessor takes the same mutex. Callers that need to check a join
/// and then drain the buffer must do both through a single [`StateGuard`]
/// from [`StateManager::lock`], otherwise an arrival landing between the
/// two calls can be lost or drained twice.
#[derive(Debug, Default)]
pub struct StateManager {
    inner: Mutex<RunState>,
}

impl StateManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the run lock.
    pub fn lock(&self) -> StateGuard<'_> {
        StateGuard {
            state: self.inner.lock().unwrap_or_else(PoisonError::into_inner),
        }
    }

    /// Record a node's output, replacing any earlier one.
    pub fn update_state(&self, node: &str, output: Payload) {
        self.lock().update_state(node, output);
    }

    /// Last output recorded for a node.
    pub fn state(&self, node: &str) -> Option<Payload> {
        self.lock().results().get(node).cloned()
    }

    /// Snapshot of every recorded output.
    pub fn results(&self) -> Results {
        self.lock().results().clone()
    }

    /// Append an arrival to a node's buffer.
    pub fn buffer_input(&self, target: &str, arrival: Arrival) {
        self.lock().buffer_input(target, arrival);
    }

    /// Copy of a node's buffer, oldest first. Does not clear it.
    pub fn get_buffer(&self, target: &str) -> Vec<Arrival> {
        self.lock().get_buffer(target).to_vec()
    }

    /// Take and clear a node's buffer.
    pub fn pop_buffer(&self, target: &str) -> Vec<Arrival> {
        self.lock().pop_buffer(target)
    }

    /// Consume the manager, returning the final results.
    pub fn into_results(self) -> Results {
        self.inner
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
            .results
    }
}

/// Exclusive view of the run state, held for the lifetime of the guard.
pub struct StateGuard<'a> {
    state: MutexGuard<'a, RunState>,
}

impl StateGuard<'_> {
    pub fn update_state(&mut self, node: &str, output: Payload) {
        self.state.results.insert(node, output);
    }

    pub fn results(&self) -> &Results {
        &self.state.results
    }

    pub fn buffer_input(&mut self, target: &str, arrival: Arrival) {
        self.state
            .buffers
            .entry(target.to_string())
            .or_default()
            .push(arrival);
    }

    pub fn get_buffer(&self, target: &str) -> &[Arrival] {
        self.state
            .buffers
            .get(target)
            .map(|b| b.as_slice())
            .unwrap_or(&[])
    }

    pub fn pop_buffer(&mut self, target: &str) -> Vec<Arrival> {
        self.state
            .buffers
            .get_mut(target)
            .map(std::mem::take)
            .unwrap_or_default()
    }

    /// Drain the buffer only if `join` is satisfied by its current contents.
    pub fn drain_if_satisfied(
        &mut self,
        target: &str,
        join: &dyn JoinStrategy,
    ) -> Result<Option<Vec<Arrival>>> {
        if join.is_satisfied(self.get_buffer(target))? {
            Ok(Some(self.pop_buffer(target)))
        } else {
            Ok(None)
        }
    }
}
