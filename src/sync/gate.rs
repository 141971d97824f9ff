// ============================================================================
// spark-store - Reentrant Pass Gate
// One notification pass at a time per store; the owning thread may nest
// ============================================================================

use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, ThreadId};

#[derive(Debug, Default)]
struct GateState {
    owner: Option<ThreadId>,
    depth: usize,
}

/// Serializes mutations across threads while letting a listener on the
/// owning thread call `set_state` again.
#[derive(Debug, Default)]
pub(crate) struct ReentrantGate {
    state: Mutex<GateState>,
    released: Condvar,
}

fn lock(state: &Mutex<GateState>) -> MutexGuard<'_, GateState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

impl ReentrantGate {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Block until this thread owns the gate.
    pub(crate) fn enter(&self) -> GateGuard<'_> {
        let me = thread::current().id();
        let mut state = lock(&self.state);
        loop {
            match state.owner {
                None => {
                    state.owner = Some(me);
                    state.depth = 1;
                    break;
                }
                Some(owner) if owner == me => {
                    state.depth += 1;
                    break;
                }
                Some(_) => {
                    state = self
                        .released
                        .wait(state)
                        .unwrap_or_else(PoisonError::into_inner);
                }
            }
        }
        GateGuard { gate: self }
    }

    #[cfg(test)]
    fn depth(&self) -> usize {
        lock(&self.state).depth
    }
}

pub(crate) struct GateGuard<'a> {
    gate: &'a ReentrantGate,
}

impl Drop for GateGuard<'_> {
    fn drop(&mut self) {
        let mut state = lock(&self.gate.state);
        state.depth = state.depth.saturating_sub(1);
        if state.depth == 0 {
            state.owner = None;
            drop(state);
            self.gate.released.notify_one();
        }
    }
}
