//! Group-wide barrier.

use std::panic;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

/// Unwind payload for lanes released from an aborted barrier.
#[derive(Debug)]
pub(crate) struct BarrierAborted;

#[derive(Debug)]
struct State {
    /// Lanes still running the kernel.
    participants: usize,
    arrived: usize,
    generation: u64,
    aborted: bool,
}

impl State {
    fn release(&mut self) {
        self.arrived = 0;
        self.generation = self.generation.wrapping_add(1);
    }
}

/// Barrier shared by the lanes of one group.
///
/// Unlike [`std::sync::Barrier`], a lane that leaves the kernel retires from
/// the barrier, and a panicking lane aborts it so that the remaining lanes
/// unwind instead of blocking forever.
#[derive(Debug)]
pub struct GroupBarrier {
    state: Mutex<State>,
    cvar: Condvar,
}

impl GroupBarrier {
    /// Create a barrier for `lanes` participants.
    pub fn new(lanes: usize) -> Self {
        Self {
            state: Mutex::new(State {
                participants: lanes,
                arrived: 0,
                generation: 0,
                aborted: false,
            }),
            cvar: Condvar::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Block until every live participant has arrived.
    ///
    /// If the barrier is or becomes aborted, the calling lane unwinds.
    pub fn wait(&self) {
        let mut state = self.lock();
        if state.aborted {
            drop(state);
            panic::resume_unwind(Box::new(BarrierAborted));
        }

        state.arrived += 1;
        if state.arrived >= state.participants {
            state.release();
            self.cvar.notify_all();
            return;
        }

        let generation = state.generation;
        while state.generation == generation && !state.aborted {
            state = self
                .cvar
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
        if state.generation == generation {
            drop(state);
            panic::resume_unwind(Box::new(BarrierAborted));
        }
    }

    /// Remove one participant; a pending phase completes if it was the last one missing.
    pub fn retire(&self) {
        let mut state = self.lock();
        state.participants = state.participants.saturating_sub(1);
        if state.arrived > 0 && state.arrived >= state.participants {
            state.release();
            self.cvar.notify_all();
        }
    }

    /// Release every waiting lane by unwinding it. Later waits unwind immediately.
    pub fn abort(&self) {
        self.lock().aborted = true;
        self.cvar.notify_all();
    }

    /// Whether [`abort`](Self::abort) has been called.
    pub fn is_aborted(&self) -> bool {
        self.lock().aborted
    }
}

/// Retires the lane from its barrier on return, aborts the barrier on panic.
pub(crate) struct LaneGuard<'a> {
    pub(crate) barrier: &'a GroupBarrier,
}

impl Drop for LaneGuard<'_> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            self.barrier.abort();
        } else {
            self.barrier.retire();
        }
    }
}
