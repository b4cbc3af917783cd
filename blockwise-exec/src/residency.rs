//! Process-wide budget of resident lanes.

use std::sync::{Condvar, Mutex, PoisonError};

use crate::MAX_RESIDENT_LANES;

pub(crate) struct Residency {
    free: Mutex<usize>,
    cvar: Condvar,
}

pub(crate) static RESIDENCY: Residency = Residency::new(MAX_RESIDENT_LANES);

impl Residency {
    const fn new(lanes: usize) -> Self {
        Self {
            free: Mutex::new(lanes),
            cvar: Condvar::new(),
        }
    }

    /// Block until `lanes` lanes fit, then reserve them.
    ///
    /// `lanes` must not exceed the total budget.
    pub(crate) fn acquire(&self, lanes: usize) -> ResidencyGuard<'_> {
        let mut free = self.free.lock().unwrap_or_else(PoisonError::into_inner);
        while *free < lanes {
            free = self
                .cvar
                .wait(free)
                .unwrap_or_else(PoisonError::into_inner);
        }
        *free -= lanes;
        ResidencyGuard {
            residency: self,
            lanes,
        }
    }
}

pub(crate) struct ResidencyGuard<'a> {
    residency: &'a Residency,
    lanes: usize,
}

impl Drop for ResidencyGuard<'_> {
    fn drop(&mut self) {
        let mut free = self
            .residency
            .free
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        *free += self.lanes;
        self.residency.cvar.notify_all();
    }
}
