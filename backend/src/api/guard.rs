//! Duplicate-submission guard.
//!
//! One guard per save form. While a submission is running, a second
//! trigger of the same action acquires nothing and is dropped
//! silently; no queueing, no error.

use std::cell::Cell;

#[derive(Debug, Default)]
pub struct SubmitGuard {
    in_flight: Cell<bool>,
}

impl SubmitGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Try to start a submission. Returns `None` while another one is
    /// in flight. The returned token releases the guard on drop, so
    /// early returns and `?` exits release it too.
    pub fn try_begin(&self) -> Option<SubmitToken<'_>> {
        if self.in_flight.get() {
            return None;
        }
        self.in_flight.set(true);
        Some(SubmitToken { guard: self })
    }
}

pub struct SubmitToken<'a> {
    guard: &'a SubmitGuard,
}

impl Drop for SubmitToken<'_> {
    fn drop(&mut self) {
        self.guard.in_flight.set(false);
    }
}
