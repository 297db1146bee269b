//! Cooperative-worker thread marking.
//!
//! The scheduler's worker threads must never block on a future; they mark
//! themselves with a [`CooperativeScope`] and
//! [`CompletionFuture::get`](crate::CompletionFuture::get) refuses to spin
//! inside such a scope.

use std::cell::Cell;

thread_local! {
    static COOPERATIVE: Cell<bool> = const { Cell::new(false) };
}

/// Marks the current thread as a cooperative worker for the lifetime of the
/// scope. Scopes nest; dropping restores the previous marking.
pub struct CooperativeScope {
    previous: bool,
}

impl CooperativeScope {
    /// Enters a cooperative scope on the current thread.
    pub fn enter() -> Self {
        let previous = COOPERATIVE.with(|flag| flag.replace(true));
        CooperativeScope { previous }
    }
}

impl Drop for CooperativeScope {
    fn drop(&mut self) {
        let previous = self.previous;
        COOPERATIVE.with(|flag| flag.set(previous));
    }
}

/// Whether the current thread is inside a cooperative scope.
pub fn is_cooperative_thread() -> bool {
    COOPERATIVE.with(|flag| flag.get())
}
