use std::cell::UnsafeCell;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam_utils::Backoff;

use crate::error::FutureError;
use crate::waiters::{Waiter, WaiterChain, WaiterRing};
use crate::worker;

const AWAITING_RESULT: u32 = 1;
const COMPLETING: u32 = 2;
const COMPLETED: u32 = 3;
const COMPLETED_EXCEPTIONALLY: u32 = 4;
const CLOSED: u32 = 5;

struct Failure {
    message: String,
    cause: Option<Arc<dyn std::error::Error + Send + Sync>>,
}

/// A reusable, single-writer completion future.
///
/// The state machine is `awaiting → completing → completed` (or
/// `completed-exceptionally`), with `closed` reachable from any state. The
/// `awaiting → completing` edge is a compare-and-set, so exactly one
/// completer wins; the value or failure is written while holding the
/// `completing` token and published by the state store, so a reader that
/// observes a completed state may read the result without further
/// synchronisation.
///
/// Waiters are callbacks enqueued with [`block`](CompletionFuture::block);
/// each runs exactly once, on completion or on [`close`]. After [`close`],
/// [`set_awaiting`](CompletionFuture::set_awaiting) recycles the instance
/// for the next completion, which is what keeps the future allocation-free
/// across uses.
///
/// `close` resets the result fields in place; it must not race against
/// `get` on the same instance — the future has a single lifecycle owner.
///
/// [`close`]: CompletionFuture::close
pub struct CompletionFuture<V> {
    state: AtomicU32,
    value: UnsafeCell<Option<V>>,
    failure: UnsafeCell<Option<Failure>>,
    ring: WaiterRing,
    chain: WaiterChain,
    pending_waiters: AtomicUsize,
    draining: AtomicBool,
}

unsafe impl<V: Send> Send for CompletionFuture<V> {}
unsafe impl<V: Send + Sync> Sync for CompletionFuture<V> {}

impl<V> CompletionFuture<V> {
    /// Creates a future in the `awaiting` state.
    pub fn new() -> Self {
        CompletionFuture {
            state: AtomicU32::new(AWAITING_RESULT),
            value: UnsafeCell::new(None),
            failure: UnsafeCell::new(None),
            ring: WaiterRing::new(),
            chain: WaiterChain::new(),
            pending_waiters: AtomicUsize::new(0),
            draining: AtomicBool::new(false),
        }
    }

    /// Creates a future in the `closed` state, to be recycled with
    /// [`set_awaiting`](CompletionFuture::set_awaiting).
    pub fn closed() -> Self {
        let future = Self::new();
        future.state.store(CLOSED, Ordering::Relaxed);
        future
    }

    /// Arms the future for the next completion. Call after
    /// [`close`](CompletionFuture::close).
    pub fn set_awaiting(&self) {
        self.state.store(AWAITING_RESULT, Ordering::Release);
    }

    /// Whether the future carries a result (value or failure).
    pub fn is_done(&self) -> bool {
        matches!(
            self.state.load(Ordering::Acquire),
            COMPLETED | COMPLETED_EXCEPTIONALLY
        )
    }

    /// Whether the future is armed and waiting for its completer.
    pub fn is_awaiting(&self) -> bool {
        self.state.load(Ordering::Acquire) == AWAITING_RESULT
    }

    /// Whether the future completed with a failure.
    pub fn is_completed_exceptionally(&self) -> bool {
        self.state.load(Ordering::Acquire) == COMPLETED_EXCEPTIONALLY
    }

    /// Whether the future is closed.
    pub fn is_closed(&self) -> bool {
        self.state.load(Ordering::Acquire) == CLOSED
    }

    /// Futures cannot be cancelled; always fails with
    /// [`FutureError::Unsupported`].
    pub fn cancel(&self) -> Result<(), FutureError> {
        Err(FutureError::Unsupported)
    }

    /// Always `false`; see [`cancel`](CompletionFuture::cancel).
    pub fn is_cancelled(&self) -> bool {
        false
    }

    /// Completes the future with `value` and wakes all waiters. Fails with
    /// [`FutureError::AlreadyCompleted`] when another completer won the
    /// `awaiting → completing` race.
    pub fn complete(&self, value: V) -> Result<(), FutureError> {
        if self
            .state
            .compare_exchange(
                AWAITING_RESULT,
                COMPLETING,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
        {
            unsafe {
                *self.value.get() = Some(value);
            }
            self.state.store(COMPLETED, Ordering::Release);
            self.notify_waiters();
            Ok(())
        } else {
            Err(FutureError::AlreadyCompleted)
        }
    }

    /// Completes the future exceptionally with `message` and wakes all
    /// waiters.
    pub fn complete_exceptionally(&self, message: impl Into<String>) -> Result<(), FutureError> {
        self.complete_exceptionally_with(message, None)
    }

    /// Completes the future exceptionally with `message` and an optional
    /// underlying cause.
    pub fn complete_exceptionally_with(
        &self,
        message: impl Into<String>,
        cause: Option<Arc<dyn std::error::Error + Send + Sync>>,
    ) -> Result<(), FutureError> {
        if self
            .state
            .compare_exchange(
                AWAITING_RESULT,
                COMPLETING,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
        {
            unsafe {
                *self.failure.get() = Some(Failure {
                    message: message.into(),
                    cause,
                });
            }
            self.state.store(COMPLETED_EXCEPTIONALLY, Ordering::Release);
            self.notify_waiters();
            Ok(())
        } else {
            Err(FutureError::AlreadyCompleted)
        }
    }

    /// Enqueues `waiter` to run when the future completes or closes, and
    /// returns whether the future was still pending at enqueue time.
    ///
    /// When the future is already done (or closed) at enqueue time, the
    /// enqueue path drains the waiters itself, so the callback still runs and
    /// no wakeup is lost.
    pub fn block(&self, waiter: impl FnOnce() + Send + 'static) -> bool {
        self.enqueue(Box::new(waiter));
        let pending = !self.is_done();
        if !pending || self.is_closed() {
            self.notify_waiters();
        }
        pending
    }

    fn enqueue(&self, waiter: Waiter) {
        self.pending_waiters.fetch_add(1, Ordering::SeqCst);
        if let Err(waiter) = self.ring.push(waiter) {
            self.chain.push(waiter);
        }
    }

    fn notify_waiters(&self) {
        loop {
            // one drainer at a time; a loser's waiters are taken over by the
            // current holder or picked up by the re-check below
            if self
                .draining
                .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
                .is_err()
            {
                return;
            }

            while let Some(waiter) = self.ring.pop() {
                self.run_waiter(waiter);
            }
            while let Some(waiter) = self.chain.pop() {
                self.run_waiter(waiter);
            }

            self.draining.store(false, Ordering::SeqCst);

            if self.pending_waiters.load(Ordering::SeqCst) == 0 {
                return;
            }
            // waiters arrived (or finished linking) while the token was held
        }
    }

    fn run_waiter(&self, waiter: Waiter) {
        self.pending_waiters.fetch_sub(1, Ordering::SeqCst);
        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(waiter)) {
            // a panicking waiter must not wedge the drain token
            eprintln!("future waiter panicked: {:?}", payload);
        }
    }

    /// Blocks until the future completes, with an effectively unbounded
    /// deadline. Fails with [`FutureError::BlockingNotPermitted`] on a
    /// cooperative worker thread.
    pub fn get(&self) -> Result<V, FutureError>
    where
        V: Clone,
    {
        self.get_timeout(Duration::from_millis(i32::MAX as u64))
    }

    /// Blocks until the future completes or `timeout` elapses, spinning and
    /// yielding rather than parking.
    pub fn get_timeout(&self, timeout: Duration) -> Result<V, FutureError>
    where
        V: Clone,
    {
        if !self.is_done() {
            if worker::is_cooperative_thread() {
                return Err(FutureError::BlockingNotPermitted);
            }
            let deadline = Instant::now() + timeout;
            let backoff = Backoff::new();
            while !self.is_done() {
                if Instant::now() > deadline {
                    return Err(FutureError::Timeout);
                }
                backoff.snooze();
            }
        }

        if self.is_completed_exceptionally() {
            Err(self.failure_error())
        } else {
            match unsafe { (*self.value.get()).as_ref() } {
                Some(value) => Ok(value.clone()),
                None => Err(FutureError::Failed {
                    message: "future result was reset while reading".into(),
                    cause: None,
                }),
            }
        }
    }

    /// The failure of an exceptionally completed future, if that is the
    /// current state.
    pub fn exception(&self) -> Option<FutureError> {
        if self.is_completed_exceptionally() {
            Some(self.failure_error())
        } else {
            None
        }
    }

    fn failure_error(&self) -> FutureError {
        match unsafe { (*self.failure.get()).as_ref() } {
            Some(failure) => FutureError::Failed {
                message: failure.message.clone(),
                cause: failure.cause.clone(),
            },
            None => FutureError::Failed {
                message: "future failure was reset while reading".into(),
                cause: None,
            },
        }
    }

    /// Closes the future: swaps the state to `closed`, clears the result
    /// fields, and drains waiters (which observe `closed`; that counts as
    /// completion for cancellation purposes). Returns whether this call
    /// performed the transition. The future is reusable afterwards via
    /// [`set_awaiting`](CompletionFuture::set_awaiting).
    pub fn close(&self) -> bool {
        let previous = self.state.swap(CLOSED, Ordering::AcqRel);
        if previous != CLOSED {
            if previous != COMPLETING {
                // a completer holding the token still owns the fields
                unsafe {
                    *self.value.get() = None;
                    *self.failure.get() = None;
                }
            }
            self.notify_waiters();
        }
        previous != CLOSED
    }
}

impl<V> Default for CompletionFuture<V> {
    fn default() -> Self {
        Self::new()
    }
}

/// Blocks on `future` without a practical deadline and returns its result.
pub fn join<V: Clone>(future: &CompletionFuture<V>) -> Result<V, FutureError> {
    future.get()
}
