//! Synchronisation primitives for the petek runtime components.
//!
//! The centrepiece is [`CompletionFuture`], a reusable, lock-free completion
//! future: one writer completes it, any number of threads observe it, and
//! waiters enqueue callbacks that run exactly once. The future is recycled
//! across completions with `close` + `set_awaiting` instead of being
//! reallocated.
//!
//! ```rust
//! use std::sync::Arc;
//! use std::thread;
//! use petek_sync::CompletionFuture;
//!
//! let future = Arc::new(CompletionFuture::new());
//! let completer = Arc::clone(&future);
//! thread::spawn(move || completer.complete(42).unwrap());
//! assert_eq!(future.get().unwrap(), 42);
//! ```
//!
//! Threads driven by a cooperative scheduler must not block; they mark
//! themselves with [`CooperativeScope`] and `get` on an incomplete future
//! then fails with [`FutureError::BlockingNotPermitted`].

mod error;
mod future;
mod waiters;
mod worker;

pub use error::FutureError;
pub use future::{join, CompletionFuture};
pub use worker::{is_cooperative_thread, CooperativeScope};
