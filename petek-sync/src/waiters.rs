//! Waiter queues for the completion future.
//!
//! Producers are the threads calling `block`; the consumer is whichever
//! thread holds the future's drain token while it runs the callbacks. Both
//! queues therefore only need many-producer/single-consumer pops: the
//! bounded ring takes every waiter until its 32 slots are full, the chain
//! takes the rest.

use std::cell::UnsafeCell;
use std::mem::MaybeUninit;
use std::ptr;
use std::sync::atomic::{AtomicPtr, AtomicUsize, Ordering};

use crossbeam_utils::{Backoff, CachePadded};

/// A queued completion callback.
pub(crate) type Waiter = Box<dyn FnOnce() + Send>;

/// Capacity of the bounded ring. Completions with more simultaneous waiters
/// spill into the chain.
pub(crate) const RING_CAPACITY: usize = 32;

struct RingSlot {
    /// Stamp protocol: a slot stamped with the tail index is free to write; a
    /// slot stamped with index + 1 holds a value ready to read.
    stamp: AtomicUsize,
    waiter: UnsafeCell<MaybeUninit<Waiter>>,
}

/// Bounded many-producer ring of completion callbacks.
pub(crate) struct WaiterRing {
    head: CachePadded<AtomicUsize>,
    tail: CachePadded<AtomicUsize>,
    slots: Box<[RingSlot]>,
}

unsafe impl Send for WaiterRing {}
unsafe impl Sync for WaiterRing {}

impl WaiterRing {
    pub(crate) fn new() -> Self {
        let mut slots = Vec::with_capacity(RING_CAPACITY);
        for i in 0..RING_CAPACITY {
            slots.push(RingSlot {
                stamp: AtomicUsize::new(i),
                waiter: UnsafeCell::new(MaybeUninit::uninit()),
            });
        }
        WaiterRing {
            head: CachePadded::new(AtomicUsize::new(0)),
            tail: CachePadded::new(AtomicUsize::new(0)),
            slots: slots.into_boxed_slice(),
        }
    }

    /// Enqueues a waiter; hands it back when the ring is full so the caller
    /// can spill into the chain.
    pub(crate) fn push(&self, waiter: Waiter) -> Result<(), Waiter> {
        let backoff = Backoff::new();
        let mut tail = self.tail.load(Ordering::Relaxed);

        loop {
            let slot = &self.slots[tail % RING_CAPACITY];
            let stamp = slot.stamp.load(Ordering::Acquire);

            if tail == stamp {
                let next = tail + 1;
                if self
                    .tail
                    .compare_exchange(tail, next, Ordering::SeqCst, Ordering::Relaxed)
                    .is_ok()
                {
                    unsafe {
                        slot.waiter.get().write(MaybeUninit::new(waiter));
                    }
                    slot.stamp.store(tail + 1, Ordering::Release);
                    return Ok(());
                }
            } else if tail + 1 > stamp {
                let head = self.head.load(Ordering::Relaxed);
                if tail >= head + RING_CAPACITY {
                    return Err(waiter);
                }
                backoff.snooze();
            } else {
                backoff.snooze();
            }
            tail = self.tail.load(Ordering::Relaxed);
        }
    }

    /// Dequeues the oldest waiter. Must only run under the future's drain
    /// token.
    pub(crate) fn pop(&self) -> Option<Waiter> {
        let backoff = Backoff::new();
        let mut head = self.head.load(Ordering::Relaxed);

        loop {
            let slot = &self.slots[head % RING_CAPACITY];
            let stamp = slot.stamp.load(Ordering::Acquire);

            if head + 1 == stamp {
                let next = head + 1;
                if self
                    .head
                    .compare_exchange(head, next, Ordering::SeqCst, Ordering::Relaxed)
                    .is_ok()
                {
                    let waiter = unsafe { slot.waiter.get().read().assume_init() };
                    slot.stamp.store(head + RING_CAPACITY, Ordering::Release);
                    return Some(waiter);
                }
            } else if head == stamp {
                let tail = self.tail.load(Ordering::Relaxed);
                if tail == head {
                    return None;
                }
                backoff.snooze();
            } else {
                backoff.snooze();
            }
            head = self.head.load(Ordering::Relaxed);
        }
    }
}

impl Drop for WaiterRing {
    fn drop(&mut self) {
        while let Some(waiter) = self.pop() {
            drop(waiter);
        }
    }
}

struct ChainNode {
    next: AtomicPtr<ChainNode>,
    waiter: Option<Waiter>,
}

/// Unbounded fallback queue: a linked list with atomically swapped tail for
/// producers and a consumer-owned head cursor. The stub node keeps push and
/// pop from ever touching the same pointer.
pub(crate) struct WaiterChain {
    tail: CachePadded<AtomicPtr<ChainNode>>,
    head: UnsafeCell<*mut ChainNode>,
}

unsafe impl Send for WaiterChain {}
unsafe impl Sync for WaiterChain {}

impl WaiterChain {
    pub(crate) fn new() -> Self {
        let stub = Box::into_raw(Box::new(ChainNode {
            next: AtomicPtr::new(ptr::null_mut()),
            waiter: None,
        }));
        WaiterChain {
            tail: CachePadded::new(AtomicPtr::new(stub)),
            head: UnsafeCell::new(stub),
        }
    }

    /// Enqueues a waiter. Safe from any number of threads.
    pub(crate) fn push(&self, waiter: Waiter) {
        let node = Box::into_raw(Box::new(ChainNode {
            next: AtomicPtr::new(ptr::null_mut()),
            waiter: Some(waiter),
        }));
        let prev = self.tail.swap(node, Ordering::AcqRel);
        // the queue is momentarily split until the previous tail links to the
        // new node; the future's pending counter covers the gap
        unsafe {
            (*prev).next.store(node, Ordering::Release);
        }
    }

    /// Dequeues the oldest waiter. Must only run under the future's drain
    /// token. Returns `None` when the chain is empty or a producer has not
    /// finished linking yet; the drain loop re-checks via the pending
    /// counter.
    pub(crate) fn pop(&self) -> Option<Waiter> {
        unsafe {
            let head = *self.head.get();
            let next = (*head).next.load(Ordering::Acquire);
            if next.is_null() {
                return None;
            }
            // the old head (possibly the stub) is retired; the next node
            // becomes the new stub after its waiter is taken
            let waiter = (*next).waiter.take();
            *self.head.get() = next;
            drop(Box::from_raw(head));
            waiter
        }
    }
}

impl Drop for WaiterChain {
    fn drop(&mut self) {
        unsafe {
            let mut node = *self.head.get();
            while !node.is_null() {
                let next = (*node).next.load(Ordering::Relaxed);
                drop(Box::from_raw(node));
                node = next;
            }
        }
    }
}
