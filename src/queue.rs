// The MIT License (MIT)

// Copyright (c) 2015 Rustcc developers

// Permission is hereby granted, free of charge, to any person obtaining a copy of
// this software and associated documentation files (the "Software"), to deal in
// the Software without restriction, including without limitation the rights to
// use, copy, modify, merge, publish, distribute, sublicense, and/or sell copies of
// the Software, and to permit persons to whom the Software is furnished to do so,
// subject to the following conditions:

// The above copyright notice and this permission notice shall be included in all
// copies or substantial portions of the Software.

// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
// IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY, FITNESS
// FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR
// COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER LIABILITY, WHETHER
// IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT OF OR IN
// CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE.

//! A bounded, single-consumer, nested-producer FIFO.
//!
//! Producers (including interrupt handlers nested arbitrarily deeply) push
//! through a global critical section, which gives FCFS ordering across
//! nested producers for free. The consumer — always the scheduler, running
//! on the main context — reads through a three-cursor scheme (`write`,
//! `acquired`, `released`) so it never needs a lock to see a consistent
//! view of its own readable band.

use core::cell::UnsafeCell;
use core::mem::MaybeUninit;
use core::sync::atomic::{AtomicUsize, Ordering};

/// A fixed-capacity nested-producer, single-consumer FIFO of `T`.
///
/// # Safety invariants
///
/// All of `read_acquire`, `iter_start`, `iter_next`, `get`, `get_mut`, and
/// `read_release` must only ever be called from the single consumer
/// context (the scheduler). This type still permits sharing `&NestedQueue`
/// across interrupt contexts for `enqueue`, the producer path, which is the
/// only operation designed for concurrent nested callers.
pub struct NestedQueue<T, const N: usize> {
    slots: [UnsafeCell<MaybeUninit<T>>; N],
    /// Total number of elements ever enqueued. Advanced by producers inside
    /// a critical section; published with `Release` so the consumer's
    /// `Acquire` load synchronizes with the write into the slot.
    write: AtomicUsize,
    /// Consumer-owned: how many elements have been moved into the readable
    /// band so far.
    acquired: UnsafeCell<usize>,
    /// Consumer-owned: how many elements have been released (freed) from
    /// the head so far.
    released: UnsafeCell<usize>,
}

// SAFETY: `slots` is only ever written by a producer under a global critical
// section (at most one producer touches a given index, and only once), and
// only ever read/mutated afterwards by the single consumer. `acquired` and
// `released` are touched exclusively by the consumer. This matches the
// single-producer-at-a-time / single-consumer discipline documented on the
// type, the same discipline under which crates like `heapless` mark their
// SPSC queues `Sync`.
unsafe impl<T: Send, const N: usize> Sync for NestedQueue<T, N> {}

impl<T, const N: usize> NestedQueue<T, N> {
    /// Creates a new, empty queue.
    pub const fn new() -> Self {
        const { assert!(N > 0, "NestedQueue capacity must be non-zero") };
        NestedQueue {
            slots: [const { UnsafeCell::new(MaybeUninit::uninit()) }; N],
            write: AtomicUsize::new(0),
            acquired: UnsafeCell::new(0),
            released: UnsafeCell::new(0),
        }
    }

    /// Nested-interrupt-safe producer insert.
    ///
    /// Returns the ticket assigned to `value`, or `None` if the queue has
    /// no free slots (i.e. `N` elements are enqueued but not yet
    /// `read_release`d).
    pub fn enqueue(&self, value: T) -> Option<usize> {
        critical_section::with(|_| {
            // SAFETY: exclusive access to `released` within this critical
            // section; no consumer runs concurrently with a producer by
            // contract (the consumer never runs with interrupts disabled
            // for longer than a single slot access).
            let released = unsafe { *self.released.get() };
            let write = self.write.load(Ordering::Relaxed);
            if write - released >= N {
                log::warn!("nested queue full, dropping enqueue");
                return None;
            }
            let idx = write % N;
            // SAFETY: slot `idx` was last used by a consumer that has since
            // released it (or never used), so it is safe to overwrite.
            unsafe { (*self.slots[idx].get()).write(value) };
            self.write.store(write + 1, Ordering::Release);
            Some(write)
        })
    }

    /// Moves one pending record into the readable band, if any is pending.
    /// Returns whether an element was acquired. Consumer-only.
    pub fn read_acquire(&self) -> bool {
        // SAFETY: consumer-exclusive field.
        let acquired = unsafe { *self.acquired.get() };
        let write = self.write.load(Ordering::Acquire);
        if acquired < write {
            unsafe { *self.acquired.get() = acquired + 1 };
            true
        } else {
            false
        }
    }

    /// Starts an iteration cursor over the current readable band, oldest
    /// first. Consumer-only.
    pub fn iter_start(&self) -> usize {
        unsafe { *self.released.get() }
    }

    /// Advances `cursor`, returning the next ticket in the readable band,
    /// or `None` once the band is exhausted. Consumer-only.
    pub fn iter_next(&self, cursor: &mut usize) -> Option<usize> {
        let acquired = unsafe { *self.acquired.get() };
        if *cursor < acquired {
            let ticket = *cursor;
            *cursor += 1;
            Some(ticket)
        } else {
            None
        }
    }

    /// Borrows the slot for `ticket` mutably. Consumer-only; `ticket` must
    /// have come from `iter_next`/`enqueue` on this same queue and not yet
    /// been `read_release`d.
    pub fn get_mut(&self, ticket: usize) -> &mut T {
        let idx = ticket % N;
        unsafe { (*self.slots[idx].get()).assume_init_mut() }
    }

    /// Borrows the slot for `ticket` immutably. See [`Self::get_mut`].
    pub fn get(&self, ticket: usize) -> &T {
        let idx = ticket % N;
        unsafe { (*self.slots[idx].get()).assume_init_ref() }
    }

    /// Releases `ticket` from the readable band. A no-op unless `ticket` is
    /// the oldest unreleased readable record. Consumer-only.
    pub fn read_release(&self, ticket: usize) {
        let released = unsafe { *self.released.get() };
        if ticket != released {
            return;
        }
        let idx = ticket % N;
        unsafe { (*self.slots[idx].get()).assume_init_drop() };
        unsafe { *self.released.get() = released + 1 };
    }
}
