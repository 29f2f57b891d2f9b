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

//! The priority-ordered scheduler main loop.

use core::ptr::NonNull;

use crate::coro::{invoke_body, CoroState, Status, WaitTarget};
use crate::queue::NestedQueue;
use crate::resource::AcquireResult;
use crate::timer::TimerDriver;

/// Type-erased view onto one priority level's backing queue.
///
/// This indirection is what lets [`CoroSchedule`] hold priority levels of
/// different capacities (different const-generic `N`) side by side in one
/// slice, the same way the original held an array of pointers to
/// differently-sized queues.
pub trait RawQueue: Sync {
    fn try_enqueue(&self, state: CoroState) -> Option<usize>;
    fn read_acquire(&self) -> bool;
    fn iter_start(&self) -> usize;
    fn iter_next(&self, cursor: &mut usize) -> Option<usize>;
    fn get_mut(&self, ticket: usize) -> &mut CoroState;
    fn get(&self, ticket: usize) -> &CoroState;
    fn read_release(&self, ticket: usize);
}

/// A [`crate::queue::NestedQueue`] of [`CoroState`] at a single priority.
pub struct CoroScheduleQueue<const N: usize> {
    inner: NestedQueue<CoroState, N>,
}

impl<const N: usize> CoroScheduleQueue<N> {
    pub const fn new() -> Self {
        CoroScheduleQueue {
            inner: NestedQueue::new(),
        }
    }
}

impl<const N: usize> Default for CoroScheduleQueue<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> RawQueue for CoroScheduleQueue<N> {
    fn try_enqueue(&self, state: CoroState) -> Option<usize> {
        self.inner.enqueue(state)
    }

    fn read_acquire(&self) -> bool {
        self.inner.read_acquire()
    }

    fn iter_start(&self) -> usize {
        self.inner.iter_start()
    }

    fn iter_next(&self, cursor: &mut usize) -> Option<usize> {
        self.inner.iter_next(cursor)
    }

    fn get_mut(&self, ticket: usize) -> &mut CoroState {
        self.inner.get_mut(ticket)
    }

    fn get(&self, ticket: usize) -> &CoroState {
        self.inner.get(ticket)
    }

    fn read_release(&self, ticket: usize) {
        self.inner.read_release(ticket)
    }
}

/// An ordered collection of priority queues, index 0 = highest priority.
///
/// Construct over a `'static` slice of `'static` queue references and pass
/// the result to [`CoroSchedule::run`] (or drive it a pass at a time with
/// [`CoroSchedule::run_pass`] from tests).
pub struct CoroSchedule {
    queues: &'static [&'static dyn RawQueue],
}

impl CoroSchedule {
    pub const fn new(queues: &'static [&'static dyn RawQueue]) -> Self {
        CoroSchedule { queues }
    }

    /// Enqueues a new coroutine at `priority` (0 = highest).
    ///
    /// Returns `None` if `priority` is out of range or that level's queue
    /// has no free slots.
    pub fn enqueue(
        &self,
        priority: usize,
        body: &'static mut dyn crate::coro::Coro,
        timer_driver: &'static dyn TimerDriver,
    ) -> Option<&CoroState> {
        let queue = *self.queues.get(priority)?;
        let state = CoroState::new(body, timer_driver);
        let ticket = queue.try_enqueue(state)?;
        Some(queue.get(ticket))
    }

    /// Runs the scheduler main loop. Never returns.
    pub fn run(&self) -> ! {
        loop {
            self.run_pass();
        }
    }

    /// Runs exactly one pass over every priority level: snapshot, step all,
    /// release finalized entries from the head. Exposed so tests can drive
    /// a deterministic number of passes.
    pub fn run_pass(&self) {
        for (level, &queue) in self.queues.iter().enumerate() {
            while queue.read_acquire() {}

            let mut cursor = queue.iter_start();
            while let Some(ticket) = queue.iter_next(&mut cursor) {
                let state = queue.get_mut(ticket);
                single_step(state);
                if state.is_finalized() {
                    log::trace!("priority {level} ticket {ticket} finalized");
                    queue.read_release(ticket);
                }
            }
        }
    }
}

/// Unconditionally resumes `state`: cancels any armed timer, marks
/// `Finalize` (overwritten by the body if it suspends again), and invokes
/// the body once.
fn resume(state: &mut CoroState) {
    if state.timed_wait {
        state.timeout.cancel();
        state.timed_wait = false;
    }
    state.status = Status::Finalize;
    invoke_body(state);
}

/// The single-step procedure: decides whether `state` is resumable right
/// now and, if so, resumes it exactly once.
///
/// Expiry takes priority over all wait kinds — a timed wait that has
/// expired always resumes, regardless of whether its primary condition
/// also became true in the same instant.
pub(crate) fn single_step(state: &mut CoroState) {
    if state.timed_wait && state.timeout.timed_out.get() {
        resume(state);
        return;
    }

    match state.status {
        Status::Finalize => {}
        Status::Suspended => resume(state),
        Status::WaitTimed => {}
        Status::WaitCondition => {
            let ready = matches!(&state.wait, WaitTarget::Condition(cond) if cond.get());
            if ready {
                resume(state);
            }
        }
        Status::WaitResource => {
            let outcome = match &state.wait {
                WaitTarget::Resource { resource, owner, .. } => Some(resource.acquire(owner)),
                _ => None,
            };
            if let Some(result) = outcome {
                if result != AcquireResult::Failed {
                    if let WaitTarget::Resource { retval, .. } = &mut state.wait {
                        *retval = result;
                    }
                    resume(state);
                }
            }
        }
        Status::WaitSubcoro => {
            let child_ptr = match &state.wait {
                WaitTarget::SubCoro(child) => Some(*child),
                _ => None,
            };
            if let Some(mut child_ptr) = child_ptr {
                // SAFETY: `Suspend::await_subcoro`'s contract requires the
                // pointee to outlive this wait.
                let child: &mut CoroState = unsafe { child_ptr.as_mut() };
                if child.is_finalized() {
                    resume(state);
                } else {
                    single_step(child);
                }
            }
        }
    }
}

/// Convenience constructor for a sub-coroutine pointer, for callers that
/// keep their child `CoroState` as a field of their own `Coro`
/// implementation rather than in any schedule queue.
pub fn subcoro_ptr(state: &mut CoroState) -> NonNull<CoroState> {
    NonNull::from(state)
}
