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

//! Interrupt-safe stackless coroutines.
//!
//! A coroutine is any type implementing [`Coro`]. `resume` either runs to
//! completion or calls exactly one of the `coro_*!` suspension macros before
//! returning. There is no stack to save: the implementing type keeps its own
//! resume point (typically a small integer field) and `match`es on it at the
//! top of `resume`, the same shape classic protothread libraries use in C.

use core::ptr::NonNull;

use crate::resource::{AcquireResult, Resource, ResourceOwner};
use crate::condition::Condition;
use crate::timer::{Timer, TimerDriver};

/// The scheduling status of a [`CoroState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Terminal: the body has returned and will never be invoked again.
    Finalize,
    /// Runnable on the next pass, unconditionally.
    Suspended,
    /// Waiting only on its own timer; resumed solely by expiry.
    WaitTimed,
    /// Waiting on a `Condition`, optionally with a timeout.
    WaitCondition,
    /// Waiting on a `Resource` acquisition, optionally with a timeout.
    WaitResource,
    /// Waiting on a sub-coroutine to reach `Finalize`, optionally with a
    /// timeout.
    WaitSubcoro,
}

/// The reason a [`CoroState`] is suspended, tagged by [`Status`].
pub(crate) enum WaitTarget {
    None,
    Condition(&'static Condition),
    Resource {
        resource: &'static Resource,
        owner: &'static ResourceOwner,
        retval: AcquireResult,
    },
    /// Non-owning pointer to a sub-coroutine's state. The caller that set up
    /// this wait must ensure the pointee outlives the wait (see
    /// [`Suspend::await_subcoro`]).
    SubCoro(NonNull<CoroState>),
}

/// Implemented by every coroutine body.
///
/// `resume` is called by the scheduler exactly once per single-step. It
/// must either return directly (finalizing the coroutine) or call one of
/// the `coro_*!` macros and then `return`.
pub trait Coro {
    fn resume(&mut self, sus: Suspend<'_>);
}

/// Per-coroutine scheduling state: status, armed timer, and wait target.
///
/// The body itself — the Rust analogue of the original's `func`/`vars`
/// pair — is referenced through a raw, non-owning pointer rather than
/// embedded by value, because `CoroState` must be a single concrete type
/// that a [`crate::queue::NestedQueue`] can store homogeneously regardless
/// of how many different `Coro` implementations are scheduled.
pub struct CoroState {
    body: NonNull<dyn Coro>,
    pub(crate) status: Status,
    pub(crate) timed_wait: bool,
    pub(crate) timeout: Timer,
    pub(crate) wait: WaitTarget,
}

// SAFETY: the two raw pointers this type carries — `body` and the
// `SubCoro` variant of `wait` — are both non-owning references into
// memory that is only ever touched from the single context stepping the
// schedule (the consumer side of `NestedQueue`'s single-consumer
// discipline), never concurrently. Moving a `CoroState` to that context
// is therefore sound even though `NonNull<T>` is `!Send` for any `T`.
unsafe impl Send for CoroState {}

impl CoroState {
    /// Creates a new state for `body`, initially `Suspended` so the first
    /// scheduler visit invokes the body from its entry point.
    ///
    /// `body` must be a `'static` reference: the scheduler may step it at
    /// any later time, including from a sub-coroutine await, for as long as
    /// this `CoroState` exists.
    pub fn new(body: &'static mut dyn Coro, timer_driver: &'static dyn TimerDriver) -> Self {
        CoroState {
            body: NonNull::from(body),
            status: Status::Suspended,
            timed_wait: false,
            timeout: Timer::new(timer_driver),
            wait: WaitTarget::None,
        }
    }

    /// The coroutine's current scheduling status.
    pub fn status(&self) -> Status {
        self.status
    }

    /// Whether this state has reached its terminal status.
    pub fn is_finalized(&self) -> bool {
        self.status == Status::Finalize
    }

    fn arm_if(&mut self, timeout_ms: Option<u32>) {
        match timeout_ms {
            Some(ms) => {
                self.timed_wait = true;
                self.timeout.start(ms);
            }
            None => self.timed_wait = false,
        }
    }
}

/// A restricted handle through which a [`Coro`] body may suspend itself.
///
/// Exposes exactly the six primitives of the original specification's
/// authoring contract, each of which overwrites `status` and `wait` before
/// returning control to the scheduler.
pub struct Suspend<'a> {
    state: &'a mut CoroState,
}

impl<'a> Suspend<'a> {
    pub(crate) fn new(state: &'a mut CoroState) -> Self {
        Suspend { state }
    }

    /// `YIELD`: suspend unconditionally, runnable again next pass.
    pub fn yield_now(&mut self) {
        self.state.status = Status::Suspended;
        self.state.timed_wait = false;
    }

    /// `AWAIT_TIMED(ms)`: suspend until `ms` milliseconds elapse.
    pub fn await_timed(&mut self, ms: u32) {
        self.state.status = Status::WaitTimed;
        self.state.wait = WaitTarget::None;
        self.state.timed_wait = true;
        self.state.timeout.start(ms);
    }

    /// `AWAIT(Condition, [ms])`: suspend until `cond` is set, or `ms`
    /// milliseconds elapse, whichever comes first.
    pub fn await_condition(&mut self, cond: &'static Condition, timeout_ms: Option<u32>) {
        self.state.status = Status::WaitCondition;
        self.state.wait = WaitTarget::Condition(cond);
        self.state.arm_if(timeout_ms);
    }

    /// `AWAIT(Resource, Owner, [ms])`: suspend until `resource` is
    /// acquired on behalf of `owner`, or `ms` milliseconds elapse. The
    /// scheduler (not this call) performs the acquire attempts; read the
    /// outcome back with [`Self::resource_result`] in the match arm that
    /// follows resumption.
    pub fn await_resource(
        &mut self,
        resource: &'static Resource,
        owner: &'static ResourceOwner,
        timeout_ms: Option<u32>,
    ) {
        self.state.status = Status::WaitResource;
        self.state.wait = WaitTarget::Resource {
            resource,
            owner,
            retval: AcquireResult::Failed,
        };
        self.state.arm_if(timeout_ms);
    }

    /// Reads back the acquire outcome stored by the scheduler after a
    /// resumed `await_resource!`. Only meaningful immediately after such a
    /// resumption; on a timed-out resumption the stored value is stale
    /// (still `Failed`) and the body should treat the wait as expired
    /// instead.
    pub fn resource_result(&self) -> AcquireResult {
        match &self.state.wait {
            WaitTarget::Resource { retval, .. } => *retval,
            _ => AcquireResult::Failed,
        }
    }

    /// `AWAIT(Sub, [ms])`: suspend until `child` reaches `Finalize`, or
    /// `ms` milliseconds elapse.
    ///
    /// # Safety contract
    ///
    /// `child` is recorded as a raw, non-owning pointer. The caller must
    /// ensure `child` outlives this wait (i.e. is not moved or dropped
    /// before the parent either resumes or is itself dropped). `child`
    /// need not be enqueued in any [`crate::schedule::CoroSchedule`]; the
    /// scheduler steps it in place while stepping the parent.
    pub fn await_subcoro(&mut self, child: &mut CoroState, timeout_ms: Option<u32>) {
        self.state.status = Status::WaitSubcoro;
        self.state.wait = WaitTarget::SubCoro(NonNull::from(child));
        self.state.arm_if(timeout_ms);
    }
}

/// Calls `$sus.yield_now()` and returns, matching `YIELD`.
#[macro_export]
macro_rules! coro_yield {
    ($sus:expr) => {{
        $sus.yield_now();
        return;
    }};
}

/// Calls `$sus.await_timed($ms)` and returns, matching `AWAIT_TIMED(ms)`.
#[macro_export]
macro_rules! coro_await_timed {
    ($sus:expr, $ms:expr) => {{
        $sus.await_timed($ms);
        return;
    }};
}

/// Calls `$sus.await_condition($cond, None)` and returns.
#[macro_export]
macro_rules! coro_await_condition {
    ($sus:expr, $cond:expr) => {{
        $sus.await_condition($cond, None);
        return;
    }};
    ($sus:expr, $cond:expr, $ms:expr) => {{
        $sus.await_condition($cond, Some($ms));
        return;
    }};
}

/// Calls `$sus.await_resource($resource, $owner, None)` and returns.
#[macro_export]
macro_rules! coro_await_resource {
    ($sus:expr, $resource:expr, $owner:expr) => {{
        $sus.await_resource($resource, $owner, None);
        return;
    }};
    ($sus:expr, $resource:expr, $owner:expr, $ms:expr) => {{
        $sus.await_resource($resource, $owner, Some($ms));
        return;
    }};
}

/// Calls `$sus.await_subcoro($child, None)` and returns.
#[macro_export]
macro_rules! coro_await_subcoro {
    ($sus:expr, $child:expr) => {{
        $sus.await_subcoro($child, None);
        return;
    }};
    ($sus:expr, $child:expr, $ms:expr) => {{
        $sus.await_subcoro($child, Some($ms));
        return;
    }};
}

/// Invokes `state`'s body once, through a fresh [`Suspend`] borrowing
/// `state`.
///
/// # Safety
///
/// `state.body` always points at a distinct `'static` allocation supplied
/// by [`CoroState::new`], never at memory owned by `state` itself, so
/// reborrowing it via the raw pointer while `state` is mutably borrowed for
/// the `Suspend` does not alias.
pub(crate) fn invoke_body(state: &mut CoroState) {
    let mut body_ptr = state.body;
    let body: &mut dyn Coro = unsafe { body_ptr.as_mut() };
    body.resume(Suspend::new(state));
}
