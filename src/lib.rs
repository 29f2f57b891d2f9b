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

//! Interrupt-safe, stackless, priority-scheduled coroutines for bare-metal
//! targets.
//!
//! A [`coro::Coro`] is a small state machine, not a stack: the scheduler
//! resumes it in place, in an interrupt, or on the main loop, without ever
//! switching a stack pointer. Coroutines are organized into priority
//! queues ([`schedule::CoroSchedule`]) and suspend on one of four
//! primitives — a plain timeout, a [`condition::Condition`], a
//! [`resource::Resource`], or another coroutine's completion — via the
//! `coro_*!` macros exported at the crate root.
//!
//! This crate never allocates and never touches a stack pointer; all
//! sizing is compile-time, via const generics on the queue types.
#![cfg_attr(not(test), no_std)]

pub mod condition;
pub mod coro;
pub mod queue;
pub mod resource;
pub mod schedule;
pub mod timer;

pub use condition::Condition;
pub use coro::{Coro, CoroState, Status, Suspend};
pub use queue::NestedQueue;
pub use resource::{AcquireResult, Resource, ResourceOwner};
pub use schedule::{CoroSchedule, CoroScheduleQueue, RawQueue};
pub use timer::{Timer, TimerDriver};

#[cfg(test)]
mod tests;
