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

//! End-to-end scheduling scenarios, run against [`crate::timer::host::HostTimerDriver`].

use core::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use crate::condition::Condition;
use crate::coro::{Coro, CoroState, Suspend};
use crate::resource::{AcquireResult, Resource, ResourceOwner};
use crate::schedule::{CoroSchedule, CoroScheduleQueue, RawQueue};
use crate::timer::host::HostTimerDriver;
use crate::{coro_await_condition, coro_await_resource, coro_await_subcoro, coro_yield};

/// S1: two equal-priority coroutines, each yielding `remaining` times,
/// interleave one step per pass.
struct Counter {
    calls: &'static AtomicUsize,
    remaining: usize,
}

impl Coro for Counter {
    fn resume(&mut self, mut sus: Suspend<'_>) {
        if self.remaining == 0 {
            return;
        }
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.remaining -= 1;
        coro_yield!(sus);
    }
}

#[test]
fn test_yield_round_robin() {
    static Q0: CoroScheduleQueue<4> = CoroScheduleQueue::new();
    static QUEUES: [&dyn RawQueue; 1] = [&Q0];
    static DRIVER: HostTimerDriver = HostTimerDriver::new();
    static CALLS_A: AtomicUsize = AtomicUsize::new(0);
    static CALLS_B: AtomicUsize = AtomicUsize::new(0);

    let schedule = CoroSchedule::new(&QUEUES);
    let a: &'static mut dyn Coro = Box::leak(Box::new(Counter {
        calls: &CALLS_A,
        remaining: 3,
    }));
    let b: &'static mut dyn Coro = Box::leak(Box::new(Counter {
        calls: &CALLS_B,
        remaining: 3,
    }));
    schedule.enqueue(0, a, &DRIVER).unwrap();
    schedule.enqueue(0, b, &DRIVER).unwrap();

    for _ in 0..3 {
        schedule.run_pass();
    }

    assert_eq!(CALLS_A.load(Ordering::SeqCst), 3);
    assert_eq!(CALLS_B.load(Ordering::SeqCst), 3);
}

/// S2: a coroutine that waits on a `Condition` set from outside the
/// schedule, with no timeout.
struct Waiter {
    cond: &'static Condition,
    woke: &'static AtomicBool,
    step: u8,
}

impl Coro for Waiter {
    fn resume(&mut self, mut sus: Suspend<'_>) {
        match self.step {
            0 => {
                self.step = 1;
                coro_await_condition!(sus, self.cond);
            }
            1 => {
                self.woke.store(true, Ordering::SeqCst);
            }
            _ => unreachable!("Waiter has no step {}", self.step),
        }
    }
}

#[test]
fn test_condition_wakes_waiter() {
    static Q0: CoroScheduleQueue<2> = CoroScheduleQueue::new();
    static QUEUES: [&dyn RawQueue; 1] = [&Q0];
    static DRIVER: HostTimerDriver = HostTimerDriver::new();
    static COND: Condition = Condition::new();
    static WOKE: AtomicBool = AtomicBool::new(false);

    let schedule = CoroSchedule::new(&QUEUES);
    let w: &'static mut dyn Coro = Box::leak(Box::new(Waiter {
        cond: &COND,
        woke: &WOKE,
        step: 0,
    }));
    schedule.enqueue(0, w, &DRIVER).unwrap();

    schedule.run_pass(); // Suspended -> WaitCondition
    assert!(!WOKE.load(Ordering::SeqCst));

    COND.set();
    schedule.run_pass(); // WaitCondition -> resumed -> Finalize
    assert!(WOKE.load(Ordering::SeqCst));
}

/// S3: the same wait, but the condition is never set and a timeout fires
/// instead.
struct TimedWaiter {
    cond: &'static Condition,
    outcome: &'static AtomicUsize,
    step: u8,
}

const OUTCOME_PENDING: usize = 0;
const OUTCOME_SIGNALED: usize = 1;
const OUTCOME_TIMED_OUT: usize = 2;

impl Coro for TimedWaiter {
    fn resume(&mut self, mut sus: Suspend<'_>) {
        match self.step {
            0 => {
                self.step = 1;
                coro_await_condition!(sus, self.cond, 20);
            }
            1 => {
                let outcome = if self.cond.get() {
                    OUTCOME_SIGNALED
                } else {
                    OUTCOME_TIMED_OUT
                };
                self.outcome.store(outcome, Ordering::SeqCst);
            }
            _ => unreachable!("TimedWaiter has no step {}", self.step),
        }
    }
}

#[test]
fn test_condition_timeout_fires() {
    static Q0: CoroScheduleQueue<2> = CoroScheduleQueue::new();
    static QUEUES: [&dyn RawQueue; 1] = [&Q0];
    static DRIVER: HostTimerDriver = HostTimerDriver::new();
    static COND: Condition = Condition::new();
    static OUTCOME: AtomicUsize = AtomicUsize::new(OUTCOME_PENDING);

    let schedule = CoroSchedule::new(&QUEUES);
    let w: &'static mut dyn Coro = Box::leak(Box::new(TimedWaiter {
        cond: &COND,
        outcome: &OUTCOME,
        step: 0,
    }));
    schedule.enqueue(0, w, &DRIVER).unwrap();

    schedule.run_pass(); // Suspended -> WaitCondition, timer armed for 20ms
    assert_eq!(OUTCOME.load(Ordering::SeqCst), OUTCOME_PENDING);

    thread::sleep(Duration::from_millis(80));
    schedule.run_pass(); // expiry observed before condition check -> resumed

    assert_eq!(OUTCOME.load(Ordering::SeqCst), OUTCOME_TIMED_OUT);
}

/// S4/S5: a coroutine awaiting a `Resource` already held by another owner.
struct ResourceWaiter {
    resource: &'static Resource,
    owner: &'static ResourceOwner,
    outcome: &'static AtomicUsize,
    step: u8,
}

const RESOURCE_FAILED: usize = 0;
const RESOURCE_SUCCESS: usize = 1;
const RESOURCE_PREEMPTED: usize = 2;
const RESOURCE_PENDING: usize = 99;

impl Coro for ResourceWaiter {
    fn resume(&mut self, mut sus: Suspend<'_>) {
        match self.step {
            0 => {
                self.step = 1;
                coro_await_resource!(sus, self.resource, self.owner);
            }
            1 => {
                let outcome = match sus.resource_result() {
                    AcquireResult::Failed => RESOURCE_FAILED,
                    AcquireResult::Success => RESOURCE_SUCCESS,
                    AcquireResult::Preempted => RESOURCE_PREEMPTED,
                };
                self.outcome.store(outcome, Ordering::SeqCst);
            }
            _ => unreachable!("ResourceWaiter has no step {}", self.step),
        }
    }
}

#[test]
fn test_resource_preempts_lower_priority_holder() {
    static Q0: CoroScheduleQueue<2> = CoroScheduleQueue::new();
    static QUEUES: [&dyn RawQueue; 1] = [&Q0];
    static DRIVER: HostTimerDriver = HostTimerDriver::new();
    static RESOURCE: Resource = Resource::new();
    static LOW: ResourceOwner = ResourceOwner::new(1);
    static HIGH: ResourceOwner = ResourceOwner::new(5);
    static OUTCOME: AtomicUsize = AtomicUsize::new(RESOURCE_PENDING);

    assert_eq!(RESOURCE.acquire(&LOW), AcquireResult::Success);

    let schedule = CoroSchedule::new(&QUEUES);
    let w: &'static mut dyn Coro = Box::leak(Box::new(ResourceWaiter {
        resource: &RESOURCE,
        owner: &HIGH,
        outcome: &OUTCOME,
        step: 0,
    }));
    schedule.enqueue(0, w, &DRIVER).unwrap();

    schedule.run_pass(); // Suspended -> WaitResource
    schedule.run_pass(); // acquire attempt preempts LOW -> resumed

    assert_eq!(OUTCOME.load(Ordering::SeqCst), RESOURCE_PREEMPTED);
    assert!(RESOURCE.is_owned_by(&HIGH));
}

#[test]
fn test_resource_equal_priority_never_preempts() {
    static Q0: CoroScheduleQueue<2> = CoroScheduleQueue::new();
    static QUEUES: [&dyn RawQueue; 1] = [&Q0];
    static DRIVER: HostTimerDriver = HostTimerDriver::new();
    static RESOURCE: Resource = Resource::new();
    static MID: ResourceOwner = ResourceOwner::new(3);
    static OTHER_MID: ResourceOwner = ResourceOwner::new(3);
    static OUTCOME: AtomicUsize = AtomicUsize::new(RESOURCE_PENDING);

    assert_eq!(RESOURCE.acquire(&MID), AcquireResult::Success);

    let schedule = CoroSchedule::new(&QUEUES);
    let w: &'static mut dyn Coro = Box::leak(Box::new(ResourceWaiter {
        resource: &RESOURCE,
        owner: &OTHER_MID,
        outcome: &OUTCOME,
        step: 0,
    }));
    let handle = schedule.enqueue(0, w, &DRIVER).unwrap();

    schedule.run_pass();
    schedule.run_pass();

    assert_eq!(OUTCOME.load(Ordering::SeqCst), RESOURCE_PENDING);
    assert_eq!(handle.status(), crate::coro::Status::WaitResource);
    assert!(RESOURCE.is_owned_by(&MID));
}

/// S6: a parent coroutine awaiting a sub-coroutine it keeps as a plain
/// field rather than enqueuing anywhere.
struct Leaf {
    done: &'static AtomicBool,
}

impl Coro for Leaf {
    fn resume(&mut self, _sus: Suspend<'_>) {
        self.done.store(true, Ordering::SeqCst);
    }
}

struct Parent {
    child: CoroState,
    finished: &'static AtomicBool,
    step: u8,
}

impl Coro for Parent {
    fn resume(&mut self, mut sus: Suspend<'_>) {
        match self.step {
            0 => {
                self.step = 1;
                coro_await_subcoro!(sus, &mut self.child);
            }
            1 => {
                self.finished.store(true, Ordering::SeqCst);
            }
            _ => unreachable!("Parent has no step {}", self.step),
        }
    }
}

#[test]
fn test_subcoro_await_completes_after_child_finalizes() {
    static Q0: CoroScheduleQueue<2> = CoroScheduleQueue::new();
    static QUEUES: [&dyn RawQueue; 1] = [&Q0];
    static DRIVER: HostTimerDriver = HostTimerDriver::new();
    static LEAF_DONE: AtomicBool = AtomicBool::new(false);
    static PARENT_FINISHED: AtomicBool = AtomicBool::new(false);

    let leaf: &'static mut dyn Coro = Box::leak(Box::new(Leaf { done: &LEAF_DONE }));
    let child_state = CoroState::new(leaf, &DRIVER);

    let schedule = CoroSchedule::new(&QUEUES);
    let parent: &'static mut dyn Coro = Box::leak(Box::new(Parent {
        child: child_state,
        finished: &PARENT_FINISHED,
        step: 0,
    }));
    schedule.enqueue(0, parent, &DRIVER).unwrap();

    schedule.run_pass(); // Suspended -> WaitSubcoro
    assert!(!LEAF_DONE.load(Ordering::SeqCst));

    schedule.run_pass(); // child stepped in place, finalizes
    assert!(LEAF_DONE.load(Ordering::SeqCst));
    assert!(!PARENT_FINISHED.load(Ordering::SeqCst));

    schedule.run_pass(); // parent observes child finalized, resumes
    assert!(PARENT_FINISHED.load(Ordering::SeqCst));
}
