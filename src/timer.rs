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

//! Platform timer interface required by the scheduler.
//!
//! This module fixes the contract; it does not implement it. Firmware links
//! in a [`TimerDriver`] that knows how to program the target's hardware
//! timer. The host-only driver under `#[cfg(test)]` exists purely so this
//! crate's own test suite can run without hardware.

use crate::condition::Condition;

/// A platform-specific timer backend.
///
/// # Contract
///
/// - `start` must arrange for `cond` to transition from clear to set exactly
///   once, `ms` milliseconds after the call, unless cancelled first.
/// - `cancel` must be idempotent and safe to call on an already-expired or
///   never-started timer.
/// - A given `Condition` must not be passed to `start` again while still
///   armed for a previous call without an intervening `cancel`.
pub trait TimerDriver: Sync {
    /// Arms the timer so that `cond` is set after `ms` milliseconds.
    fn start(&self, cond: &Condition, ms: u32);

    /// Disarms the timer. Safe to call more than once.
    fn cancel(&self, cond: &Condition);
}

/// A timer instance embedded in a [`crate::coro::CoroState`].
///
/// Pairs a `Condition` that is set on expiry with the driver that knows how
/// to arm/disarm the underlying hardware (or host clock, in tests).
pub struct Timer {
    /// Set by the driver when the timer expires.
    pub timed_out: Condition,
    driver: &'static dyn TimerDriver,
}

impl Timer {
    /// Creates a new, unarmed timer bound to `driver`.
    pub const fn new(driver: &'static dyn TimerDriver) -> Self {
        Timer {
            timed_out: Condition::new(),
            driver,
        }
    }

    /// Starts (or restarts) the timer for `ms` milliseconds.
    pub fn start(&self, ms: u32) {
        self.timed_out.clear();
        self.driver.start(&self.timed_out, ms);
        log::trace!("timer armed for {ms}ms");
    }

    /// Cancels the timer. Safe to call repeatedly, including on a timer that
    /// was never started.
    pub fn cancel(&self) {
        self.driver.cancel(&self.timed_out);
    }
}
