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

//! A single-bit atomic flag that coroutines and interrupt handlers use to
//! signal events to each other.

use core::sync::atomic::{AtomicBool, Ordering};

/// An atomic condition flag.
///
/// Once set, a `Condition` stays set until explicitly cleared; there are no
/// spurious transitions. All operations are sequentially consistent with
/// respect to other `Condition` operations and to the `Resource`/queue
/// operations the scheduler observes, so a coroutine that sees a condition
/// set also sees everything the setter did before setting it.
pub struct Condition {
    flag: AtomicBool,
}

impl Condition {
    /// Creates a new, cleared condition.
    pub const fn new() -> Self {
        Condition {
            flag: AtomicBool::new(false),
        }
    }

    /// Atomically reads the current value.
    pub fn get(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Atomically sets the condition to true.
    pub fn set(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Atomically clears the condition to false.
    pub fn clear(&self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

impl Default for Condition {
    fn default() -> Self {
        Condition::new()
    }
}

#[cfg(test)]
mod test {
    use super::Condition;

    #[test]
    fn test_condition_basic() {
        let cond = Condition::new();
        assert!(!cond.get());

        cond.set();
        assert!(cond.get());

        cond.clear();
        assert!(!cond.get());
    }

    #[test]
    fn test_condition_set_idempotent() {
        let cond = Condition::new();
        cond.set();
        cond.set();
        assert!(cond.get());
    }
}
