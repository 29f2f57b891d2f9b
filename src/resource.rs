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

//! Priority based "partial" lock for controlling access to physical
//! resources.
//!
//! A [`Resource`] arbitrates a single physical resource (a peripheral, a
//! shared buffer, a bus) among any number of producers at different
//! priorities, including interrupt service routines. It is a lock-free CAS
//! loop rather than a blocking mutex: there is no wait list and no
//! ownership queue, only "who holds it right now".

use core::sync::atomic::{AtomicPtr, Ordering};

/// Identity and priority of a potential [`Resource`] owner.
///
/// Each caller that may hold a `Resource` owns exactly one `ResourceOwner`
/// for as long as it might be recorded in that resource's cell. Ownership
/// is tracked by address, not by value: two owners with equal `priority`
/// are still distinct.
pub struct ResourceOwner {
    pub priority: i32,
}

impl ResourceOwner {
    pub const fn new(priority: i32) -> Self {
        ResourceOwner { priority }
    }
}

/// Outcome of [`Resource::acquire`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquireResult {
    /// Another owner at equal or higher priority already holds the
    /// resource; the cell was not modified.
    Failed,
    /// The resource was unowned and is now held by the caller.
    Success,
    /// The resource was held by a strictly lower-priority owner, who has
    /// now been displaced.
    Preempted,
}

/// An atomically-owned resource cell.
///
/// At any instant the cell holds at most one owner. Acquisition at a
/// strictly higher priority than the current owner preempts it; acquisition
/// at an equal or lower priority fails outright. This asymmetry is
/// deliberate: it prevents equal-priority contenders from ping-ponging
/// ownership back and forth.
pub struct Resource {
    owner: AtomicPtr<ResourceOwner>,
}

impl Resource {
    /// Creates a new, unowned resource.
    pub const fn new() -> Self {
        Resource {
            owner: AtomicPtr::new(core::ptr::null_mut()),
        }
    }

    /// Attempts to acquire the resource for `owner`.
    ///
    /// `owner` must remain valid for as long as it might still be the
    /// recorded owner of `self` — in practice, for as long as `self` might
    /// still hold a pointer to it, since a displaced owner is never
    /// actively notified (§[`AcquireResult::Preempted`]).
    pub fn acquire(&self, owner: &'static ResourceOwner) -> AcquireResult {
        let owner_ptr = owner as *const ResourceOwner as *mut ResourceOwner;
        let mut current = self.owner.load(Ordering::SeqCst);
        loop {
            let current_priority = unsafe { current.as_ref() }.map(|o| o.priority);
            match current_priority {
                Some(p) if p >= owner.priority => return AcquireResult::Failed,
                _ => {}
            }
            match self.owner.compare_exchange_weak(
                current,
                owner_ptr,
                Ordering::SeqCst,
                Ordering::SeqCst,
            ) {
                Ok(prior) => {
                    return if prior.is_null() {
                        AcquireResult::Success
                    } else {
                        log::debug!("resource preempted at priority {}", owner.priority);
                        AcquireResult::Preempted
                    };
                }
                Err(observed) => current = observed,
            }
        }
    }

    /// Releases the resource if, and only if, `owner` is still the recorded
    /// owner. A release by anyone else (including a previously-preempted
    /// owner) is silently a no-op, which makes it safe to call
    /// unconditionally after any `acquire`.
    pub fn release(&self, owner: &'static ResourceOwner) {
        let owner_ptr = owner as *const ResourceOwner as *mut ResourceOwner;
        let mut current = self.owner.load(Ordering::SeqCst);
        while current == owner_ptr {
            match self.owner.compare_exchange_weak(
                current,
                core::ptr::null_mut(),
                Ordering::SeqCst,
                Ordering::SeqCst,
            ) {
                Ok(_) => return,
                Err(observed) => current = observed,
            }
        }
    }

    /// Advisory check for whether `owner` currently holds the resource.
    ///
    /// This is unsynchronized with respect to any acquire racing against
    /// it: a `true` result can be stale by the time the caller acts on it,
    /// if a higher-priority acquirer preempts immediately afterwards.
    pub fn is_owned_by(&self, owner: &'static ResourceOwner) -> bool {
        let owner_ptr = owner as *const ResourceOwner as *mut ResourceOwner;
        self.owner.load(Ordering::SeqCst) == owner_ptr
    }
}

impl Default for Resource {
    fn default() -> Self {
        Resource::new()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    static LOW: ResourceOwner = ResourceOwner::new(1);
    static MID: ResourceOwner = ResourceOwner::new(3);
    static HIGH: ResourceOwner = ResourceOwner::new(5);

    #[test]
    fn test_acquire_unowned_succeeds() {
        let r = Resource::new();
        assert_eq!(r.acquire(&LOW), AcquireResult::Success);
        assert!(r.is_owned_by(&LOW));
    }

    #[test]
    fn test_acquire_preempts_lower_priority() {
        let r = Resource::new();
        assert_eq!(r.acquire(&LOW), AcquireResult::Success);
        assert_eq!(r.acquire(&HIGH), AcquireResult::Preempted);
        assert!(r.is_owned_by(&HIGH));
        assert!(!r.is_owned_by(&LOW));
    }

    #[test]
    fn test_equal_priority_does_not_preempt() {
        static OTHER_MID: ResourceOwner = ResourceOwner::new(3);
        let r = Resource::new();
        assert_eq!(r.acquire(&MID), AcquireResult::Success);
        assert_eq!(r.acquire(&OTHER_MID), AcquireResult::Failed);
        assert!(r.is_owned_by(&MID));
    }

    #[test]
    fn test_release_by_non_owner_is_noop() {
        let r = Resource::new();
        r.acquire(&LOW);
        r.acquire(&HIGH); // preempts LOW
        r.release(&LOW); // no-op: LOW is not the current owner
        assert!(r.is_owned_by(&HIGH));
    }

    #[test]
    fn test_release_idempotent() {
        let r = Resource::new();
        r.acquire(&LOW);
        r.release(&LOW);
        r.release(&LOW);
        assert!(!r.is_owned_by(&LOW));
        assert_eq!(r.acquire(&LOW), AcquireResult::Success);
    }
}
