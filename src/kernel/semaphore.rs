//! Counting semaphores with block/wake.
//!
//! A semaphore is a signed counter. `wait` decrements it and blocks the
//! running thread when the result goes negative; `signal` increments it and
//! wakes one blocked thread when the result is still at or below zero. A
//! negative value −v always accounts for exactly v blocked threads whose
//! blocking reference is this semaphore.
//!
//! Wake order is deliberately not FIFO: `signal` wakes the nearest blocked
//! thread found scanning forward around the ring from the running thread.
//! That is "some waiter", not "oldest waiter".
//!
//! Both operations mutate the counter and the ring inside a critical
//! section, so they never interleave with each other or with the tick
//! handler. Using a semaphore before `init_semaphore` is a documented
//! hazard: the counter starts at zero and the accounting is the caller's
//! responsibility.

use crate::kernel::{Kernel, NUM_THREADS};
use crate::platform::{Critical, Platform};
use portable_atomic::{AtomicI32, Ordering};

/// Counting semaphore.
///
/// Const-constructible so it can live in a `static`; blocking operations
/// take `&'static Semaphore` because a blocked thread's descriptor holds a
/// non-owning pointer to it across suspension.
pub struct Semaphore {
    value: AtomicI32,
}

impl Semaphore {
    /// Create a semaphore with value zero. Set the real initial value with
    /// [`Kernel::init_semaphore`] before the first wait or signal.
    pub const fn new() -> Self {
        Self {
            value: AtomicI32::new(0),
        }
    }

    /// Current counter value. Negative values count blocked waiters.
    pub fn value(&self) -> i32 {
        self.value.load(Ordering::Acquire)
    }

    fn decrement(&self) -> i32 {
        self.value.fetch_sub(1, Ordering::AcqRel) - 1
    }

    fn increment(&self) -> i32 {
        self.value.fetch_add(1, Ordering::AcqRel) + 1
    }
}

impl Default for Semaphore {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: Platform> Kernel<P> {
    /// Set a semaphore's value. Must precede any wait or signal on it.
    pub fn init_semaphore(&self, sem: &Semaphore, value: i32) {
        sem.value.store(value, Ordering::Release);
    }

    /// Decrement `sem`; block the running thread if the result is negative.
    ///
    /// The critical section is dropped before the voluntary suspend so tick
    /// delivery is never starved while the processor is handed off; on
    /// return the thread has been rescheduled with the semaphore held.
    pub fn wait(&self, sem: &'static Semaphore) {
        let cs = Critical::<P>::enter();
        if sem.decrement() < 0 {
            self.running_descriptor().block_on(sem);
            drop(cs);
            self.suspend();
        }
    }

    /// Increment `sem`; wake one blocked thread if the result is still at
    /// or below zero.
    ///
    /// The woken thread becomes eligible on the scheduler's next pass; it
    /// is not dispatched immediately. Callable from thread context and from
    /// periodic event callbacks.
    ///
    /// A result at or below zero with no thread blocked on `sem` means the
    /// semaphore accounting was corrupted (typically a signal on an
    /// uninitialized semaphore); that is an invariant violation and halts.
    pub fn signal(&self, sem: &Semaphore) {
        let _cs = Critical::<P>::enter();
        if sem.increment() <= 0 {
            let mut idx = self.running_descriptor().next();
            for _ in 0..NUM_THREADS {
                let desc = self.descriptor(idx);
                if desc.is_blocked_on(sem) {
                    desc.unblock();
                    return;
                }
                idx = desc.next();
            }
            panic!("semaphore signaled at or below zero with no blocked thread");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::tests::{leaked_kernel, ENTRIES};
    use crate::platform::HostPlatform;
    use std::boxed::Box;

    fn leaked_sem(initial: i32, kernel: &Kernel<HostPlatform>) -> &'static Semaphore {
        let sem = Box::leak(Box::new(Semaphore::new()));
        kernel.init_semaphore(sem, initial);
        sem
    }

    #[test]
    fn test_wait_without_contention_does_not_block() {
        let kernel = leaked_kernel();
        kernel.add_threads(ENTRIES).unwrap();
        let sem = leaked_sem(2, kernel);

        kernel.wait(sem);
        assert_eq!(sem.value(), 1);
        assert!(kernel.running_descriptor().is_eligible());
    }

    #[test]
    fn test_wait_below_zero_blocks_running_thread() {
        let kernel = leaked_kernel();
        kernel.add_threads(ENTRIES).unwrap();
        let sem = leaked_sem(0, kernel);

        kernel.wait(sem);
        assert_eq!(sem.value(), -1);
        assert!(kernel.running_descriptor().is_blocked_on(sem));
        assert!(!kernel.running_descriptor().is_eligible());
    }

    #[test]
    fn test_signal_wakes_a_waiter() {
        let kernel = leaked_kernel();
        kernel.add_threads(ENTRIES).unwrap();
        let sem = leaked_sem(0, kernel);

        // Thread 0 blocks, scheduler moves on to thread 1.
        kernel.wait(sem);
        kernel.schedule();
        assert_eq!(kernel.running_index(), 1);

        kernel.signal(sem);
        assert_eq!(sem.value(), 0);
        assert!(kernel.descriptor(0).is_eligible());
    }

    #[test]
    fn test_conservation_under_balanced_wait_signal() {
        let kernel = leaked_kernel();
        kernel.add_threads(ENTRIES).unwrap();
        let sem = leaked_sem(3, kernel);

        // Interleaving with equal call counts restores the initial value.
        kernel.wait(sem);
        kernel.wait(sem);
        kernel.signal(sem);
        kernel.wait(sem);
        kernel.signal(sem);
        kernel.signal(sem);
        assert_eq!(sem.value(), 3);
    }

    #[test]
    #[should_panic(expected = "no blocked thread")]
    fn test_signal_with_no_waiter_halts() {
        let kernel = leaked_kernel();
        kernel.add_threads(ENTRIES).unwrap();
        let sem = leaked_sem(-1, kernel);

        // Value rises to 0 but nobody is blocked: accounting is corrupt.
        kernel.signal(sem);
    }
}
