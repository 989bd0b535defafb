//! Thread descriptors and the scheduling ring.
//!
//! The ring is index-based: each descriptor lives in a fixed array inside
//! the kernel and holds the array index of its ring successor. Traversal is
//! O(1) per hop and there is no self-referential ownership to manage.

use crate::kernel::semaphore::Semaphore;
use core::cell::UnsafeCell;
use core::ptr;
use portable_atomic::{AtomicPtr, AtomicU32, AtomicUsize, Ordering};

/// Number of application threads in the ring. Fixed at build time; the ring
/// is created once and never grows or shrinks.
pub const NUM_THREADS: usize = 6;

/// Entry point of an application thread. Expected never to return.
pub type ThreadEntry = fn();

/// Control block for one application thread.
///
/// Mutated by the scheduler (ring position, via the kernel's running index),
/// the semaphore primitive (blocked pointer), and the sleep mechanism
/// (sleep counter). The saved context slot is touched only by
/// `add_threads` and the platform trampoline.
pub(crate) struct ThreadDescriptor<C> {
    /// Saved execution context, opaque to the kernel core.
    context: UnsafeCell<C>,
    /// Ring successor, as an index into the kernel's descriptor array.
    next: AtomicUsize,
    /// Semaphore this thread is blocked on; null when runnable. Non-owning.
    blocked: AtomicPtr<Semaphore>,
    /// Remaining sleep ticks; zero when not sleeping.
    sleep: AtomicU32,
}

// The context slot is handed to exactly one execution context at a time:
// add_threads before launch, the trampoline afterwards.
unsafe impl<C: Send> Send for ThreadDescriptor<C> {}
unsafe impl<C: Send> Sync for ThreadDescriptor<C> {}

impl<C: Default> ThreadDescriptor<C> {
    pub(crate) fn parked() -> Self {
        Self {
            context: UnsafeCell::new(C::default()),
            next: AtomicUsize::new(0),
            blocked: AtomicPtr::new(ptr::null_mut()),
            sleep: AtomicU32::new(0),
        }
    }
}

impl<C> ThreadDescriptor<C> {
    /// Index of the ring successor.
    pub(crate) fn next(&self) -> usize {
        self.next.load(Ordering::Acquire)
    }

    pub(crate) fn set_next(&self, next: usize) {
        debug_assert!(next < NUM_THREADS);
        self.next.store(next, Ordering::Release);
    }

    /// Eligible means not blocked on a semaphore and not sleeping.
    pub(crate) fn is_eligible(&self) -> bool {
        self.blocked.load(Ordering::Acquire).is_null() && self.sleep.load(Ordering::Acquire) == 0
    }

    pub(crate) fn block_on(&self, sem: &Semaphore) {
        self.blocked
            .store(sem as *const Semaphore as *mut Semaphore, Ordering::Release);
    }

    pub(crate) fn is_blocked_on(&self, sem: &Semaphore) -> bool {
        ptr::eq(self.blocked.load(Ordering::Acquire), sem)
    }

    pub(crate) fn unblock(&self) {
        self.blocked.store(ptr::null_mut(), Ordering::Release);
    }

    pub(crate) fn set_sleep(&self, ticks: u32) {
        self.sleep.store(ticks, Ordering::Release);
    }

    pub(crate) fn sleep_remaining(&self) -> u32 {
        self.sleep.load(Ordering::Acquire)
    }

    /// Advance the sleep countdown by one tick. Runs in tick context, the
    /// only writer while a thread is dormant.
    pub(crate) fn tick_sleep(&self) {
        let remaining = self.sleep.load(Ordering::Acquire);
        if remaining > 0 {
            self.sleep.store(remaining - 1, Ordering::Release);
        }
    }

    /// Install the initial saved context for this descriptor.
    ///
    /// # Safety
    ///
    /// Caller must guarantee nothing else is reading the context slot:
    /// called only from `add_threads`, before the tick source is armed.
    pub(crate) unsafe fn install_context(&self, context: C) {
        unsafe { *self.context.get() = context };
    }

    /// Raw pointer to the saved context slot, for the platform trampoline.
    pub(crate) fn context_ptr(&self) -> *mut C {
        self.context.get()
    }
}
