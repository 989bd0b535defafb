//! Kernel context: thread ring, scheduler, tick handler, sleep/suspend.
//!
//! All scheduler, semaphore, and periodic-event state lives in one
//! process-wide [`Kernel`] value with explicit initialization, shared by
//! reference between thread context and the platform's tick handler. There
//! are no ambient globals; the interrupt-atomicity guarantees come from the
//! [`Critical`](crate::platform::Critical) sections around every mutation.
//!
//! # Execution model
//!
//! Two contexts exist. Tick context runs [`Kernel::tick`] to completion:
//! periodic event callbacks, sleep countdowns, then one scheduling
//! decision. Thread context runs the application threads, each until it
//! voluntarily suspends ([`Kernel::sleep`], a blocking
//! [`wait`](Kernel::wait), [`Kernel::suspend`]) or the tick boundary
//! arrives. Exactly one thread holds the processor at any instant.
//!
//! # Scheduling policy
//!
//! Strict round robin over the ring, skipping blocked and sleeping
//! descriptors. No priorities, no aging: each eligible thread gets exactly
//! one slice per ring revolution. A ring with no eligible descriptor is a
//! usage error and halts the system.

mod events;
pub mod semaphore;
mod thread;

pub use events::NUM_PERIODIC;
pub use thread::{ThreadEntry, NUM_THREADS};

use crate::errors::{KernelError, KernelResult};
use crate::kernel::events::PeriodicTable;
use crate::kernel::thread::ThreadDescriptor;
use crate::platform::{Critical, Platform};
use portable_atomic::{AtomicBool, AtomicUsize, Ordering};

/// The kernel context.
///
/// Generic over the [`Platform`] that supplies context switching,
/// interrupt control, and the tick source.
///
/// # Example
///
/// ```ignore
/// use tickos::{Kernel, HostPlatform};
/// use spin::Lazy;
///
/// static KERNEL: Lazy<Kernel<HostPlatform>> = Lazy::new(Kernel::new);
///
/// fn main_threads() {
///     KERNEL.init().expect("double init");
///     KERNEL
///         .add_threads([t0, t1, t2, t3, t4, t5])
///         .expect("ring already built");
///     KERNEL.launch(1000);
/// }
/// # fn t0() {} fn t1() {} fn t2() {} fn t3() {} fn t4() {} fn t5() {}
/// ```
pub struct Kernel<P: Platform> {
    /// Fixed descriptor arena; ring links are indices into it.
    threads: [ThreadDescriptor<P::Context>; NUM_THREADS],
    /// Ring index of the running thread. Mutated only by the scheduler and
    /// launch.
    running: AtomicUsize,
    /// Periodic event table, driven from tick context.
    events: PeriodicTable,
    /// One-shot lifecycle flags.
    initialized: AtomicBool,
    threads_added: AtomicBool,
}

impl<P: Platform> Kernel<P> {
    /// Create an idle kernel: every descriptor parked, ring unlinked.
    pub fn new() -> Self {
        Self {
            threads: core::array::from_fn(|_| ThreadDescriptor::parked()),
            running: AtomicUsize::new(0),
            events: PeriodicTable::new(),
            initialized: AtomicBool::new(false),
            threads_added: AtomicBool::new(false),
        }
    }

    /// One-time kernel and platform bring-up.
    ///
    /// Fails with [`KernelError::AlreadyInitialized`] on a second call.
    pub fn init(&self) -> KernelResult<()> {
        self.initialized
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| KernelError::AlreadyInitialized)?;
        P::init();
        Ok(())
    }

    /// Whether [`Kernel::init`] has run.
    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    /// Build the ring over exactly [`NUM_THREADS`] entry points.
    ///
    /// Called once, after [`Kernel::init`] and before [`Kernel::launch`].
    /// Links the descriptors into one circular ring in creation order,
    /// points the running index at the first, and synthesizes each initial
    /// context so that first dispatch looks to the trampoline like a return
    /// from preemption. All threads start eligible.
    ///
    /// There is no removal or replacement; a second call fails with
    /// [`KernelError::ThreadsAlreadyAdded`].
    pub fn add_threads(&self, entries: [ThreadEntry; NUM_THREADS]) -> KernelResult<()> {
        self.threads_added
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| KernelError::ThreadsAlreadyAdded)?;

        let _cs = Critical::<P>::enter();
        for (i, entry) in entries.into_iter().enumerate() {
            let desc = &self.threads[i];
            desc.set_next((i + 1) % NUM_THREADS);
            // Sole writer: the tick source is not armed yet.
            unsafe { desc.install_context(P::build_initial_context(entry)) };
        }
        self.running.store(0, Ordering::Release);
        Ok(())
    }

    /// Bind a periodic event thread: `callback` runs every `period` ticks
    /// in tick context.
    ///
    /// Callbacks run to completion before the scheduler advances and must
    /// never block, sleep, or wait; [`signal`](Kernel::signal) and a
    /// non-blocking [`Fifo::put`](crate::fifo::Fifo::put) are the only safe
    /// kernel services. This constraint is documented, not enforced.
    pub fn add_periodic_event_thread(&self, callback: fn(), period: u32) -> KernelResult<()> {
        self.events.add(callback, period)
    }

    /// Start the tick source and dispatch the first thread. Never returns.
    ///
    /// Launching without [`Kernel::init`] and [`Kernel::add_threads`] is a
    /// usage error and halts.
    pub fn launch(&self, tick_period: u32) -> ! {
        if !self.is_initialized() || !self.threads_added.load(Ordering::Acquire) {
            panic!("launch requires init and add_threads");
        }
        P::tick_start(tick_period);
        // The ring is built and the running index points at thread 0.
        unsafe { P::start_first_thread(self.running_context()) }
    }

    /// The hardware tick handler body. Runs to completion in tick context,
    /// never suspends.
    ///
    /// Order: periodic event callbacks, then sleep countdowns, then one
    /// scheduling decision. After this returns, the platform trampoline
    /// resumes the thread at [`Kernel::running_context`].
    pub fn tick(&self) {
        self.events.run_due();
        for desc in &self.threads {
            desc.tick_sleep();
        }
        self.schedule();
    }

    /// Advance the running index to the next eligible descriptor in ring
    /// order.
    ///
    /// Exactly one bounded pass: if the full ring (including the current
    /// thread) is blocked or sleeping, the at-least-one-eligible invariant
    /// is broken and the system halts rather than spin in tick context.
    pub fn schedule(&self) {
        let mut idx = self.running_descriptor().next();
        for _ in 0..NUM_THREADS {
            if self.threads[idx].is_eligible() {
                self.running.store(idx, Ordering::Release);
                return;
            }
            idx = self.threads[idx].next();
        }
        panic!("scheduler ring has no eligible thread");
    }

    /// Voluntarily give up the rest of the current slice.
    ///
    /// Resets the tick countdown and triggers an immediate scheduler pass,
    /// so the next eligible thread starts with a full slice.
    pub fn suspend(&self) {
        P::tick_rearm_now();
    }

    /// Put the running thread to sleep for `ticks` tick-handler
    /// invocations, then suspend.
    ///
    /// The countdown is evaluated only at tick boundaries (±1 tick
    /// granularity) and runs independently of blocking status. `sleep(0)`
    /// is a cooperative yield.
    pub fn sleep(&self, ticks: u32) {
        self.running_descriptor().set_sleep(ticks);
        self.suspend();
    }

    /// Ring index of the running thread.
    pub fn running_index(&self) -> usize {
        self.running.load(Ordering::Acquire)
    }

    /// Raw pointer to the running thread's saved context slot.
    ///
    /// The platform trampoline saves the preempted context through this
    /// pointer before [`Kernel::tick`] and restores through it afterwards;
    /// the kernel itself never interprets the contents.
    pub fn running_context(&self) -> *mut P::Context {
        self.running_descriptor().context_ptr()
    }

    /// Number of bound periodic event slots.
    pub fn periodic_events_bound(&self) -> usize {
        self.events.bound()
    }

    pub(crate) fn running_descriptor(&self) -> &ThreadDescriptor<P::Context> {
        &self.threads[self.running.load(Ordering::Acquire)]
    }

    pub(crate) fn descriptor(&self, idx: usize) -> &ThreadDescriptor<P::Context> {
        &self.threads[idx]
    }
}

impl<P: Platform> Default for Kernel<P> {
    fn default() -> Self {
        Self::new()
    }
}
