//! Platform abstraction for context switching, interrupts, and the tick
//! source.
//!
//! The kernel core never interprets a saved execution context: it stores and
//! swaps an opaque [`Platform::Context`] handle and leaves the register-level
//! save/restore to the platform's trampoline. Likewise the tick source is
//! reached only through [`Platform::tick_start`] and
//! [`Platform::tick_rearm_now`], so the scheduling policy stays independent
//! of any particular timer block.

use crate::kernel::ThreadEntry;
use core::marker::PhantomData;

/// Platform abstraction trait.
///
/// Implemented once per target. The implementation owns the stack memory,
/// the register frame layout, the interrupt controller, and the tick timer;
/// the kernel owns the scheduling policy.
///
/// # Safety
///
/// Implementations involve direct hardware manipulation. The methods marked
/// unsafe have preconditions that the kernel upholds on its side; a platform
/// port must uphold the contracts documented on each method.
pub trait Platform {
    /// Opaque saved execution context for one thread.
    ///
    /// Contains whatever the platform's trampoline needs to resume the
    /// thread: stack pointer, register snapshot location, and so on. The
    /// `Default` value is a parked placeholder used before the ring is
    /// built; the kernel never dispatches it.
    type Context: Send + Default;

    /// One-time hardware bring-up: clock configuration and anything the
    /// tick source needs before [`Platform::tick_start`].
    fn init();

    /// Synthesize an initial context whose resumption enters `entry`.
    ///
    /// To the trampoline, dispatching this context must be
    /// indistinguishable from resuming a thread that was preempted at its
    /// first instruction.
    fn build_initial_context(entry: ThreadEntry) -> Self::Context;

    /// Disable tick delivery on the current CPU.
    fn interrupts_disable();

    /// Re-enable tick delivery on the current CPU.
    fn interrupts_enable();

    /// Whether tick delivery is currently enabled.
    fn interrupts_enabled() -> bool;

    /// Arm the tick source to fire at a fixed `period` (platform units,
    /// typically timer reload counts or milliseconds).
    fn tick_start(period: u32);

    /// Reset the tick countdown and trigger an immediate scheduler pass.
    ///
    /// This is the voluntary-suspend fast path: the remainder of the
    /// running thread's slice is donated, and the next eligible thread gets
    /// a full slice. Only the scheduling decision re-runs; sleep and
    /// periodic-event countdowns stay on the fixed-period tick.
    fn tick_rearm_now();

    /// Transfer control into the thread whose saved context is at `ctx`.
    ///
    /// # Safety
    ///
    /// - `ctx` must point to a context synthesized by
    ///   [`Platform::build_initial_context`] and still owned by the kernel.
    /// - The tick source must already be armed; this call does not return.
    unsafe fn start_first_thread(ctx: *const Self::Context) -> !;
}

/// Scoped critical section: tick delivery is disabled between construction
/// and drop.
///
/// At most one critical section is active at a time; the kernel never nests
/// them. The guard re-enables delivery on every exit path, including the
/// voluntary-suspend path in `wait`, which drops the guard explicitly
/// before handing off the processor.
pub struct Critical<P: Platform>(PhantomData<P>);

impl<P: Platform> Critical<P> {
    /// Enter a critical section.
    pub fn enter() -> Self {
        P::interrupts_disable();
        Critical(PhantomData)
    }
}

impl<P: Platform> Drop for Critical<P> {
    fn drop(&mut self) {
        P::interrupts_enable();
    }
}

/// Host-side platform double for running the test suite without hardware.
///
/// No context ever runs: `build_initial_context` just records the entry
/// point, and `tick_rearm_now` latches a reschedule-pending flag instead of
/// raising an interrupt. Tests drive the kernel by calling its tick handler
/// directly and observing the flag.
pub struct HostPlatform;

/// Saved-context stand-in used by [`HostPlatform`].
#[derive(Debug, Default, Clone, Copy)]
pub struct HostContext {
    /// Entry point this context would resume into, if it ever ran.
    pub entry: Option<ThreadEntry>,
}

/// Recorded host-platform state. The test harness runs tests on parallel
/// threads, each driving its own kernel, so under `cfg(test)` the state is
/// thread-local; outside the harness a single plain atomic set suffices.
#[cfg(not(test))]
mod host_state {
    use portable_atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};

    static INTERRUPTS_ENABLED: AtomicBool = AtomicBool::new(false);
    static RESCHEDULE_PENDING: AtomicBool = AtomicBool::new(false);
    static REARM_COUNT: AtomicU64 = AtomicU64::new(0);
    static TICK_PERIOD: AtomicU32 = AtomicU32::new(0);

    pub(super) fn interrupts_enabled() -> bool {
        INTERRUPTS_ENABLED.load(Ordering::Acquire)
    }

    pub(super) fn set_interrupts_enabled(enabled: bool) {
        INTERRUPTS_ENABLED.store(enabled, Ordering::Release);
    }

    pub(super) fn reschedule_pending() -> bool {
        RESCHEDULE_PENDING.load(Ordering::Acquire)
    }

    pub(super) fn clear_reschedule_pending() {
        RESCHEDULE_PENDING.store(false, Ordering::Release);
    }

    pub(super) fn note_rearm() {
        RESCHEDULE_PENDING.store(true, Ordering::Release);
        REARM_COUNT.fetch_add(1, Ordering::Relaxed);
    }

    pub(super) fn rearm_count() -> u64 {
        REARM_COUNT.load(Ordering::Relaxed)
    }

    pub(super) fn tick_period() -> u32 {
        TICK_PERIOD.load(Ordering::Relaxed)
    }

    pub(super) fn set_tick_period(period: u32) {
        TICK_PERIOD.store(period, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod host_state {
    use core::cell::Cell;

    std::thread_local! {
        static INTERRUPTS_ENABLED: Cell<bool> = const { Cell::new(false) };
        static RESCHEDULE_PENDING: Cell<bool> = const { Cell::new(false) };
        static REARM_COUNT: Cell<u64> = const { Cell::new(0) };
        static TICK_PERIOD: Cell<u32> = const { Cell::new(0) };
    }

    pub(super) fn interrupts_enabled() -> bool {
        INTERRUPTS_ENABLED.with(Cell::get)
    }

    pub(super) fn set_interrupts_enabled(enabled: bool) {
        INTERRUPTS_ENABLED.with(|flag| flag.set(enabled));
    }

    pub(super) fn reschedule_pending() -> bool {
        RESCHEDULE_PENDING.with(Cell::get)
    }

    pub(super) fn clear_reschedule_pending() {
        RESCHEDULE_PENDING.with(|flag| flag.set(false));
    }

    pub(super) fn note_rearm() {
        RESCHEDULE_PENDING.with(|flag| flag.set(true));
        REARM_COUNT.with(|count| count.set(count.get() + 1));
    }

    pub(super) fn rearm_count() -> u64 {
        REARM_COUNT.with(Cell::get)
    }

    pub(super) fn tick_period() -> u32 {
        TICK_PERIOD.with(Cell::get)
    }

    pub(super) fn set_tick_period(period: u32) {
        TICK_PERIOD.with(|cell| cell.set(period));
    }
}

impl HostPlatform {
    /// Whether a voluntary suspend has requested a scheduler pass since the
    /// last [`HostPlatform::clear_reschedule_pending`].
    pub fn reschedule_pending() -> bool {
        host_state::reschedule_pending()
    }

    /// Clear the reschedule-pending flag.
    pub fn clear_reschedule_pending() {
        host_state::clear_reschedule_pending();
    }

    /// Total number of tick rearm requests observed.
    pub fn rearm_count() -> u64 {
        host_state::rearm_count()
    }

    /// The tick period most recently passed to [`Platform::tick_start`].
    pub fn tick_period() -> u32 {
        host_state::tick_period()
    }
}

impl Platform for HostPlatform {
    type Context = HostContext;

    fn init() {}

    fn build_initial_context(entry: ThreadEntry) -> HostContext {
        HostContext { entry: Some(entry) }
    }

    fn interrupts_disable() {
        host_state::set_interrupts_enabled(false);
    }

    fn interrupts_enable() {
        host_state::set_interrupts_enabled(true);
    }

    fn interrupts_enabled() -> bool {
        host_state::interrupts_enabled()
    }

    fn tick_start(period: u32) {
        host_state::set_tick_period(period);
    }

    fn tick_rearm_now() {
        host_state::note_rearm();
    }

    unsafe fn start_first_thread(_ctx: *const HostContext) -> ! {
        panic!("HostPlatform has no thread context to dispatch into");
    }
}
