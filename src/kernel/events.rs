//! Periodic event threads.
//!
//! A small fixed table of callbacks driven from tick context. Slots are
//! bound first-free and never freed. Callbacks run to completion inside the
//! tick handler, in table order, before the scheduler advances: they must
//! never block, sleep, or wait. Signaling a semaphore and a non-blocking
//! FIFO put are the only kernel services safe to call from one.

use crate::errors::{KernelError, KernelResult};
use core::num::NonZeroU32;
use spin::Mutex;

/// Capacity of the periodic event table.
pub const NUM_PERIODIC: usize = 2;

/// One bound periodic event.
#[derive(Clone, Copy)]
struct PeriodicSlot {
    /// Callback invoked from tick context.
    callback: fn(),
    /// Invocation period in ticks. Nonzero by construction, which is what
    /// distinguishes a bound slot from a free one.
    period: NonZeroU32,
    /// Ticks elapsed since the last invocation.
    elapsed: u32,
}

/// Fixed table of periodic event slots.
///
/// The lock is uncontended by construction: bindings happen before launch,
/// and after launch only the tick handler touches the table.
pub(crate) struct PeriodicTable {
    slots: Mutex<[Option<PeriodicSlot>; NUM_PERIODIC]>,
}

impl PeriodicTable {
    pub(crate) const fn new() -> Self {
        Self {
            slots: Mutex::new([None; NUM_PERIODIC]),
        }
    }

    /// Bind `callback` to the first free slot with the given `period`.
    ///
    /// Fails with [`KernelError::EventTableFull`] when all slots are bound,
    /// leaving the table unchanged, and with [`KernelError::InvalidPeriod`]
    /// for a zero period.
    pub(crate) fn add(&self, callback: fn(), period: u32) -> KernelResult<()> {
        let period = NonZeroU32::new(period).ok_or(KernelError::InvalidPeriod)?;
        let mut slots = self.slots.lock();
        let free = slots
            .iter_mut()
            .find(|slot| slot.is_none())
            .ok_or(KernelError::EventTableFull)?;
        *free = Some(PeriodicSlot {
            callback,
            period,
            elapsed: 0,
        });
        Ok(())
    }

    /// Advance every bound slot by one tick and run the due callbacks, in
    /// table order. Runs in tick context.
    pub(crate) fn run_due(&self) {
        let mut slots = self.slots.lock();
        for slot in slots.iter_mut().flatten() {
            slot.elapsed += 1;
            if slot.elapsed >= slot.period.get() {
                slot.elapsed = 0;
                (slot.callback)();
            }
        }
    }

    /// Number of bound slots.
    pub(crate) fn bound(&self) -> usize {
        self.slots.lock().iter().filter(|s| s.is_some()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use portable_atomic::{AtomicU32, Ordering};

    static CALLS_A: AtomicU32 = AtomicU32::new(0);
    static CALLS_B: AtomicU32 = AtomicU32::new(0);

    fn bump_a() {
        CALLS_A.fetch_add(1, Ordering::Relaxed);
    }

    fn bump_b() {
        CALLS_B.fetch_add(1, Ordering::Relaxed);
    }

    fn noop() {}

    #[test]
    fn test_rejects_zero_period() {
        let table = PeriodicTable::new();
        assert_eq!(table.add(noop, 0), Err(KernelError::InvalidPeriod));
        assert_eq!(table.bound(), 0);
    }

    #[test]
    fn test_first_excess_add_fails_and_table_unchanged() {
        let table = PeriodicTable::new();
        assert_eq!(table.add(noop, 1), Ok(()));
        assert_eq!(table.add(noop, 5), Ok(()));

        assert_eq!(table.add(noop, 7), Err(KernelError::EventTableFull));
        assert_eq!(table.bound(), NUM_PERIODIC);

        // Still full on retry; nothing was displaced.
        assert_eq!(table.add(noop, 7), Err(KernelError::EventTableFull));
        assert_eq!(table.bound(), NUM_PERIODIC);
    }

    #[test]
    fn test_callbacks_fire_on_their_period() {
        CALLS_A.store(0, Ordering::Relaxed);
        CALLS_B.store(0, Ordering::Relaxed);

        let table = PeriodicTable::new();
        table.add(bump_a, 1).unwrap();
        table.add(bump_b, 3).unwrap();

        for _ in 0..6 {
            table.run_due();
        }

        assert_eq!(CALLS_A.load(Ordering::Relaxed), 6);
        assert_eq!(CALLS_B.load(Ordering::Relaxed), 2);
    }
}
