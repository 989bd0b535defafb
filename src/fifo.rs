//! Bounded single-producer/single-consumer FIFO.
//!
//! Moves `u32` values from exactly one producer (typically a periodic event
//! thread) to exactly one consumer (a main thread). Occupancy is tracked by
//! a counting semaphore: `put` signals it, `get` waits on it, so the
//! consumer blocks while the queue is empty and the producer never blocks
//! at all.
//!
//! The put index is written only by the producer and the get index only by
//! the consumer; that SPSC discipline is the only thing protecting the
//! indices. Generalizing to multiple producers or consumers requires adding
//! a lock around the respective index; the discipline is a contract, not
//! something this type can check.

use crate::errors::{KernelError, KernelResult};
use crate::kernel::semaphore::Semaphore;
use crate::kernel::Kernel;
use crate::platform::Platform;
use portable_atomic::{AtomicU32, AtomicUsize, Ordering};

/// Bounded SPSC queue of `u32` values with capacity `N`.
pub struct Fifo<const N: usize> {
    cells: [AtomicU32; N],
    /// Next slot to write. Producer-owned.
    put_at: AtomicUsize,
    /// Next slot to read. Consumer-owned.
    get_at: AtomicUsize,
    /// Occupied-slot count; the consumer blocks on it when empty.
    pub(crate) size: Semaphore,
    /// Values dropped because the queue was full.
    lost: AtomicU32,
}

impl<const N: usize> Fifo<N> {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self {
            cells: core::array::from_fn(|_| AtomicU32::new(0)),
            put_at: AtomicUsize::new(0),
            get_at: AtomicUsize::new(0),
            size: Semaphore::new(),
            lost: AtomicU32::new(0),
        }
    }

    /// Producer side: store `value` and signal the consumer. Non-blocking.
    ///
    /// When the queue is full the value is dropped without overwriting
    /// anything, the lost counter is incremented, and
    /// [`KernelError::FifoFull`] is returned. Safe to call from a periodic
    /// event callback.
    pub fn put<P: Platform>(&self, kernel: &Kernel<P>, value: u32) -> KernelResult<()> {
        if self.size.value() >= N as i32 {
            self.lost.fetch_add(1, Ordering::Relaxed);
            return Err(KernelError::FifoFull);
        }
        let at = self.put_at.load(Ordering::Relaxed);
        self.cells[at].store(value, Ordering::Release);
        self.put_at.store((at + 1) % N, Ordering::Relaxed);
        kernel.signal(&self.size);
        Ok(())
    }

    /// Consumer side: take the oldest value, blocking while the queue is
    /// empty.
    ///
    /// Blocking means the calling thread suspends on the size semaphore and
    /// becomes eligible again after the next `put`; there is no timeout.
    pub fn get<P: Platform>(&'static self, kernel: &Kernel<P>) -> u32 {
        kernel.wait(&self.size);
        let at = self.get_at.load(Ordering::Relaxed);
        let value = self.cells[at].load(Ordering::Acquire);
        self.get_at.store((at + 1) % N, Ordering::Relaxed);
        value
    }

    /// Number of occupied slots (zero while consumers are blocked waiting).
    pub fn len(&self) -> usize {
        self.size.value().max(0) as usize
    }

    /// Whether the queue is currently empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of values dropped by `put` against a full queue.
    pub fn lost(&self) -> u32 {
        self.lost.load(Ordering::Relaxed)
    }
}

impl<const N: usize> Default for Fifo<N> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::tests::{leaked_kernel, ENTRIES};
    use crate::platform::HostPlatform;
    use std::boxed::Box;

    fn leaked_fifo<const N: usize>() -> &'static Fifo<N> {
        Box::leak(Box::new(Fifo::new()))
    }

    fn ready_kernel() -> &'static crate::kernel::Kernel<HostPlatform> {
        let kernel = leaked_kernel();
        kernel.add_threads(ENTRIES).unwrap();
        kernel
    }

    #[test]
    fn test_put_then_get_in_insertion_order() {
        let kernel = ready_kernel();
        let fifo = leaked_fifo::<4>();

        fifo.put(kernel, 10).unwrap();
        fifo.put(kernel, 20).unwrap();
        assert_eq!(fifo.len(), 2);

        assert_eq!(fifo.get(kernel), 10);
        assert_eq!(fifo.get(kernel), 20);
        assert!(fifo.is_empty());
    }

    #[test]
    fn test_full_put_fails_and_counts_lost() {
        let kernel = ready_kernel();
        let fifo = leaked_fifo::<3>();

        for v in 0..3 {
            assert_eq!(fifo.put(kernel, v), Ok(()));
        }
        assert_eq!(fifo.put(kernel, 99), Err(KernelError::FifoFull));
        assert_eq!(fifo.lost(), 1);
        assert_eq!(fifo.len(), 3);

        // The rejected value did not overwrite anything.
        assert_eq!(fifo.get(kernel), 0);
        assert_eq!(fifo.get(kernel), 1);
        assert_eq!(fifo.get(kernel), 2);
    }

    #[test]
    fn test_wraparound_preserves_order() {
        let kernel = ready_kernel();
        let fifo = leaked_fifo::<3>();

        for round in 0..4u32 {
            for i in 0..3 {
                fifo.put(kernel, round * 10 + i).unwrap();
            }
            for i in 0..3 {
                assert_eq!(fifo.get(kernel), round * 10 + i);
            }
        }
        assert_eq!(fifo.lost(), 0);
    }

    #[test]
    fn test_get_on_empty_blocks_caller_until_put() {
        let kernel = ready_kernel();
        let fifo = leaked_fifo::<4>();

        // The consumer would block here: waiting on the size semaphore
        // drives it negative and parks the running thread.
        kernel.wait(&fifo.size);
        assert_eq!(fifo.size.value(), -1);
        assert!(!kernel.running_descriptor().is_eligible());

        // A put signals the semaphore and the consumer becomes eligible.
        kernel.schedule();
        fifo.put(kernel, 7).unwrap();
        assert!(kernel.descriptor(0).is_eligible());
        assert_eq!(fifo.size.value(), 0);
    }
}
