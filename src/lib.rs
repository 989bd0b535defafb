#![no_std]
#![deny(unsafe_op_in_unsafe_fn)]
#![forbid(unreachable_pub)]

//! Minimal real-time kernel core.
//!
//! A preemptive round-robin scheduler over a fixed ring of six cooperative
//! application threads, with counting semaphores for blocking
//! synchronization, a per-thread sleep mechanism, a fixed table of periodic
//! event threads run from tick context, and a bounded
//! single-producer/single-consumer FIFO linking an event thread to a main
//! thread.
//!
//! The register-level context switch, stack layout, interrupt controller,
//! and tick timer live behind the [`Platform`] trait; the kernel stores and
//! swaps only opaque context handles. [`HostPlatform`] is a hardware-free
//! implementation backing the test suite.
//!
//! # Quick Start
//!
//! ```ignore
//! use tickos::Kernel;
//! use spin::Lazy;
//!
//! static KERNEL: Lazy<Kernel<Board>> = Lazy::new(Kernel::new);
//!
//! fn main() -> ! {
//!     KERNEL.init().expect("kernel init");
//!     KERNEL
//!         .add_threads([t0, t1, t2, t3, t4, t5])
//!         .expect("thread ring");
//!     KERNEL
//!         .add_periodic_event_thread(sample_sensor, 10)
//!         .expect("event slot");
//!     KERNEL.launch(1000) // tick period; never returns
//! }
//! ```
//!
//! # Error handling
//!
//! Capacity and lifecycle failures (full event table, full FIFO, repeated
//! `init`/`add_threads`) come back as [`KernelError`] values and are always
//! caller-recoverable. Invariant violations (every thread blocked or
//! sleeping, a semaphore signaled below zero with no waiter, launching
//! before the ring exists) halt the system via `panic!`; on bare metal the
//! panic handler parks the CPU.

// Core modules
pub mod errors;
pub mod fifo;
pub mod kernel;
pub mod platform;

#[cfg(test)]
extern crate std;

// Panic handler for bare-metal
#[cfg(all(not(test), not(feature = "std-shim")))]
use core::panic::PanicInfo;

#[cfg(all(not(test), not(feature = "std-shim")))]
#[panic_handler]
fn panic(_info: &PanicInfo) -> ! {
    // Nothing to unwind on bare metal: park the CPU.
    loop {
        core::hint::spin_loop();
    }
}

// ============================================================================
// Public API
// ============================================================================

// Kernel
pub use kernel::{Kernel, ThreadEntry, NUM_PERIODIC, NUM_THREADS};

// Synchronization
pub use kernel::semaphore::Semaphore;

// Queue
pub use fifo::Fifo;

// Platform abstraction
pub use platform::{Critical, HostContext, HostPlatform, Platform};

// Errors
pub use errors::{KernelError, KernelResult};

#[cfg(test)]
mod tests;
