//! Error types for kernel operations.
//!
//! Every recoverable failure in the kernel is reported through
//! [`KernelError`]. Invariant violations (an all-ineligible ring, a signal
//! below zero with no blocked thread) are not recoverable and halt the
//! system instead; see the crate-level documentation.

use core::fmt;

/// Result type for kernel operations.
pub type KernelResult<T> = Result<T, KernelError>;

/// Errors returned by kernel lifecycle and capacity-bounded operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KernelError {
    /// `init` was called on an already-initialized kernel
    AlreadyInitialized,
    /// `add_threads` was called a second time
    ThreadsAlreadyAdded,
    /// The periodic event table has no free slot
    EventTableFull,
    /// A periodic event was registered with period zero
    InvalidPeriod,
    /// The FIFO is full; the value was dropped and counted as lost
    FifoFull,
}

impl fmt::Display for KernelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KernelError::AlreadyInitialized => write!(f, "kernel already initialized"),
            KernelError::ThreadsAlreadyAdded => write!(f, "thread ring already built"),
            KernelError::EventTableFull => write!(f, "periodic event table full"),
            KernelError::InvalidPeriod => write!(f, "periodic event period must be nonzero"),
            KernelError::FifoFull => write!(f, "FIFO full, value lost"),
        }
    }
}
