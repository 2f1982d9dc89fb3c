//! Error types for the paging simulator.

use crate::memory::{Capability, FrameId, PageId};
use thiserror::Error;

/// Errors raised by a block store.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Block {page} is out of range (store holds {npages} blocks)")]
    BlockOutOfRange { page: PageId, npages: usize },

    #[error("Buffer size must be PAGE_SIZE ({expected}), got {actual}")]
    BadBufferSize { expected: usize, actual: usize },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for block store operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Internal inconsistencies in the paging core. Any of these means the
/// simulated memory can no longer be trusted.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum InvariantViolation {
    #[error("Fault on page {page} which is already {observed:?}")]
    UnexpectedFault { page: PageId, observed: Capability },

    #[error("Page {page} is {observed:?} but has no backing frame")]
    MissingFrame { page: PageId, observed: Capability },

    #[error("Page {page} maps to frame {frame}, but the frame holds {occupant:?}")]
    MappingMismatch {
        page: PageId,
        frame: FrameId,
        occupant: Option<PageId>,
    },

    #[error("Page {page} is unmapped but still points at frame {frame}")]
    DanglingMapping { page: PageId, frame: FrameId },

    #[error("Eviction policy '{policy}' selected free frame {frame}")]
    VictimNotOccupied { policy: &'static str, frame: FrameId },

    #[error("Eviction policy '{policy}' found no victim among {resident} resident frames")]
    NoVictim { policy: &'static str, resident: usize },

    #[error("Frame {frame} is occupied twice (pages {first} and {second})")]
    DoubleMapped {
        frame: FrameId,
        first: PageId,
        second: PageId,
    },

    #[error("Page {page} is read-only but frame {frame} is dirty")]
    DirtyReadOnly { page: PageId, frame: FrameId },

    #[error("{resident} pages are resident but only {nframes} frames exist")]
    ResidencyExceeded { resident: usize, nframes: usize },

    #[error("Access to page {page} still faults after the handler ran")]
    FaultNotResolved { page: PageId },
}

/// Configuration problems detected before the simulator is built.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Unknown policy: {0} (expected rand, fifo, custom or lru)")]
    UnknownPolicy(String),

    #[error("Unknown workload: {0} (expected sort, scan or focus)")]
    UnknownWorkload(String),

    #[error("Page count must be at least 1")]
    NoPages,

    #[error("Frame count must be at least 1")]
    NoFrames,

    #[error("Frame count must be at least {required} for {workload}, got {actual}")]
    TooFewFrames {
        workload: &'static str,
        required: usize,
        actual: usize,
    },

    #[error("Block store holds {actual} pages but the simulation needs {expected}")]
    StoreSizeMismatch { expected: usize, actual: usize },
}

/// Top-level simulator error.
#[derive(Error, Debug)]
pub enum SimError {
    #[error("Invariant violation: {0}")]
    Invariant(#[from] InvariantViolation),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Address {addr:#x} is outside virtual memory of {len} bytes")]
    AddressOutOfRange { addr: usize, len: usize },
}

impl SimError {
    /// Returns the invariant that failed, if this is an invariant violation.
    pub fn invariant(&self) -> Option<&InvariantViolation> {
        match self {
            SimError::Invariant(v) => Some(v),
            _ => None,
        }
    }
}

/// Result type for simulator operations.
pub type SimResult<T> = Result<T, SimError>;
