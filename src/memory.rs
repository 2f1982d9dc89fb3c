//! Simulated physical memory and the structures that describe it.
//!
//! - **FrameTable**: which page occupies each physical frame, and whether it is dirty
//! - **PageTable**: per-page capability bits, the page-to-frame mapping, and the
//!   physical bytes themselves
//!
//! Both are plain data. The fault handler is the only code that moves pages
//! between frames, and it keeps the two tables in agreement.

pub mod frame_table;
pub mod page_table;

pub use frame_table::FrameTable;
pub use page_table::{PageTable, Translation};

use std::fmt;

/// Size of a page and of a frame, in bytes.
pub const PAGE_SIZE: usize = 4096;

/// Index of a physical frame.
pub type FrameId = u32;

/// Index of a virtual page, in `[0, npages)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PageId(pub u32);

impl PageId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Access level currently granted to a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Capability {
    #[default]
    None,
    Read,
    ReadWrite,
}

impl Capability {
    /// Whether this capability allows `access` without faulting.
    pub fn permits(self, access: Access) -> bool {
        match (self, access) {
            (Capability::None, _) => false,
            (Capability::Read, Access::Read) => true,
            (Capability::Read, Access::Write) => false,
            (Capability::ReadWrite, _) => true,
        }
    }
}

/// Kind of memory access issued by a workload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Read,
    Write,
}
