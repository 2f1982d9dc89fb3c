//! Block-addressed backing stores.
//!
//! A block store holds exactly one page-sized block per virtual page and is
//! addressed by page number. All calls are synchronous; errors are fatal to
//! the simulation.

pub mod file_disk;
pub mod memory_disk;

pub use file_disk::FileDisk;
pub use memory_disk::{DiskOp, MemoryDisk};

use crate::error::{StorageError, StorageResult};
use crate::memory::{PageId, PAGE_SIZE};

pub trait BlockStore: Send {
    /// Number of blocks the store holds.
    fn npages(&self) -> usize;

    /// Reads block `page` into `buf`, which must be `PAGE_SIZE` bytes.
    fn read(&mut self, page: PageId, buf: &mut [u8]) -> StorageResult<()>;

    /// Writes `data`, which must be `PAGE_SIZE` bytes, to block `page`.
    fn write(&mut self, page: PageId, data: &[u8]) -> StorageResult<()>;
}

impl<S: BlockStore + ?Sized> BlockStore for Box<S> {
    fn npages(&self) -> usize {
        (**self).npages()
    }

    fn read(&mut self, page: PageId, buf: &mut [u8]) -> StorageResult<()> {
        (**self).read(page, buf)
    }

    fn write(&mut self, page: PageId, data: &[u8]) -> StorageResult<()> {
        (**self).write(page, data)
    }
}

/// Shared argument checks for every store.
pub(crate) fn check_block(page: PageId, npages: usize, len: usize) -> StorageResult<()> {
    if len != PAGE_SIZE {
        return Err(StorageError::BadBufferSize {
            expected: PAGE_SIZE,
            actual: len,
        });
    }
    if page.index() >= npages {
        return Err(StorageError::BlockOutOfRange { page, npages });
    }
    Ok(())
}
