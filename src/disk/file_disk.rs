use super::{check_block, BlockStore};
use crate::error::StorageResult;
use crate::memory::{PageId, PAGE_SIZE};
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

/// A block store backed by a regular file of `npages * PAGE_SIZE` bytes.
///
/// The file is truncated on creation; its contents do not outlive the run.
pub struct FileDisk {
    file: File,
    npages: usize,
}

impl FileDisk {
    pub fn create(path: &Path, npages: usize) -> StorageResult<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        file.set_len((npages * PAGE_SIZE) as u64)?;

        log::debug!(
            "Created virtual disk at {} with {} blocks",
            path.display(),
            npages
        );

        Ok(Self { file, npages })
    }

    fn block_offset(page: PageId) -> u64 {
        page.0 as u64 * PAGE_SIZE as u64
    }
}

impl BlockStore for FileDisk {
    fn npages(&self) -> usize {
        self.npages
    }

    fn read(&mut self, page: PageId, buf: &mut [u8]) -> StorageResult<()> {
        check_block(page, self.npages, buf.len())?;
        self.file.seek(SeekFrom::Start(Self::block_offset(page)))?;
        self.file.read_exact(buf)?;
        Ok(())
    }

    fn write(&mut self, page: PageId, data: &[u8]) -> StorageResult<()> {
        check_block(page, self.npages, data.len())?;
        self.file.seek(SeekFrom::Start(Self::block_offset(page)))?;
        self.file.write_all(data)?;
        Ok(())
    }
}
