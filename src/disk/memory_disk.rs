use super::{check_block, BlockStore};
use crate::error::StorageResult;
use crate::memory::{PageId, PAGE_SIZE};

/// One call made against a `MemoryDisk`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiskOp {
    Read(PageId),
    Write(PageId),
}

/// In-memory block store. Built with `with_log`, it also remembers every
/// call made against it.
#[derive(Debug, Clone)]
pub struct MemoryDisk {
    blocks: Vec<u8>,
    ops: Option<Vec<DiskOp>>,
}

impl MemoryDisk {
    pub fn new(npages: usize) -> Self {
        Self {
            blocks: vec![0u8; npages * PAGE_SIZE],
            ops: None,
        }
    }

    /// A store that records each successful read and write.
    pub fn with_log(npages: usize) -> Self {
        Self {
            ops: Some(Vec::new()),
            ..Self::new(npages)
        }
    }

    /// Calls made so far, oldest first. Always empty without a log.
    pub fn ops(&self) -> &[DiskOp] {
        self.ops.as_deref().unwrap_or(&[])
    }

    pub fn clear_ops(&mut self) {
        if let Some(ops) = self.ops.as_mut() {
            ops.clear();
        }
    }

    /// Current stored content of `page`, without recording an operation.
    pub fn block(&self, page: PageId) -> Option<&[u8]> {
        if page.index() >= self.npages() {
            return None;
        }
        Some(self.slot(page))
    }

    fn slot(&self, page: PageId) -> &[u8] {
        let start = page.index() * PAGE_SIZE;
        &self.blocks[start..start + PAGE_SIZE]
    }

    fn record(&mut self, op: DiskOp) {
        if let Some(ops) = self.ops.as_mut() {
            ops.push(op);
        }
    }
}

impl BlockStore for MemoryDisk {
    fn npages(&self) -> usize {
        self.blocks.len() / PAGE_SIZE
    }

    fn read(&mut self, page: PageId, buf: &mut [u8]) -> StorageResult<()> {
        check_block(page, self.npages(), buf.len())?;
        buf.copy_from_slice(self.slot(page));
        self.record(DiskOp::Read(page));
        Ok(())
    }

    fn write(&mut self, page: PageId, data: &[u8]) -> StorageResult<()> {
        check_block(page, self.npages(), data.len())?;
        let start = page.index() * PAGE_SIZE;
        self.blocks[start..start + PAGE_SIZE].copy_from_slice(data);
        self.record(DiskOp::Write(page));
        Ok(())
    }
}
