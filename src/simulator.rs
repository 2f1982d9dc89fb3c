//! The simulator context: one address space, its frames, its policy and its
//! backing store, driven one access at a time.

use crate::config::SimConfig;
use crate::disk::BlockStore;
use crate::error::{ConfigError, InvariantViolation, SimResult};
use crate::fault::{FaultHandler, FaultStats};
use crate::memory::{Access, FrameTable, PageId, PageTable, Translation, PAGE_SIZE};
use crate::workload::Memory;

/// A load needs at most one fault to map the page and one to make it writable.
const MAX_FAULTS_PER_ACCESS: usize = 2;

pub struct Simulator<D: BlockStore = Box<dyn BlockStore>> {
    config: SimConfig,
    page_table: PageTable,
    handler: FaultHandler<D>,
}

impl<D: BlockStore> Simulator<D> {
    pub fn new(config: SimConfig, disk: D) -> SimResult<Self> {
        config.validate()?;
        if disk.npages() < config.page_count {
            return Err(ConfigError::StoreSizeMismatch {
                expected: config.page_count,
                actual: disk.npages(),
            }
            .into());
        }

        let policy = config.policy.build(config.frame_count, config.seed);
        log::info!(
            "Simulating {} pages over {} frames with the {} policy",
            config.page_count,
            config.frame_count,
            policy.name()
        );

        Ok(Self {
            page_table: PageTable::new(config.page_count, config.frame_count),
            handler: FaultHandler::new(config.frame_count, policy, disk),
            config,
        })
    }

    pub fn page_table(&self) -> &PageTable {
        &self.page_table
    }

    pub fn frames(&self) -> &FrameTable {
        self.handler.frames()
    }

    pub fn disk(&self) -> &D {
        self.handler.disk()
    }

    pub fn stats(&self) -> FaultStats {
        self.handler.stats()
    }

    pub fn verify(&self) -> Result<(), InvariantViolation> {
        self.handler.verify(&self.page_table)
    }

    pub fn into_disk(self) -> D {
        self.handler.into_disk()
    }

    pub fn read(&mut self, addr: usize) -> SimResult<u8> {
        let offset = self.resolve(addr, Access::Read)?;
        Ok(self.page_table.physmem()[offset])
    }

    pub fn write(&mut self, addr: usize, value: u8) -> SimResult<()> {
        let offset = self.resolve(addr, Access::Write)?;
        self.page_table.physmem_mut()[offset] = value;
        Ok(())
    }

    /// Translates `addr`, running the fault handler until the access is
    /// permitted. Returns the offset into physical memory.
    fn resolve(&mut self, addr: usize, access: Access) -> SimResult<usize> {
        for _ in 0..=MAX_FAULTS_PER_ACCESS {
            match self.page_table.translate(addr, access)? {
                Translation::Hit { frame, offset } => {
                    if self.config.track_hits {
                        self.handler.note_access(frame);
                    }
                    return Ok(offset);
                }
                Translation::Fault { page } => {
                    self.handler
                        .handle_fault(&mut self.page_table, page, access)?;
                    if self.config.verify {
                        self.handler.verify(&self.page_table)?;
                    }
                }
            }
        }

        Err(InvariantViolation::FaultNotResolved {
            page: PageId((addr / PAGE_SIZE) as u32),
        }
        .into())
    }
}

impl<D: BlockStore> Memory for Simulator<D> {
    fn len(&self) -> usize {
        self.page_table.virtual_len()
    }

    fn load(&mut self, addr: usize) -> SimResult<u8> {
        self.read(addr)
    }

    fn store(&mut self, addr: usize, value: u8) -> SimResult<()> {
        self.write(addr, value)
    }
}
