//! Page fault handling.
//!
//! The handler is the only code that changes which page lives in which
//! frame. Each fault runs to completion, disk I/O included, before the
//! faulting access is retried:
//!
//! - **Unmapped page**: load it read-only, evicting a victim first if no
//!   frame is free.
//! - **Read-only page written**: mark the frame dirty and grant write. No I/O.
//! - **Anything else**: the tables are inconsistent and the run stops.
//!
//! On eviction a dirty victim is written back before the new page is read
//! into the same bytes, and the victim's mapping is dropped only once that
//! write has completed.

use crate::disk::BlockStore;
use crate::error::{InvariantViolation, SimError, SimResult};
use crate::memory::{Access, Capability, FrameId, FrameTable, PageId, PageTable, PAGE_SIZE};
use crate::policy::EvictionPolicy;
use std::fmt;

/// Counters accumulated over a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FaultStats {
    /// Every call into the handler.
    pub faults: u64,
    /// Faults that brought a page in from the block store.
    pub loads: u64,
    /// Faults that only granted write access.
    pub upgrades: u64,
    pub evictions: u64,
    pub disk_reads: u64,
    pub disk_writes: u64,
}

impl fmt::Display for FaultStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "page faults: {}, disk reads: {}, disk writes: {}, evictions: {}, upgrades: {}",
            self.faults, self.disk_reads, self.disk_writes, self.evictions, self.upgrades
        )
    }
}

pub struct FaultHandler<D: BlockStore> {
    frames: FrameTable,
    policy: Box<dyn EvictionPolicy>,
    disk: D,
    stats: FaultStats,
}

impl<D: BlockStore> FaultHandler<D> {
    pub fn new(nframes: usize, policy: Box<dyn EvictionPolicy>, disk: D) -> Self {
        Self {
            frames: FrameTable::new(nframes),
            policy,
            disk,
            stats: FaultStats::default(),
        }
    }

    pub fn frames(&self) -> &FrameTable {
        &self.frames
    }

    pub fn disk(&self) -> &D {
        &self.disk
    }

    pub fn into_disk(self) -> D {
        self.disk
    }

    pub fn stats(&self) -> FaultStats {
        self.stats
    }

    /// Resolves a fault raised by `access` to `page`.
    pub fn handle_fault(
        &mut self,
        pt: &mut PageTable,
        page: PageId,
        access: Access,
    ) -> SimResult<()> {
        if page.index() >= pt.npages() {
            return Err(SimError::AddressOutOfRange {
                addr: page.index() * PAGE_SIZE,
                len: pt.virtual_len(),
            });
        }

        self.stats.faults += 1;
        let observed = pt.get_capability(page);
        log::debug!(
            "Page fault on page {} ({:?} access, currently {:?})",
            page,
            access,
            observed
        );
        log::trace!("Before fault on page {}:\n{}", page, pt);

        match (observed, access) {
            (Capability::None, _) => self.load(pt, page)?,
            (Capability::Read, Access::Write) => self.upgrade(pt, page)?,
            (Capability::Read, Access::Read) | (Capability::ReadWrite, _) => {
                return Err(InvariantViolation::UnexpectedFault { page, observed }.into());
            }
        }

        log::trace!("After fault on page {}:\n{}", page, pt);
        Ok(())
    }

    /// Reports a permitted access so recency-based policies can see hits.
    pub fn note_access(&mut self, frame: FrameId) {
        self.policy.on_touch(frame);
    }

    fn load(&mut self, pt: &mut PageTable, page: PageId) -> SimResult<()> {
        if let Some(frame) = pt.get_frame(page) {
            return Err(InvariantViolation::DanglingMapping { page, frame }.into());
        }

        let frame = match self.frames.allocate_free_frame() {
            Some(frame) => frame,
            None => self.evict(pt)?,
        };

        self.disk.read(page, pt.frame_bytes_mut(frame))?;
        self.stats.disk_reads += 1;

        self.frames.mark_occupied(frame, page)?;
        pt.set_entry(page, frame, Capability::Read);
        self.policy.on_load(frame);
        self.stats.loads += 1;

        log::debug!("Loaded page {} into frame {}", page, frame);
        Ok(())
    }

    /// Vacates a victim frame and returns it, empty and clean.
    fn evict(&mut self, pt: &mut PageTable) -> SimResult<FrameId> {
        let policy = self.policy.name();
        let frame = self
            .policy
            .on_evict(&self.frames)
            .ok_or(InvariantViolation::NoVictim {
                policy,
                resident: self.frames.resident_count(),
            })?;

        let victim = self
            .frames
            .occupant_of(frame)
            .ok_or(InvariantViolation::VictimNotOccupied { policy, frame })?;
        if pt.get_frame(victim) != Some(frame) {
            return Err(InvariantViolation::MappingMismatch {
                page: victim,
                frame,
                occupant: Some(victim),
            }
            .into());
        }

        let dirty = self.frames.is_dirty(frame);
        if dirty {
            self.disk.write(victim, pt.frame_bytes(frame))?;
            self.stats.disk_writes += 1;
            self.frames.clear_dirty(frame);
        }

        pt.clear_entry(victim);
        self.frames.clear(frame);
        self.stats.evictions += 1;

        log::debug!(
            "Evicted page {} from frame {} ({}, policy {})",
            victim,
            frame,
            if dirty { "written back" } else { "clean" },
            policy
        );
        Ok(frame)
    }

    fn upgrade(&mut self, pt: &mut PageTable, page: PageId) -> SimResult<()> {
        let frame = pt.get_frame(page).ok_or(InvariantViolation::MissingFrame {
            page,
            observed: Capability::Read,
        })?;
        let occupant = self.frames.occupant_of(frame);
        if occupant != Some(page) {
            return Err(InvariantViolation::MappingMismatch {
                page,
                frame,
                occupant,
            }
            .into());
        }

        self.frames.mark_dirty(frame);
        pt.set_entry(page, frame, Capability::ReadWrite);
        // A write counts as a fresh reference.
        self.policy.on_touch(frame);
        self.stats.upgrades += 1;

        log::debug!("Granted write on page {} in frame {}", page, frame);
        Ok(())
    }

    /// Checks that the frame table and page table describe the same
    /// residency: no more resident pages than frames, every resident page
    /// backed by the frame that claims it, and no frame claimed twice.
    pub fn verify(&self, pt: &PageTable) -> Result<(), InvariantViolation> {
        let nframes = self.frames.len();
        let resident = pt.resident_count();
        if resident > nframes {
            return Err(InvariantViolation::ResidencyExceeded { resident, nframes });
        }

        let mut claimed: Vec<Option<PageId>> = vec![None; nframes];
        for (page, frame, capability) in pt.mapped_pages() {
            if capability == Capability::None {
                return Err(InvariantViolation::DanglingMapping { page, frame });
            }
            let slot = claimed
                .get_mut(frame as usize)
                .ok_or(InvariantViolation::MappingMismatch {
                    page,
                    frame,
                    occupant: None,
                })?;
            if let Some(first) = *slot {
                return Err(InvariantViolation::DoubleMapped {
                    frame,
                    first,
                    second: page,
                });
            }
            *slot = Some(page);

            let occupant = self.frames.occupant_of(frame);
            if occupant != Some(page) {
                return Err(InvariantViolation::MappingMismatch {
                    page,
                    frame,
                    occupant,
                });
            }
            if capability == Capability::Read && self.frames.is_dirty(frame) {
                return Err(InvariantViolation::DirtyReadOnly { page, frame });
            }
        }

        for (frame, page) in self.frames.occupied_frames() {
            if pt.get_frame(page) != Some(frame) {
                return Err(InvariantViolation::MappingMismatch {
                    page,
                    frame,
                    occupant: Some(page),
                });
            }
        }

        Ok(())
    }
}

impl<D: BlockStore> fmt::Debug for FaultHandler<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FaultHandler")
            .field("frames", &self.frames)
            .field("policy", &self.policy)
            .field("stats", &self.stats)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::disk::{DiskOp, MemoryDisk};
    use crate::policy::{FifoPolicy, PolicyKind};

    fn handler(
        npages: usize,
        nframes: usize,
        kind: PolicyKind,
    ) -> (PageTable, FaultHandler<MemoryDisk>) {
        let pt = PageTable::new(npages, nframes);
        let handler = FaultHandler::new(nframes, kind.build(nframes, 1), MemoryDisk::new(npages));
        (pt, handler)
    }

    #[test]
    fn test_load_into_free_frame() {
        let (mut pt, mut h) = handler(4, 2, PolicyKind::Fifo);

        h.handle_fault(&mut pt, PageId(3), Access::Read).unwrap();

        assert_eq!(pt.get_capability(PageId(3)), Capability::Read);
        assert_eq!(pt.get_frame(PageId(3)), Some(0));
        assert_eq!(h.frames().occupant_of(0), Some(PageId(3)));
        assert!(!h.frames().is_dirty(0));
        assert_eq!(h.stats().loads, 1);
        assert_eq!(h.stats().disk_reads, 1);
        h.verify(&pt).unwrap();
    }

    #[test]
    fn test_write_fault_on_unmapped_page_loads_read_only() {
        let (mut pt, mut h) = handler(2, 1, PolicyKind::Fifo);

        h.handle_fault(&mut pt, PageId(1), Access::Write).unwrap();
        assert_eq!(pt.get_capability(PageId(1)), Capability::Read);

        h.handle_fault(&mut pt, PageId(1), Access::Write).unwrap();
        assert_eq!(pt.get_capability(PageId(1)), Capability::ReadWrite);
        assert!(h.frames().is_dirty(0));
        assert_eq!(h.stats().upgrades, 1);
        assert_eq!(h.stats().disk_reads, 1);
    }

    #[test]
    fn test_fault_on_read_write_page_is_fatal() {
        let (mut pt, mut h) = handler(2, 2, PolicyKind::Fifo);
        h.handle_fault(&mut pt, PageId(0), Access::Read).unwrap();
        h.handle_fault(&mut pt, PageId(0), Access::Write).unwrap();

        let err = h
            .handle_fault(&mut pt, PageId(0), Access::Write)
            .unwrap_err();
        assert_eq!(
            err.invariant(),
            Some(&InvariantViolation::UnexpectedFault {
                page: PageId(0),
                observed: Capability::ReadWrite,
            })
        );
    }

    #[test]
    fn test_read_fault_on_read_only_page_is_fatal() {
        let (mut pt, mut h) = handler(2, 2, PolicyKind::Fifo);
        h.handle_fault(&mut pt, PageId(1), Access::Read).unwrap();

        let err = h.handle_fault(&mut pt, PageId(1), Access::Read).unwrap_err();
        assert!(matches!(
            err.invariant(),
            Some(InvariantViolation::UnexpectedFault { .. })
        ));
    }

    #[test]
    fn test_clean_eviction_writes_nothing() {
        let (mut pt, mut h) = handler(3, 1, PolicyKind::Fifo);

        h.handle_fault(&mut pt, PageId(0), Access::Read).unwrap();
        h.handle_fault(&mut pt, PageId(1), Access::Read).unwrap();

        assert_eq!(h.stats().evictions, 1);
        assert_eq!(h.stats().disk_writes, 0);
        assert_eq!(pt.get_capability(PageId(0)), Capability::None);
        assert_eq!(pt.get_frame(PageId(0)), None);
        assert_eq!(pt.get_frame(PageId(1)), Some(0));
        h.verify(&pt).unwrap();
    }

    #[test]
    fn test_dirty_eviction_flushes_before_read() {
        let npages = 2;
        let mut pt = PageTable::new(npages, 1);
        let mut h = FaultHandler::new(1, Box::new(FifoPolicy::new(1)), MemoryDisk::new(npages));

        h.handle_fault(&mut pt, PageId(0), Access::Read).unwrap();
        h.handle_fault(&mut pt, PageId(0), Access::Write).unwrap();
        pt.frame_bytes_mut(0).fill(0xab);

        h.handle_fault(&mut pt, PageId(1), Access::Read).unwrap();
        // Page 1 was never written, so the frame now reads as zeros.
        assert!(pt.frame_bytes(0).iter().all(|&b| b == 0));

        h.handle_fault(&mut pt, PageId(0), Access::Read).unwrap();
        assert!(pt.frame_bytes(0).iter().all(|&b| b == 0xab));
        assert!(!h.frames().is_dirty(0));

        let stats = h.stats();
        assert_eq!(stats.disk_writes, 1);
        assert_eq!(stats.disk_reads, 3);
        assert_eq!(stats.evictions, 2);
    }

    #[test]
    fn test_policy_returning_unoccupied_frame_is_fatal() {
        #[derive(Debug)]
        struct Broken;

        impl EvictionPolicy for Broken {
            fn name(&self) -> &'static str {
                "broken"
            }
            fn on_load(&mut self, _frame: FrameId) {}
            fn on_evict(&mut self, _frames: &FrameTable) -> Option<FrameId> {
                Some(7)
            }
        }

        let mut pt = PageTable::new(2, 1);
        let mut h = FaultHandler::new(1, Box::new(Broken), MemoryDisk::with_log(2));
        h.handle_fault(&mut pt, PageId(0), Access::Read).unwrap();

        let err = h.handle_fault(&mut pt, PageId(1), Access::Read).unwrap_err();
        assert_eq!(
            err.invariant(),
            Some(&InvariantViolation::VictimNotOccupied {
                policy: "broken",
                frame: 7,
            })
        );
        // Nothing was evicted or read for the failed fault.
        assert_eq!(pt.get_frame(PageId(0)), Some(0));
        assert_eq!(h.disk().ops(), &[DiskOp::Read(PageId(0))]);
    }

    #[test]
    fn test_stale_mapping_detected_on_eviction() {
        let mut pt = PageTable::new(3, 1);
        let mut h = FaultHandler::new(1, PolicyKind::Fifo.build(1, 0), MemoryDisk::new(3));
        h.handle_fault(&mut pt, PageId(0), Access::Read).unwrap();

        // The page table forgets page 0 while the frame table still holds it.
        pt.clear_entry(PageId(0));

        let err = h.handle_fault(&mut pt, PageId(1), Access::Read).unwrap_err();
        assert_eq!(
            err.invariant(),
            Some(&InvariantViolation::MappingMismatch {
                page: PageId(0),
                frame: 0,
                occupant: Some(PageId(0)),
            })
        );
    }

    #[test]
    fn test_no_victim_is_fatal() {
        #[derive(Debug)]
        struct Empty;

        impl EvictionPolicy for Empty {
            fn name(&self) -> &'static str {
                "empty"
            }
            fn on_load(&mut self, _frame: FrameId) {}
            fn on_evict(&mut self, _frames: &FrameTable) -> Option<FrameId> {
                None
            }
        }

        let mut pt = PageTable::new(2, 1);
        let mut h = FaultHandler::new(1, Box::new(Empty), MemoryDisk::new(2));
        h.handle_fault(&mut pt, PageId(0), Access::Read).unwrap();

        let err = h.handle_fault(&mut pt, PageId(1), Access::Read).unwrap_err();
        assert_eq!(
            err.invariant(),
            Some(&InvariantViolation::NoVictim {
                policy: "empty",
                resident: 1,
            })
        );
    }

    #[test]
    fn test_storage_error_propagates() {
        let mut pt = PageTable::new(4, 1);
        // Store is smaller than the address space.
        let mut h = FaultHandler::new(1, PolicyKind::Fifo.build(1, 0), MemoryDisk::new(2));

        let err = h.handle_fault(&mut pt, PageId(3), Access::Read).unwrap_err();
        assert!(matches!(err, SimError::Storage(_)));
    }

    #[test]
    fn test_verify_detects_mapping_mismatch() {
        let (mut pt, mut h) = handler(4, 2, PolicyKind::Custom);
        h.handle_fault(&mut pt, PageId(0), Access::Read).unwrap();
        h.verify(&pt).unwrap();

        // A second page pointing at the same frame.
        pt.set_entry(PageId(2), 0, Capability::Read);
        let err = h.verify(&pt).unwrap_err();
        assert_eq!(
            err,
            InvariantViolation::DoubleMapped {
                frame: 0,
                first: PageId(0),
                second: PageId(2),
            }
        );
    }

    #[test]
    fn test_fifo_eviction_order_follows_first_load() {
        let (mut pt, mut h) = handler(6, 3, PolicyKind::Fifo);
        for p in 0..6 {
            h.handle_fault(&mut pt, PageId(p), Access::Read).unwrap();
        }

        // Pages 0, 1, 2 were evicted in that order to make room for 3, 4, 5.
        for p in 0..3 {
            assert_eq!(pt.get_capability(PageId(p)), Capability::None);
        }
        assert_eq!(pt.get_frame(PageId(3)), Some(0));
        assert_eq!(pt.get_frame(PageId(4)), Some(1));
        assert_eq!(pt.get_frame(PageId(5)), Some(2));
        assert_eq!(h.stats().evictions, 3);
        assert_eq!(PAGE_SIZE, pt.frame_bytes(0).len());
    }

    #[test]
    fn test_disk_operation_order() {
        let npages = 3;
        let mut pt = PageTable::new(npages, 1);
        let mut disk = MemoryDisk::with_log(npages);
        disk.write(PageId(2), &vec![5u8; PAGE_SIZE]).unwrap();
        disk.clear_ops();

        let mut h = FaultHandler::new(1, PolicyKind::Lru.build(1, 0), disk);
        h.handle_fault(&mut pt, PageId(0), Access::Read).unwrap();
        h.handle_fault(&mut pt, PageId(0), Access::Write).unwrap();
        h.handle_fault(&mut pt, PageId(2), Access::Read).unwrap();

        assert!(pt.frame_bytes(0).iter().all(|&b| b == 5));
        assert_eq!(
            h.disk().ops(),
            &[
                DiskOp::Read(PageId(0)),
                DiskOp::Write(PageId(0)),
                DiskOp::Read(PageId(2)),
            ]
        );
        assert_eq!(h.stats().faults, 3);
    }

    #[test]
    fn test_page_outside_table_is_rejected() {
        let (mut pt, mut h) = handler(2, 1, PolicyKind::Fifo);

        let err = h.handle_fault(&mut pt, PageId(2), Access::Read).unwrap_err();
        assert!(matches!(
            err,
            SimError::AddressOutOfRange { addr, len } if addr == 2 * PAGE_SIZE && len == 2 * PAGE_SIZE
        ));
        assert_eq!(h.stats(), FaultStats::default());
    }

    #[test]
    fn test_write_upgrade_refreshes_lru() {
        let (mut pt, mut h) = handler(3, 2, PolicyKind::Lru);
        h.handle_fault(&mut pt, PageId(0), Access::Read).unwrap();
        h.handle_fault(&mut pt, PageId(1), Access::Read).unwrap();

        // Page 0 is the older load; its only later reference is a write.
        h.handle_fault(&mut pt, PageId(0), Access::Write).unwrap();
        h.handle_fault(&mut pt, PageId(2), Access::Read).unwrap();

        assert_eq!(pt.get_capability(PageId(0)), Capability::ReadWrite);
        assert_eq!(pt.get_capability(PageId(1)), Capability::None);
        assert_eq!(h.stats().disk_writes, 0);
    }

    #[test]
    fn test_write_upgrade_gives_clock_second_chance() {
        let (mut pt, mut h) = handler(5, 3, PolicyKind::Custom);
        for p in 0..3 {
            h.handle_fault(&mut pt, PageId(p), Access::Read).unwrap();
        }
        // Sweeps every marker clear and takes page 0; the hand rests on frame 1.
        h.handle_fault(&mut pt, PageId(3), Access::Read).unwrap();
        assert_eq!(pt.get_capability(PageId(0)), Capability::None);

        // Page 1 sits under the hand; the write is its only re-reference.
        h.handle_fault(&mut pt, PageId(1), Access::Write).unwrap();
        h.handle_fault(&mut pt, PageId(4), Access::Read).unwrap();

        assert_eq!(pt.get_capability(PageId(1)), Capability::ReadWrite);
        assert_eq!(pt.get_capability(PageId(2)), Capability::None);
        assert_eq!(pt.get_frame(PageId(4)), Some(2));
        h.verify(&pt).unwrap();
    }
}
