use super::{Access, Capability, FrameId, PageId, PAGE_SIZE};
use crate::error::{SimError, SimResult};
use std::fmt;

#[derive(Debug, Clone, Copy, Default)]
struct PageEntry {
    frame: Option<FrameId>,
    capability: Capability,
}

/// Outcome of translating a virtual address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Translation {
    /// The access is permitted; `offset` indexes physical memory.
    Hit { frame: FrameId, offset: usize },
    /// The access violates the page's capability.
    Fault { page: PageId },
}

/// The mapping authority: capability bits and frame for every virtual page,
/// plus the physical memory those frames live in.
pub struct PageTable {
    entries: Vec<PageEntry>,
    physmem: Vec<u8>,
}

impl PageTable {
    pub fn new(npages: usize, nframes: usize) -> Self {
        Self {
            entries: vec![PageEntry::default(); npages],
            physmem: vec![0u8; nframes * PAGE_SIZE],
        }
    }

    pub fn npages(&self) -> usize {
        self.entries.len()
    }

    /// Size of the virtual address space in bytes.
    pub fn virtual_len(&self) -> usize {
        self.entries.len() * PAGE_SIZE
    }

    pub fn get_capability(&self, page: PageId) -> Capability {
        self.entries[page.index()].capability
    }

    pub fn get_frame(&self, page: PageId) -> Option<FrameId> {
        self.entries[page.index()].frame
    }

    pub fn set_entry(&mut self, page: PageId, frame: FrameId, capability: Capability) {
        let entry = &mut self.entries[page.index()];
        entry.frame = Some(frame);
        entry.capability = capability;
    }

    /// Drops the mapping for `page`; it will fault on its next access.
    pub fn clear_entry(&mut self, page: PageId) {
        self.entries[page.index()] = PageEntry::default();
    }

    /// Number of pages whose capability is not `None`.
    pub fn resident_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| e.capability != Capability::None)
            .count()
    }

    /// Iterates over `(page, frame, capability)` for every page that has a frame.
    pub fn mapped_pages(&self) -> impl Iterator<Item = (PageId, FrameId, Capability)> + '_ {
        self.entries.iter().enumerate().filter_map(|(idx, e)| {
            e.frame
                .map(|frame| (PageId(idx as u32), frame, e.capability))
        })
    }

    pub fn translate(&self, addr: usize, access: Access) -> SimResult<Translation> {
        if addr >= self.virtual_len() {
            return Err(SimError::AddressOutOfRange {
                addr,
                len: self.virtual_len(),
            });
        }

        let page = PageId((addr / PAGE_SIZE) as u32);
        let entry = &self.entries[page.index()];
        match entry.frame {
            Some(frame) if entry.capability.permits(access) => Ok(Translation::Hit {
                frame,
                offset: frame as usize * PAGE_SIZE + addr % PAGE_SIZE,
            }),
            _ => Ok(Translation::Fault { page }),
        }
    }

    pub fn frame_bytes(&self, frame: FrameId) -> &[u8] {
        let start = frame as usize * PAGE_SIZE;
        &self.physmem[start..start + PAGE_SIZE]
    }

    pub fn frame_bytes_mut(&mut self, frame: FrameId) -> &mut [u8] {
        let start = frame as usize * PAGE_SIZE;
        &mut self.physmem[start..start + PAGE_SIZE]
    }

    pub(crate) fn physmem(&self) -> &[u8] {
        &self.physmem
    }

    pub(crate) fn physmem_mut(&mut self) -> &mut [u8] {
        &mut self.physmem
    }
}

impl fmt::Display for PageTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "page  frame  bits")?;
        for (page, frame, capability) in self.mapped_pages() {
            let bits = match capability {
                Capability::None => "---",
                Capability::Read => "r--",
                Capability::ReadWrite => "rw-",
            };
            writeln!(f, "{:>4}  {:>5}  {}", page.0, frame, bits)?;
        }
        Ok(())
    }
}

impl fmt::Debug for PageTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PageTable")
            .field("npages", &self.npages())
            .field("nframes", &(self.physmem.len() / PAGE_SIZE))
            .field("resident", &self.resident_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unmapped_pages_fault() {
        let table = PageTable::new(4, 2);
        assert_eq!(table.virtual_len(), 4 * PAGE_SIZE);

        let t = table.translate(PAGE_SIZE + 7, Access::Read).unwrap();
        assert_eq!(t, Translation::Fault { page: PageId(1) });
        assert_eq!(table.get_capability(PageId(1)), Capability::None);
        assert_eq!(table.get_frame(PageId(1)), None);
    }

    #[test]
    fn test_read_only_mapping() {
        let mut table = PageTable::new(4, 2);
        table.set_entry(PageId(3), 1, Capability::Read);

        let addr = 3 * PAGE_SIZE + 10;
        assert_eq!(
            table.translate(addr, Access::Read).unwrap(),
            Translation::Hit {
                frame: 1,
                offset: PAGE_SIZE + 10
            }
        );
        assert_eq!(
            table.translate(addr, Access::Write).unwrap(),
            Translation::Fault { page: PageId(3) }
        );
    }

    #[test]
    fn test_clear_entry() {
        let mut table = PageTable::new(2, 1);
        table.set_entry(PageId(0), 0, Capability::ReadWrite);
        assert_eq!(table.resident_count(), 1);

        table.clear_entry(PageId(0));
        assert_eq!(table.get_capability(PageId(0)), Capability::None);
        assert_eq!(table.get_frame(PageId(0)), None);
        assert_eq!(table.resident_count(), 0);
    }

    #[test]
    fn test_out_of_range() {
        let table = PageTable::new(2, 1);
        let err = table.translate(2 * PAGE_SIZE, Access::Read).unwrap_err();
        assert!(matches!(err, SimError::AddressOutOfRange { .. }));
    }

    #[test]
    fn test_frame_bytes_are_disjoint() {
        let mut table = PageTable::new(2, 2);
        table.frame_bytes_mut(0).fill(1);
        table.frame_bytes_mut(1).fill(2);

        assert!(table.frame_bytes(0).iter().all(|&b| b == 1));
        assert!(table.frame_bytes(1).iter().all(|&b| b == 2));
    }

    #[test]
    fn test_display_lists_mapped_pages() {
        let mut table = PageTable::new(3, 2);
        table.set_entry(PageId(2), 0, Capability::Read);
        table.set_entry(PageId(0), 1, Capability::ReadWrite);

        let dump = table.to_string();
        assert!(dump.contains("r--"));
        assert!(dump.contains("rw-"));
        assert_eq!(dump.lines().count(), 3);
    }
}
