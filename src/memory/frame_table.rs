use super::{FrameId, PageId};
use crate::error::InvariantViolation;

#[derive(Debug, Clone, Default)]
struct Frame {
    occupant: Option<PageId>,
    is_dirty: bool,
}

impl Frame {
    fn reset(&mut self) {
        self.occupant = None;
        self.is_dirty = false;
    }
}

/// Occupancy of the physical frame pool. This is the single source of truth
/// for which page lives where; the page table mirrors it.
#[derive(Debug)]
pub struct FrameTable {
    frames: Vec<Frame>,
    free_count: usize,
    /// Where the next free-frame scan starts.
    cursor: usize,
}

impl FrameTable {
    pub fn new(nframes: usize) -> Self {
        Self {
            frames: vec![Frame::default(); nframes],
            free_count: nframes,
            cursor: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Returns an unoccupied frame, or `None` when every frame holds a page.
    ///
    /// The frame stays free until `mark_occupied` is called on it. Returns
    /// immediately when the pool is full, so the steady state of a thrashing
    /// workload costs nothing here.
    pub fn allocate_free_frame(&mut self) -> Option<FrameId> {
        if self.free_count == 0 {
            return None;
        }

        let n = self.frames.len();
        for step in 0..n {
            let idx = (self.cursor + step) % n;
            if self.frames[idx].occupant.is_none() {
                self.cursor = (idx + 1) % n;
                return Some(idx as FrameId);
            }
        }
        None
    }

    /// Records that `page` now occupies `frame`, clean.
    pub fn mark_occupied(&mut self, frame: FrameId, page: PageId) -> Result<(), InvariantViolation> {
        let slot = &mut self.frames[frame as usize];
        if let Some(current) = slot.occupant {
            return Err(InvariantViolation::DoubleMapped {
                frame,
                first: current,
                second: page,
            });
        }
        slot.occupant = Some(page);
        slot.is_dirty = false;
        self.free_count -= 1;
        Ok(())
    }

    pub fn mark_dirty(&mut self, frame: FrameId) {
        self.frames[frame as usize].is_dirty = true;
    }

    pub fn clear_dirty(&mut self, frame: FrameId) {
        self.frames[frame as usize].is_dirty = false;
    }

    /// Vacates `frame`, returning the page that occupied it.
    pub fn clear(&mut self, frame: FrameId) -> Option<PageId> {
        let slot = &mut self.frames[frame as usize];
        let previous = slot.occupant;
        slot.reset();
        if previous.is_some() {
            self.free_count += 1;
        }
        previous
    }

    pub fn occupant_of(&self, frame: FrameId) -> Option<PageId> {
        self.frames.get(frame as usize).and_then(|f| f.occupant)
    }

    pub fn is_dirty(&self, frame: FrameId) -> bool {
        self.frames
            .get(frame as usize)
            .map(|f| f.is_dirty)
            .unwrap_or(false)
    }

    pub fn is_free(&self, frame: FrameId) -> bool {
        self.occupant_of(frame).is_none()
    }

    pub fn resident_count(&self) -> usize {
        self.frames.len() - self.free_count
    }

    /// Iterates over `(frame, page)` for every occupied frame, in frame order.
    pub fn occupied_frames(&self) -> impl Iterator<Item = (FrameId, PageId)> + '_ {
        self.frames
            .iter()
            .enumerate()
            .filter_map(|(idx, f)| f.occupant.map(|page| (idx as FrameId, page)))
    }
}
