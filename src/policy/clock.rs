use super::EvictionPolicy;
use crate::memory::{FrameId, FrameTable};

/// Second-chance clock, the "custom" policy.
///
/// Every frame carries a reference marker, set when its page is loaded or
/// touched. The hand sweeps frames in circular order: a set marker is
/// cleared and the frame passed over once; the first frame found with a
/// clear marker is the victim. Two sweeps always suffice.
#[derive(Debug)]
pub struct ClockPolicy {
    referenced: Vec<bool>,
    hand: usize,
}

impl ClockPolicy {
    pub fn new(nframes: usize) -> Self {
        Self {
            referenced: vec![false; nframes],
            hand: 0,
        }
    }

    pub fn is_referenced(&self, frame: FrameId) -> bool {
        self.referenced[frame as usize]
    }

    fn advance(&mut self) {
        self.hand = (self.hand + 1) % self.referenced.len();
    }
}

impl EvictionPolicy for ClockPolicy {
    fn name(&self) -> &'static str {
        "custom"
    }

    fn on_load(&mut self, frame: FrameId) {
        self.referenced[frame as usize] = true;
    }

    fn on_touch(&mut self, frame: FrameId) {
        self.referenced[frame as usize] = true;
    }

    fn on_evict(&mut self, frames: &FrameTable) -> Option<FrameId> {
        if frames.resident_count() == 0 || self.referenced.is_empty() {
            return None;
        }

        for _ in 0..2 * self.referenced.len() {
            let idx = self.hand;
            self.advance();

            let frame = idx as FrameId;
            if frames.is_free(frame) {
                continue;
            }
            if self.referenced[idx] {
                self.referenced[idx] = false;
                continue;
            }
            return Some(frame);
        }
        None
    }
}
