use super::EvictionPolicy;
use crate::memory::{FrameId, FrameTable};
use std::collections::VecDeque;

/// Evicts frames in the order their pages were loaded. Accesses after the
/// load do not matter.
#[derive(Debug)]
pub struct FifoPolicy {
    /// Oldest load at the front.
    queue: VecDeque<FrameId>,
}

impl FifoPolicy {
    pub fn new(nframes: usize) -> Self {
        Self {
            queue: VecDeque::with_capacity(nframes),
        }
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

impl EvictionPolicy for FifoPolicy {
    fn name(&self) -> &'static str {
        "fifo"
    }

    fn on_load(&mut self, frame: FrameId) {
        self.queue.push_back(frame);
    }

    fn on_evict(&mut self, _frames: &FrameTable) -> Option<FrameId> {
        self.queue.pop_front()
    }
}
