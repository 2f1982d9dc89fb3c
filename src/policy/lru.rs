use super::EvictionPolicy;
use crate::memory::{FrameId, FrameTable};
use std::collections::VecDeque;

/// Evicts the frame whose page was loaded or touched least recently.
///
/// Only accesses reported to the policy count; without hit tracking those
/// are loads and write upgrades.
#[derive(Debug)]
pub struct LruPolicy {
    /// Least recently used at front
    lru_list: VecDeque<FrameId>,
}

impl LruPolicy {
    pub fn new(nframes: usize) -> Self {
        Self {
            lru_list: VecDeque::with_capacity(nframes),
        }
    }

    fn move_to_back(&mut self, frame: FrameId) {
        if let Some(idx) = self.lru_list.iter().position(|&f| f == frame) {
            self.lru_list.remove(idx);
        }
        self.lru_list.push_back(frame);
    }
}

impl EvictionPolicy for LruPolicy {
    fn name(&self) -> &'static str {
        "lru"
    }

    fn on_load(&mut self, frame: FrameId) {
        self.move_to_back(frame);
    }

    fn on_touch(&mut self, frame: FrameId) {
        if self.lru_list.back() != Some(&frame) && self.lru_list.contains(&frame) {
            self.move_to_back(frame);
        }
    }

    fn on_evict(&mut self, _frames: &FrameTable) -> Option<FrameId> {
        self.lru_list.pop_front()
    }
}
