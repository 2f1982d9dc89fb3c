use super::EvictionPolicy;
use crate::memory::{FrameId, FrameTable};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Evicts a uniformly random resident frame.
#[derive(Debug)]
pub struct RandomPolicy {
    rng: StdRng,
}

impl RandomPolicy {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl EvictionPolicy for RandomPolicy {
    fn name(&self) -> &'static str {
        "rand"
    }

    fn on_load(&mut self, _frame: FrameId) {}

    fn on_evict(&mut self, frames: &FrameTable) -> Option<FrameId> {
        // Sample only among occupied frames so a single draw always lands.
        let resident = frames.resident_count();
        if resident == 0 {
            return None;
        }
        let pick = self.rng.gen_range(0..resident);
        frames.occupied_frames().nth(pick).map(|(frame, _)| frame)
    }
}
