//! Page replacement policies.
//!
//! A policy only ranks frames; it never touches page contents or mappings.
//! The fault handler tells it when a frame is loaded or touched and asks it
//! for a victim once the frame pool is full.

pub mod clock;
pub mod fifo;
pub mod lru;
pub mod random;

pub use clock::ClockPolicy;
pub use fifo::FifoPolicy;
pub use lru::LruPolicy;
pub use random::RandomPolicy;

use crate::error::ConfigError;
use crate::memory::{FrameId, FrameTable};
use std::fmt::{self, Debug};
use std::str::FromStr;

pub trait EvictionPolicy: Send + Debug {
    /// Short name used in logs and error reports.
    fn name(&self) -> &'static str;

    /// A page was just loaded into `frame`.
    fn on_load(&mut self, frame: FrameId);

    /// The page in `frame` was accessed again.
    fn on_touch(&mut self, _frame: FrameId) {}

    /// Select a frame to evict and forget it. Returns `None` only when no
    /// frame in `frames` is occupied.
    fn on_evict(&mut self, frames: &FrameTable) -> Option<FrameId>;
}

/// Which replacement policy to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum PolicyKind {
    /// Uniformly random among resident frames
    #[value(name = "rand")]
    Random,
    /// Oldest load first
    Fifo,
    /// Second-chance clock
    Custom,
    /// Least recently loaded or touched
    Lru,
}

impl PolicyKind {
    pub fn as_str(self) -> &'static str {
        match self {
            PolicyKind::Random => "rand",
            PolicyKind::Fifo => "fifo",
            PolicyKind::Custom => "custom",
            PolicyKind::Lru => "lru",
        }
    }

    /// Builds the policy for a pool of `nframes` frames.
    pub fn build(self, nframes: usize, seed: u64) -> Box<dyn EvictionPolicy> {
        match self {
            PolicyKind::Random => Box::new(RandomPolicy::new(seed)),
            PolicyKind::Fifo => Box::new(FifoPolicy::new(nframes)),
            PolicyKind::Custom => Box::new(ClockPolicy::new(nframes)),
            PolicyKind::Lru => Box::new(LruPolicy::new(nframes)),
        }
    }
}

impl fmt::Display for PolicyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PolicyKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "rand" => Ok(PolicyKind::Random),
            "fifo" => Ok(PolicyKind::Fifo),
            "custom" => Ok(PolicyKind::Custom),
            "lru" => Ok(PolicyKind::Lru),
            other => Err(ConfigError::UnknownPolicy(other.to_string())),
        }
    }
}
