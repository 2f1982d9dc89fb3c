//! Construction-time configuration for a simulation run.

use crate::error::ConfigError;
use crate::policy::PolicyKind;
use crate::workload::WorkloadKind;

/// Seed used when none is given, for both the random policy and workloads.
pub const DEFAULT_SEED: u64 = 38290;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimConfig {
    pub page_count: usize,
    pub frame_count: usize,
    pub policy: PolicyKind,
    /// Seed for the random policy.
    pub seed: u64,
    /// Report every permitted access to the policy, not just faults.
    pub track_hits: bool,
    /// Check the frame and page tables against each other after every fault.
    pub verify: bool,
}

impl SimConfig {
    pub fn new(page_count: usize, frame_count: usize, policy: PolicyKind) -> Self {
        Self {
            page_count,
            frame_count,
            policy,
            seed: DEFAULT_SEED,
            track_hits: false,
            verify: false,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_track_hits(mut self, track_hits: bool) -> Self {
        self.track_hits = track_hits;
        self
    }

    pub fn with_verify(mut self, verify: bool) -> Self {
        self.verify = verify;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.page_count == 0 {
            return Err(ConfigError::NoPages);
        }
        if self.frame_count == 0 {
            return Err(ConfigError::NoFrames);
        }
        Ok(())
    }

    /// Validates the configuration and checks that `workload` can run in it.
    pub fn validate_for(&self, workload: WorkloadKind) -> Result<(), ConfigError> {
        self.validate()?;
        let required = workload.min_frames();
        if self.frame_count < required {
            return Err(ConfigError::TooFewFrames {
                workload: workload.as_str(),
                required,
                actual: self.frame_count,
            });
        }
        Ok(())
    }
}
