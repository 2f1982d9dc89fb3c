//! Access-pattern generators.
//!
//! Each workload runs over a byte-addressed `Memory` and returns a checksum
//! of the final contents. The checksum depends only on the workload and the
//! memory size, never on how memory is paged, which makes any lost or stale
//! page visible as a different result.

use crate::config::DEFAULT_SEED;
use crate::error::{ConfigError, SimError, SimResult};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::fmt;
use std::str::FromStr;

/// Byte-addressed memory a workload can drive.
pub trait Memory {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn load(&mut self, addr: usize) -> SimResult<u8>;

    fn store(&mut self, addr: usize, value: u8) -> SimResult<()>;
}

/// Plain memory with no paging, used as the reference result.
impl Memory for Vec<u8> {
    fn len(&self) -> usize {
        Vec::len(self)
    }

    fn load(&mut self, addr: usize) -> SimResult<u8> {
        self.get(addr)
            .copied()
            .ok_or(SimError::AddressOutOfRange {
                addr,
                len: Vec::len(self),
            })
    }

    fn store(&mut self, addr: usize, value: u8) -> SimResult<()> {
        let len = Vec::len(self);
        let slot = self
            .get_mut(addr)
            .ok_or(SimError::AddressOutOfRange { addr, len })?;
        *slot = value;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum WorkloadKind {
    /// Sort every byte in place
    Sort,
    /// Fill sequentially, then sum ten times
    Scan,
    /// Scattered writes inside small windows
    Focus,
}

impl WorkloadKind {
    pub fn as_str(self) -> &'static str {
        match self {
            WorkloadKind::Sort => "sort",
            WorkloadKind::Scan => "scan",
            WorkloadKind::Focus => "focus",
        }
    }

    /// Frames needed for the workload to make progress. Sorting compares
    /// and swaps bytes on two different pages at once.
    pub fn min_frames(self) -> usize {
        match self {
            WorkloadKind::Sort => 2,
            WorkloadKind::Scan | WorkloadKind::Focus => 1,
        }
    }

    pub fn run<M: Memory + ?Sized>(self, mem: &mut M) -> SimResult<u64> {
        match self {
            WorkloadKind::Sort => sort(mem),
            WorkloadKind::Scan => scan(mem),
            WorkloadKind::Focus => focus(mem),
        }
    }
}

impl fmt::Display for WorkloadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WorkloadKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sort" => Ok(WorkloadKind::Sort),
            "scan" => Ok(WorkloadKind::Scan),
            "focus" => Ok(WorkloadKind::Focus),
            other => Err(ConfigError::UnknownWorkload(other.to_string())),
        }
    }
}

/// Number of read passes made by `scan`.
const SCAN_PASSES: usize = 10;
const FOCUS_ROUNDS: usize = 100;
const FOCUS_WRITES: usize = 100;
const FOCUS_WINDOW: usize = 25;

fn checksum<M: Memory + ?Sized>(mem: &mut M) -> SimResult<u64> {
    let mut total = 0u64;
    for addr in 0..mem.len() {
        total += u64::from(mem.load(addr)?);
    }
    Ok(total)
}

/// Writes `i % 256` to every byte, then reads everything back several times.
pub fn scan<M: Memory + ?Sized>(mem: &mut M) -> SimResult<u64> {
    for addr in 0..mem.len() {
        mem.store(addr, (addr % 256) as u8)?;
    }

    let mut total = 0u64;
    for _ in 0..SCAN_PASSES {
        total += checksum(mem)?;
    }
    Ok(total)
}

/// Fills memory with random bytes and sorts it in place.
pub fn sort<M: Memory + ?Sized>(mem: &mut M) -> SimResult<u64> {
    let mut rng = StdRng::seed_from_u64(DEFAULT_SEED);
    for addr in 0..mem.len() {
        mem.store(addr, rng.gen())?;
    }

    quicksort(mem)?;
    checksum(mem)
}

/// Zeroes memory, then makes bursts of random writes, each burst confined
/// to a small window at a random position.
pub fn focus<M: Memory + ?Sized>(mem: &mut M) -> SimResult<u64> {
    let len = mem.len();
    let mut rng = StdRng::seed_from_u64(DEFAULT_SEED);
    for addr in 0..len {
        mem.store(addr, 0)?;
    }

    if len > 0 {
        for _ in 0..FOCUS_ROUNDS {
            let start = rng.gen_range(0..len);
            for _ in 0..FOCUS_WRITES {
                let addr = (start + rng.gen_range(0..FOCUS_WINDOW)) % len;
                mem.store(addr, rng.gen())?;
            }
        }
    }

    checksum(mem)
}

fn swap<M: Memory + ?Sized>(mem: &mut M, a: usize, b: usize) -> SimResult<()> {
    if a != b {
        let va = mem.load(a)?;
        let vb = mem.load(b)?;
        mem.store(a, vb)?;
        mem.store(b, va)?;
    }
    Ok(())
}

/// Three-way quicksort over the whole of `mem`. Bytes have few distinct
/// values, so equal keys are grouped in one pass rather than re-partitioned.
fn quicksort<M: Memory + ?Sized>(mem: &mut M) -> SimResult<()> {
    let mut pending = vec![(0usize, mem.len())];

    while let Some((mut lo, mut hi)) = pending.pop() {
        while hi - lo > 1 {
            let pivot = mem.load(lo + (hi - lo) / 2)?;
            let (mut lt, mut i, mut gt) = (lo, lo, hi);

            // [lo, lt) < pivot, [lt, i) == pivot, [gt, hi) > pivot
            while i < gt {
                let v = mem.load(i)?;
                if v < pivot {
                    swap(mem, lt, i)?;
                    lt += 1;
                    i += 1;
                } else if v > pivot {
                    gt -= 1;
                    swap(mem, i, gt)?;
                } else {
                    i += 1;
                }
            }

            // Keep the smaller side in hand so `pending` stays shallow.
            if lt - lo < hi - gt {
                pending.push((gt, hi));
                hi = lt;
            } else {
                pending.push((lo, lt));
                lo = gt;
            }
        }
    }
    Ok(())
}
