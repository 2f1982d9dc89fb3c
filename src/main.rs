//! virtmem - demand paging simulator

use anyhow::{Context, Result};
use clap::Parser as ClapParser;
use std::path::PathBuf;
use virtmem::config::{SimConfig, DEFAULT_SEED};
use virtmem::disk::{BlockStore, FileDisk, MemoryDisk};
use virtmem::policy::PolicyKind;
use virtmem::workload::WorkloadKind;
use virtmem::Simulator;

/// virtmem - run a workload over simulated demand-paged memory
#[derive(ClapParser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Number of virtual pages
    npages: usize,

    /// Number of physical frames
    nframes: usize,

    /// Page replacement policy
    #[arg(value_enum)]
    policy: PolicyKind,

    /// Workload to run
    #[arg(value_enum)]
    program: WorkloadKind,

    /// Seed for the random replacement policy
    #[arg(short, long, default_value_t = DEFAULT_SEED)]
    seed: u64,

    /// Back virtual memory with this file instead of an in-memory store
    #[arg(long)]
    disk: Option<PathBuf>,

    /// Report every access to the policy, not only faults
    #[arg(long)]
    track_hits: bool,

    /// Cross-check the frame and page tables after every fault
    #[arg(long)]
    verify: bool,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = if args.debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    let config = SimConfig::new(args.npages, args.nframes, args.policy)
        .with_seed(args.seed)
        .with_track_hits(args.track_hits)
        .with_verify(args.verify);
    config
        .validate_for(args.program)
        .context("Invalid configuration")?;

    let disk: Box<dyn BlockStore> = match &args.disk {
        Some(path) => Box::new(
            FileDisk::create(path, args.npages)
                .with_context(|| format!("Couldn't create virtual disk: {}", path.display()))?,
        ),
        None => Box::new(MemoryDisk::new(args.npages)),
    };

    let mut sim = Simulator::new(config, disk).context("Couldn't create page table")?;
    let result = args
        .program
        .run(&mut sim)
        .with_context(|| format!("{} program aborted", args.program))?;

    let stats = sim.stats();
    println!("{} result is {}", args.program, result);
    println!("page faults: {}", stats.faults);
    println!("disk reads: {}", stats.disk_reads);
    println!("disk writes: {}", stats.disk_writes);
    log::info!("{}", stats);

    Ok(())
}
