pub mod config;
pub mod disk;
pub mod error;
pub mod fault;
pub mod memory;
pub mod policy;
pub mod simulator;
pub mod workload;

pub use config::SimConfig;
pub use error::{SimError, SimResult};
pub use simulator::Simulator;
