#![warn(clippy::all, rust_2018_idioms)]

pub mod config;
pub mod data;
pub mod simulator;

pub use config::SimConfig;

pub mod prelude {
    pub use crate::config::SimConfig;
    pub use crate::data::Dataset;
    pub use crate::simulator::common::{ErrorTracker, HistoryManager};
    pub use crate::simulator::{SimError, Simulate, SlamRun, StepLog};
}
