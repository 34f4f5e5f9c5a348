//! Common utilities shared by simulation runs.
//!
//! - [`HistoryManager`]: Manages trajectory history with circular buffers
//! - [`ErrorTracker`]: Tracks position and landmark errors over time
//! - Noise generation utilities

pub mod error_tracking;
pub mod history;
pub mod noise;

pub use error_tracking::ErrorTracker;
pub use history::HistoryManager;
pub use noise::{gaussian_noise, gaussian_vector3, uniform_vector3};
