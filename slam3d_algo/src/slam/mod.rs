pub mod belief;
pub mod config;
pub mod ekf_slam;
pub mod error;

pub use belief::*;
pub use config::*;
pub use ekf_slam::*;
pub use error::*;
