//! Simulation parameters.

use anyhow::{bail, Result};

use crate::simulator::common::history::DEFAULT_HISTORY_LEN;

/// Parameters of a simulated run, constant once the run starts
#[derive(Debug, Clone, PartialEq)]
pub struct SimConfig {
    /// Number of timesteps
    pub n_steps: usize,
    /// Number of landmarks
    pub n_landmarks: usize,
    /// Timestep (s)
    pub dt: f64,
    /// Linear velocity components are drawn from `[0, max_linear_velocity)`
    pub max_linear_velocity: f64,
    /// Angular velocity components are drawn from `[0, max_angular_velocity)`
    pub max_angular_velocity: f64,
    /// Landmark coordinates are drawn from `[0, landmark_extent)`
    pub landmark_extent: f64,
    /// Std dev of the per-step feature noise baked into the dataset
    pub feature_noise_std: f64,
    /// Std dev of the noise added on top of the features by the lidar
    pub lidar_noise_std: f64,
    /// Simulate GPS fixes for error tracking
    pub gps_enabled: bool,
    /// Std dev of the GPS noise
    pub gps_noise_std: f64,
    /// Maximum number of retained history entries
    pub history_len: usize,
    /// Seed for every random draw of the run
    pub seed: u64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            n_steps: 50,
            n_landmarks: 5,
            dt: 0.05,
            max_linear_velocity: 0.1,
            max_angular_velocity: 0.01,
            landmark_extent: 5.0,
            feature_noise_std: 0.05,
            lidar_noise_std: 0.05,
            gps_enabled: true,
            gps_noise_std: 0.02,
            history_len: DEFAULT_HISTORY_LEN,
            seed: 0,
        }
    }
}

impl SimConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.dt.is_finite() && self.dt > 0.0) {
            bail!("dt must be a positive finite number, got {}", self.dt);
        }
        if self.history_len == 0 {
            bail!("history_len must be at least 1");
        }
        let non_negative = [
            ("max_linear_velocity", self.max_linear_velocity),
            ("max_angular_velocity", self.max_angular_velocity),
            ("landmark_extent", self.landmark_extent),
            ("feature_noise_std", self.feature_noise_std),
            ("lidar_noise_std", self.lidar_noise_std),
            ("gps_noise_std", self.gps_noise_std),
        ];
        for (name, value) in non_negative {
            if !(value.is_finite() && value >= 0.0) {
                bail!("{} must be finite and non-negative, got {}", name, value);
            }
        }
        Ok(())
    }
}
