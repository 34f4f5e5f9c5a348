//! Headless 3D EKF-SLAM run over a [`Dataset`].
//!
//! Each step feeds the dataset's control input to the prediction, perturbs
//! the step's features with lidar noise, corrects the belief and records the
//! outcome in the history, the error tracker and the step log.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use csv::Writer;
use nalgebra::Vector3;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use slam3d_algo::slam::{ControlInput, EkfSlam, EkfSlamConfig};
use tracing::{debug, info};

use super::common::{gaussian_vector3, ErrorTracker, HistoryManager};
use super::{SimError, Simulate};
use crate::config::SimConfig;
use crate::data::Dataset;

/// Maximum number of log entries to keep
const MAX_LOG_ENTRIES: usize = 5000;

/// Log entry for a single simulation step
#[derive(Debug, Clone, Serialize)]
pub struct StepLog {
    pub step: usize,
    // Estimated pose
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub roll: f64,
    pub pitch: f64,
    pub yaw: f64,
    // GPS fix, empty when disabled
    pub gps_x: Option<f64>,
    pub gps_y: Option<f64>,
    pub gps_z: Option<f64>,
    /// Distance between the estimate and the GPS fix
    pub position_error: Option<f64>,
    /// Mean distance between estimated and reference landmarks
    pub landmark_error: f64,
    /// Largest |Σ - Σᵀ| after the step
    pub asymmetry: f64,
}

#[derive(Debug, Serialize)]
struct LandmarkRow {
    kind: &'static str,
    index: usize,
    x: f64,
    y: f64,
    z: f64,
}

/// EKF-SLAM run driven by a dataset
pub struct SlamRun {
    dataset: Dataset,
    config: SimConfig,
    slam_config: EkfSlamConfig,

    /// Filter owning the belief
    slam: EkfSlam,
    /// GPS fixes per step, if simulated
    gps: Option<Vec<Vector3<f64>>>,
    /// Lidar noise source
    rng: StdRng,

    history: HistoryManager<Vector3<f64>>,
    errors: ErrorTracker,

    /// Step counter, also the index of the next dataset entry
    step_count: usize,
    logs: Vec<StepLog>,
}

impl SlamRun {
    pub fn new(dataset: Dataset, config: SimConfig, slam_config: EkfSlamConfig) -> Self {
        let mut rng = StdRng::seed_from_u64(config.seed.wrapping_add(1));
        let gps = config
            .gps_enabled
            .then(|| dataset.simulate_gps(config.gps_noise_std, &mut rng));
        let slam = EkfSlam::new(dataset.n_landmarks(), slam_config.clone());

        Self {
            history: HistoryManager::new(config.history_len),
            errors: ErrorTracker::new(config.history_len),
            dataset,
            config,
            slam_config,
            slam,
            gps,
            rng,
            step_count: 0,
            logs: Vec::new(),
        }
    }

    pub fn slam(&self) -> &EkfSlam {
        &self.slam
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn history(&self) -> &HistoryManager<Vector3<f64>> {
        &self.history
    }

    pub fn errors(&self) -> &ErrorTracker {
        &self.errors
    }

    pub fn logs(&self) -> &[StepLog] {
        &self.logs
    }

    pub fn step_count(&self) -> usize {
        self.step_count
    }

    /// Write the step log and the final landmark estimates to `dir`.
    ///
    /// Returns the paths of the step log and the landmark file.
    pub fn save_logs(&self, dir: impl AsRef<Path>) -> Result<(PathBuf, PathBuf)> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;

        let log_path = dir.join("slam_log.csv");
        let mut wtr = Writer::from_path(&log_path)
            .with_context(|| format!("Failed to create {}", log_path.display()))?;
        for log in &self.logs {
            wtr.serialize(log)?;
        }
        wtr.flush()?;

        let lm_path = dir.join("slam_landmarks.csv");
        let mut wtr = Writer::from_path(&lm_path)
            .with_context(|| format!("Failed to create {}", lm_path.display()))?;

        let estimated = self.slam.belief().landmarks();
        let groups = [("true", self.dataset.landmarks()), ("estimated", &estimated[..])];
        for (kind, landmarks) in groups {
            for (index, lm) in landmarks.iter().enumerate() {
                wtr.serialize(LandmarkRow {
                    kind,
                    index,
                    x: lm.x,
                    y: lm.y,
                    z: lm.z,
                })?;
            }
        }
        wtr.flush()?;

        info!(log = %log_path.display(), landmarks = %lm_path.display(), "saved run logs");
        Ok((log_path, lm_path))
    }

    fn record(&mut self, t: usize) {
        let belief = self.slam.belief();
        let position = belief.position();
        let orientation = belief.orientation();
        let landmarks = belief.landmarks();
        let gps = self.gps.as_ref().and_then(|fixes| fixes.get(t)).copied();

        self.errors.track_estimates(
            &position,
            gps.as_ref(),
            &landmarks,
            self.dataset.reference_landmarks(),
        );

        let log_entry = StepLog {
            step: t,
            x: position.x,
            y: position.y,
            z: position.z,
            roll: orientation.x,
            pitch: orientation.y,
            yaw: orientation.z,
            gps_x: gps.map(|g| g.x),
            gps_y: gps.map(|g| g.y),
            gps_z: gps.map(|g| g.z),
            position_error: self.errors.current_position_error(),
            landmark_error: self.errors.current_landmark_error().unwrap_or_default(),
            asymmetry: belief.asymmetry(),
        };
        self.logs.push(log_entry);
        if self.logs.len() > MAX_LOG_ENTRIES {
            self.logs.remove(0);
        }

        self.history.push(position, gps, landmarks);
    }
}

impl Simulate for SlamRun {
    type Error = SimError;

    fn step(&mut self) -> Result<(), SimError> {
        let t = self.step_count;
        let (Some((v, omega)), Some(features)) =
            (self.dataset.control(t), self.dataset.features().get(t))
        else {
            return Err(SimError::Exhausted {
                step: t,
                len: self.dataset.len(),
            });
        };

        // 1. Prediction from the recorded motion
        let control = ControlInput::new(v, omega, self.dataset.dt());

        // 2. Simulated lidar measurements
        let lidar: Vec<Vector3<f64>> = features
            .iter()
            .map(|f| f + gaussian_vector3(&mut self.rng, self.config.lidar_noise_std))
            .collect();

        // 3. Landmark update
        self.slam.step(&control, &lidar)?;
        debug!(step = t, "completed step");

        // 4. Record
        self.record(t);
        self.step_count += 1;
        Ok(())
    }

    fn is_finished(&self) -> bool {
        self.step_count >= self.dataset.len()
    }

    fn reset_state(&mut self) {
        self.slam = EkfSlam::new(self.dataset.n_landmarks(), self.slam_config.clone());
        self.rng = StdRng::seed_from_u64(self.config.seed.wrapping_add(1));
        self.gps = self
            .config
            .gps_enabled
            .then(|| self.dataset.simulate_gps(self.config.gps_noise_std, &mut self.rng));
        self.history.clear();
        self.errors.clear();
        self.logs.clear();
        self.step_count = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::{Matrix3, Matrix6};
    use slam3d_algo::slam::SlamError;

    fn small_config() -> SimConfig {
        SimConfig {
            n_steps: 20,
            n_landmarks: 3,
            seed: 11,
            ..Default::default()
        }
    }

    fn small_run() -> SlamRun {
        let config = small_config();
        let dataset = Dataset::synthetic(&config, &mut StdRng::seed_from_u64(config.seed));
        SlamRun::new(dataset, config, EkfSlamConfig::default())
    }

    #[test]
    fn test_run_consumes_whole_dataset() {
        let mut run = small_run();
        let steps = run.run().unwrap();

        assert_eq!(steps, 20);
        assert!(run.is_finished());
        assert_eq!(run.slam().steps(), 20);
        assert_eq!(run.history().len(), 20);
        assert_eq!(run.logs().len(), 20);
        assert_eq!(run.history().get_gps().count(), 20);
        assert_eq!(run.history().latest_landmarks().map(|lm| lm.len()), Some(3));
    }

    #[test]
    fn test_step_after_finish_is_an_error() {
        let mut run = small_run();
        run.run().unwrap();
        let belief = run.slam().belief().clone();

        let err = run.step().unwrap_err();
        assert_eq!(err, SimError::Exhausted { step: 20, len: 20 });
        assert!(err.is_exhausted());
        assert_eq!(run.step_count(), 20);
        assert_eq!(run.slam().belief(), &belief);
        assert_eq!(run.run().unwrap(), 0);
    }

    #[test]
    fn test_first_landmark_error_uses_first_frame_features() {
        let mut run = small_run();
        run.step().unwrap();

        let estimated = run.slam().belief().landmarks();
        let expected =
            ErrorTracker::mean_landmark_error(&estimated, &run.dataset().features()[0]);
        assert_eq!(run.errors().current_landmark_error(), Some(expected));
    }

    #[test]
    fn test_landmarks_converge_toward_reference() {
        let mut run = small_run();
        run.run().unwrap();

        let first = run.errors().get_landmark_errors().next().copied().unwrap();
        let last = run.errors().current_landmark_error().unwrap();
        assert!(
            last < 0.5 * first,
            "landmark error only went from {} to {}",
            first,
            last
        );
    }

    #[test]
    fn test_reset_replays_identically() {
        let mut run = small_run();
        run.run().unwrap();
        let first_pass = run.slam().belief().clone();

        run.reset_state();
        assert_eq!(run.step_count(), 0);
        assert!(run.history().is_empty());

        run.run().unwrap();
        assert_eq!(run.slam().belief(), &first_pass);
    }

    #[test]
    fn test_gps_disabled_leaves_gaps() {
        let config = SimConfig {
            gps_enabled: false,
            ..small_config()
        };
        let dataset = Dataset::synthetic(&config, &mut StdRng::seed_from_u64(1));
        let mut run = SlamRun::new(dataset, config, EkfSlamConfig::default());
        run.run().unwrap();

        assert_eq!(run.history().get_gps().count(), 0);
        assert!(run.errors().position_rmse().is_none());
        assert!(run.logs().iter().all(|log| log.gps_x.is_none()));
    }

    #[test]
    fn test_singular_update_stops_run() {
        let config = SimConfig {
            lidar_noise_std: 0.0,
            ..small_config()
        };
        let dataset = Dataset::synthetic(&config, &mut StdRng::seed_from_u64(2));
        let slam_config = EkfSlamConfig::default()
            .with_process_noise(Matrix6::zeros())
            .with_measurement_noise(Matrix3::zeros())
            .with_initial_covariance_scale(0.0);
        let mut run = SlamRun::new(dataset, config, slam_config);

        let err = run.run().unwrap_err();
        assert!(matches!(
            err,
            SimError::Slam(SlamError::Numerical { landmark: 0, .. })
        ));
        assert_eq!(run.step_count(), 0);
        assert!(run.logs().is_empty());
    }

    #[test]
    fn test_save_logs_writes_csv() {
        let mut run = small_run();
        run.run().unwrap();

        let dir = std::env::temp_dir().join(format!("slam3d_run_{}", std::process::id()));
        let (log_path, lm_path) = run.save_logs(&dir).unwrap();

        let log = fs::read_to_string(&log_path).unwrap();
        let mut lines = log.lines();
        assert!(lines.next().unwrap().starts_with("step,x,y,z,roll,pitch,yaw,gps_x"));
        assert_eq!(lines.count(), 20);

        let landmarks = fs::read_to_string(&lm_path).unwrap();
        assert_eq!(landmarks.lines().filter(|l| l.starts_with("true,")).count(), 3);
        assert_eq!(landmarks.lines().filter(|l| l.starts_with("estimated,")).count(), 3);
        let _ = fs::remove_dir_all(&dir);
    }
}
