//! Motion/feature datasets: synthetic generation and CSV persistence.
//!
//! A dataset directory holds two files:
//! - `motion.csv`: `step,vx,vy,vz,wx,wy,wz`
//! - `features.csv`: `step,landmark,x,y,z`, exactly one row per landmark
//!   per step, landmarks in index order

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use csv::{ReaderBuilder, Writer};
use nalgebra::Vector3;
use rand::Rng;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::SimConfig;
use crate::simulator::common::{gaussian_vector3, uniform_vector3};

pub const MOTION_FILE: &str = "motion.csv";
pub const FEATURES_FILE: &str = "features.csv";

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct MotionRow {
    step: usize,
    vx: f64,
    vy: f64,
    vz: f64,
    wx: f64,
    wy: f64,
    wz: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct FeatureRow {
    step: usize,
    landmark: usize,
    x: f64,
    y: f64,
    z: f64,
}

/// Control inputs and landmark observations for every step of a run.
///
/// Built only through [`Dataset::new`], [`Dataset::synthetic`] or
/// [`Dataset::read_csv`], so every step has one control input and exactly
/// one feature per landmark.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    /// Linear velocity per step
    linear_velocity: Vec<Vector3<f64>>,
    /// Angular velocity per step
    angular_velocity: Vec<Vector3<f64>>,
    /// Observed landmark positions per step, `M` per step
    features: Vec<Vec<Vector3<f64>>>,
    /// Landmark positions the features were drawn around
    landmarks: Vec<Vector3<f64>>,
    /// Timestep (s)
    dt: f64,
}

impl Dataset {
    /// Assemble a dataset, rejecting inconsistent shapes.
    pub fn new(
        linear_velocity: Vec<Vector3<f64>>,
        angular_velocity: Vec<Vector3<f64>>,
        features: Vec<Vec<Vector3<f64>>>,
        landmarks: Vec<Vector3<f64>>,
        dt: f64,
    ) -> Result<Self> {
        if !(dt.is_finite() && dt > 0.0) {
            bail!("dt must be a positive finite number, got {}", dt);
        }
        let n = features.len();
        if linear_velocity.len() != n || angular_velocity.len() != n {
            bail!(
                "{} feature steps but {} linear and {} angular velocities",
                n,
                linear_velocity.len(),
                angular_velocity.len()
            );
        }
        if let Some((step, points)) = features
            .iter()
            .enumerate()
            .find(|(_, points)| points.len() != landmarks.len())
        {
            bail!(
                "step {} has {} features, expected {}",
                step,
                points.len(),
                landmarks.len()
            );
        }
        Ok(Self {
            linear_velocity,
            angular_velocity,
            features,
            landmarks,
            dt,
        })
    }

    /// Generate a random dataset.
    ///
    /// Velocities and landmarks are drawn uniformly, each step's features
    /// are the true landmarks plus Gaussian noise.
    pub fn synthetic<R: Rng + ?Sized>(config: &SimConfig, rng: &mut R) -> Self {
        let n = config.n_steps;
        let linear_velocity = (0..n)
            .map(|_| uniform_vector3(&mut *rng, 0.0, config.max_linear_velocity))
            .collect();
        let angular_velocity = (0..n)
            .map(|_| uniform_vector3(&mut *rng, 0.0, config.max_angular_velocity))
            .collect();
        let landmarks: Vec<_> = (0..config.n_landmarks)
            .map(|_| uniform_vector3(&mut *rng, 0.0, config.landmark_extent))
            .collect();
        let features = (0..n)
            .map(|_| {
                landmarks
                    .iter()
                    .map(|lm| lm + gaussian_vector3(&mut *rng, config.feature_noise_std))
                    .collect::<Vec<_>>()
            })
            .collect();

        debug!(
            n_steps = n,
            n_landmarks = config.n_landmarks,
            "generated synthetic dataset"
        );

        Self {
            linear_velocity,
            angular_velocity,
            features,
            landmarks,
            dt: config.dt,
        }
    }

    /// Number of steps
    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Number of landmarks observed at every step
    pub fn n_landmarks(&self) -> usize {
        self.landmarks.len()
    }

    pub fn dt(&self) -> f64 {
        self.dt
    }

    pub fn linear_velocity(&self) -> &[Vector3<f64>] {
        &self.linear_velocity
    }

    pub fn angular_velocity(&self) -> &[Vector3<f64>] {
        &self.angular_velocity
    }

    pub fn features(&self) -> &[Vec<Vector3<f64>>] {
        &self.features
    }

    /// Landmarks the features were generated around. For a loaded dataset
    /// these are the first step's features.
    pub fn landmarks(&self) -> &[Vector3<f64>] {
        &self.landmarks
    }

    /// Map that landmark errors are measured against: the first step's
    /// features.
    pub fn reference_landmarks(&self) -> &[Vector3<f64>] {
        self.features.first().map(Vec::as_slice).unwrap_or_default()
    }

    /// Linear and angular velocity of step `t`
    pub fn control(&self, t: usize) -> Option<(Vector3<f64>, Vector3<f64>)> {
        Some((*self.linear_velocity.get(t)?, *self.angular_velocity.get(t)?))
    }

    /// Simulated GPS: integrated linear velocity plus Gaussian noise.
    pub fn simulate_gps<R: Rng + ?Sized>(&self, std_dev: f64, rng: &mut R) -> Vec<Vector3<f64>> {
        let mut position = Vector3::zeros();
        self.linear_velocity
            .iter()
            .map(|v| {
                position += v * self.dt;
                position + gaussian_vector3(&mut *rng, std_dev)
            })
            .collect()
    }

    /// Write `motion.csv` and `features.csv` into `dir`, creating it if needed.
    pub fn write_csv(&self, dir: impl AsRef<Path>) -> Result<()> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;

        let motion_path = dir.join(MOTION_FILE);
        let mut wtr = Writer::from_path(&motion_path)
            .with_context(|| format!("Failed to create {}", motion_path.display()))?;
        for (step, (v, w)) in self
            .linear_velocity
            .iter()
            .zip(&self.angular_velocity)
            .enumerate()
        {
            wtr.serialize(MotionRow {
                step,
                vx: v.x,
                vy: v.y,
                vz: v.z,
                wx: w.x,
                wy: w.y,
                wz: w.z,
            })?;
        }
        wtr.flush()?;

        let features_path = dir.join(FEATURES_FILE);
        let mut wtr = Writer::from_path(&features_path)
            .with_context(|| format!("Failed to create {}", features_path.display()))?;
        for (step, points) in self.features.iter().enumerate() {
            for (landmark, p) in points.iter().enumerate() {
                wtr.serialize(FeatureRow {
                    step,
                    landmark,
                    x: p.x,
                    y: p.y,
                    z: p.z,
                })?;
            }
        }
        wtr.flush()?;

        info!(dir = %dir.display(), steps = self.len(), "dataset written");
        Ok(())
    }

    /// Read a dataset directory written by [`Dataset::write_csv`].
    ///
    /// The landmark count is taken from step 0 and must be the same for
    /// every step. The first step's features serve as reference landmarks.
    pub fn read_csv(dir: impl AsRef<Path>, dt: f64) -> Result<Self> {
        let dir = dir.as_ref();
        let motion: Vec<MotionRow> = read_rows(dir.join(MOTION_FILE))?;
        let feature_rows: Vec<FeatureRow> = read_rows(dir.join(FEATURES_FILE))?;

        let mut linear_velocity = Vec::with_capacity(motion.len());
        let mut angular_velocity = Vec::with_capacity(motion.len());
        for (expected, row) in motion.iter().enumerate() {
            if row.step != expected {
                bail!("{}: expected step {}, found {}", MOTION_FILE, expected, row.step);
            }
            linear_velocity.push(Vector3::new(row.vx, row.vy, row.vz));
            angular_velocity.push(Vector3::new(row.wx, row.wy, row.wz));
        }

        let mut features: Vec<Vec<Vector3<f64>>> = vec![Vec::new(); motion.len()];
        for row in &feature_rows {
            let Some(points) = features.get_mut(row.step) else {
                bail!(
                    "{}: step {} has no motion entry ({} steps)",
                    FEATURES_FILE,
                    row.step,
                    motion.len()
                );
            };
            if row.landmark != points.len() {
                bail!(
                    "{}: step {} lists landmark {} where {} was expected",
                    FEATURES_FILE,
                    row.step,
                    row.landmark,
                    points.len()
                );
            }
            points.push(Vector3::new(row.x, row.y, row.z));
        }

        let landmarks = features.first().cloned().unwrap_or_default();
        let dataset = Self::new(linear_velocity, angular_velocity, features, landmarks, dt)
            .with_context(|| format!("{}: inconsistent dataset", dir.display()))?;

        info!(
            dir = %dir.display(),
            steps = dataset.len(),
            n_landmarks = dataset.n_landmarks(),
            "dataset loaded"
        );
        Ok(dataset)
    }

    /// True if `dir` already contains a dataset.
    pub fn exists_in(dir: impl AsRef<Path>) -> bool {
        let dir = dir.as_ref();
        dir.join(MOTION_FILE).is_file() && dir.join(FEATURES_FILE).is_file()
    }
}

fn read_rows<T: DeserializeOwned>(csv_path: PathBuf) -> Result<Vec<T>> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .comment(Some(b'#'))
        .from_path(&csv_path)
        .with_context(|| format!("Failed to open {}", csv_path.display()))?;

    let mut rows = Vec::new();
    for (line, rec) in rdr.deserialize().enumerate() {
        let row: T =
            rec.with_context(|| format!("{}: bad record {}", csv_path.display(), line + 1))?;
        rows.push(row);
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir()
            .join(format!("slam3d_dataset_{}_{}", name, std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn test_synthetic_shapes_and_ranges() {
        let config = SimConfig::default();
        let mut rng = StdRng::seed_from_u64(1);
        let data = Dataset::synthetic(&config, &mut rng);

        assert_eq!(data.len(), config.n_steps);
        assert_eq!(data.n_landmarks(), config.n_landmarks);
        assert_eq!(data.linear_velocity().len(), config.n_steps);
        assert!(data.features().iter().all(|f| f.len() == config.n_landmarks));
        assert!(data
            .linear_velocity()
            .iter()
            .all(|v| v.iter().all(|&x| (0.0..0.1).contains(&x))));
        assert!(data
            .landmarks()
            .iter()
            .all(|lm| lm.iter().all(|&x| (0.0..5.0).contains(&x))));
    }

    #[test]
    fn test_synthetic_is_reproducible() {
        let config = SimConfig::default();
        let a = Dataset::synthetic(&config, &mut StdRng::seed_from_u64(9));
        let b = Dataset::synthetic(&config, &mut StdRng::seed_from_u64(9));
        assert_eq!(a, b);
    }

    #[test]
    fn test_noiseless_gps_integrates_velocity() {
        let data = Dataset::new(
            vec![Vector3::new(1.0, 0.0, 0.0); 3],
            vec![Vector3::zeros(); 3],
            vec![Vec::new(); 3],
            Vec::new(),
            0.5,
        )
        .unwrap();

        let gps = data.simulate_gps(0.0, &mut StdRng::seed_from_u64(3));
        assert_eq!(gps.len(), 3);
        assert_relative_eq!(gps[2], Vector3::new(1.5, 0.0, 0.0));
    }

    #[test]
    fn test_csv_round_trip() {
        let config = SimConfig {
            n_steps: 4,
            n_landmarks: 2,
            ..Default::default()
        };
        let data = Dataset::synthetic(&config, &mut StdRng::seed_from_u64(5));
        let dir = scratch_dir("round_trip");

        assert!(!Dataset::exists_in(&dir));
        data.write_csv(&dir).unwrap();
        assert!(Dataset::exists_in(&dir));

        let loaded = Dataset::read_csv(&dir, config.dt).unwrap();
        assert_eq!(loaded.len(), 4);
        assert_eq!(loaded.n_landmarks(), 2);
        assert_eq!(loaded.landmarks(), loaded.reference_landmarks());
        assert_eq!(loaded.reference_landmarks(), data.reference_landmarks());
        for (a, b) in loaded.features().iter().flatten().zip(data.features().iter().flatten()) {
            assert_relative_eq!(a, b, epsilon = 1e-12);
        }
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_read_rejects_ragged_features() {
        let dir = scratch_dir("ragged");
        fs::create_dir_all(&dir).unwrap();
        fs::write(
            dir.join(MOTION_FILE),
            "step,vx,vy,vz,wx,wy,wz\n0,0,0,0,0,0,0\n1,0,0,0,0,0,0\n",
        )
        .unwrap();
        fs::write(
            dir.join(FEATURES_FILE),
            "step,landmark,x,y,z\n0,0,1,1,1\n0,1,2,2,2\n1,0,1,1,1\n",
        )
        .unwrap();

        let err = Dataset::read_csv(&dir, 0.05).unwrap_err();
        assert!(format!("{:#}", err).contains("step 1 has 1 features"));
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_read_rejects_out_of_order_landmarks() {
        let dir = scratch_dir("order");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(MOTION_FILE), "step,vx,vy,vz,wx,wy,wz\n0,0,0,0,0,0,0\n").unwrap();
        fs::write(
            dir.join(FEATURES_FILE),
            "step,landmark,x,y,z\n0,1,1,1,1\n0,0,2,2,2\n",
        )
        .unwrap();

        let err = Dataset::read_csv(&dir, 0.05).unwrap_err();
        assert!(err.to_string().contains("landmark 1"));
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_new_rejects_mismatched_lengths() {
        let lm = vec![Vector3::zeros(); 2];
        let err = Dataset::new(
            vec![Vector3::zeros(); 1],
            vec![Vector3::zeros(); 2],
            vec![lm.clone(); 2],
            lm.clone(),
            0.05,
        )
        .unwrap_err();
        assert!(err.to_string().contains("1 linear and 2 angular"));

        let err = Dataset::new(
            vec![Vector3::zeros(); 2],
            vec![Vector3::zeros(); 2],
            vec![lm.clone(), vec![Vector3::zeros()]],
            lm.clone(),
            0.05,
        )
        .unwrap_err();
        assert!(err.to_string().contains("step 1 has 1 features"));

        assert!(Dataset::new(Vec::new(), Vec::new(), Vec::new(), lm, 0.0).is_err());
    }

    #[test]
    fn test_reference_landmarks_are_first_features() {
        let config = SimConfig {
            n_steps: 3,
            n_landmarks: 2,
            ..Default::default()
        };
        let data = Dataset::synthetic(&config, &mut StdRng::seed_from_u64(4));
        assert_eq!(data.reference_landmarks(), data.features()[0].as_slice());
        assert_ne!(data.reference_landmarks(), data.landmarks());
        assert_eq!(data.control(2).map(|(v, _)| v), Some(data.linear_velocity()[2]));
        assert!(data.control(3).is_none());
    }
}
