//! EKF-SLAM (Extended Kalman Filter Simultaneous Localization and Mapping) in 3D
//!
//! This module estimates the 6-DoF pose of a moving agent together with the
//! fixed positions of a known set of landmarks, using a single joint
//! Gaussian [`Belief`].
//!
//! ## Prediction
//! Euler integration of the control input. Linear velocity is assumed to be
//! expressed in the world frame already, orientation is integrated
//! additively as Euler angles, and only the pose block of `Σ` receives
//! process noise. Landmark blocks are never touched by prediction.
//!
//! ## Update
//! Identity observation model with fixed-index correspondence: measurement
//! `i` observes landmark `i`. Landmarks are corrected one after another in
//! index order, each correction consuming the state left by the previous
//! one. With independent per-landmark noise the processing order only
//! changes the result at rounding level.
//!
//! The covariance correction is the plain `Σ -= K Σ[block, :]` form
//! without Joseph stabilization, so symmetry and positive
//! semi-definiteness can erode over long runs (see
//! [`Belief::asymmetry`] and [`Belief::min_eigenvalue`]).

use nalgebra::{DMatrix, DVector, Matrix3, Matrix6, Vector3};
use tracing::{debug, trace, warn};

use super::belief::{Belief, LANDMARK_DIM, POSE_DIM};
use super::config::EkfSlamConfig;
use super::error::{Result, SlamError};

/// Control input for a single timestep
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlInput {
    /// Linear velocity [v_x, v_y, v_z] in the world frame
    pub linear_velocity: Vector3<f64>,
    /// Angular velocity [ω_roll, ω_pitch, ω_yaw]
    pub angular_velocity: Vector3<f64>,
    /// Timestep (s)
    pub dt: f64,
}

impl ControlInput {
    pub fn new(linear_velocity: Vector3<f64>, angular_velocity: Vector3<f64>, dt: f64) -> Self {
        Self {
            linear_velocity,
            angular_velocity,
            dt,
        }
    }

    /// Build a control input from untyped slices, as delivered by a dataset.
    ///
    /// Both vectors must have exactly three finite components and `dt` must
    /// be finite.
    pub fn from_slices(v: &[f64], omega: &[f64], dt: f64) -> Result<Self> {
        let linear_velocity = vector3_from_slice("v", v)?;
        let angular_velocity = vector3_from_slice("omega", omega)?;
        if !dt.is_finite() {
            return Err(SlamError::validation(
                "dt",
                "finite timestep",
                format!("{}", dt),
            ));
        }
        Ok(Self::new(linear_velocity, angular_velocity, dt))
    }
}

fn vector3_from_slice(argument: &'static str, values: &[f64]) -> Result<Vector3<f64>> {
    if values.len() != 3 {
        return Err(SlamError::validation(
            argument,
            "3-element vector",
            format!("shape ({},)", values.len()),
        ));
    }
    if let Some(bad) = values.iter().find(|x| !x.is_finite()) {
        return Err(SlamError::validation(
            argument,
            "finite components",
            format!("{}", bad),
        ));
    }
    Ok(Vector3::from_column_slice(values))
}

/// EKF-SLAM prediction step from raw velocity slices.
///
/// Returns a new belief; the input belief is not modified. Fails with a
/// validation error if `v` or `omega` is not 3-dimensional.
pub fn predict(
    belief: &Belief,
    v: &[f64],
    omega: &[f64],
    q: &Matrix6<f64>,
    dt: f64,
) -> Result<Belief> {
    let control = ControlInput::from_slices(v, omega, dt)?;
    Ok(predict_control(belief, &control, q))
}

/// EKF-SLAM prediction step: advance the pose using the control input
///
/// - position += v·dt
/// - orientation += ω·dt
/// - Σ[0:6, 0:6] += Q
pub fn predict_control(belief: &Belief, control: &ControlInput, q: &Matrix6<f64>) -> Belief {
    let mut mu = belief.mu().clone();
    let mut sigma = belief.sigma().clone();
    let dt = control.dt;

    {
        let mut position = mu.fixed_rows_mut::<3>(0);
        position += control.linear_velocity * dt;
    }
    {
        let mut orientation = mu.fixed_rows_mut::<3>(3);
        orientation += control.angular_velocity * dt;
    }
    {
        let mut pose_cov = sigma.fixed_view_mut::<POSE_DIM, POSE_DIM>(0, 0);
        pose_cov += q;
    }

    debug!(dt, x = mu[0], y = mu[1], z = mu[2], "predicted pose");

    let mut predicted = belief.clone();
    predicted.commit(mu, sigma);
    predicted
}

/// EKF-SLAM update step: correct the belief with one point per landmark
///
/// `measurements[i]` is taken to observe landmark `i`. Landmarks are
/// processed in index order. Corrections are staged on a working copy and
/// only written back once every landmark has been processed, so a failure
/// leaves `belief` untouched.
pub fn update(
    belief: &mut Belief,
    measurements: &[Vector3<f64>],
    r: &Matrix3<f64>,
) -> Result<()> {
    check_measurements(belief, measurements)?;
    let order: Vec<usize> = (0..belief.n_landmarks()).collect();
    apply_corrections(belief, measurements, &order, r)
}

/// Sequential update over an explicit landmark order.
///
/// `order` must be a permutation of `0..M`. It also decides which landmark
/// is reported when an innovation covariance is singular.
pub fn update_in_order(
    belief: &mut Belief,
    measurements: &[Vector3<f64>],
    order: &[usize],
    r: &Matrix3<f64>,
) -> Result<()> {
    check_measurements(belief, measurements)?;

    let m = belief.n_landmarks();
    let mut seen = vec![false; m];
    let is_permutation = order.len() == m
        && order.iter().all(|&i| {
            if i >= m || seen[i] {
                return false;
            }
            seen[i] = true;
            true
        });
    if !is_permutation {
        return Err(SlamError::validation(
            "order",
            format!("permutation of 0..{}", m),
            format!("{:?}", order),
        ));
    }

    apply_corrections(belief, measurements, order, r)
}

fn check_measurements(belief: &Belief, measurements: &[Vector3<f64>]) -> Result<()> {
    if measurements.len() != belief.n_landmarks() {
        return Err(SlamError::validation(
            "measurements",
            format!("{} points", belief.n_landmarks()),
            format!("{} points", measurements.len()),
        ));
    }
    if let Some(idx) = measurements.iter().position(|z| !z.iter().all(|x| x.is_finite())) {
        return Err(SlamError::validation(
            "measurements",
            "finite points",
            format!("{:?} at landmark {}", measurements[idx].as_slice(), idx),
        ));
    }
    Ok(())
}

fn apply_corrections(
    belief: &mut Belief,
    measurements: &[Vector3<f64>],
    order: &[usize],
    r: &Matrix3<f64>,
) -> Result<()> {
    let mut mu = belief.mu().clone();
    let mut sigma = belief.sigma().clone();

    for &idx in order {
        correct_landmark(&mut mu, &mut sigma, idx, &measurements[idx], r)?;
    }

    debug!(n_landmarks = order.len(), "corrected belief");
    belief.commit(mu, sigma);
    Ok(())
}

/// Correct the staged state with the observation of a single landmark
fn correct_landmark(
    mu: &mut DVector<f64>,
    sigma: &mut DMatrix<f64>,
    idx: usize,
    z: &Vector3<f64>,
    r: &Matrix3<f64>,
) -> Result<()> {
    let base = POSE_DIM + LANDMARK_DIM * idx;

    // Innovation: the expected measurement is the landmark estimate itself
    let expected = mu.fixed_rows::<LANDMARK_DIM>(base).into_owned();
    let y = z - expected;

    // Innovation covariance: S = Σ[b, b] + R
    let S = sigma
        .fixed_view::<LANDMARK_DIM, LANDMARK_DIM>(base, base)
        .into_owned()
        + r;

    let Some(S_inv) = S.try_inverse() else {
        warn!(landmark = idx, ?S, "singular innovation covariance");
        return Err(SlamError::Numerical {
            landmark: idx,
            matrix: S,
        });
    };

    // Kalman gain over the full column: K = Σ[:, b] S⁻¹
    let K = sigma.fixed_columns::<LANDMARK_DIM>(base) * S_inv;

    *mu += &K * y;

    let correction = &K * sigma.fixed_rows::<LANDMARK_DIM>(base);
    *sigma -= correction;

    trace!(landmark = idx, innovation = y.norm(), "landmark corrected");
    Ok(())
}

/// Filter instance owning exactly one belief for the life of a run
#[derive(Debug, Clone)]
pub struct EkfSlam {
    belief: Belief,
    config: EkfSlamConfig,
    steps: usize,
}

impl EkfSlam {
    /// Zero mean, scaled-identity covariance over `n_landmarks` landmarks
    pub fn new(n_landmarks: usize, config: EkfSlamConfig) -> Self {
        let belief = Belief::initial(n_landmarks, config.initial_covariance_scale);
        Self::with_belief(belief, config)
    }

    pub fn with_belief(belief: Belief, config: EkfSlamConfig) -> Self {
        Self {
            belief,
            config,
            steps: 0,
        }
    }

    pub fn belief(&self) -> &Belief {
        &self.belief
    }

    pub fn config(&self) -> &EkfSlamConfig {
        &self.config
    }

    /// Number of completed predict/update cycles
    pub fn steps(&self) -> usize {
        self.steps
    }

    pub fn n_landmarks(&self) -> usize {
        self.belief.n_landmarks()
    }

    pub fn predict(&mut self, control: &ControlInput) {
        self.belief = predict_control(&self.belief, control, &self.config.process_noise);
    }

    pub fn update(&mut self, measurements: &[Vector3<f64>]) -> Result<()> {
        update(&mut self.belief, measurements, &self.config.measurement_noise)
    }

    /// One full timestep: predict, then correct with the measurements.
    ///
    /// If the correction fails the belief is left as it was before the
    /// step, prediction included.
    pub fn step(&mut self, control: &ControlInput, measurements: &[Vector3<f64>]) -> Result<()> {
        let mut next = predict_control(&self.belief, control, &self.config.process_noise);
        update(&mut next, measurements, &self.config.measurement_noise)?;
        self.belief = next;
        self.steps += 1;
        Ok(())
    }
}
