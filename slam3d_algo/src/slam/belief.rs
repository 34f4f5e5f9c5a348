//! Joint Gaussian belief over the 3D pose and a fixed set of landmarks.
//!
//! ## State Vector Structure
//! - Dimension: 6 + 3M (pose + M landmarks)
//! - Position: [x, y, z] at `[0, 3)`
//! - Orientation: [roll, pitch, yaw] at `[3, 6)`
//! - Landmark `i`: [m_x, m_y, m_z] at `[6 + 3i, 6 + 3i + 3)`
//!
//! The landmark count is fixed when the belief is built and never changes.

use nalgebra::{DMatrix, DVector, Matrix3, Matrix6, Vector3, Vector6};

use super::error::{Result, SlamError};

/// Number of pose entries (position + orientation)
pub const POSE_DIM: usize = 6;
/// Number of entries per landmark
pub const LANDMARK_DIM: usize = 3;

/// Tolerance used when checking symmetry and positive semi-definiteness
const STRUCTURE_TOL: f64 = 1e-9;

/// Mean and covariance of the joint pose/landmark estimate
#[derive(Debug, Clone, PartialEq)]
pub struct Belief {
    /// State mean [x, y, z, roll, pitch, yaw, m1_x, m1_y, m1_z, ...]
    mu: DVector<f64>,
    /// State covariance (6+3M × 6+3M), co-indexed with `mu`
    sigma: DMatrix<f64>,
    /// Number of landmarks in the state
    n_landmarks: usize,
}

impl Belief {
    /// Build a belief from an explicit mean and covariance.
    ///
    /// Fails with a validation error if `mu` does not have length `6 + 3M`,
    /// if `sigma` is not the matching square matrix, if any entry is not
    /// finite, or if `sigma` is not symmetric positive semi-definite.
    pub fn new(mu: DVector<f64>, sigma: DMatrix<f64>) -> Result<Self> {
        let n = mu.len();
        if n < POSE_DIM || (n - POSE_DIM) % LANDMARK_DIM != 0 {
            return Err(SlamError::validation(
                "mu",
                "length 6 + 3M",
                format!("length {}", n),
            ));
        }
        if sigma.shape() != (n, n) {
            return Err(SlamError::validation(
                "sigma",
                format!("shape ({}, {})", n, n),
                format!("shape {:?}", sigma.shape()),
            ));
        }
        if mu.iter().any(|v| !v.is_finite()) {
            return Err(SlamError::validation("mu", "finite entries", "non-finite entry"));
        }
        if sigma.iter().any(|v| !v.is_finite()) {
            return Err(SlamError::validation(
                "sigma",
                "finite entries",
                "non-finite entry",
            ));
        }

        let belief = Self {
            mu,
            sigma,
            n_landmarks: (n - POSE_DIM) / LANDMARK_DIM,
        };

        let scale = belief.sigma.amax().max(1.0);
        let asymmetry = belief.asymmetry();
        if asymmetry > STRUCTURE_TOL * scale {
            return Err(SlamError::validation(
                "sigma",
                "symmetric matrix",
                format!("max |Σ - Σᵀ| = {:e}", asymmetry),
            ));
        }
        let min_eig = belief.min_eigenvalue();
        if min_eig < -STRUCTURE_TOL * scale {
            return Err(SlamError::validation(
                "sigma",
                "positive semi-definite matrix",
                format!("smallest eigenvalue {:e}", min_eig),
            ));
        }

        Ok(belief)
    }

    /// Initial belief: zero mean and `sigma_scale · I` covariance.
    pub fn initial(n_landmarks: usize, sigma_scale: f64) -> Self {
        let n = POSE_DIM + LANDMARK_DIM * n_landmarks;
        Self {
            mu: DVector::zeros(n),
            sigma: DMatrix::identity(n, n) * sigma_scale,
            n_landmarks,
        }
    }

    /// Swap in a freshly computed mean/covariance of the same dimension.
    pub(crate) fn commit(&mut self, mu: DVector<f64>, sigma: DMatrix<f64>) {
        debug_assert_eq!(mu.len(), self.dim());
        debug_assert_eq!(sigma.shape(), (self.dim(), self.dim()));
        self.mu = mu;
        self.sigma = sigma;
    }

    pub fn mu(&self) -> &DVector<f64> {
        &self.mu
    }

    pub fn sigma(&self) -> &DMatrix<f64> {
        &self.sigma
    }

    pub fn n_landmarks(&self) -> usize {
        self.n_landmarks
    }

    /// Length of the state vector (6 + 3M)
    pub fn dim(&self) -> usize {
        self.mu.len()
    }

    /// Offset of landmark `idx` in the state vector, if it exists
    pub fn landmark_offset(&self, idx: usize) -> Option<usize> {
        (idx < self.n_landmarks).then(|| POSE_DIM + LANDMARK_DIM * idx)
    }

    /// Position [x, y, z]
    pub fn position(&self) -> Vector3<f64> {
        self.mu.fixed_rows::<3>(0).into_owned()
    }

    /// Orientation [roll, pitch, yaw]
    pub fn orientation(&self) -> Vector3<f64> {
        self.mu.fixed_rows::<3>(3).into_owned()
    }

    /// Full pose [x, y, z, roll, pitch, yaw]
    pub fn pose(&self) -> Vector6<f64> {
        self.mu.fixed_rows::<POSE_DIM>(0).into_owned()
    }

    /// Get landmark position by index
    pub fn landmark(&self, idx: usize) -> Option<Vector3<f64>> {
        let base = self.landmark_offset(idx)?;
        Some(self.mu.fixed_rows::<LANDMARK_DIM>(base).into_owned())
    }

    /// All landmark estimates in state order
    pub fn landmarks(&self) -> Vec<Vector3<f64>> {
        (0..self.n_landmarks).filter_map(|i| self.landmark(i)).collect()
    }

    /// The 6x6 pose-pose covariance block
    pub fn pose_covariance(&self) -> Matrix6<f64> {
        self.sigma
            .fixed_view::<POSE_DIM, POSE_DIM>(0, 0)
            .into_owned()
    }

    /// Get the 3x3 covariance block for a specific landmark
    pub fn landmark_covariance(&self, idx: usize) -> Option<Matrix3<f64>> {
        let base = self.landmark_offset(idx)?;
        Some(
            self.sigma
                .fixed_view::<LANDMARK_DIM, LANDMARK_DIM>(base, base)
                .into_owned(),
        )
    }

    /// Largest absolute difference between `Σ` and `Σᵀ`.
    ///
    /// The sequential update does not re-symmetrize, so this drifts away
    /// from zero over long runs.
    pub fn asymmetry(&self) -> f64 {
        (&self.sigma - self.sigma.transpose()).amax()
    }

    /// Smallest eigenvalue of the symmetric part of `Σ`.
    pub fn min_eigenvalue(&self) -> f64 {
        let sym = (&self.sigma + self.sigma.transpose()) * 0.5;
        sym.symmetric_eigenvalues().min()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_initial_layout() {
        let belief = Belief::initial(2, 0.01);
        assert_eq!(belief.dim(), 12);
        assert_eq!(belief.n_landmarks(), 2);
        assert_eq!(belief.landmark_offset(0), Some(6));
        assert_eq!(belief.landmark_offset(1), Some(9));
        assert_eq!(belief.landmark_offset(2), None);
        assert!(belief.landmark(2).is_none());
        assert_relative_eq!(belief.sigma()[(11, 11)], 0.01);
        assert_relative_eq!(belief.sigma()[(0, 1)], 0.0);
    }

    #[test]
    fn test_accessors_follow_layout() {
        let mu = DVector::from_iterator(9, (0..9).map(|i| i as f64));
        let belief = Belief::new(mu, DMatrix::identity(9, 9)).unwrap();
        assert_eq!(belief.position(), Vector3::new(0.0, 1.0, 2.0));
        assert_eq!(belief.orientation(), Vector3::new(3.0, 4.0, 5.0));
        assert_eq!(belief.landmark(0), Some(Vector3::new(6.0, 7.0, 8.0)));
        assert_eq!(belief.landmarks().len(), 1);
        assert_eq!(belief.pose_covariance(), Matrix6::identity());
        assert_eq!(belief.landmark_covariance(0), Some(Matrix3::identity()));
    }

    #[test]
    fn test_no_landmarks_is_valid() {
        let belief = Belief::new(DVector::zeros(6), DMatrix::identity(6, 6)).unwrap();
        assert_eq!(belief.n_landmarks(), 0);
        assert!(belief.landmarks().is_empty());
    }

    #[test]
    fn test_rejects_bad_mean_length() {
        let err = Belief::new(DVector::zeros(8), DMatrix::identity(8, 8)).unwrap_err();
        assert!(matches!(err, SlamError::Validation { argument: "mu", .. }));

        let err = Belief::new(DVector::zeros(3), DMatrix::identity(3, 3)).unwrap_err();
        assert!(matches!(err, SlamError::Validation { argument: "mu", .. }));
    }

    #[test]
    fn test_rejects_mismatched_covariance() {
        let err = Belief::new(DVector::zeros(9), DMatrix::identity(6, 6)).unwrap_err();
        assert!(matches!(err, SlamError::Validation { argument: "sigma", .. }));
    }

    #[test]
    fn test_rejects_asymmetric_covariance() {
        let mut sigma = DMatrix::identity(6, 6);
        sigma[(0, 1)] = 0.5;
        let err = Belief::new(DVector::zeros(6), sigma).unwrap_err();
        assert!(err.to_string().contains("symmetric"));
    }

    #[test]
    fn test_rejects_indefinite_covariance() {
        let mut sigma = DMatrix::identity(6, 6);
        sigma[(2, 2)] = -1.0;
        let err = Belief::new(DVector::zeros(6), sigma).unwrap_err();
        assert!(err.to_string().contains("positive semi-definite"));
    }

    #[test]
    fn test_accepts_singular_psd_covariance() {
        let belief = Belief::new(DVector::zeros(6), DMatrix::zeros(6, 6)).unwrap();
        assert_relative_eq!(belief.min_eigenvalue(), 0.0);
        assert_relative_eq!(belief.asymmetry(), 0.0);
    }

    #[test]
    fn test_rejects_non_finite() {
        let mut mu = DVector::zeros(6);
        mu[4] = f64::NAN;
        let err = Belief::new(mu, DMatrix::identity(6, 6)).unwrap_err();
        assert!(matches!(err, SlamError::Validation { argument: "mu", .. }));
    }
}
