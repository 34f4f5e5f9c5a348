//! Error tracking for pose and map estimation accuracy.

use std::collections::VecDeque;

use nalgebra::Vector3;

use super::history::DEFAULT_HISTORY_LEN;

/// Tracks position errors against GPS and landmark errors against a
/// reference map over time.
#[derive(Debug, Clone)]
pub struct ErrorTracker {
    /// History of position errors (`None` when no GPS fix was available)
    position_errors: VecDeque<Option<f64>>,
    /// History of mean landmark errors
    landmark_errors: VecDeque<f64>,
    /// Maximum history length
    max_len: usize,
}

impl ErrorTracker {
    /// Create a new error tracker with the specified maximum history length.
    pub fn new(max_len: usize) -> Self {
        Self {
            position_errors: VecDeque::with_capacity(max_len),
            landmark_errors: VecDeque::with_capacity(max_len),
            max_len,
        }
    }

    /// Create a new error tracker with default maximum length.
    pub fn with_default_len() -> Self {
        Self::new(DEFAULT_HISTORY_LEN)
    }

    /// 3D Euclidean distance between two points.
    pub fn position_error_3d(a: &Vector3<f64>, b: &Vector3<f64>) -> f64 {
        (a - b).norm()
    }

    /// Mean Euclidean distance between paired estimated and reference
    /// landmarks. Returns 0 for an empty map.
    pub fn mean_landmark_error(estimated: &[Vector3<f64>], reference: &[Vector3<f64>]) -> f64 {
        let n = estimated.len().min(reference.len());
        if n == 0 {
            return 0.0;
        }
        let total: f64 = estimated
            .iter()
            .zip(reference)
            .map(|(e, r)| Self::position_error_3d(e, r))
            .sum();
        total / n as f64
    }

    /// Track errors for this timestep.
    pub fn track(&mut self, position_err: Option<f64>, landmark_err: f64) {
        self.position_errors.push_back(position_err);
        self.landmark_errors.push_back(landmark_err);

        // Maintain circular buffer behavior
        if self.position_errors.len() > self.max_len {
            self.position_errors.pop_front();
            self.landmark_errors.pop_front();
        }
    }

    /// Track errors by computing differences from the estimates.
    pub fn track_estimates(
        &mut self,
        est_position: &Vector3<f64>,
        gps: Option<&Vector3<f64>>,
        est_landmarks: &[Vector3<f64>],
        ref_landmarks: &[Vector3<f64>],
    ) {
        let position_err = gps.map(|fix| Self::position_error_3d(est_position, fix));
        let landmark_err = Self::mean_landmark_error(est_landmarks, ref_landmarks);
        self.track(position_err, landmark_err);
    }

    /// Position errors for the steps that had a GPS fix.
    pub fn get_position_errors(&self) -> impl Iterator<Item = &f64> {
        self.position_errors.iter().flatten()
    }

    pub fn get_landmark_errors(&self) -> impl Iterator<Item = &f64> {
        self.landmark_errors.iter()
    }

    /// Get the current position error (last value).
    pub fn current_position_error(&self) -> Option<f64> {
        self.position_errors.back().copied().flatten()
    }

    /// Get the current landmark error (last value).
    pub fn current_landmark_error(&self) -> Option<f64> {
        self.landmark_errors.back().copied()
    }

    /// Root mean square of the retained position errors.
    pub fn position_rmse(&self) -> Option<f64> {
        let (sum_sq, n) = self
            .get_position_errors()
            .fold((0.0, 0usize), |(s, n), e| (s + e * e, n + 1));
        (n > 0).then(|| (sum_sq / n as f64).sqrt())
    }

    /// Get the current history length.
    pub fn len(&self) -> usize {
        self.landmark_errors.len()
    }

    /// Check if error history is empty.
    pub fn is_empty(&self) -> bool {
        self.landmark_errors.is_empty()
    }

    /// Clear all error history.
    pub fn clear(&mut self) {
        self.position_errors.clear();
        self.landmark_errors.clear();
    }
}

impl Default for ErrorTracker {
    fn default() -> Self {
        Self::with_default_len()
    }
}
