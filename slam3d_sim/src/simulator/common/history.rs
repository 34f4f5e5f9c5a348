//! History management with circular buffers for trajectory output.

use std::collections::VecDeque;

/// Default maximum history length
pub const DEFAULT_HISTORY_LEN: usize = 1000;

/// Manages history of estimated positions, GPS fixes and landmark
/// estimates with circular buffers.
#[derive(Debug, Clone)]
pub struct HistoryManager<T: Clone> {
    /// History of estimated positions (the trajectory)
    estimated_history: VecDeque<T>,
    /// History of GPS fixes, `None` for steps without a fix
    gps_history: VecDeque<Option<T>>,
    /// Landmark estimates at each step
    landmark_history: VecDeque<Vec<T>>,
    /// Maximum history length
    max_len: usize,
    /// Total step count
    step_count: usize,
}

impl<T: Clone> HistoryManager<T> {
    /// Create a new history manager with the specified maximum length.
    pub fn new(max_len: usize) -> Self {
        Self {
            estimated_history: VecDeque::with_capacity(max_len),
            gps_history: VecDeque::with_capacity(max_len),
            landmark_history: VecDeque::with_capacity(max_len),
            max_len,
            step_count: 0,
        }
    }

    /// Create a new history manager with default maximum length.
    pub fn with_default_len() -> Self {
        Self::new(DEFAULT_HISTORY_LEN)
    }

    /// Push the state of one completed timestep and increment step count.
    pub fn push(&mut self, estimated: T, gps: Option<T>, landmarks: Vec<T>) {
        self.estimated_history.push_back(estimated);
        self.gps_history.push_back(gps);
        self.landmark_history.push_back(landmarks);
        self.step_count += 1;

        // Maintain circular buffer behavior
        if self.estimated_history.len() > self.max_len {
            self.estimated_history.pop_front();
            self.gps_history.pop_front();
            self.landmark_history.pop_front();
        }
    }

    /// Estimated trajectory, oldest first.
    pub fn get_estimated(&self) -> impl Iterator<Item = &T> {
        self.estimated_history.iter()
    }

    /// GPS fixes that were available, oldest first.
    pub fn get_gps(&self) -> impl Iterator<Item = &T> {
        self.gps_history.iter().flatten()
    }

    /// Most recent landmark estimates.
    pub fn latest_landmarks(&self) -> Option<&[T]> {
        self.landmark_history.back().map(Vec::as_slice)
    }

    /// Landmark estimates for every retained step, oldest first.
    pub fn get_landmarks(&self) -> impl Iterator<Item = &[T]> {
        self.landmark_history.iter().map(Vec::as_slice)
    }

    /// Get the total step count.
    pub fn step_count(&self) -> usize {
        self.step_count
    }

    /// Get the current history length.
    pub fn len(&self) -> usize {
        self.estimated_history.len()
    }

    /// Check if history is empty.
    pub fn is_empty(&self) -> bool {
        self.estimated_history.is_empty()
    }

    /// Get the maximum history length.
    pub fn max_len(&self) -> usize {
        self.max_len
    }

    /// Step count at the beginning of the current history window.
    pub fn start_step(&self) -> usize {
        self.step_count.saturating_sub(self.max_len)
    }

    /// Clear all history and reset step count.
    pub fn clear(&mut self) {
        self.estimated_history.clear();
        self.gps_history.clear();
        self.landmark_history.clear();
        self.step_count = 0;
    }
}

impl<T: Clone> Default for HistoryManager<T> {
    fn default() -> Self {
        Self::with_default_len()
    }
}
