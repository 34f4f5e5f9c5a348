use nalgebra::{Matrix3, Matrix6};

/// EKF-SLAM configuration parameters, constant for the life of a run
#[derive(Debug, Clone, PartialEq)]
pub struct EkfSlamConfig {
    /// Process noise `Q` added to the pose block on every prediction
    pub process_noise: Matrix6<f64>,
    /// Measurement noise `R` for each 3D point observation
    pub measurement_noise: Matrix3<f64>,
    /// Initial covariance is `initial_covariance_scale · I`
    pub initial_covariance_scale: f64,
}

impl Default for EkfSlamConfig {
    fn default() -> Self {
        Self {
            process_noise: Matrix6::identity() * 1e-4,
            measurement_noise: Matrix3::identity() * 0.05,
            initial_covariance_scale: 0.01,
        }
    }
}

impl EkfSlamConfig {
    pub fn with_process_noise(mut self, q: Matrix6<f64>) -> Self {
        self.process_noise = q;
        self
    }

    pub fn with_measurement_noise(mut self, r: Matrix3<f64>) -> Self {
        self.measurement_noise = r;
        self
    }

    pub fn with_initial_covariance_scale(mut self, scale: f64) -> Self {
        self.initial_covariance_scale = scale;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_overrides_defaults() {
        let config = EkfSlamConfig::default()
            .with_process_noise(Matrix6::zeros())
            .with_measurement_noise(Matrix3::identity())
            .with_initial_covariance_scale(2.0);
        assert_eq!(config.process_noise, Matrix6::zeros());
        assert_eq!(config.measurement_noise, Matrix3::identity());
        assert_eq!(config.initial_covariance_scale, 2.0);
    }
}
