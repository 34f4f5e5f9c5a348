//! Noise generation utilities for simulation.

use nalgebra::Vector3;
use rand::distributions::{Distribution, Uniform};
use rand::Rng;
use rand_distr::Normal;

/// Generate Gaussian noise with the specified standard deviation.
///
/// A non-positive or non-finite standard deviation yields no noise.
pub fn gaussian_noise<R: Rng + ?Sized>(rng: &mut R, std_dev: f64) -> f64 {
    if !(std_dev.is_finite() && std_dev > 0.0) {
        return 0.0;
    }
    match Normal::new(0.0, std_dev) {
        Ok(normal) => normal.sample(rng),
        Err(_) => 0.0,
    }
}

/// Independent Gaussian noise on each axis.
pub fn gaussian_vector3<R: Rng + ?Sized>(rng: &mut R, std_dev: f64) -> Vector3<f64> {
    Vector3::from_fn(|_, _| gaussian_noise(&mut *rng, std_dev))
}

/// Point drawn uniformly from the box `[low, high)³`.
///
/// Returns `low` on every axis when the range is empty or not finite.
pub fn uniform_vector3<R: Rng + ?Sized>(rng: &mut R, low: f64, high: f64) -> Vector3<f64> {
    if low >= high || !low.is_finite() || !high.is_finite() {
        return Vector3::repeat(low);
    }
    let lim = Uniform::new(low, high);
    Vector3::from_fn(|_, _| lim.sample(&mut *rng))
}
