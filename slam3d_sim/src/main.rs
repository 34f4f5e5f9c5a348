//! Runs 3D EKF-SLAM over a synthetic or recorded dataset and writes the
//! per-step log.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use nalgebra::{Matrix3, Matrix6};
use rand::rngs::StdRng;
use rand::SeedableRng;
use slam3d_algo::slam::EkfSlamConfig;
use slam3d_sim::prelude::*;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Number of timesteps of a generated dataset
    #[arg(short = 'n', long, default_value_t = 50)]
    steps: usize,

    /// Number of landmarks of a generated dataset
    #[arg(short, long, default_value_t = 5)]
    landmarks: usize,

    /// Random seed for deterministic runs
    #[arg(short, long, default_value_t = 0)]
    seed: u64,

    /// Timestep (s)
    #[arg(long, default_value_t = 0.05)]
    dt: f64,

    /// Std dev of the lidar noise added to every feature
    #[arg(long, default_value_t = 0.05)]
    lidar_noise: f64,

    /// Std dev of the GPS noise
    #[arg(long, default_value_t = 0.02)]
    gps_noise: f64,

    /// Disable the simulated GPS
    #[arg(long)]
    no_gps: bool,

    /// Diagonal of the process noise Q
    #[arg(long, default_value_t = 1e-4)]
    process_noise: f64,

    /// Diagonal of the measurement noise R
    #[arg(long, default_value_t = 0.05)]
    measurement_noise: f64,

    /// Diagonal of the initial covariance
    #[arg(long, default_value_t = 0.01)]
    initial_covariance: f64,

    /// Dataset directory, generated and written there when missing
    #[arg(short, long)]
    dataset: Option<PathBuf>,

    /// Directory for the run logs
    #[arg(short, long, default_value = "output")]
    output: PathBuf,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let config = SimConfig {
        n_steps: args.steps,
        n_landmarks: args.landmarks,
        dt: args.dt,
        lidar_noise_std: args.lidar_noise,
        gps_enabled: !args.no_gps,
        gps_noise_std: args.gps_noise,
        seed: args.seed,
        ..Default::default()
    };
    config.validate()?;

    let slam_config = EkfSlamConfig::default()
        .with_process_noise(Matrix6::identity() * args.process_noise)
        .with_measurement_noise(Matrix3::identity() * args.measurement_noise)
        .with_initial_covariance_scale(args.initial_covariance);

    let dataset = match &args.dataset {
        Some(dir) if Dataset::exists_in(dir) => {
            info!(dir = %dir.display(), "loading dataset");
            Dataset::read_csv(dir, config.dt)?
        }
        Some(dir) => {
            let dataset = Dataset::synthetic(&config, &mut StdRng::seed_from_u64(config.seed));
            dataset.write_csv(dir)?;
            info!(dir = %dir.display(), "generated dataset");
            dataset
        }
        None => Dataset::synthetic(&config, &mut StdRng::seed_from_u64(config.seed)),
    };
    info!(
        steps = dataset.len(),
        landmarks = dataset.n_landmarks(),
        "running EKF-SLAM"
    );

    let mut run = SlamRun::new(dataset, config, slam_config);
    let steps = run.run().context("EKF-SLAM run failed")?;

    let belief = run.slam().belief();
    info!(
        steps,
        position = ?belief.position().as_slice(),
        landmark_error = run.errors().current_landmark_error().unwrap_or_default(),
        position_rmse = ?run.errors().position_rmse(),
        "run finished"
    );

    run.save_logs(&args.output)?;
    Ok(())
}
