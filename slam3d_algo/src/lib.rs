#![allow(non_snake_case)]

pub mod slam;

pub mod prelude {
    pub use crate::slam::{
        predict, predict_control, update, update_in_order, Belief, ControlInput, EkfSlam,
        EkfSlamConfig, SlamError, LANDMARK_DIM, POSE_DIM,
    };
    pub use nalgebra;
    pub use nalgebra::{Matrix3, Matrix6, Vector3};
}

pub use prelude::*;
