//! Errors of a step-driven simulation.

use std::fmt;

use slam3d_algo::slam::SlamError;

#[derive(Debug, Clone, PartialEq)]
pub enum SimError {
    /// `step` was called after every input step had been consumed
    Exhausted {
        /// Index of the step that was requested
        step: usize,
        /// Number of steps in the input
        len: usize,
    },

    /// The filter rejected the step
    Slam(SlamError),
}

impl SimError {
    pub fn is_exhausted(&self) -> bool {
        matches!(self, SimError::Exhausted { .. })
    }
}

impl fmt::Display for SimError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimError::Exhausted { step, len } => write!(
                f,
                "step {} requested but the input only has {} steps",
                step, len
            ),
            SimError::Slam(err) => write!(f, "filter step failed: {}", err),
        }
    }
}

impl std::error::Error for SimError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SimError::Slam(err) => Some(err),
            SimError::Exhausted { .. } => None,
        }
    }
}

impl From<SlamError> for SimError {
    fn from(err: SlamError) -> Self {
        SimError::Slam(err)
    }
}
