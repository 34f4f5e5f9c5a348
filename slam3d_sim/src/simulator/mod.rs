pub mod common;
pub mod error;
pub mod slam;

pub use error::SimError;
pub use slam::{SlamRun, StepLog};

/// Base trait for step-driven simulations.
pub trait Simulate {
    /// Error produced by a failed step
    type Error;

    /// Take a single step through the simulation
    fn step(&mut self) -> Result<(), Self::Error>;

    /// True once there is no more input to consume
    fn is_finished(&self) -> bool;

    /// Reset the dynamic states of the current simulation object.
    ///
    /// Anything that is **not a dynamic state of the system (e.g. tunable
    /// parameters or the input dataset) should not be reset using this
    /// method.**
    fn reset_state(&mut self);

    /// Step until the input is exhausted, returning the number of steps taken
    fn run(&mut self) -> Result<usize, Self::Error> {
        let mut steps = 0;
        while !self.is_finished() {
            self.step()?;
            steps += 1;
        }
        Ok(steps)
    }
}
