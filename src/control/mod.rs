//! The position control loop and its building blocks.

pub mod admittance;

mod builder;
pub use builder::Builder as PositionAttitudeControlBuilder;

pub mod law;

pub mod position_attitude;
pub use position_attitude::{CycleInputs, CycleOutputs, PositionAttitudeControl};

pub mod takeoff;

#[cfg(test)]
pub(crate) mod testing;
