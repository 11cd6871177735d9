//! # omni-flight
//! A `#![no_std]` rotor allocation and position control library for (tilting) multi-rotors
//!
//! # Allocation
//! [`allocation`] builds the effectiveness matrix mapping rotor commands to body force and
//! moment, for fixed-axis frames and for omnidirectional tilting frames.
//!
//! [`tilt`](allocation::tilt) points tilting rotors along the axis commanded by their servo group.
//!
//! # Control
//! [`PositionAttitudeControl`] is the control cycle around a pluggable
//! [`ControlLaw`](control::law::ControlLaw). It corrects setpoints for estimator resets,
//! runs the [`Takeoff`](control::takeoff::Takeoff) state machine and shapes the setpoint
//! with an [`AdmittanceFilter`](control::admittance::AdmittanceFilter).
//!
//! [`task`] (with the `std` feature) runs the cycle as a reactive tokio task.

#![no_std]

#[cfg(any(feature = "std", test))]
extern crate std;

pub mod allocation;

pub mod config;
pub use config::Params;

pub mod control;
pub use control::{PositionAttitudeControl, PositionAttitudeControlBuilder};

mod error;
pub use error::Error;

pub mod filter;

pub mod msg;

#[cfg(feature = "std")]
pub mod task;

/// Standard gravity (in m/s^2).
pub const GRAVITY: f32 = 9.80665;

/// Linear interpolation between `a` and `b`.
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Clamp `amt` to `[low, high]`, returning the midpoint for NaN.
pub fn constrain_float(amt: f32, low: f32, high: f32) -> f32 {
    if amt.is_nan() {
        return (low + high) / 2.;
    }
    amt.max(low).min(high)
}

/// Approximate equality relative to the larger magnitude.
pub fn is_equal_f(a: f32, b: f32) -> bool {
    let scale = num_traits::Float::abs(a).max(num_traits::Float::abs(b)).max(1.);
    num_traits::Float::abs(a - b) <= f32::EPSILON * scale
}
