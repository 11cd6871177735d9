//! Snapshot records exchanged with the transport.
//!
//! All timestamps are in microseconds since an arbitrary epoch shared by every source.
//! Undefined setpoint components are NaN.

use crate::control::takeoff::TakeoffState;
use nalgebra::{Rotation3, Vector3};

fn nan3() -> Vector3<f32> {
    Vector3::repeat(f32::NAN)
}

/// Estimator reset counters, one per kind of state discontinuity.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ResetCounters {
    pub xy: u8,
    pub z: u8,
    pub vxy: u8,
    pub vz: u8,
    pub heading: u8,
}

/// Local state estimate.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LocalPosition {
    pub timestamp: u64,
    pub timestamp_sample: u64,

    pub position: Vector3<f32>,
    pub velocity: Vector3<f32>,
    pub xy_valid: bool,
    pub z_valid: bool,
    pub v_xy_valid: bool,
    pub v_z_valid: bool,
    /// Vertical velocity from differentiating the altitude estimate.
    pub z_deriv: f32,
    pub heading: f32,

    /// Jumps reported with the latest increment of each reset counter.
    pub delta_xy: [f32; 2],
    pub delta_z: f32,
    pub delta_vxy: [f32; 2],
    pub delta_vz: f32,
    pub delta_heading: f32,
    pub reset_counters: ResetCounters,
}

impl Default for LocalPosition {
    fn default() -> Self {
        Self {
            timestamp: 0,
            timestamp_sample: 0,
            position: Vector3::zeros(),
            velocity: Vector3::zeros(),
            xy_valid: false,
            z_valid: false,
            v_xy_valid: false,
            v_z_valid: false,
            z_deriv: 0.,
            heading: 0.,
            delta_xy: [0.; 2],
            delta_z: 0.,
            delta_vxy: [0.; 2],
            delta_vz: 0.,
            delta_heading: 0.,
            reset_counters: ResetCounters::default(),
        }
    }
}

/// Reference trajectory point.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TrajectorySetpoint {
    pub timestamp: u64,
    pub position: Vector3<f32>,
    pub velocity: Vector3<f32>,
    pub acceleration: Vector3<f32>,
    pub yaw: f32,
    pub yaw_rate: f32,
}

impl Default for TrajectorySetpoint {
    fn default() -> Self {
        Self {
            timestamp: 0,
            position: nan3(),
            velocity: nan3(),
            acceleration: nan3(),
            yaw: f32::NAN,
            yaw_rate: f32::NAN,
        }
    }
}

impl TrajectorySetpoint {
    /// Mark every component as undefined, keeping the timestamp.
    pub fn reset_to_nan(&mut self) {
        *self = Self {
            timestamp: self.timestamp,
            ..Self::default()
        };
    }
}

/// Flags selecting which controllers run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ControlMode {
    pub timestamp: u64,
    /// Position, velocity and acceleration control by this loop.
    pub enabled: bool,
    pub armed: bool,
    /// Setpoints come from an external offboard source.
    pub offboard: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LandDetected {
    pub timestamp: u64,
    pub landed: bool,
    pub ground_contact: bool,
}

impl Default for LandDetected {
    fn default() -> Self {
        Self {
            timestamp: 0,
            landed: true,
            ground_contact: true,
        }
    }
}

/// Constraints from the flight task generating setpoints.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VehicleConstraints {
    pub timestamp: u64,
    /// Maximum ascent speed (in m/s), NaN for the configured limit.
    pub speed_up: f32,
    /// Maximum descent speed (in m/s), NaN for the configured limit.
    pub speed_down: f32,
    pub want_takeoff: bool,
}

impl Default for VehicleConstraints {
    fn default() -> Self {
        Self {
            timestamp: 0,
            speed_up: f32::NAN,
            speed_down: f32::NAN,
            want_takeoff: false,
        }
    }
}

/// Force and torque measured by the sensor, in sensor axes.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ForceTorque {
    pub timestamp: u64,
    pub force: Vector3<f32>,
    pub torque: Vector3<f32>,
}

impl Default for ForceTorque {
    fn default() -> Self {
        Self {
            timestamp: 0,
            force: Vector3::zeros(),
            torque: Vector3::zeros(),
        }
    }
}

/// Local position setpoint after control, for logging.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LocalPositionSetpoint {
    pub timestamp: u64,
    pub position: Vector3<f32>,
    pub velocity: Vector3<f32>,
    pub acceleration: Vector3<f32>,
    /// Body thrust normalized by the maximum thrust.
    pub thrust: Vector3<f32>,
    pub yaw: f32,
    pub yaw_rate: f32,
}

impl Default for LocalPositionSetpoint {
    fn default() -> Self {
        Self {
            timestamp: 0,
            position: nan3(),
            velocity: nan3(),
            acceleration: nan3(),
            thrust: nan3(),
            yaw: f32::NAN,
            yaw_rate: f32::NAN,
        }
    }
}

/// Attitude setpoint for the rate controller.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AttitudeSetpoint {
    pub timestamp: u64,
    pub rotation: Rotation3<f32>,
    /// Body thrust normalized by the maximum thrust.
    pub thrust_body: Vector3<f32>,
    pub yaw_sp_move_rate: f32,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct TiltServoSetpoint {
    pub timestamp: u64,
    /// Servo angle (in radians).
    pub angle: f32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TakeoffStatus {
    pub timestamp: u64,
    pub state: TakeoffState,
    /// Current tilt limit (in radians).
    pub tilt_limit: f32,
}
