use super::{ControlLaw, ControlOutput, PositionGains, PositionInput, PositionPid, PositionState};
use crate::msg::LocalPositionSetpoint;
use nalgebra::{Matrix3, Rotation3, Vector3};
use num_traits::Float;

/// Attitude and collective thrust producing `force` (in N, NED) at heading `yaw`.
///
/// The body z axis is aligned against the force, then the body x axis is chosen as
/// close as possible to the heading. A force without an upward component gives a level
/// attitude and no thrust.
pub fn attitude_from_force(force: &Vector3<f32>, yaw: f32) -> (Rotation3<f32>, f32) {
    let level = Rotation3::from_euler_angles(0., 0., yaw);

    let norm = force.norm();
    if norm <= f32::EPSILON || force.z >= 0. {
        return (level, 0.);
    }
    let b3 = -force / norm;

    let (sin, cos) = Float::sin_cos(yaw);
    let heading = Vector3::new(cos, sin, 0.);
    let b2 = b3.cross(&heading);
    let b2_norm = b2.norm();
    if b2_norm <= f32::EPSILON {
        return (level, norm);
    }
    let b2 = b2 / b2_norm;
    let b1 = b2.cross(&b3);

    let rotation = Rotation3::from_matrix_unchecked(Matrix3::from_columns(&[b1, b2, b3]));
    (rotation, norm)
}

/// Geometric control on the rotation group: the position PID force is tracked by
/// tilting the whole vehicle.
#[derive(Clone, Debug)]
pub struct Geometric {
    pid: PositionPid,
    rotation: Rotation3<f32>,
    thrust: f32,
}

impl Default for Geometric {
    fn default() -> Self {
        Self {
            pid: PositionPid::default(),
            rotation: Rotation3::identity(),
            thrust: 0.,
        }
    }
}

impl ControlLaw for Geometric {
    fn set_gains(&mut self, gains: &PositionGains) {
        self.pid.set_gains(gains);
    }

    fn set_state(&mut self, state: &PositionState) {
        self.pid.set_state(state);
    }

    fn set_input_setpoint(&mut self, input: &PositionInput) {
        self.pid.set_input_setpoint(input);
    }

    fn update(&mut self, dt: f32) -> bool {
        if !self.pid.update(dt) {
            return false;
        }

        let (rotation, thrust) = attitude_from_force(self.pid.force(), self.pid.yaw_sp());
        self.rotation = rotation;
        self.thrust = thrust;
        true
    }

    fn reset_integral(&mut self) {
        self.pid.reset_integral();
    }

    fn local_position_setpoint(&self) -> LocalPositionSetpoint {
        self.pid.local_position_setpoint()
    }

    fn control_output(&self) -> ControlOutput {
        ControlOutput::Attitude {
            rotation: self.rotation,
            thrust: Vector3::new(0., 0., -self.thrust),
            yaw_rate: self.pid.yaw_rate_sp(),
        }
    }
}
