use super::{ControlLaw, ControlOutput, PositionGains, PositionInput, PositionPid, PositionState};
use crate::msg::LocalPositionSetpoint;
use nalgebra::{Rotation3, Vector3};

/// Keeps the vehicle level and produces horizontal force by tilting the rotors.
#[derive(Clone, Debug)]
pub struct Tilt {
    pid: PositionPid,
    rotation: Rotation3<f32>,
    thrust: Vector3<f32>,
}

impl Default for Tilt {
    fn default() -> Self {
        Self {
            pid: PositionPid::default(),
            rotation: Rotation3::identity(),
            thrust: Vector3::zeros(),
        }
    }
}

impl ControlLaw for Tilt {
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

        self.rotation = Rotation3::from_euler_angles(0., 0., self.pid.yaw_sp());
        let mut thrust = self.rotation.inverse() * self.pid.force();

        // Rotors cannot push the vehicle down
        thrust.z = thrust.z.min(0.);
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
        ControlOutput::Tilt {
            rotation: self.rotation,
            thrust: self.thrust,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::GRAVITY;
    use approx::assert_relative_eq;
    use core::f32::consts::FRAC_PI_2;

    #[test]
    fn lateral_force_stays_in_body_frame() {
        let mut law = Tilt::default();
        law.set_state(&PositionState {
            position: Vector3::zeros(),
            velocity: Vector3::zeros(),
            acceleration: Vector3::zeros(),
            yaw: 0.,
        });
        law.set_input_setpoint(&PositionInput {
            acceleration: Vector3::new(1., 0., 0.),
            yaw: FRAC_PI_2,
            ..PositionInput::default()
        });
        assert!(law.update(0.01));

        match law.control_output() {
            ControlOutput::Tilt { rotation, thrust } => {
                assert_relative_eq!(rotation.euler_angles().2, FRAC_PI_2, epsilon = 1e-6);
                // World north is body left when facing east
                assert_relative_eq!(thrust, Vector3::new(0., -1.5, -1.5 * GRAVITY), epsilon = 1e-5);
            }
            output => panic!("unexpected output {:?}", output),
        }
    }
}
