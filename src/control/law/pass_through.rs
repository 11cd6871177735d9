use super::{ControlLaw, ControlOutput, PositionGains, PositionInput, PositionPid, PositionState};
use crate::msg::LocalPositionSetpoint;

/// Passes the PID acceleration to an external attitude loop.
#[derive(Clone, Debug, Default)]
pub struct PassThrough {
    pid: PositionPid,
}

impl ControlLaw for PassThrough {
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
        self.pid.update(dt)
    }

    fn reset_integral(&mut self) {
        self.pid.reset_integral();
    }

    fn local_position_setpoint(&self) -> LocalPositionSetpoint {
        self.pid.local_position_setpoint()
    }

    fn control_output(&self) -> ControlOutput {
        ControlOutput::Acceleration {
            acceleration: *self.pid.acceleration_sp(),
            yaw: self.pid.yaw_sp(),
            yaw_rate: self.pid.yaw_rate_sp(),
        }
    }
}
