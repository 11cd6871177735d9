use super::{PositionGains, PositionInput, PositionState};
use crate::msg::LocalPositionSetpoint;
use crate::{constrain_float, GRAVITY};
use nalgebra::Vector3;

fn finite_or(value: f32, default: f32) -> f32 {
    if value.is_finite() {
        value
    } else {
        default
    }
}

/// Cascaded position and velocity PID shared by the control laws.
///
/// Each axis is controlled independently. An axis without a position setpoint tracks its
/// velocity setpoint, and an axis without either passes its acceleration setpoint through.
#[derive(Clone, Debug, Default)]
pub struct PositionPid {
    gains: PositionGains,
    state: PositionState,
    input: PositionInput,
    integral: Vector3<f32>,

    position_sp: Vector3<f32>,
    velocity_sp: Vector3<f32>,
    acceleration_sp: Vector3<f32>,
    force: Vector3<f32>,
    yaw_sp: f32,
    yaw_rate_sp: f32,
}

impl PositionPid {
    pub fn gains(&self) -> &PositionGains {
        &self.gains
    }

    pub fn set_gains(&mut self, gains: &PositionGains) {
        self.gains = *gains;
    }

    pub fn set_state(&mut self, state: &PositionState) {
        self.state = *state;
    }

    pub fn set_input_setpoint(&mut self, input: &PositionInput) {
        self.input = *input;
    }

    pub fn integral(&self) -> &Vector3<f32> {
        &self.integral
    }

    pub fn reset_integral(&mut self) {
        self.integral = Vector3::new(0., 0., self.gains.start_z_int);
    }

    /// Desired acceleration of the last successful update (in m/s^2, NED).
    pub fn acceleration_sp(&self) -> &Vector3<f32> {
        &self.acceleration_sp
    }

    /// Force needed to reach the desired acceleration against gravity (in N, NED).
    pub fn force(&self) -> &Vector3<f32> {
        &self.force
    }

    pub fn yaw_sp(&self) -> f32 {
        self.yaw_sp
    }

    pub fn yaw_rate_sp(&self) -> f32 {
        self.yaw_rate_sp
    }

    /// Run both loops for `dt` seconds.
    ///
    /// Returns `false`, keeping the previous setpoints, if any axis ends up without an
    /// acceleration.
    pub fn update(&mut self, dt: f32) -> bool {
        let mut velocity_sp = Vector3::zeros();
        let mut acceleration_sp = Vector3::zeros();
        let mut integral = self.integral;

        for i in 0..3 {
            // 1. Velocity setpoint from the position error, with the velocity as feed forward
            velocity_sp[i] =
                if self.input.position[i].is_finite() && self.state.position[i].is_finite() {
                    finite_or(self.input.velocity[i], 0.)
                        + self.gains.position[i] * (self.input.position[i] - self.state.position[i])
                } else {
                    self.input.velocity[i]
                };

            // 2. Acceleration from the velocity error and its integral
            acceleration_sp[i] =
                if velocity_sp[i].is_finite() && self.state.velocity[i].is_finite() {
                    let error = velocity_sp[i] - self.state.velocity[i];
                    integral[i] = constrain_float(
                        integral[i] + self.gains.integral[i] * error * dt,
                        -GRAVITY,
                        GRAVITY,
                    );

                    self.gains.velocity[i] * error
                        + integral[i]
                        + finite_or(self.input.acceleration[i], 0.)
                } else {
                    self.input.acceleration[i]
                };
        }

        if !acceleration_sp.iter().all(|a| a.is_finite()) {
            return false;
        }

        // 3. Multiply by the mass after removing gravity to get the force
        self.force = (acceleration_sp - Vector3::new(0., 0., GRAVITY)) * self.gains.mass;
        self.position_sp = self.input.position;
        self.velocity_sp = velocity_sp;
        self.acceleration_sp = acceleration_sp;
        self.integral = integral;

        self.yaw_sp = if self.input.yaw.is_finite() {
            self.input.yaw
        } else {
            finite_or(self.state.yaw, 0.)
        };
        self.yaw_rate_sp = finite_or(self.input.yaw_rate, 0.);

        true
    }

    pub fn local_position_setpoint(&self) -> LocalPositionSetpoint {
        LocalPositionSetpoint {
            timestamp: 0,
            position: self.position_sp,
            velocity: self.velocity_sp,
            acceleration: self.acceleration_sp,
            thrust: self.force,
            yaw: self.yaw_sp,
            yaw_rate: self.yaw_rate_sp,
        }
    }
}
