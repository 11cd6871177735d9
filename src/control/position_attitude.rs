//! The position and attitude control cycle.
//!
//! One call to [`PositionAttitudeControl::run_cycle`] handles one local position sample:
//! 1. Clamp the cycle time and assemble the vehicle state.
//! 2. Correct the held setpoint for estimator resets.
//! 3. Decide on takeoff and advance the [`Takeoff`] state machine.
//! 4. Slew the tilt limit, then shape the setpoint with the [`AdmittanceFilter`].
//! 5. Run the [`ControlLaw`] and compose the outputs.

use super::admittance::{AdmittanceFilter, AdmittanceGains};
use super::law::{
    AnyControlLaw, ControlLaw, ControlOutput, PositionGains, PositionInput, PositionState,
};
use super::takeoff::{Takeoff, TakeoffState};
use crate::config::Params;
use crate::filter::{Derivative, Hysteresis, SlewRate};
use crate::msg::{
    AttitudeSetpoint, ControlMode, ForceTorque, LandDetected, LocalPosition,
    LocalPositionSetpoint, ResetCounters, TakeoffStatus, TiltServoSetpoint, TrajectorySetpoint,
    VehicleConstraints,
};
use crate::{constrain_float, is_equal_f, Error};
use embedded_time::{duration::Microseconds, Clock};
use log::{debug, info, warn};
use nalgebra::{Matrix3, Rotation3, Vector3};
use num_traits::Float;

/// Bounds of the cycle time (in seconds).
pub const DT_MIN: f32 = 0.002;
pub const DT_MAX: f32 = 0.04;

/// Cycles between two traces of the yaw setpoint.
pub const TRACE_PERIOD: u32 = 100;

/// Maximum age of a setpoint that can request a takeoff (in microseconds).
const TAKEOFF_SETPOINT_TIMEOUT_US: u64 = 1_000_000;

/// Rate the tilt limit moves at (in rad/s).
const TILT_LIMIT_SLEW_RATE: f32 = 0.2;

/// Cutoff of the velocity derivative filters (in Hz).
const VELOCITY_DERIVATIVE_CUTOFF: f32 = 5.;

/// Downward acceleration requested on the ground so the law commands no thrust (in m/s^2).
const GROUND_ACCELERATION: f32 = 100.;

/// Inputs of one cycle, copied from the transport when the local position arrives.
#[derive(Clone, Copy, Debug, Default)]
pub struct CycleInputs {
    pub local_position: LocalPosition,
    pub control_mode: ControlMode,
    pub land_detected: LandDetected,
    pub constraints: VehicleConstraints,
    /// Trajectory setpoint received since the previous cycle.
    pub trajectory_setpoint: Option<TrajectorySetpoint>,
    /// Force/torque sample received since the previous cycle.
    pub force_torque: Option<ForceTorque>,
}

/// Everything one enabled cycle publishes.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CycleOutputs {
    /// Thrust normalized by the maximum thrust.
    pub local_position_setpoint: LocalPositionSetpoint,
    pub control_output: ControlOutput,
    pub attitude_setpoint: Option<AttitudeSetpoint>,
    /// Set for horizontally tilting airframes with an attitude output.
    pub tilt_servo: Option<TiltServoSetpoint>,
    /// Set when the takeoff state or tilt limit changed.
    pub takeoff_status: Option<TakeoffStatus>,
}

/// Split the pitch of `rotation` off into a tilt servo angle within `[min, max]`.
///
/// Returns the servo angle and the attitude rebuilt from the remaining roll and yaw.
pub fn split_horizontal_tilt(
    rotation: &Rotation3<f32>,
    min: f32,
    max: f32,
) -> (f32, Rotation3<f32>) {
    let (roll, pitch, yaw) = rotation.euler_angles();
    let servo = constrain_float(pitch, min, max);

    // Rz(yaw) * Rx(roll), the Euler composition with zero pitch
    let (sr, cr) = Float::sin_cos(roll);
    let (sy, cy) = Float::sin_cos(yaw);
    let matrix = Matrix3::new(
        cy, -sy * cr, sy * sr, //
        sy, cy * cr, -cy * sr, //
        0., sr, cr,
    );

    (servo, Rotation3::from_matrix_unchecked(matrix))
}

/// Position and attitude control around a [`ControlLaw`].
pub struct PositionAttitudeControl<C, L = AnyControlLaw> {
    pub(super) clock: C,
    pub(super) control: L,
    pub(super) params: Params,
    pub(super) admittance: AdmittanceFilter,
    pub(super) takeoff: Takeoff,
    pub(super) tilt_limit: SlewRate,
    pub(super) failsafe_land: Hysteresis,
    pub(super) velocity_derivative: [Derivative; 3],

    /// Held trajectory setpoint, corrected in place every cycle.
    pub(super) setpoint: TrajectorySetpoint,
    pub(super) reset_counters: ResetCounters,
    pub(super) last_sample_us: u64,
    pub(super) is_active: bool,
    pub(super) counter: u32,
    pub(super) takeoff_status: TakeoffStatus,
}

impl<C, L> PositionAttitudeControl<C, L>
where
    C: Clock<T = u64>,
    L: ControlLaw,
{
    pub(super) fn new(clock: C, control: L, params: Params) -> Result<Self, Error> {
        params.validate()?;
        let last_sample_us = micros_since_epoch(&clock)?;

        let mut me = Self {
            clock,
            control,
            admittance: AdmittanceFilter::new(AdmittanceGains::new(
                &params.admittance,
                &params.admittance_yaw,
            )?),
            params,
            takeoff: Takeoff::default(),
            tilt_limit: SlewRate::new(TILT_LIMIT_SLEW_RATE),
            failsafe_land: Hysteresis::new(false),
            velocity_derivative: [Derivative::with_cutoff(VELOCITY_DERIVATIVE_CUTOFF); 3],
            setpoint: TrajectorySetpoint::default(),
            reset_counters: ResetCounters::default(),
            last_sample_us,
            is_active: false,
            counter: 0,
            takeoff_status: TakeoffStatus {
                timestamp: 0,
                state: TakeoffState::Disarmed,
                tilt_limit: 0.,
            },
        };
        me.apply_params();
        Ok(me)
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    pub fn control_law(&self) -> &L {
        &self.control
    }

    pub fn admittance(&self) -> &AdmittanceFilter {
        &self.admittance
    }

    pub fn takeoff_state(&self) -> TakeoffState {
        self.takeoff.state()
    }

    /// Current tilt limit (in radians).
    pub fn tilt_limit(&self) -> f32 {
        self.tilt_limit.state()
    }

    pub fn setpoint(&self) -> &TrajectorySetpoint {
        &self.setpoint
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    /// Failsafe landing request.
    ///
    /// Successful control law updates confirm `false` and a failed update only withholds
    /// that confirmation, so this never turns `true` on its own.
    pub fn failsafe_land(&self) -> bool {
        self.failsafe_land.state()
    }

    /// Apply a new parameter epoch.
    ///
    /// An epoch that fails validation is rejected and the previous one stays in use.
    pub fn update_params(&mut self, params: &Params) -> Result<(), Error> {
        if let Err(error) = params.validate() {
            warn!("rejecting parameters: {}", error);
            return Err(error);
        }
        if params.control_law != self.params.control_law {
            warn!(
                "control law changes from {:?} to {:?} need a restart",
                self.params.control_law, params.control_law
            );
        }

        self.params = params.clone();
        self.apply_params();
        Ok(())
    }

    fn apply_params(&mut self) {
        self.control.set_gains(&PositionGains::from(&self.params.position));

        let gains = AdmittanceGains::new(&self.params.admittance, &self.params.admittance_yaw);
        if let Err(error) = gains.and_then(|gains| self.admittance.set_gains(gains)) {
            warn!("keeping admittance gains: {}", error);
        }

        self.takeoff.set_spoolup_time(self.params.spoolup_time);
        self.takeoff.set_takeoff_ramp_time(self.params.takeoff_ramp_time);
        self.takeoff.generate_initial_ramp_value(self.params.z_vel_p_acc);
    }

    /// Run one cycle for a new local position sample.
    ///
    /// Returns `None` when this loop is disabled and publishes nothing.
    pub fn run_cycle(&mut self, inputs: &CycleInputs) -> Option<CycleOutputs> {
        self.counter = (self.counter + 1) % TRACE_PERIOD;

        let local_position = &inputs.local_position;
        let sample_us = local_position.timestamp_sample;
        let dt = constrain_float(
            sample_us.saturating_sub(self.last_sample_us) as f32 * 1e-6,
            DT_MIN,
            DT_MAX,
        );
        self.last_sample_us = sample_us;

        let state = self.vehicle_state(local_position, dt);

        let outputs = if inputs.control_mode.enabled {
            Some(self.run_enabled(inputs, state, dt))
        } else {
            if self.is_active {
                info!("position control deactivated");
            }
            self.is_active = false;
            self.takeoff.update_takeoff_state(
                inputs.control_mode.armed,
                inputs.land_detected.landed,
                false,
                true,
                sample_us,
            );
            None
        };

        self.reset_counters = local_position.reset_counters;
        outputs
    }

    fn run_enabled(
        &mut self,
        inputs: &CycleInputs,
        mut state: PositionState,
        dt: f32,
    ) -> CycleOutputs {
        let local_position = &inputs.local_position;
        let mode = inputs.control_mode;
        let land = inputs.land_detected;
        let sample_us = local_position.timestamp_sample;
        let now_us = self.now_us(local_position.timestamp);

        let is_setpoint_updated = match inputs.trajectory_setpoint {
            Some(setpoint) => {
                self.setpoint = setpoint;
                true
            }
            None => false,
        };

        if !self.is_active || !mode.armed {
            if !self.is_active {
                info!("position control activated");
            }
            self.is_active = true;
            self.control.reset_integral();
            self.admittance.reset();
        }

        let force_torque = inputs.force_torque.unwrap_or_default();

        self.apply_reset_deltas(local_position);

        let mut constraints = inputs.constraints;
        if !constraints.speed_up.is_finite() || constraints.speed_up > self.params.z_vel_max_up {
            constraints.speed_up = self.params.z_vel_max_up;
        }

        if mode.offboard {
            constraints.want_takeoff = self.want_takeoff(&mode, &land, &state, now_us);
            constraints.speed_up = self.params.z_vel_max_up;
            constraints.speed_down = self.params.z_vel_max_dn;
        }

        self.takeoff.update_takeoff_state(
            mode.armed,
            land.landed,
            constraints.want_takeoff,
            false,
            sample_us,
        );
        let flying = self.takeoff.is_flying();

        if is_setpoint_updated {
            // Keep feed forward from amending the takeoff ramp
            if !flying {
                self.setpoint.acceleration.z = f32::NAN;
            }

            let not_taken_off = self.takeoff.state() < TakeoffState::Rampup;
            let flying_but_ground_contact = flying && land.ground_contact;
            if not_taken_off || flying_but_ground_contact {
                self.setpoint.reset_to_nan();
                self.setpoint.acceleration = Vector3::new(0., 0., GROUND_ACCELERATION);
                self.control.reset_integral();
                debug!("on the ground, holding zero thrust");
            }
        }

        let tilt_limit_deg = if self.takeoff.state() < TakeoffState::Flight {
            self.params.tilt_max_lnd
        } else {
            self.params.tilt_max_air
        };
        self.tilt_limit.update(tilt_limit_deg.to_radians(), dt);

        self.admittance.step(&force_torque, dt, &mut self.setpoint);

        self.control.set_input_setpoint(&PositionInput {
            position: self.setpoint.position,
            velocity: self.setpoint.velocity,
            acceleration: self.setpoint.acceleration,
            yaw: self.setpoint.yaw,
            yaw_rate: self.setpoint.yaw_rate,
            yaw_acceleration: 0.,
        });

        if self.counter == 0 {
            debug!(
                "yaw setpoint {} rate {}, yaw admittance {} {} {}",
                self.setpoint.yaw,
                self.setpoint.yaw_rate,
                self.admittance.y,
                self.admittance.yd,
                self.admittance.ydd
            );
        }

        let speed_up = if constraints.speed_up.is_finite() {
            constraints.speed_up
        } else {
            self.params.z_vel_max_up
        };
        self.takeoff.update_ramp(dt, speed_up);

        self.blend_vertical_velocity(&mut state, local_position);
        self.control.set_state(&state);

        if self.control.update(dt) {
            self.failsafe_land.set_state_and_update(false, sample_us);
        } else {
            warn!("position control update failed, keeping the last output");
        }

        self.compose_outputs(now_us)
    }

    /// Position and velocity components are only used when finite and flagged valid.
    fn vehicle_state(&mut self, local_position: &LocalPosition, dt: f32) -> PositionState {
        let mut state = PositionState::default();
        let position = &local_position.position;
        let velocity = &local_position.velocity;

        if position.x.is_finite() && position.y.is_finite() && local_position.xy_valid {
            state.position.x = position.x;
            state.position.y = position.y;
        }
        if position.z.is_finite() && local_position.z_valid {
            state.position.z = position.z;
        }

        let valid = [
            local_position.v_xy_valid && velocity.x.is_finite() && velocity.y.is_finite(),
            local_position.v_xy_valid && velocity.x.is_finite() && velocity.y.is_finite(),
            local_position.v_z_valid && velocity.z.is_finite(),
        ];
        for (i, derivative) in self.velocity_derivative.iter_mut().enumerate() {
            if valid[i] {
                state.velocity[i] = velocity[i];
                state.acceleration[i] = derivative.update(velocity[i], dt);
            } else {
                // Avoid an acceleration spike when the velocity comes back
                derivative.reset();
            }
        }

        if local_position.heading.is_finite() {
            state.yaw = local_position.heading;
        }

        state
    }

    /// Shift the held setpoint by the jumps of every reset counter that changed.
    fn apply_reset_deltas(&mut self, local_position: &LocalPosition) {
        if self.setpoint.timestamp >= local_position.timestamp {
            return;
        }

        let counters = &local_position.reset_counters;
        let setpoint = &mut self.setpoint;

        if counters.vxy != self.reset_counters.vxy {
            setpoint.velocity.x += local_position.delta_vxy[0];
            setpoint.velocity.y += local_position.delta_vxy[1];
        }
        if counters.vz != self.reset_counters.vz {
            setpoint.velocity.z += local_position.delta_vz;
        }
        if counters.xy != self.reset_counters.xy {
            setpoint.position.x += local_position.delta_xy[0];
            setpoint.position.y += local_position.delta_xy[1];
        }
        if counters.z != self.reset_counters.z {
            setpoint.position.z += local_position.delta_z;
        }
        if counters.heading != self.reset_counters.heading {
            setpoint.yaw += local_position.delta_heading;
        }
    }

    /// A recent offboard setpoint asks for a takeoff if it leads upwards.
    fn want_takeoff(
        &self,
        mode: &ControlMode,
        land: &LandDetected,
        state: &PositionState,
        now_us: u64,
    ) -> bool {
        let is_recent =
            now_us.saturating_sub(self.setpoint.timestamp) < TAKEOFF_SETPOINT_TIMEOUT_US;
        if !(mode.armed && land.landed && is_recent) {
            return false;
        }

        let setpoint = &self.setpoint;
        (setpoint.position.z.is_finite() && setpoint.position.z < state.position.z)
            || (setpoint.velocity.z.is_finite() && setpoint.velocity.z < 0.)
            || (setpoint.acceleration.z.is_finite() && setpoint.acceleration.z < 0.)
    }

    /// Blend the vertical velocity toward the altitude derivative when climbing or
    /// descending without an altitude setpoint.
    ///
    /// Below the landing speed the derivative is ramped in, above it it is used alone.
    fn blend_vertical_velocity(&self, state: &mut PositionState, local_position: &LocalPosition) {
        let vz_sp = self.setpoint.velocity.z;
        if !self.setpoint.position.z.is_finite()
            && vz_sp.is_finite()
            && Float::abs(vz_sp) > f32::EPSILON
            && local_position.z_deriv.is_finite()
            && local_position.z_valid
            && local_position.v_z_valid
        {
            let weighting = (Float::abs(vz_sp) / self.params.land_speed).min(1.);
            state.velocity.z = local_position.z_deriv * weighting
                + local_position.velocity.z * (1. - weighting);
        }
    }

    fn compose_outputs(&mut self, now_us: u64) -> CycleOutputs {
        let max_thrust = self.params.max_thrust;

        let mut local_position_setpoint = self.control.local_position_setpoint();
        local_position_setpoint.timestamp = now_us;
        local_position_setpoint.thrust /= max_thrust;

        let mut control_output = self.control.control_output();
        let mut tilt_servo = None;
        if self.params.is_horizontal_tilting() {
            if let ControlOutput::Attitude { rotation, .. } = &mut control_output {
                let (angle, level) = split_horizontal_tilt(
                    rotation,
                    self.params.servo_pitch_min,
                    self.params.servo_pitch_max,
                );
                *rotation = level;
                tilt_servo = Some(TiltServoSetpoint {
                    timestamp: now_us,
                    angle,
                });
            }
        }

        let attitude_setpoint = match control_output {
            ControlOutput::Attitude {
                rotation,
                thrust,
                yaw_rate,
            } => Some(AttitudeSetpoint {
                timestamp: now_us,
                rotation,
                thrust_body: thrust / max_thrust,
                yaw_sp_move_rate: yaw_rate,
            }),
            ControlOutput::Tilt { rotation, thrust } => Some(AttitudeSetpoint {
                timestamp: now_us,
                rotation,
                thrust_body: thrust / max_thrust,
                yaw_sp_move_rate: local_position_setpoint.yaw_rate,
            }),
            ControlOutput::Acceleration { .. } => None,
        };

        let state = self.takeoff.state();
        let tilt_limit = self.tilt_limit.state();
        let takeoff_status = if state != self.takeoff_status.state
            || !is_equal_f(tilt_limit, self.takeoff_status.tilt_limit)
        {
            self.takeoff_status = TakeoffStatus {
                timestamp: now_us,
                state,
                tilt_limit,
            };
            Some(self.takeoff_status)
        } else {
            None
        };

        CycleOutputs {
            local_position_setpoint,
            control_output,
            attitude_setpoint,
            tilt_servo,
            takeoff_status,
        }
    }

    fn now_us(&self, fallback_us: u64) -> u64 {
        match micros_since_epoch(&self.clock) {
            Ok(now) => now,
            Err(error) => {
                warn!("{}, using the sample time", error);
                fallback_us
            }
        }
    }
}

fn micros_since_epoch<C: Clock<T = u64>>(clock: &C) -> Result<u64, Error> {
    let instant = clock.try_now()?;
    let micros = Microseconds::<u64>::try_from(instant.duration_since_epoch())?;
    Ok(micros.0)
}
