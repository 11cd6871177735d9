use crate::filter::Hysteresis;
use crate::{lerp, GRAVITY};

/// Takeoff progress of the vehicle, ordered from disarmed to flying.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum TakeoffState {
    #[default]
    Disarmed = 0,
    /// Armed, waiting for the motors to spool up.
    Spoolup = 1,
    ReadyForTakeoff = 2,
    /// Climbing with a ramped vertical velocity limit.
    Rampup = 3,
    Flight = 4,
}

/// Takeoff state machine and vertical velocity ramp.
#[derive(Clone, Copy, Debug)]
pub struct Takeoff {
    state: TakeoffState,
    /// Duration of the velocity ramp (in seconds).
    ramp_time: f32,
    /// Vertical velocity the ramp starts from (in m/s, NED).
    ramp_vz_init: f32,
    ramp_progress: f32,
    spoolup: Hysteresis,
}

impl Default for Takeoff {
    fn default() -> Self {
        let mut takeoff = Self {
            state: TakeoffState::Disarmed,
            ramp_time: 3.,
            ramp_vz_init: 0.,
            ramp_progress: 0.,
            spoolup: Hysteresis::new(false),
        };
        takeoff.set_spoolup_time(1.);
        takeoff.generate_initial_ramp_value(4.);
        takeoff
    }
}

impl Takeoff {
    pub fn state(&self) -> TakeoffState {
        self.state
    }

    /// True once the takeoff completed.
    pub fn is_flying(&self) -> bool {
        self.state >= TakeoffState::Flight
    }

    pub fn ramp_progress(&self) -> f32 {
        self.ramp_progress
    }

    /// Set how long the vehicle must be armed before the motors are considered spooled up.
    pub fn set_spoolup_time(&mut self, seconds: f32) {
        let micros = (seconds.max(0.) * 1e6) as u64;
        self.spoolup.set_hysteresis_time_from(false, micros);
    }

    pub fn set_takeoff_ramp_time(&mut self, seconds: f32) {
        self.ramp_time = seconds;
    }

    /// Start the ramp at the velocity whose controller output just cancels gravity.
    pub fn generate_initial_ramp_value(&mut self, velocity_p_gain: f32) {
        let velocity_p_gain = velocity_p_gain.max(0.01);
        self.ramp_vz_init = -GRAVITY / velocity_p_gain;
    }

    /// Advance the state machine.
    ///
    /// `skip_takeoff` jumps straight to [`TakeoffState::Flight`] while armed, for modes
    /// that do not control altitude.
    pub fn update_takeoff_state(
        &mut self,
        armed: bool,
        landed: bool,
        want_takeoff: bool,
        skip_takeoff: bool,
        now_us: u64,
    ) {
        self.spoolup.set_state_and_update(armed, now_us);

        // Each satisfied condition falls through to the next state in the same update
        loop {
            self.state = match self.state {
                TakeoffState::Disarmed if armed => TakeoffState::Spoolup,
                TakeoffState::Spoolup if self.spoolup.state() => TakeoffState::ReadyForTakeoff,
                TakeoffState::ReadyForTakeoff if want_takeoff => {
                    self.ramp_progress = 0.;
                    TakeoffState::Rampup
                }
                TakeoffState::Rampup if self.ramp_progress >= 1. => TakeoffState::Flight,
                TakeoffState::Flight => {
                    if landed {
                        self.state = TakeoffState::ReadyForTakeoff;
                    }
                    break;
                }
                _ => break,
            };
        }

        if armed && skip_takeoff {
            self.state = TakeoffState::Flight;
        }

        if !armed {
            self.state = TakeoffState::Disarmed;
        }
    }

    /// Advance the ramp by `dt` seconds and return the vertical velocity limit.
    ///
    /// Before the ramp the limit is the initial ramp value, after it `takeoff_desired_vz`.
    pub fn update_ramp(&mut self, dt: f32, takeoff_desired_vz: f32) -> f32 {
        if self.state < TakeoffState::Rampup {
            return self.ramp_vz_init;
        }

        if self.state == TakeoffState::Rampup {
            if self.ramp_time > dt {
                self.ramp_progress += dt / self.ramp_time;
            } else {
                self.ramp_progress = 1.;
            }

            if self.ramp_progress < 1. {
                return lerp(self.ramp_vz_init, takeoff_desired_vz, self.ramp_progress);
            }
        }

        takeoff_desired_vz
    }
}
