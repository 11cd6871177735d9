//! Small discrete-time signal blocks used by the control loop.

use core::f32::consts::PI;

/// First order low pass filter with a fixed cutoff frequency.
#[derive(Clone, Copy, Debug)]
pub struct LowPassFilter {
    cutoff_freq: f32,
    output: f32,
    is_initialised: bool,
}

impl LowPassFilter {
    pub fn with_cutoff(cutoff_freq: f32) -> Self {
        Self {
            cutoff_freq,
            output: 0.,
            is_initialised: false,
        }
    }

    pub fn output(&self) -> f32 {
        self.output
    }

    pub fn cutoff_freq(&self) -> f32 {
        self.cutoff_freq
    }

    /// Filter `sample` taken `dt` seconds after the previous one.
    ///
    /// The first sample (and any sample with a non-positive cutoff or `dt`) passes
    /// straight through.
    pub fn apply(&mut self, sample: f32, dt: f32) -> f32 {
        if !self.is_initialised || !self.output.is_finite() {
            self.reset(sample);
            return self.output;
        }

        let alpha = alpha(dt, self.cutoff_freq);
        self.output += alpha * (sample - self.output);
        self.output
    }

    pub fn reset(&mut self, value: f32) {
        self.is_initialised = true;
        self.output = value;
    }
}

/// Smoothing factor of a first order low pass filter.
pub fn alpha(dt: f32, cutoff_freq: f32) -> f32 {
    if cutoff_freq <= 0. || dt <= 0. {
        return 1.;
    }

    let b = 2. * PI * cutoff_freq * dt;
    b / (1. + b)
}

/// Low pass filtered derivative of a signal.
#[derive(Clone, Copy, Debug)]
pub struct Derivative {
    last_input: f32,
    low_pass: LowPassFilter,
    is_initialised: bool,
}

impl Derivative {
    pub fn with_cutoff(cutoff_freq: f32) -> Self {
        Self {
            last_input: 0.,
            low_pass: LowPassFilter::with_cutoff(cutoff_freq),
            is_initialised: false,
        }
    }

    /// Update with a new input, returning the filtered rate of change.
    ///
    /// The first update after a reset has no previous input and returns zero.
    pub fn update(&mut self, input: f32, dt: f32) -> f32 {
        let output = if self.is_initialised && dt > 0. {
            self.low_pass.apply((input - self.last_input) / dt, dt)
        } else {
            self.low_pass.reset(0.);
            self.is_initialised = true;
            0.
        };
        self.last_input = input;
        output
    }

    pub fn reset(&mut self) {
        self.is_initialised = false;
        self.last_input = 0.;
        self.low_pass.reset(0.);
    }
}

/// Moves a value toward a target no faster than a fixed rate.
#[derive(Clone, Copy, Debug, Default)]
pub struct SlewRate {
    slew_rate: f32,
    value: f32,
}

impl SlewRate {
    /// Create a slew limiter starting at zero, moving at most `slew_rate` units per second.
    pub fn new(slew_rate: f32) -> Self {
        Self {
            slew_rate,
            value: 0.,
        }
    }

    pub fn set_slew_rate(&mut self, slew_rate: f32) {
        self.slew_rate = slew_rate;
    }

    pub fn set_for_current_value(&mut self, value: f32) {
        self.value = value;
    }

    pub fn state(&self) -> f32 {
        self.value
    }

    /// Step toward `target` over `dt` seconds and return the new value.
    pub fn update(&mut self, target: f32, dt: f32) -> f32 {
        let max_step = self.slew_rate * dt;
        let step = (target - self.value).max(-max_step).min(max_step);
        self.value += step;
        self.value
    }
}

/// A boolean that only changes after the requested state has held for a set time.
#[derive(Clone, Copy, Debug)]
pub struct Hysteresis {
    state: bool,
    requested_state: bool,
    /// Time (in microseconds) `false` must be requested before leaving `true`.
    time_from_true_us: u64,
    /// Time (in microseconds) `true` must be requested before leaving `false`.
    time_from_false_us: u64,
    last_time_to_change_state: u64,
}

impl Hysteresis {
    pub fn new(initial_state: bool) -> Self {
        Self {
            state: initial_state,
            requested_state: initial_state,
            time_from_true_us: 0,
            time_from_false_us: 0,
            last_time_to_change_state: 0,
        }
    }

    pub fn state(&self) -> bool {
        self.state
    }

    /// Set how long a change away from `from_state` must be requested.
    pub fn set_hysteresis_time_from(&mut self, from_state: bool, micros: u64) {
        if from_state {
            self.time_from_true_us = micros;
        } else {
            self.time_from_false_us = micros;
        }
    }

    pub fn set_state_and_update(&mut self, new_state: bool, now_us: u64) {
        if new_state != self.state {
            if new_state != self.requested_state {
                self.requested_state = new_state;
                self.last_time_to_change_state = now_us;
            }
        } else {
            self.requested_state = self.state;
        }

        self.update(now_us);
    }

    pub fn update(&mut self, now_us: u64) {
        if self.requested_state == self.state {
            return;
        }

        let elapsed = now_us.saturating_sub(self.last_time_to_change_state);
        let hold = if self.state {
            self.time_from_true_us
        } else {
            self.time_from_false_us
        };

        if elapsed >= hold {
            self.state = self.requested_state;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn low_pass_converges_to_a_constant() {
        let mut filter = LowPassFilter::with_cutoff(5.);
        assert_relative_eq!(filter.apply(0., 0.01), 0.);

        let mut last = 0.;
        for _ in 0..200 {
            let output = filter.apply(1., 0.01);
            assert!(output >= last);
            last = output;
        }
        assert_relative_eq!(last, 1., epsilon = 1e-3);
    }

    #[test]
    fn derivative_of_a_ramp() {
        let mut derivative = Derivative::with_cutoff(0.);
        assert_relative_eq!(derivative.update(0., 0.01), 0.);
        assert_relative_eq!(derivative.update(0.02, 0.01), 2., epsilon = 1e-4);

        derivative.reset();
        assert_relative_eq!(derivative.update(10., 0.01), 0.);
    }

    #[test]
    fn slew_rate_limits_each_step() {
        let mut slew = SlewRate::new(0.2);
        assert_relative_eq!(slew.update(1., 0.5), 0.1);
        assert_relative_eq!(slew.update(1., 0.5), 0.2);
        assert_relative_eq!(slew.update(0.15, 0.5), 0.15);
        assert_relative_eq!(slew.state(), 0.15);
    }

    #[test]
    fn hysteresis_waits_before_switching() {
        let mut hysteresis = Hysteresis::new(false);
        hysteresis.set_hysteresis_time_from(false, 1_000);

        hysteresis.set_state_and_update(true, 10_000);
        assert!(!hysteresis.state());
        hysteresis.set_state_and_update(true, 10_999);
        assert!(!hysteresis.state());
        hysteresis.set_state_and_update(true, 11_000);
        assert!(hysteresis.state());

        // No hold time from true
        hysteresis.set_state_and_update(false, 11_001);
        assert!(!hysteresis.state());
    }

    #[test]
    fn hysteresis_restarts_when_request_drops() {
        let mut hysteresis = Hysteresis::new(false);
        hysteresis.set_hysteresis_time_from(false, 1_000);

        hysteresis.set_state_and_update(true, 0);
        hysteresis.set_state_and_update(false, 500);
        hysteresis.set_state_and_update(true, 900);
        hysteresis.set_state_and_update(true, 1_500);
        assert!(!hysteresis.state());
        hysteresis.set_state_and_update(true, 1_900);
        assert!(hysteresis.state());
    }
}
