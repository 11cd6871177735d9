//! Asynchronous runner for the control cycle.
//!
//! The cycle runs on a tokio task whenever a new local position sample arrives. Every
//! other input is the latest value of a [`watch`] channel, copied once at the start of
//! the cycle. Without samples the task still wakes up every [`FALLBACK_PERIOD`] to pick
//! up new parameters.

use crate::config::Params;
use crate::control::law::{ControlLaw, ControlOutput};
use crate::control::{CycleInputs, CycleOutputs, PositionAttitudeControl};
use crate::msg::{
    AttitudeSetpoint, ControlMode, ForceTorque, LandDetected, LocalPosition,
    LocalPositionSetpoint, TakeoffStatus, TiltServoSetpoint, TrajectorySetpoint,
    VehicleConstraints,
};
use crate::Error;
use embedded_time::{clock, fraction::Fraction, Clock, Instant};
use log::{info, warn};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Period of the fallback wake up without new samples.
pub const FALLBACK_PERIOD: Duration = Duration::from_millis(100);

/// Microseconds since the clock was created, from the operating system's monotonic clock.
#[derive(Clone, Copy, Debug)]
pub struct SystemClock {
    start: std::time::Instant,
}

impl Default for SystemClock {
    fn default() -> Self {
        Self {
            start: std::time::Instant::now(),
        }
    }
}

impl Clock for SystemClock {
    type T = u64;

    const SCALING_FACTOR: Fraction = Fraction::new(1, 1_000_000);

    fn try_now(&self) -> Result<Instant<Self>, clock::Error> {
        let micros = u64::try_from(self.start.elapsed().as_micros())
            .map_err(|_| clock::Error::Unspecified)?;
        Ok(Instant::new(micros))
    }
}

/// Latest value of an input topic.
#[derive(Debug)]
pub struct Subscription<T> {
    receiver: watch::Receiver<T>,
}

impl<T: Clone> Subscription<T> {
    pub fn new(receiver: watch::Receiver<T>) -> Self {
        Self { receiver }
    }

    /// The value published since the last read, if any.
    pub fn update(&mut self) -> Option<T> {
        match self.receiver.has_changed() {
            Ok(true) => Some(self.receiver.borrow_and_update().clone()),
            _ => None,
        }
    }

    /// The latest value, marking it as read.
    pub fn latest(&mut self) -> T {
        self.receiver.borrow_and_update().clone()
    }
}

/// Input topics of the control task.
#[derive(Debug)]
pub struct Subscriptions {
    pub local_position: Subscription<LocalPosition>,
    pub control_mode: Subscription<ControlMode>,
    pub land_detected: Subscription<LandDetected>,
    pub constraints: Subscription<VehicleConstraints>,
    pub trajectory_setpoint: Subscription<TrajectorySetpoint>,
    pub force_torque: Subscription<ForceTorque>,
    pub params: Subscription<Params>,
}

/// Publishing ends of the [`Subscriptions`] topics.
#[derive(Debug)]
pub struct Inputs {
    pub local_position: watch::Sender<LocalPosition>,
    pub control_mode: watch::Sender<ControlMode>,
    pub land_detected: watch::Sender<LandDetected>,
    pub constraints: watch::Sender<VehicleConstraints>,
    pub trajectory_setpoint: watch::Sender<TrajectorySetpoint>,
    pub force_torque: watch::Sender<ForceTorque>,
    pub params: watch::Sender<Params>,
}

impl Subscriptions {
    /// Create every input topic, starting from `params`.
    pub fn channel(params: Params) -> (Inputs, Self) {
        let (local_position, local_position_rx) = watch::channel(LocalPosition::default());
        let (control_mode, control_mode_rx) = watch::channel(ControlMode::default());
        let (land_detected, land_detected_rx) = watch::channel(LandDetected::default());
        let (constraints, constraints_rx) = watch::channel(VehicleConstraints::default());
        let (trajectory_setpoint, trajectory_setpoint_rx) =
            watch::channel(TrajectorySetpoint::default());
        let (force_torque, force_torque_rx) = watch::channel(ForceTorque::default());
        let (params, params_rx) = watch::channel(params);

        let inputs = Inputs {
            local_position,
            control_mode,
            land_detected,
            constraints,
            trajectory_setpoint,
            force_torque,
            params,
        };
        let subscriptions = Self {
            local_position: Subscription::new(local_position_rx),
            control_mode: Subscription::new(control_mode_rx),
            land_detected: Subscription::new(land_detected_rx),
            constraints: Subscription::new(constraints_rx),
            trajectory_setpoint: Subscription::new(trajectory_setpoint_rx),
            force_torque: Subscription::new(force_torque_rx),
            params: Subscription::new(params_rx),
        };
        (inputs, subscriptions)
    }

    /// Copy every input once for the cycle triggered by a new local position.
    pub fn snapshot(&mut self) -> CycleInputs {
        CycleInputs {
            local_position: self.local_position.latest(),
            control_mode: self.control_mode.latest(),
            land_detected: self.land_detected.latest(),
            constraints: self.constraints.latest(),
            trajectory_setpoint: self.trajectory_setpoint.update(),
            force_torque: self.force_torque.update(),
        }
    }
}

/// Output topics of the control task.
#[derive(Debug)]
pub struct Publications {
    pub local_position_setpoint: watch::Sender<Option<LocalPositionSetpoint>>,
    pub control_output: watch::Sender<Option<ControlOutput>>,
    pub attitude_setpoint: watch::Sender<Option<AttitudeSetpoint>>,
    pub tilt_servo: watch::Sender<Option<TiltServoSetpoint>>,
    pub takeoff_status: watch::Sender<Option<TakeoffStatus>>,
}

impl Default for Publications {
    fn default() -> Self {
        Self {
            local_position_setpoint: watch::channel(None).0,
            control_output: watch::channel(None).0,
            attitude_setpoint: watch::channel(None).0,
            tilt_servo: watch::channel(None).0,
            takeoff_status: watch::channel(None).0,
        }
    }
}

impl Publications {
    pub fn publish(&self, outputs: &CycleOutputs) {
        self.local_position_setpoint
            .send_replace(Some(outputs.local_position_setpoint));
        self.control_output.send_replace(Some(outputs.control_output));

        if let Some(attitude_setpoint) = outputs.attitude_setpoint {
            self.attitude_setpoint.send_replace(Some(attitude_setpoint));
        }
        if let Some(tilt_servo) = outputs.tilt_servo {
            self.tilt_servo.send_replace(Some(tilt_servo));
        }
        if let Some(takeoff_status) = outputs.takeoff_status {
            self.takeoff_status.send_replace(Some(takeoff_status));
        }
    }
}

/// Spawn the control task.
///
/// The task ends with `Ok` once `stop` reads `true` (or its sender is dropped) and with
/// [`Error::TaskStopped`] if the local position source goes away.
pub fn spawn<C, L>(
    control: PositionAttitudeControl<C, L>,
    subscriptions: Subscriptions,
    publications: Publications,
    stop: watch::Receiver<bool>,
) -> JoinHandle<Result<(), Error>>
where
    C: Clock<T = u64> + Send + 'static,
    L: ControlLaw + Send + 'static,
{
    tokio::spawn(run(control, subscriptions, publications, stop))
}

/// Run the control task on the current task.
pub async fn run<C, L>(
    mut control: PositionAttitudeControl<C, L>,
    mut subscriptions: Subscriptions,
    publications: Publications,
    mut stop: watch::Receiver<bool>,
) -> Result<(), Error>
where
    C: Clock<T = u64>,
    L: ControlLaw,
{
    info!("position control task started");
    let mut params_available = true;

    loop {
        if *stop.borrow() {
            info!("position control task stopped");
            return Ok(());
        }

        let has_sample = tokio::select! {
            changed = stop.changed() => {
                if changed.is_err() {
                    info!("stop signal dropped, position control task stopped");
                    return Ok(());
                }
                continue;
            }
            changed = tokio::time::timeout(
                FALLBACK_PERIOD,
                subscriptions.local_position.receiver.changed(),
            ) => {
                match changed {
                    Ok(Ok(())) => true,
                    Ok(Err(_)) => {
                        warn!("local position source closed");
                        return Err(Error::TaskStopped);
                    }
                    Err(_elapsed) => false,
                }
            }
        };

        if let Err(error) = refresh_params(&mut control, &mut subscriptions.params) {
            if params_available {
                warn!("{}, keeping the current parameters", error);
            }
            params_available = false;
        }

        if has_sample {
            let inputs = subscriptions.snapshot();
            if let Some(outputs) = control.run_cycle(&inputs) {
                publications.publish(&outputs);
            }
        }
    }
}

/// Apply the parameters published since the last cycle.
///
/// A rejected epoch is logged by the controller and leaves the current one in place.
fn refresh_params<C, L>(
    control: &mut PositionAttitudeControl<C, L>,
    params: &mut Subscription<Params>,
) -> Result<(), Error>
where
    C: Clock<T = u64>,
    L: ControlLaw,
{
    match params.receiver.has_changed() {
        Ok(true) => {
            control.update_params(&params.latest()).ok();
            Ok(())
        }
        Ok(false) => Ok(()),
        Err(_) => Err(Error::ParamsUnavailable),
    }
}
