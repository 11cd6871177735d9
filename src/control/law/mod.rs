//! Position control laws.
//!
//! The control cycle hands every law the same state and setpoint through [`ControlLaw`]
//! and only differs in the [`ControlOutput`] it reads back. All laws share a cascaded
//! position/velocity PID producing the desired acceleration and force; they differ in how
//! that force is turned into an output.

use crate::config::PositionParams;
use crate::msg::LocalPositionSetpoint;
use nalgebra::{Rotation3, Vector3};
use serde::{Deserialize, Serialize};

mod geometric;
pub use geometric::Geometric;

mod pass_through;
pub use pass_through::PassThrough;

mod pid;
pub use pid::PositionPid;

mod tilt;
pub use tilt::Tilt;

/// Gains of the position/velocity PID.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PositionGains {
    pub position: Vector3<f32>,
    pub velocity: Vector3<f32>,
    pub integral: Vector3<f32>,
    /// Vehicle mass (in kg).
    pub mass: f32,
    /// Vertical integral after a reset (in m/s^2).
    pub start_z_int: f32,
}

impl Default for PositionGains {
    fn default() -> Self {
        Self {
            position: Vector3::new(1., 1., 1.),
            velocity: Vector3::new(2., 2., 4.),
            integral: Vector3::new(0., 0., 0.4),
            mass: 1.5,
            start_z_int: 0.,
        }
    }
}

impl From<&PositionParams> for PositionGains {
    fn from(params: &PositionParams) -> Self {
        Self {
            position: Vector3::new(params.xy_p, params.xy_p, params.z_p),
            velocity: Vector3::new(params.xy_v, params.xy_v, params.z_v),
            integral: Vector3::new(params.xy_i, params.xy_i, params.z_i),
            mass: params.mass,
            start_z_int: params.start_z_int,
        }
    }
}

/// Estimated vehicle state. Unknown components are NaN.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PositionState {
    pub position: Vector3<f32>,
    pub velocity: Vector3<f32>,
    pub acceleration: Vector3<f32>,
    pub yaw: f32,
}

impl Default for PositionState {
    fn default() -> Self {
        Self {
            position: Vector3::repeat(f32::NAN),
            velocity: Vector3::repeat(f32::NAN),
            acceleration: Vector3::repeat(f32::NAN),
            yaw: f32::NAN,
        }
    }
}

/// Setpoint handed to a law. Undefined components are NaN.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PositionInput {
    pub position: Vector3<f32>,
    pub velocity: Vector3<f32>,
    pub acceleration: Vector3<f32>,
    pub yaw: f32,
    pub yaw_rate: f32,
    pub yaw_acceleration: f32,
}

impl Default for PositionInput {
    fn default() -> Self {
        Self {
            position: Vector3::repeat(f32::NAN),
            velocity: Vector3::repeat(f32::NAN),
            acceleration: Vector3::repeat(f32::NAN),
            yaw: f32::NAN,
            yaw_rate: f32::NAN,
            yaw_acceleration: f32::NAN,
        }
    }
}

/// Output of a control law.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ControlOutput {
    /// Attitude setpoint with thrust along the body z axis (in N).
    Attitude {
        rotation: Rotation3<f32>,
        thrust: Vector3<f32>,
        yaw_rate: f32,
    },
    /// Virtual acceleration setpoint (in m/s^2) for an external attitude loop.
    Acceleration {
        acceleration: Vector3<f32>,
        yaw: f32,
        yaw_rate: f32,
    },
    /// Level attitude at the commanded yaw with a full 3D body thrust (in N).
    Tilt {
        rotation: Rotation3<f32>,
        thrust: Vector3<f32>,
    },
}

/// Selects the law built for a parameter epoch.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ControlLawKind {
    #[default]
    Geometric,
    PassThrough,
    Tilt,
}

/// A position control strategy.
pub trait ControlLaw {
    fn set_gains(&mut self, gains: &PositionGains);

    fn set_state(&mut self, state: &PositionState);

    fn set_input_setpoint(&mut self, input: &PositionInput);

    /// Run the law for a cycle of `dt` seconds.
    ///
    /// Returns `false` if the setpoint could not be tracked; the previous output is kept.
    fn update(&mut self, dt: f32) -> bool;

    fn reset_integral(&mut self);

    /// The intermediate setpoints of the last update, with the thrust in N.
    fn local_position_setpoint(&self) -> LocalPositionSetpoint;

    fn control_output(&self) -> ControlOutput;
}

/// One of the built-in laws, chosen at runtime.
#[derive(Clone, Debug)]
pub enum AnyControlLaw {
    Geometric(Geometric),
    PassThrough(PassThrough),
    Tilt(Tilt),
}

impl AnyControlLaw {
    pub fn new(kind: ControlLawKind) -> Self {
        match kind {
            ControlLawKind::Geometric => Self::Geometric(Geometric::default()),
            ControlLawKind::PassThrough => Self::PassThrough(PassThrough::default()),
            ControlLawKind::Tilt => Self::Tilt(Tilt::default()),
        }
    }

    pub fn kind(&self) -> ControlLawKind {
        match self {
            Self::Geometric(_) => ControlLawKind::Geometric,
            Self::PassThrough(_) => ControlLawKind::PassThrough,
            Self::Tilt(_) => ControlLawKind::Tilt,
        }
    }

    fn law(&self) -> &dyn ControlLaw {
        match self {
            Self::Geometric(law) => law,
            Self::PassThrough(law) => law,
            Self::Tilt(law) => law,
        }
    }

    fn law_mut(&mut self) -> &mut dyn ControlLaw {
        match self {
            Self::Geometric(law) => law,
            Self::PassThrough(law) => law,
            Self::Tilt(law) => law,
        }
    }
}

impl Default for AnyControlLaw {
    fn default() -> Self {
        Self::new(ControlLawKind::default())
    }
}

impl ControlLaw for AnyControlLaw {
    fn set_gains(&mut self, gains: &PositionGains) {
        self.law_mut().set_gains(gains)
    }

    fn set_state(&mut self, state: &PositionState) {
        self.law_mut().set_state(state)
    }

    fn set_input_setpoint(&mut self, input: &PositionInput) {
        self.law_mut().set_input_setpoint(input)
    }

    fn update(&mut self, dt: f32) -> bool {
        self.law_mut().update(dt)
    }

    fn reset_integral(&mut self) {
        self.law_mut().reset_integral()
    }

    fn local_position_setpoint(&self) -> LocalPositionSetpoint {
        self.law().local_position_setpoint()
    }

    fn control_output(&self) -> ControlOutput {
        self.law().control_output()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_builds_the_selected_law() {
        for kind in [
            ControlLawKind::Geometric,
            ControlLawKind::PassThrough,
            ControlLawKind::Tilt,
        ] {
            assert_eq!(AnyControlLaw::new(kind).kind(), kind);
        }
    }

    #[test]
    fn dispatch_reaches_the_inner_law() {
        let mut law = AnyControlLaw::new(ControlLawKind::PassThrough);
        law.set_state(&PositionState {
            position: Vector3::zeros(),
            velocity: Vector3::zeros(),
            acceleration: Vector3::zeros(),
            yaw: 0.,
        });
        law.set_input_setpoint(&PositionInput {
            acceleration: Vector3::new(1., 0., 0.),
            ..PositionInput::default()
        });

        assert!(law.update(0.01));
        match law.control_output() {
            ControlOutput::Acceleration { acceleration, .. } => {
                assert_eq!(acceleration, Vector3::new(1., 0., 0.))
            }
            output => panic!("unexpected output {:?}", output),
        }
    }
}
