//! Configuration epochs.
//!
//! A [`Params`] value is a complete snapshot of every recognized option. It is
//! filled by an external loader, checked with [`Params::validate`], and then
//! applied wholesale; nothing in the crate reads parameter storage directly.

use crate::allocation::{tilt::MAX_TILTS, AxisConfiguration, OmniSigns, TiltingType, NUM_ROTORS_MAX};
use crate::control::law::ControlLawKind;
use crate::Error;
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

/// Geometry and coefficients of one rotor.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RotorParams {
    /// Position in the body frame (in meters).
    pub position: Vector3<f32>,
    /// Spin axis in the body frame, only used with [`AxisConfiguration::Configurable`].
    pub axis: Vector3<f32>,
    /// Thrust coefficient.
    pub thrust_coef: f32,
    /// Moment to thrust ratio, signed by spin direction.
    pub moment_ratio: f32,
    /// Tilt group of this rotor, starting at 1. Zero means the rotor does not tilt.
    pub tilt: u8,
}

impl Default for RotorParams {
    fn default() -> Self {
        Self {
            position: Vector3::zeros(),
            axis: Vector3::new(0., 0., -1.),
            thrust_coef: 6.5,
            moment_ratio: 0.05,
            tilt: 0,
        }
    }
}

/// Range and direction of a tilt servo group (all in degrees).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TiltParams {
    pub min_angle: f32,
    pub max_angle: f32,
    /// Fixed yaw of the tilt plane.
    pub direction: f32,
}

impl Default for TiltParams {
    fn default() -> Self {
        Self {
            min_angle: -45.,
            max_angle: 45.,
            direction: 0.,
        }
    }
}

/// Virtual mass, damping and stiffness of one admittance channel.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct AdmittanceParams {
    pub mass: f32,
    pub damping: f32,
    pub stiffness: f32,
}

impl AdmittanceParams {
    fn validate(&self) -> Result<(), Error> {
        if !(self.mass > 0.) {
            return Err(Error::NonPositiveGain("admittance mass"));
        }
        if !(self.damping > 0.) {
            return Err(Error::NonPositiveGain("admittance damping"));
        }
        if !(self.stiffness > 0.) {
            return Err(Error::NonPositiveGain("admittance stiffness"));
        }
        Ok(())
    }
}

/// Gains handed to the position control law.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PositionParams {
    pub xy_p: f32,
    pub z_p: f32,
    pub xy_v: f32,
    pub z_v: f32,
    pub xy_i: f32,
    pub z_i: f32,
    /// Vehicle mass (in kg).
    pub mass: f32,
    /// Initial value of the vertical integral (in m/s^2).
    pub start_z_int: f32,
}

impl Default for PositionParams {
    fn default() -> Self {
        Self {
            xy_p: 1.,
            z_p: 1.,
            xy_v: 2.,
            z_v: 4.,
            xy_i: 0.,
            z_i: 0.4,
            mass: 1.5,
            start_z_int: 0.,
        }
    }
}

/// Airframe selector.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Airframe {
    #[default]
    Multirotor,
    /// Multi-rotor with tilt servos on (some of) its rotors.
    TiltingMultirotor,
}

/// Every option the allocation and control loop recognize.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Params {
    pub rotors: [RotorParams; NUM_ROTORS_MAX],
    pub rotor_count: usize,
    pub axis_config: AxisConfiguration,
    /// Ignore propeller drag torque on all rotors.
    pub propeller_torque_disabled: bool,
    /// Ignore propeller drag torque on rotors that do not point upwards.
    pub propeller_torque_disabled_non_upwards: bool,
    pub omni_signs: OmniSigns,

    pub tilts: [TiltParams; MAX_TILTS],
    pub tilt_count: usize,
    pub airframe: Airframe,
    pub tilting_type: TiltingType,
    /// Bounds of the tilt servo angle extracted from the attitude (in radians).
    pub servo_pitch_min: f32,
    pub servo_pitch_max: f32,

    pub admittance: AdmittanceParams,
    pub admittance_yaw: AdmittanceParams,

    pub control_law: ControlLawKind,
    pub position: PositionParams,
    /// Thrust (in N) that maps to a normalized thrust of one.
    pub max_thrust: f32,

    /// Maximum ascent speed (in m/s).
    pub z_vel_max_up: f32,
    /// Maximum descent speed (in m/s).
    pub z_vel_max_dn: f32,
    /// Descent speed at which the altitude derivative fully replaces the velocity estimate.
    pub land_speed: f32,
    /// Tilt limit in flight (in degrees).
    pub tilt_max_air: f32,
    /// Tilt limit while landed or taking off (in degrees).
    pub tilt_max_lnd: f32,
    /// Time the motors need to spool up after arming (in seconds).
    pub spoolup_time: f32,
    /// Duration of the takeoff velocity ramp (in seconds).
    pub takeoff_ramp_time: f32,
    /// Vertical velocity gain used for the initial takeoff ramp value.
    pub z_vel_p_acc: f32,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            rotors: [RotorParams::default(); NUM_ROTORS_MAX],
            rotor_count: 0,
            axis_config: AxisConfiguration::Configurable,
            propeller_torque_disabled: false,
            propeller_torque_disabled_non_upwards: false,
            omni_signs: OmniSigns::default(),
            tilts: [TiltParams::default(); MAX_TILTS],
            tilt_count: 0,
            airframe: Airframe::Multirotor,
            tilting_type: TiltingType::Horizontal,
            servo_pitch_min: -0.5,
            servo_pitch_max: 0.5,
            admittance: AdmittanceParams {
                mass: 1.,
                damping: 10.,
                stiffness: 5.,
            },
            admittance_yaw: AdmittanceParams {
                mass: 0.1,
                damping: 1.,
                stiffness: 0.5,
            },
            control_law: ControlLawKind::Geometric,
            position: PositionParams::default(),
            max_thrust: 40.,
            z_vel_max_up: 3.,
            z_vel_max_dn: 1.,
            land_speed: 0.7,
            tilt_max_air: 45.,
            tilt_max_lnd: 12.,
            spoolup_time: 1.,
            takeoff_ramp_time: 3.,
            z_vel_p_acc: 4.,
        }
    }
}

impl Params {
    /// Check the epoch before it replaces the current one.
    pub fn validate(&self) -> Result<(), Error> {
        if self.rotor_count > NUM_ROTORS_MAX {
            return Err(Error::TooManyRotors {
                count: self.rotor_count,
                max: NUM_ROTORS_MAX,
            });
        }
        if self.tilt_count > MAX_TILTS {
            return Err(Error::TooManyTilts {
                count: self.tilt_count,
                max: MAX_TILTS,
            });
        }

        self.admittance.validate()?;
        self.admittance_yaw.validate()?;

        if !(self.max_thrust > 0.) {
            return Err(Error::NonPositiveGain("max thrust"));
        }
        if !(self.land_speed > 0.) {
            return Err(Error::NonPositiveGain("land speed"));
        }
        if !(self.position.mass > 0.) {
            return Err(Error::NonPositiveGain("mass"));
        }

        Ok(())
    }

    /// Rotors referencing a tilt group that is not configured.
    ///
    /// These are accepted and treated as non-tilting, the caller only reports them.
    pub fn dangling_tilt_references(&self) -> impl Iterator<Item = Error> + '_ {
        let count = self.tilt_count;
        self.rotors
            .iter()
            .take(self.rotor_count.min(NUM_ROTORS_MAX))
            .enumerate()
            .filter(move |(_, rotor)| rotor.tilt as usize > count)
            .map(move |(rotor, params)| Error::TiltGroupOutOfRange {
                rotor,
                group: params.tilt as usize,
                count,
            })
    }

    /// True for a multi-rotor that tilts its rotors to produce horizontal thrust.
    pub fn is_horizontal_tilting(&self) -> bool {
        self.airframe == Airframe::TiltingMultirotor && self.tilting_type == TiltingType::Horizontal
    }

    /// True for a multi-rotor whose rotors tilt to push in any horizontal direction.
    pub fn is_omnidirectional(&self) -> bool {
        self.airframe == Airframe::TiltingMultirotor
            && self.tilting_type == TiltingType::Omnidirectional
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        assert_eq!(Params::default().validate(), Ok(()));
    }

    #[test]
    fn it_rejects_too_many_rotors() {
        let params = Params {
            rotor_count: NUM_ROTORS_MAX + 1,
            ..Params::default()
        };
        assert_eq!(
            params.validate(),
            Err(Error::TooManyRotors {
                count: NUM_ROTORS_MAX + 1,
                max: NUM_ROTORS_MAX
            })
        );
    }

    #[test]
    fn it_rejects_non_positive_admittance_mass() {
        let mut params = Params::default();
        params.admittance.mass = 0.;
        assert_eq!(
            params.validate(),
            Err(Error::NonPositiveGain("admittance mass"))
        );

        params.admittance.mass = f32::NAN;
        assert!(params.validate().is_err());
    }

    #[test]
    fn it_reports_dangling_tilt_references() {
        let mut params = Params {
            rotor_count: 3,
            tilt_count: 1,
            ..Params::default()
        };
        params.rotors[0].tilt = 1;
        params.rotors[2].tilt = 2;

        let mut dangling = params.dangling_tilt_references();
        assert_eq!(
            dangling.next(),
            Some(Error::TiltGroupOutOfRange {
                rotor: 2,
                group: 2,
                count: 1
            })
        );
        assert_eq!(dangling.next(), None);
    }
}
