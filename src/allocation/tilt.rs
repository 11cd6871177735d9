//! Rotor axis kinematics of tilt servo groups.

use super::{Geometry, RotorSet};
use crate::config::Params;
use crate::{lerp, Error};
use nalgebra::{Rotation3, Vector3};

/// Maximum number of tilt servo groups.
pub const MAX_TILTS: usize = 4;

/// Range and direction of one tilt group (in radians).
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct TiltConfig {
    pub min_angle: f32,
    pub max_angle: f32,
    /// Fixed yaw of the plane the rotors tilt in.
    pub direction: f32,
}

impl TiltConfig {
    /// The tilt angle for a normalized command in [-1, 1].
    ///
    /// A non-finite command falls back to the minimum tilt.
    pub fn angle(&self, command: f32) -> f32 {
        let command = if command.is_finite() {
            command.max(-1.).min(1.)
        } else {
            -1.
        };
        lerp(self.min_angle, self.max_angle, (command + 1.) / 2.)
    }
}

/// The configured tilt groups.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Tilts {
    configs: [TiltConfig; MAX_TILTS],
    count: usize,
}

impl Tilts {
    pub fn new(configs: &[TiltConfig]) -> Result<Self, Error> {
        if configs.len() > MAX_TILTS {
            return Err(Error::TooManyTilts {
                count: configs.len(),
                max: MAX_TILTS,
            });
        }

        let mut tilts = Self {
            count: configs.len(),
            ..Self::default()
        };
        tilts.configs[..configs.len()].copy_from_slice(configs);
        Ok(tilts)
    }

    /// Convert the tilt groups of a parameter epoch from degrees.
    pub fn from_params(params: &Params) -> Result<Self, Error> {
        if params.tilt_count > MAX_TILTS {
            return Err(Error::TooManyTilts {
                count: params.tilt_count,
                max: MAX_TILTS,
            });
        }

        let mut configs = [TiltConfig::default(); MAX_TILTS];
        for (config, tilt) in configs.iter_mut().zip(&params.tilts) {
            *config = TiltConfig {
                min_angle: tilt.min_angle.to_radians(),
                max_angle: tilt.max_angle.to_radians(),
                direction: tilt.direction.to_radians(),
            };
        }
        Self::new(&configs[..params.tilt_count])
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn config(&self, index: usize) -> Option<&TiltConfig> {
        self.configs[..self.count].get(index)
    }
}

/// Rotate the downward unit axis by a pitch of `-tilt_angle`, then yaw by `tilt_direction`.
pub fn tilted_axis(tilt_angle: f32, tilt_direction: f32) -> Vector3<f32> {
    Rotation3::from_euler_angles(0., -tilt_angle, tilt_direction) * Vector3::new(0., 0., -1.)
}

/// Point every tilting rotor of `geometry` along the axis commanded by `tilt_control`.
///
/// Rotors without a tilt group, or with one past the configured groups, keep their
/// axis and are returned as the non-tilted set.
pub fn update_axis(geometry: &mut Geometry, tilts: &Tilts, tilt_control: f32) -> RotorSet {
    let mut nontilted = RotorSet::empty();
    let num_rotors = geometry.rotors().len();

    for (i, rotor) in geometry.rotors[..num_rotors].iter_mut().enumerate() {
        match rotor.tilt_index.and_then(|index| tilts.config(index)) {
            Some(tilt) => rotor.axis = tilted_axis(tilt.angle(tilt_control), tilt.direction),
            None => nontilted.insert(i),
        }
    }

    nontilted
}
