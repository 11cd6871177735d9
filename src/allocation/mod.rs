//! Rotor control allocation.
//!
//! Builds the effectiveness matrix: the linear map from each rotor's command to the
//! moment (rows 0-2) and force (rows 3-5) it produces in the body frame.
//!
//! ```
//! use omni_flight::allocation::{
//!     compute_effectiveness_matrix, EffectivenessMatrix, Geometry, MatrixMode, RotorSpec,
//! };
//! use nalgebra::Vector3;
//!
//! let mut geometry = Geometry::default();
//! geometry.push(RotorSpec {
//!     position: Vector3::new(0.2, 0.2, 0.),
//!     axis: Vector3::new(0., 0., -1.),
//!     thrust_coef: 6.5,
//!     moment_ratio: 0.05,
//!     tilt_index: None,
//! });
//!
//! let mut effectiveness = EffectivenessMatrix::zeros();
//! let columns = compute_effectiveness_matrix(&geometry, &mut effectiveness, 0, MatrixMode::Fixed);
//! assert_eq!(columns, 1);
//! ```

use crate::config::Params;
use crate::Error;
use log::{error, warn};
use nalgebra::{SMatrix, Vector3};
use num_traits::Float;
use serde::{Deserialize, Serialize};

mod rotor_set;
pub use rotor_set::RotorSet;

pub mod tilt;
pub use tilt::{TiltConfig, Tilts};

/// Maximum number of rotors in a geometry.
pub const NUM_ROTORS_MAX: usize = 12;

/// Number of actuator columns in an effectiveness matrix.
pub const NUM_ACTUATORS: usize = 16;

/// Moment x/y/z followed by force x/y/z.
pub const NUM_AXES: usize = 6;

/// Number of effectiveness matrices an allocation configuration holds.
pub const MAX_NUM_MATRICES: usize = 2;

pub type EffectivenessMatrix = SMatrix<f32, NUM_AXES, NUM_ACTUATORS>;

/// A single rotor of the geometry.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RotorSpec {
    /// Position relative to the center of gravity in the body frame.
    pub position: Vector3<f32>,
    /// Thrust direction in the body frame, not necessarily normalized.
    pub axis: Vector3<f32>,
    pub thrust_coef: f32,
    pub moment_ratio: f32,
    /// Tilt group controlling this rotor's axis.
    pub tilt_index: Option<usize>,
}

impl Default for RotorSpec {
    fn default() -> Self {
        Self {
            position: Vector3::zeros(),
            axis: Vector3::new(0., 0., -1.),
            thrust_coef: 0.,
            moment_ratio: 0.,
            tilt_index: None,
        }
    }
}

/// Sign convention of the omnidirectional vertical sub-matrix.
///
/// The default (`+km * ct` yaw moment, `-ct` vertical force) must be checked
/// against the spin direction convention of the hardware.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct OmniSigns {
    pub yaw_moment: f32,
    pub vertical_thrust: f32,
}

impl Default for OmniSigns {
    fn default() -> Self {
        Self {
            yaw_moment: 1.,
            vertical_thrust: -1.,
        }
    }
}

/// Rotor table for one parameter epoch.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Geometry {
    pub rotors: [RotorSpec; NUM_ROTORS_MAX],
    pub num_rotors: usize,
    pub propeller_torque_disabled: bool,
    pub propeller_torque_disabled_non_upwards: bool,
    pub omni_signs: OmniSigns,
}

impl Geometry {
    /// The configured rotors.
    pub fn rotors(&self) -> &[RotorSpec] {
        &self.rotors[..self.num_rotors.min(NUM_ROTORS_MAX)]
    }

    /// Append a rotor, returning `false` if the table is full.
    pub fn push(&mut self, rotor: RotorSpec) -> bool {
        if self.num_rotors >= NUM_ROTORS_MAX {
            return false;
        }
        self.rotors[self.num_rotors] = rotor;
        self.num_rotors += 1;
        true
    }
}

/// Which matrix a call to [`compute_effectiveness_matrix`] fills.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MatrixMode {
    /// Classic multi-rotor with a fixed thrust axis per rotor.
    Fixed,
    /// Vertical lift coupling of omnidirectionally tilting rotors.
    OmniVertical,
    /// Horizontal tilt coupling of omnidirectionally tilting rotors.
    OmniLateral,
}

/// Where the rotor axes come from when a geometry is loaded.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AxisConfiguration {
    /// Axis taken from the rotor table.
    #[default]
    Configurable,
    /// Every rotor pushes forward along body x.
    FixedForward,
    /// Every rotor pushes upwards (negative body z).
    FixedUpwards,
}

/// How the tilt servos of a tilting multi-rotor move the rotors.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TiltingType {
    /// Rotors tilt about one axis, driven by the attitude pitch.
    #[default]
    Horizontal,
    /// Rotors tilt to push in any horizontal direction.
    Omnidirectional,
}

/// Returns `true` if a normalized axis points mostly upwards.
pub fn is_upwards(axis: &Vector3<f32>) -> bool {
    Float::abs(axis.x) < 0.1 && Float::abs(axis.y) < 0.1 && axis.z < -0.5
}

/// Write one column per rotor into `effectiveness`, starting at `actuator_start_index`.
///
/// Returns the number of columns claimed. Rotors with a degenerate axis or no thrust
/// still claim their column so actuator indices stay contiguous, but leave it untouched.
/// Columns outside the claimed block are never written, and rotors that would land
/// past the last column are dropped.
pub fn compute_effectiveness_matrix(
    geometry: &Geometry,
    effectiveness: &mut EffectivenessMatrix,
    actuator_start_index: usize,
    mode: MatrixMode,
) -> usize {
    let mut num_actuators = 0;

    for (i, rotor) in geometry.rotors().iter().enumerate() {
        let column = i + actuator_start_index;
        if column >= NUM_ACTUATORS {
            break;
        }
        num_actuators += 1;

        // Bad axis definition, ignore this rotor
        let axis_norm = rotor.axis.norm();
        if axis_norm <= f32::EPSILON {
            continue;
        }
        let axis = rotor.axis / axis_norm;

        let ct = rotor.thrust_coef;
        if Float::abs(ct) <= f32::EPSILON {
            continue;
        }

        let mut km = rotor.moment_ratio;
        if geometry.propeller_torque_disabled
            || (geometry.propeller_torque_disabled_non_upwards && !is_upwards(&axis))
        {
            km = 0.;
        }

        let position = &rotor.position;
        let (moment, thrust) = match mode {
            MatrixMode::Fixed => (
                position.cross(&axis) * ct - axis * (ct * km),
                axis * ct,
            ),
            MatrixMode::OmniVertical => {
                let signs = &geometry.omni_signs;
                (
                    Vector3::new(-ct * position.y, ct * position.x, signs.yaw_moment * km * ct),
                    Vector3::new(0., 0., signs.vertical_thrust * ct),
                )
            }
            MatrixMode::OmniLateral => {
                let (sin, cos) = Float::sin_cos(Float::atan2(position.y, position.x));
                (
                    Vector3::new(
                        sin * km * ct,
                        -cos * km * ct,
                        ct * Float::hypot(position.x, position.y),
                    ),
                    Vector3::new(-ct * sin, ct * cos, 0.),
                )
            }
        };

        for j in 0..3 {
            effectiveness[(j, column)] = moment[j];
            effectiveness[(j + 3, column)] = thrust[j];
        }
    }

    num_actuators
}

/// Kind of actuator added to an allocation [`Configuration`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ActuatorType {
    Motors = 0,
    Servos = 1,
}

pub const NUM_ACTUATOR_TYPES: usize = 2;

/// Effectiveness matrices being assembled for the allocator.
#[derive(Clone, Debug, PartialEq)]
pub struct Configuration {
    pub effectiveness_matrices: [EffectivenessMatrix; MAX_NUM_MATRICES],
    /// Columns used in each matrix.
    pub num_actuators_matrix: [usize; MAX_NUM_MATRICES],
    /// Actuators added per [`ActuatorType`].
    pub num_actuators: [usize; NUM_ACTUATOR_TYPES],
    /// Matrix the next actuators are added to.
    pub selected_matrix: usize,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            effectiveness_matrices: [EffectivenessMatrix::zeros(); MAX_NUM_MATRICES],
            num_actuators_matrix: [0; MAX_NUM_MATRICES],
            num_actuators: [0; NUM_ACTUATOR_TYPES],
            selected_matrix: 0,
        }
    }
}

impl Configuration {
    /// Record `count` actuators of `actuator_type` added to the selected matrix.
    pub fn actuators_added(&mut self, actuator_type: ActuatorType, count: usize) {
        self.num_actuators[actuator_type as usize] += count;
        self.num_actuators_matrix[self.selected_matrix] += count;
    }

    pub fn total_actuators(&self) -> usize {
        self.num_actuators.iter().sum()
    }
}

/// Effectiveness of the vehicle's rotors, rebuilt on every parameter epoch.
#[derive(Clone, Debug)]
pub struct RotorsEffectiveness {
    axis_config: AxisConfiguration,
    tilt_support: bool,
    tilting_omnidir: bool,
    geometry: Geometry,
}

impl RotorsEffectiveness {
    pub fn new(axis_config: AxisConfiguration, tilt_support: bool, tilting_omnidir: bool) -> Self {
        Self {
            axis_config,
            tilt_support,
            tilting_omnidir,
            geometry: Geometry::default(),
        }
    }

    /// Create the effectiveness for the airframe described by `params`.
    pub fn from_params(params: &Params) -> Result<Self, Error> {
        let mut rotors = Self::new(
            params.axis_config,
            params.airframe == crate::config::Airframe::TiltingMultirotor,
            params.is_omnidirectional(),
        );
        rotors.update_params(params)?;
        Ok(rotors)
    }

    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    /// Rebuild the geometry from a new parameter epoch.
    ///
    /// On error the previous geometry is kept.
    pub fn update_params(&mut self, params: &Params) -> Result<(), Error> {
        if params.rotor_count > NUM_ROTORS_MAX {
            error!(
                "rotor count {} exceeds the maximum of {}",
                params.rotor_count, NUM_ROTORS_MAX
            );
            return Err(Error::TooManyRotors {
                count: params.rotor_count,
                max: NUM_ROTORS_MAX,
            });
        }

        let mut geometry = Geometry {
            propeller_torque_disabled: params.propeller_torque_disabled,
            propeller_torque_disabled_non_upwards: params.propeller_torque_disabled_non_upwards,
            omni_signs: params.omni_signs,
            ..Geometry::default()
        };

        for rotor in &params.rotors[..params.rotor_count] {
            let axis = match self.axis_config {
                AxisConfiguration::Configurable => rotor.axis,
                AxisConfiguration::FixedForward => Vector3::new(1., 0., 0.),
                AxisConfiguration::FixedUpwards => Vector3::new(0., 0., -1.),
            };
            let tilt_index = if self.tilt_support && rotor.tilt > 0 {
                Some(rotor.tilt as usize - 1)
            } else {
                None
            };

            geometry.push(RotorSpec {
                position: rotor.position,
                axis,
                thrust_coef: rotor.thrust_coef,
                moment_ratio: rotor.moment_ratio,
                tilt_index,
            });
        }

        if self.tilt_support {
            for dangling in params.dangling_tilt_references() {
                warn!("{}, treating it as non-tilting", dangling);
            }
        }

        self.geometry = geometry;
        Ok(())
    }

    /// Add the rotor columns to the currently selected matrix of `configuration`.
    ///
    /// With omnidirectional tilting, matrix 0 receives the vertical and matrix 1
    /// the lateral coupling.
    pub fn add_actuators(&self, configuration: &mut Configuration) -> Result<(), Error> {
        if configuration.num_actuators[ActuatorType::Servos as usize] > 0 {
            error!("wrong actuator ordering: servos need to be after motors");
            return Err(Error::ActuatorOrdering);
        }

        let selected = configuration.selected_matrix;
        let mode = match (self.tilting_omnidir, selected) {
            (false, 0..=1) => MatrixMode::Fixed,
            (true, 0) => MatrixMode::OmniVertical,
            (true, 1) => MatrixMode::OmniLateral,
            (_, index) => return Err(Error::MatrixIndex(index)),
        };

        let num_actuators = compute_effectiveness_matrix(
            &self.geometry,
            &mut configuration.effectiveness_matrices[selected],
            configuration.num_actuators_matrix[selected],
            mode,
        );
        configuration.actuators_added(ActuatorType::Motors, num_actuators);

        Ok(())
    }

    /// Point the tilting rotors along the axis commanded by `tilt_control` in [-1, 1].
    ///
    /// Returns the rotors that are not under tilt control.
    pub fn update_axis_from_tilts(&mut self, tilts: &Tilts, tilt_control: f32) -> RotorSet {
        tilt::update_axis(&mut self.geometry, tilts, tilt_control)
    }

    /// Rotors whose axis currently points upwards.
    pub fn upwards_motors(&self) -> RotorSet {
        self.geometry
            .rotors()
            .iter()
            .enumerate()
            .filter(|(_, rotor)| is_upwards(&rotor.axis))
            .map(|(i, _)| i)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn rotor(position: Vector3<f32>, axis: Vector3<f32>, ct: f32, km: f32) -> RotorSpec {
        RotorSpec {
            position,
            axis,
            thrust_coef: ct,
            moment_ratio: km,
            tilt_index: None,
        }
    }

    fn geometry(rotors: &[RotorSpec]) -> Geometry {
        let mut geometry = Geometry::default();
        for rotor in rotors {
            assert!(geometry.push(*rotor));
        }
        geometry
    }

    fn column(effectiveness: &EffectivenessMatrix, index: usize) -> [f32; 6] {
        let mut column = [0.; 6];
        for (row, value) in column.iter_mut().enumerate() {
            *value = effectiveness[(row, index)];
        }
        column
    }

    #[test]
    fn fixed_axis_column_matches_thrust_and_moment() {
        let position = Vector3::new(0.3, -0.2, 0.05);
        let axis = Vector3::new(0.2, 0., -2.);
        let (ct, km) = (6.5, 0.05);
        let geometry = geometry(&[rotor(position, axis, ct, km)]);

        let mut effectiveness = EffectivenessMatrix::zeros();
        let n = compute_effectiveness_matrix(&geometry, &mut effectiveness, 0, MatrixMode::Fixed);
        assert_eq!(n, 1);

        let axis = axis.normalize();
        let thrust = axis * ct;
        let moment = position.cross(&axis) * ct - axis * (ct * km);
        for j in 0..3 {
            assert_relative_eq!(effectiveness[(j, 0)], moment[j], epsilon = 1e-5);
            assert_relative_eq!(effectiveness[(j + 3, 0)], thrust[j], epsilon = 1e-5);
        }
    }

    #[test]
    fn quad_x_has_symmetric_roll_and_pitch() {
        let up = Vector3::new(0., 0., -1.);
        let geometry = geometry(&[
            rotor(Vector3::new(1., 1., 0.), up, 1., 0.05),
            rotor(Vector3::new(-1., -1., 0.), up, 1., 0.05),
            rotor(Vector3::new(1., -1., 0.), up, 1., -0.05),
            rotor(Vector3::new(-1., 1., 0.), up, 1., -0.05),
        ]);

        let mut effectiveness = EffectivenessMatrix::zeros();
        let n = compute_effectiveness_matrix(&geometry, &mut effectiveness, 0, MatrixMode::Fixed);
        assert_eq!(n, 4);

        let row_sum = |row: usize| (0..4).map(|i| effectiveness[(row, i)]).sum::<f32>();
        assert_relative_eq!(row_sum(0), 0., epsilon = 1e-6);
        assert_relative_eq!(row_sum(1), 0., epsilon = 1e-6);
        assert_relative_eq!(row_sum(2), 0., epsilon = 1e-6);
        assert_relative_eq!(row_sum(5), -4., epsilon = 1e-6);

        // A front right rotor rolls left and pitches up
        assert_relative_eq!(effectiveness[(0, 0)], -1.);
        assert_relative_eq!(effectiveness[(1, 0)], 1.);
    }

    #[test]
    fn degenerate_axis_leaves_column_unset() {
        let geometry = geometry(&[
            rotor(Vector3::new(1., 0., 0.), Vector3::zeros(), 1., 0.05),
            rotor(Vector3::new(-1., 0., 0.), Vector3::new(0., 0., -1.), 1., 0.05),
        ]);

        let mut effectiveness = EffectivenessMatrix::zeros();
        let n = compute_effectiveness_matrix(&geometry, &mut effectiveness, 0, MatrixMode::Fixed);

        // The skipped rotor still claims its column
        assert_eq!(n, 2);
        assert_eq!(column(&effectiveness, 0), [0.; 6]);
        assert_relative_eq!(effectiveness[(5, 1)], -1.);
    }

    #[test]
    fn zero_thrust_coefficient_contributes_nothing() {
        let geometry = geometry(&[rotor(
            Vector3::new(1., 0., 0.),
            Vector3::new(0., 0., -1.),
            0.,
            0.05,
        )]);

        let mut effectiveness = EffectivenessMatrix::zeros();
        for mode in [MatrixMode::Fixed, MatrixMode::OmniVertical, MatrixMode::OmniLateral] {
            compute_effectiveness_matrix(&geometry, &mut effectiveness, 0, mode);
            assert_eq!(column(&effectiveness, 0), [0.; 6]);
        }
    }

    #[test]
    fn columns_outside_the_block_are_untouched() {
        let up = Vector3::new(0., 0., -1.);
        let geometry = geometry(&[
            rotor(Vector3::new(1., 0., 0.), up, 1., 0.),
            rotor(Vector3::new(0., 0., 0.), Vector3::zeros(), 1., 0.),
        ]);

        let mut effectiveness = EffectivenessMatrix::from_element(7.);
        let n = compute_effectiveness_matrix(&geometry, &mut effectiveness, 3, MatrixMode::Fixed);
        assert_eq!(n, 2);

        for index in (0..NUM_ACTUATORS).filter(|&index| index != 3) {
            assert_eq!(column(&effectiveness, index), [7.; 6]);
        }
        assert_eq!(column(&effectiveness, 3), [0., 1., 0., 0., 0., -1.]);
    }

    #[test]
    fn it_truncates_at_matrix_capacity() {
        let up = Vector3::new(0., 0., -1.);
        let geometry = geometry(&[rotor(Vector3::zeros(), up, 1., 0.); 4]);

        let mut effectiveness = EffectivenessMatrix::zeros();
        let n = compute_effectiveness_matrix(
            &geometry,
            &mut effectiveness,
            NUM_ACTUATORS - 2,
            MatrixMode::Fixed,
        );
        assert_eq!(n, 2);
    }

    #[test]
    fn torque_disabled_for_non_upward_rotors() {
        let mut geometry = geometry(&[
            rotor(Vector3::zeros(), Vector3::new(1., 0., 0.), 1., 0.5),
            rotor(Vector3::zeros(), Vector3::new(0., 0., -1.), 1., 0.5),
        ]);
        geometry.propeller_torque_disabled_non_upwards = true;

        let mut effectiveness = EffectivenessMatrix::zeros();
        compute_effectiveness_matrix(&geometry, &mut effectiveness, 0, MatrixMode::Fixed);
        assert_eq!(column(&effectiveness, 0), [0., 0., 0., 1., 0., 0.]);
        assert_relative_eq!(effectiveness[(2, 1)], 0.5);

        geometry.propeller_torque_disabled = true;
        compute_effectiveness_matrix(&geometry, &mut effectiveness, 0, MatrixMode::Fixed);
        assert_relative_eq!(effectiveness[(2, 1)], 0.);
    }

    #[test]
    fn omni_vertical_column() {
        let geometry = geometry(&[rotor(
            Vector3::new(1., 0., 0.),
            Vector3::new(0., 0., -1.),
            1.,
            0.,
        )]);

        let mut effectiveness = EffectivenessMatrix::zeros();
        compute_effectiveness_matrix(&geometry, &mut effectiveness, 0, MatrixMode::OmniVertical);
        assert_eq!(column(&effectiveness, 0), [0., 1., 0., 0., 0., -1.]);
    }

    #[test]
    fn omni_vertical_signs_are_configurable() {
        let mut geometry = geometry(&[rotor(
            Vector3::new(1., 0., 0.),
            Vector3::new(0., 0., -1.),
            2.,
            0.5,
        )]);
        geometry.omni_signs = OmniSigns {
            yaw_moment: -1.,
            vertical_thrust: 1.,
        };

        let mut effectiveness = EffectivenessMatrix::zeros();
        compute_effectiveness_matrix(&geometry, &mut effectiveness, 0, MatrixMode::OmniVertical);
        assert_relative_eq!(effectiveness[(2, 0)], -1.);
        assert_relative_eq!(effectiveness[(5, 0)], 2.);
    }

    #[test]
    fn omni_lateral_column() {
        let geometry = geometry(&[rotor(
            Vector3::new(1., 0., 0.),
            Vector3::new(0., 0., -1.),
            1.,
            1.,
        )]);

        let mut effectiveness = EffectivenessMatrix::zeros();
        compute_effectiveness_matrix(&geometry, &mut effectiveness, 0, MatrixMode::OmniLateral);
        let expected = [0., -1., 1., 0., 1., 0.];
        for (value, expected) in column(&effectiveness, 0).iter().zip(expected) {
            assert_relative_eq!(*value, expected, epsilon = 1e-6);
        }
    }

    #[test]
    fn omni_lateral_follows_rotor_azimuth() {
        let geometry = geometry(&[rotor(
            Vector3::new(0., 2., 0.),
            Vector3::new(0., 0., -1.),
            1.,
            0.,
        )]);

        let mut effectiveness = EffectivenessMatrix::zeros();
        compute_effectiveness_matrix(&geometry, &mut effectiveness, 0, MatrixMode::OmniLateral);
        // Tangential push at 90 degrees azimuth is along -x
        assert_relative_eq!(effectiveness[(3, 0)], -1., epsilon = 1e-6);
        assert_relative_eq!(effectiveness[(4, 0)], 0., epsilon = 1e-6);
        assert_relative_eq!(effectiveness[(2, 0)], 2., epsilon = 1e-6);
    }

    fn hexa_params() -> Params {
        let mut params = Params {
            rotor_count: 6,
            ..Params::default()
        };
        for (i, rotor) in params.rotors.iter_mut().take(6).enumerate() {
            let angle = i as f32 * core::f32::consts::FRAC_PI_3;
            rotor.position = Vector3::new(Float::cos(angle), Float::sin(angle), 0.) * 0.3;
        }
        params
    }

    #[test]
    fn it_rejects_servos_before_motors() {
        let rotors = RotorsEffectiveness::from_params(&hexa_params()).unwrap();
        let mut configuration = Configuration::default();
        configuration.actuators_added(ActuatorType::Servos, 2);

        assert_eq!(
            rotors.add_actuators(&mut configuration),
            Err(Error::ActuatorOrdering)
        );
    }

    #[test]
    fn it_fills_both_omni_matrices() {
        let mut params = hexa_params();
        params.airframe = crate::config::Airframe::TiltingMultirotor;
        params.tilting_type = TiltingType::Omnidirectional;
        let rotors = RotorsEffectiveness::from_params(&params).unwrap();

        let mut configuration = Configuration::default();
        rotors.add_actuators(&mut configuration).unwrap();
        configuration.selected_matrix = 1;
        rotors.add_actuators(&mut configuration).unwrap();

        assert_eq!(configuration.num_actuators_matrix, [6, 6]);
        assert_eq!(configuration.num_actuators[ActuatorType::Motors as usize], 12);
        assert_relative_eq!(configuration.effectiveness_matrices[0][(5, 0)], -6.5);
        assert_relative_eq!(configuration.effectiveness_matrices[1][(5, 0)], 0.);
        assert_relative_eq!(configuration.effectiveness_matrices[1][(4, 0)], 6.5, epsilon = 1e-5);
    }

    #[test]
    fn it_applies_the_axis_configuration() {
        let mut params = hexa_params();
        params.rotors[0].axis = Vector3::new(0., 1., 0.);
        params.axis_config = AxisConfiguration::FixedForward;

        let rotors = RotorsEffectiveness::from_params(&params).unwrap();
        assert_eq!(rotors.geometry().num_rotors, 6);
        assert_eq!(rotors.geometry().rotors[0].axis, Vector3::new(1., 0., 0.));
        assert!(rotors.upwards_motors().is_empty());
    }

    #[test]
    fn it_keeps_the_previous_geometry_on_error() {
        let mut rotors = RotorsEffectiveness::from_params(&hexa_params()).unwrap();
        let params = Params {
            rotor_count: NUM_ROTORS_MAX + 1,
            ..hexa_params()
        };

        assert!(rotors.update_params(&params).is_err());
        assert_eq!(rotors.geometry().num_rotors, 6);
    }

    #[test]
    fn it_finds_upward_motors() {
        let mut params = hexa_params();
        params.rotors[2].axis = Vector3::new(0.5, 0., -0.5);
        let rotors = RotorsEffectiveness::from_params(&params).unwrap();

        let upwards = rotors.upwards_motors();
        assert_eq!(upwards.len(), 5);
        assert!(!upwards.contains(2));
    }
}
