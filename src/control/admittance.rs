//! Admittance filter shaping the setpoint with measured external force.
//!
//! The setpoint is treated as a virtual mass pushed by the force/torque sensor through a
//! spring and damper. The resulting displacement, velocity and acceleration are added on
//! top of the reference trajectory so the vehicle yields on contact.

use crate::config::AdmittanceParams;
use crate::msg::{ForceTorque, TrajectorySetpoint};
use crate::Error;
use nalgebra::{Matrix3, Vector3};

/// Rotation from sensor axes to body axes.
///
/// The sensor is mounted with its z axis along the body's negative x axis and its x axis
/// along the body's negative z axis.
pub fn sensor_to_body() -> Matrix3<f32> {
    Matrix3::new(
        0., 0., -1., //
        0., -1., 0., //
        -1., 0., 0.,
    )
}

/// Virtual mass, damping and stiffness of the translational and yaw channels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AdmittanceGains {
    pub mass: Vector3<f32>,
    pub damping: Vector3<f32>,
    pub stiffness: Vector3<f32>,
    pub yaw_mass: f32,
    pub yaw_damping: f32,
    pub yaw_stiffness: f32,
}

impl AdmittanceGains {
    /// Isotropic translational gains from `translation`, yaw gains from `yaw`.
    pub fn new(translation: &AdmittanceParams, yaw: &AdmittanceParams) -> Result<Self, Error> {
        let gains = Self {
            mass: Vector3::repeat(translation.mass),
            damping: Vector3::repeat(translation.damping),
            stiffness: Vector3::repeat(translation.stiffness),
            yaw_mass: yaw.mass,
            yaw_damping: yaw.damping,
            yaw_stiffness: yaw.stiffness,
        };
        gains.validate()?;
        Ok(gains)
    }

    pub fn validate(&self) -> Result<(), Error> {
        let positive = |x: &f32| *x > 0.;
        if !self.mass.iter().all(positive) || !positive(&self.yaw_mass) {
            return Err(Error::NonPositiveGain("admittance mass"));
        }
        if !self.damping.iter().all(positive) || !positive(&self.yaw_damping) {
            return Err(Error::NonPositiveGain("admittance damping"));
        }
        if !self.stiffness.iter().all(positive) || !positive(&self.yaw_stiffness) {
            return Err(Error::NonPositiveGain("admittance stiffness"));
        }
        Ok(())
    }
}

impl Default for AdmittanceGains {
    fn default() -> Self {
        Self {
            mass: Vector3::repeat(1.),
            damping: Vector3::repeat(10.),
            stiffness: Vector3::repeat(5.),
            yaw_mass: 0.1,
            yaw_damping: 1.,
            yaw_stiffness: 0.5,
        }
    }
}

/// Mass-spring-damper state per translational axis and for yaw.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AdmittanceFilter {
    gains: AdmittanceGains,

    /// Virtual displacement
    pub p: Vector3<f32>,
    /// Virtual velocity
    pub pd: Vector3<f32>,
    /// Virtual acceleration
    pub pdd: Vector3<f32>,

    pub y: f32,
    pub yd: f32,
    pub ydd: f32,
}

impl AdmittanceFilter {
    pub fn new(gains: AdmittanceGains) -> Self {
        Self {
            gains,
            ..Self::default()
        }
    }

    pub fn gains(&self) -> &AdmittanceGains {
        &self.gains
    }

    /// Replace the gains, keeping the current state.
    pub fn set_gains(&mut self, gains: AdmittanceGains) -> Result<(), Error> {
        gains.validate()?;
        self.gains = gains;
        Ok(())
    }

    /// Zero the virtual state.
    pub fn reset(&mut self) {
        *self = Self::new(self.gains);
    }

    /// Advance the virtual dynamics by `dt` seconds and apply them to `setpoint`.
    pub fn step(&mut self, sample: &ForceTorque, dt: f32, setpoint: &mut TrajectorySetpoint) {
        let rotation = sensor_to_body();
        let force = rotation * sample.force;
        let torque = rotation * sample.torque;

        let g = &self.gains;

        // 1. Solve for the acceleration of each translational axis
        self.pdd = (force - g.damping.component_mul(&self.pd) - g.stiffness.component_mul(&self.p))
            .component_div(&g.mass);

        // 2. Integrate velocity first, then position with the new velocity
        self.pd += self.pdd * dt;
        self.p += self.pd * dt;

        // 3. Same for yaw, driven by the torque about the body z axis
        self.ydd = (torque.z - g.yaw_damping * self.yd - g.yaw_stiffness * self.y) / g.yaw_mass;
        self.yd += self.ydd * dt;
        self.y += self.yd * dt;

        setpoint.position += self.p;
        setpoint.velocity += self.pd;
        setpoint.acceleration += self.pdd;
        setpoint.yaw += self.y;
        setpoint.yaw_rate += self.yd;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn hover_setpoint() -> TrajectorySetpoint {
        TrajectorySetpoint {
            timestamp: 0,
            position: Vector3::new(1., 2., -3.),
            velocity: Vector3::zeros(),
            acceleration: Vector3::zeros(),
            yaw: 0.5,
            yaw_rate: 0.,
        }
    }

    #[test]
    fn rest_is_a_fixed_point() {
        let mut filter = AdmittanceFilter::new(AdmittanceGains::default());

        for _ in 0..100 {
            let mut setpoint = hover_setpoint();
            filter.step(&ForceTorque::default(), 0.01, &mut setpoint);
            assert_eq!(setpoint, hover_setpoint());
        }
        assert_eq!(filter, AdmittanceFilter::new(AdmittanceGains::default()));
    }

    #[test]
    fn sensor_axes_map_onto_body_axes() {
        let rotation = sensor_to_body();
        assert_eq!(rotation * Vector3::new(1., 2., 3.), Vector3::new(-3., -2., -1.));
        assert_relative_eq!(rotation * rotation, Matrix3::identity());
    }

    #[test]
    fn one_step_semi_implicit_euler() {
        let mut filter = AdmittanceFilter::new(AdmittanceGains::default());
        let sample = ForceTorque {
            timestamp: 0,
            // Body force (0, 0, -2)
            force: Vector3::new(2., 0., 0.),
            // Body yaw torque 0.1
            torque: Vector3::new(-0.1, 0., 0.),
        };

        let mut setpoint = hover_setpoint();
        filter.step(&sample, 0.1, &mut setpoint);

        assert_relative_eq!(filter.pdd, Vector3::new(0., 0., -2.), epsilon = 1e-6);
        assert_relative_eq!(filter.pd, Vector3::new(0., 0., -0.2), epsilon = 1e-6);
        assert_relative_eq!(filter.p, Vector3::new(0., 0., -0.02), epsilon = 1e-6);
        assert_relative_eq!(setpoint.position, Vector3::new(1., 2., -3.02), epsilon = 1e-6);
        assert_relative_eq!(setpoint.velocity, Vector3::new(0., 0., -0.2), epsilon = 1e-6);
        assert_relative_eq!(setpoint.acceleration, Vector3::new(0., 0., -2.), epsilon = 1e-6);

        assert_relative_eq!(filter.ydd, 1., epsilon = 1e-6);
        assert_relative_eq!(filter.yd, 0.1, epsilon = 1e-6);
        assert_relative_eq!(filter.y, 0.01, epsilon = 1e-6);
        assert_relative_eq!(setpoint.yaw, 0.51, epsilon = 1e-6);
        assert_relative_eq!(setpoint.yaw_rate, 0.1, epsilon = 1e-6);
    }

    #[test]
    fn constant_force_settles_at_spring_deflection() {
        let mut filter = AdmittanceFilter::new(AdmittanceGains::default());
        let sample = ForceTorque {
            timestamp: 0,
            force: Vector3::new(0., 0., -5.),
            torque: Vector3::zeros(),
        };

        for _ in 0..2_000 {
            filter.step(&sample, 0.01, &mut hover_setpoint());
        }

        // f / kp along body x
        assert_relative_eq!(filter.p, Vector3::new(1., 0., 0.), epsilon = 1e-3);
        assert_relative_eq!(filter.pd, Vector3::zeros(), epsilon = 1e-3);
    }

    #[test]
    fn reset_keeps_gains() {
        let gains = AdmittanceGains {
            yaw_mass: 2.,
            ..AdmittanceGains::default()
        };
        let mut filter = AdmittanceFilter::new(gains);
        filter.p = Vector3::repeat(1.);
        filter.y = 1.;

        filter.reset();
        assert_eq!(filter, AdmittanceFilter::new(gains));
    }

    #[test]
    fn it_rejects_non_positive_gains() {
        let params = AdmittanceParams {
            mass: 1.,
            damping: -1.,
            stiffness: 1.,
        };
        assert_eq!(
            AdmittanceGains::new(&params, &params),
            Err(Error::NonPositiveGain("admittance damping"))
        );

        let mut filter = AdmittanceFilter::default();
        let gains = AdmittanceGains {
            yaw_mass: 0.,
            ..AdmittanceGains::default()
        };
        assert!(filter.set_gains(gains).is_err());
        assert_eq!(filter.gains(), &AdmittanceGains::default());
    }
}
