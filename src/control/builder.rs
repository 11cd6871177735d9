use super::law::{AnyControlLaw, ControlLaw};
use super::PositionAttitudeControl;
use crate::config::Params;
use crate::Error;
use embedded_time::Clock;

/// Builder for a [`PositionAttitudeControl`].
pub struct Builder<C> {
    clock: Option<C>,
    params: Params,
}

impl<C> Default for Builder<C> {
    fn default() -> Self {
        Self {
            clock: None,
            params: Params::default(),
        }
    }
}

impl<C> Builder<C>
where
    C: Clock<T = u64>,
{
    pub fn clock(mut self, clock: C) -> Self {
        self.clock = Some(clock);
        self
    }

    /// The first parameter epoch, the defaults if unset.
    pub fn params(mut self, params: Params) -> Self {
        self.params = params;
        self
    }

    /// Build with the control law selected by the parameters.
    pub fn build(self) -> Result<PositionAttitudeControl<C, AnyControlLaw>, Error> {
        let control = AnyControlLaw::new(self.params.control_law);
        self.build_with(control)
    }

    /// Build around a custom control law.
    pub fn build_with<L: ControlLaw>(
        self,
        control: L,
    ) -> Result<PositionAttitudeControl<C, L>, Error> {
        let clock = self.clock.ok_or(Error::Clock)?;
        PositionAttitudeControl::new(clock, control, self.params)
    }
}
