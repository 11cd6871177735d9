use embedded_time::{clock, ConversionError};
use thiserror::Error;

/// Errors raised while loading a configuration epoch or starting the controller.
///
/// None of these abort a running control cycle: the loop logs them and keeps the
/// previous epoch.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    #[error("rotor count {count} exceeds the maximum of {max}")]
    TooManyRotors { count: usize, max: usize },

    #[error("tilt group count {count} exceeds the maximum of {max}")]
    TooManyTilts { count: usize, max: usize },

    #[error("gain `{0}` must be strictly positive")]
    NonPositiveGain(&'static str),

    #[error("wrong actuator ordering: servos need to be after motors")]
    ActuatorOrdering,

    #[error("rotor {rotor} references tilt group {group} but only {count} are configured")]
    TiltGroupOutOfRange {
        rotor: usize,
        group: usize,
        count: usize,
    },

    #[error("effectiveness matrix {0} is not available")]
    MatrixIndex(usize),

    #[error("clock unavailable")]
    Clock,

    #[error("parameters unavailable")]
    ParamsUnavailable,

    #[error("control task stopped")]
    TaskStopped,
}

impl From<clock::Error> for Error {
    fn from(_clock_error: clock::Error) -> Self {
        Error::Clock
    }
}

impl From<ConversionError> for Error {
    fn from(_conversion_error: ConversionError) -> Self {
        Error::Clock
    }
}
