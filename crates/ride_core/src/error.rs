use std::fmt;

use crate::ecs::RideStatus;

/// Errors returned synchronously by the command surface. Balance exhaustion and
/// collaborator failures are notices, not errors: they never block the
/// lifecycle.
#[derive(Debug)]
pub enum RideError {
    /// Malformed ride request; no state is created.
    InvalidRequest(String),
    /// Command issued in a status that does not permit it; state unchanged.
    InvalidTransition {
        command: &'static str,
        expected: RideStatus,
        actual: RideStatus,
    },
    NoSuchRide,
    NoSuchDriver,
    /// Driver exists but is busy or offline; state unchanged.
    DriverUnavailable(String),
}

impl fmt::Display for RideError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RideError::InvalidRequest(reason) => write!(f, "invalid ride request: {reason}"),
            RideError::InvalidTransition {
                command,
                expected,
                actual,
            } => write!(
                f,
                "{command} requires status {} but ride is {}",
                expected.as_str(),
                actual.as_str()
            ),
            RideError::NoSuchRide => write!(f, "ride does not exist"),
            RideError::NoSuchDriver => write!(f, "driver does not exist"),
            RideError::DriverUnavailable(name) => write!(f, "driver {name} is not available"),
        }
    }
}

impl std::error::Error for RideError {}
