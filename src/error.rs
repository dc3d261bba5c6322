//! Simulation error taxonomy
//!
//! Only `ControllerTimeout` and tolerated `ControllerFault`s are absorbed by the
//! game loop. Every other variant propagates to the caller and ends the run.

use crate::game::state::ShipId;

/// Errors raised by scenario construction, the controller sandbox and the game loop
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SimError {
    /// Invalid scenario or configuration, rejected at construction time
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A controller produced a NaN actuator command
    #[error("Invalid command for ship {ship_id}: {field} is NaN")]
    InvalidCommand { ship_id: ShipId, field: &'static str },

    /// The controller did not return within the tick deadline
    #[error("Controller '{controller}' timed out on frame {frame}")]
    ControllerTimeout { controller: String, frame: u64 },

    /// The controller returned an error or panicked
    #[error("Controller '{controller}' failed on frame {frame}: {message}")]
    ControllerFault {
        controller: String,
        frame: u64,
        message: String,
    },

    /// Internal state that can only be produced by a simulation bug
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    /// The run was stopped from outside before reaching a terminal state
    #[error("Run cancelled at frame {frame}")]
    Cancelled { frame: u64 },
}

impl SimError {
    pub fn config(msg: impl Into<String>) -> Self {
        SimError::Configuration(msg.into())
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        SimError::InvariantViolation(msg.into())
    }

    /// Whether the game loop may absorb this error and continue
    pub fn is_recoverable(&self) -> bool {
        matches!(self, SimError::ControllerTimeout { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = SimError::InvalidCommand { ship_id: 2, field: "thrust" };
        assert_eq!(err.to_string(), "Invalid command for ship 2: thrust is NaN");

        let err = SimError::config("both asteroid specs set");
        assert_eq!(err.to_string(), "Configuration error: both asteroid specs set");
    }

    #[test]
    fn test_only_timeouts_recoverable() {
        assert!(SimError::ControllerTimeout { controller: "a".into(), frame: 1 }.is_recoverable());
        assert!(!SimError::invariant("size 5").is_recoverable());
        assert!(!SimError::Cancelled { frame: 3 }.is_recoverable());
        assert!(!SimError::ControllerFault {
            controller: "a".into(),
            frame: 1,
            message: "boom".into()
        }
        .is_recoverable());
    }
}
