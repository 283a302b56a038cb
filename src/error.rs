use thiserror::Error;

use crate::status::{CommandStatus, ExecutionOutcome};

#[derive(Debug, Error)]
pub enum CommanderError {
    #[error("Config error: {0}")]
    Config(String),

    #[error("Commander node has stopped")]
    NodeStopped,

    #[error("Goal {0} was dropped before reaching a terminal state")]
    GoalDropped(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Domain failure raised by an arm or tool executor while running a command.
///
/// The execution path converts it into an [`ExecutionOutcome`] carrying the
/// same status and message; it never propagates past the goal.
#[derive(Debug, Clone, Error)]
#[error("{status}: {message}")]
pub struct CommandError {
    pub status: CommandStatus,
    pub message: String,
}

impl CommandError {
    pub fn new(status: CommandStatus, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

impl From<CommandError> for ExecutionOutcome {
    fn from(err: CommandError) -> Self {
        ExecutionOutcome::new(err.status, err.message)
    }
}

/// Infrastructure failure of an external service call (learning mode RPC).
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Service unavailable: {0}")]
    Unavailable(String),

    #[allow(dead_code)]
    #[error("Service call failed: {0}")]
    CallFailed(String),
}
