use std::fmt;

use serde::{Deserialize, Serialize};

/// Closed set of status codes a command can end with, whether it was
/// rejected at admission or produced by an executor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommandStatus {
    Success,
    Stopped,
    HardwareNotOk,
    CalibrationNotDone,
    JogControllerEnabled,
    GoalStillActive,
    LearningModeOn,
    ControllerProblems,
    UnknownCommand,
}

impl fmt::Display for CommandStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CommandStatus::Success => "SUCCESS",
            CommandStatus::Stopped => "STOPPED",
            CommandStatus::HardwareNotOk => "HARDWARE_NOT_OK",
            CommandStatus::CalibrationNotDone => "CALIBRATION_NOT_DONE",
            CommandStatus::JogControllerEnabled => "JOG_CONTROLLER_ENABLED",
            CommandStatus::GoalStillActive => "GOAL_STILL_ACTIVE",
            CommandStatus::LearningModeOn => "LEARNING_MODE_ON",
            CommandStatus::ControllerProblems => "CONTROLLER_PROBLEMS",
            CommandStatus::UnknownCommand => "UNKNOWN_COMMAND",
        };
        f.write_str(s)
    }
}

/// Status and message reported for one execution of a command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionOutcome {
    pub status: CommandStatus,
    pub message: String,
}

impl ExecutionOutcome {
    pub fn new(status: CommandStatus, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(CommandStatus::Success, message)
    }

    pub fn stopped(message: impl Into<String>) -> Self {
        Self::new(CommandStatus::Stopped, message)
    }

    pub fn is_success(&self) -> bool {
        self.status == CommandStatus::Success
    }
}

impl fmt::Display for ExecutionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.status, self.message)
    }
}
