use std::fmt;

use crate::status::{CommandStatus, ExecutionOutcome};

use super::goal::TerminalStatus;

/// What one executor call produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Execution {
    /// The executor returned an outcome.
    Responded(ExecutionOutcome),
    /// The executor raised a domain failure; no response was produced.
    Failed(ExecutionOutcome),
}

impl Execution {
    pub fn outcome(&self) -> &ExecutionOutcome {
        match self {
            Execution::Responded(outcome) | Execution::Failed(outcome) => outcome,
        }
    }

    pub fn into_outcome(self) -> ExecutionOutcome {
        match self {
            Execution::Responded(outcome) | Execution::Failed(outcome) => outcome,
        }
    }
}

/// Why a goal ended the way it did. Used for log diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reason {
    Succeeded,
    Stopped,
    ExecutionFailed,
    ControllerProblems,
    UnknownResult,
    PauseTimeout,
    CancelSignal,
    CancelRequested,
    TooManyResumes,
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Reason::Succeeded => "goal has been set as succeeded",
            Reason::Stopped => "goal has been successfully canceled",
            Reason::ExecutionFailed => "execution has been aborted",
            Reason::ControllerProblems => {
                "controller failed during execution, either a collision or a motor unable to \
                 follow a given command (overload, extreme positions, ...)"
            }
            Reason::UnknownResult => "unknown result, goal has been set as aborted",
            Reason::PauseTimeout => "goal has been paused for too long, cancelling it",
            Reason::CancelSignal => "goal has been canceled by a cancel signal",
            Reason::CancelRequested => "goal has been canceled on request",
            Reason::TooManyResumes => "goal has been resumed too many times, aborting it",
        };
        f.write_str(s)
    }
}

/// Terminal status chosen for a goal, with the reason behind it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    pub status: TerminalStatus,
    pub reason: Reason,
}

impl Resolution {
    pub const fn new(status: TerminalStatus, reason: Reason) -> Self {
        Self { status, reason }
    }
}

/// Map an execution that was not interrupted by a pause to a terminal status.
///
/// - no response (executor failure) → ABORTED
/// - SUCCESS → SUCCEEDED
/// - STOPPED → CANCELED
/// - CONTROLLER_PROBLEMS → ABORTED
/// - anything else → ABORTED with an unknown-result diagnostic
pub fn resolve(execution: &Execution) -> Resolution {
    let outcome = match execution {
        Execution::Failed(_) => {
            return Resolution::new(TerminalStatus::Aborted, Reason::ExecutionFailed);
        }
        Execution::Responded(outcome) => outcome,
    };

    match outcome.status {
        CommandStatus::Success => Resolution::new(TerminalStatus::Succeeded, Reason::Succeeded),
        CommandStatus::Stopped => Resolution::new(TerminalStatus::Canceled, Reason::Stopped),
        CommandStatus::ControllerProblems => {
            Resolution::new(TerminalStatus::Aborted, Reason::ControllerProblems)
        }
        _ => Resolution::new(TerminalStatus::Aborted, Reason::UnknownResult),
    }
}
