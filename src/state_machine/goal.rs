use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::command::RobotCommand;
use crate::status::ExecutionOutcome;

pub type GoalId = Uuid;

/// Lifecycle status of a goal.
///
/// A goal flows: PENDING → ACTIVE → {SUCCEEDED, ABORTED, CANCELED}
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GoalStatus {
    Pending,
    Active,
    Succeeded,
    Aborted,
    Canceled,
}

impl GoalStatus {
    /// Pending and active goals occupy the slot.
    pub fn is_active(self) -> bool {
        matches!(self, GoalStatus::Pending | GoalStatus::Active)
    }

    pub fn is_terminal(self) -> bool {
        !self.is_active()
    }

    pub fn can_transition_to(self, next: GoalStatus) -> bool {
        match self {
            GoalStatus::Pending => next == GoalStatus::Active || next.is_terminal(),
            GoalStatus::Active => next.is_terminal(),
            _ => false,
        }
    }
}

impl fmt::Display for GoalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GoalStatus::Pending => write!(f, "PENDING"),
            GoalStatus::Active => write!(f, "ACTIVE"),
            GoalStatus::Succeeded => write!(f, "SUCCEEDED"),
            GoalStatus::Aborted => write!(f, "ABORTED"),
            GoalStatus::Canceled => write!(f, "CANCELED"),
        }
    }
}

/// The three ways a goal can end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TerminalStatus {
    Succeeded,
    Aborted,
    Canceled,
}

impl From<TerminalStatus> for GoalStatus {
    fn from(status: TerminalStatus) -> Self {
        match status {
            TerminalStatus::Succeeded => GoalStatus::Succeeded,
            TerminalStatus::Aborted => GoalStatus::Aborted,
            TerminalStatus::Canceled => GoalStatus::Canceled,
        }
    }
}

impl fmt::Display for TerminalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        GoalStatus::from(*self).fmt(f)
    }
}

/// One admitted command and its lifecycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Goal {
    pub id: GoalId,
    pub command: RobotCommand,
    pub status: GoalStatus,
    /// Number of times the command was handed to the executor.
    pub attempts: u32,
    /// Set once a client asked for this goal to be canceled.
    #[serde(default)]
    pub cancel_requested: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Goal {
    pub fn new(command: RobotCommand) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            command,
            status: GoalStatus::Pending,
            attempts: 0,
            cancel_requested: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// Move to `next` if the lifecycle allows it. Returns whether it moved.
    pub fn transition(&mut self, next: GoalStatus) -> bool {
        if !self.status.can_transition_to(next) {
            return false;
        }
        self.status = next;
        self.updated_at = Utc::now();
        true
    }
}

/// Terminal notification delivered once to the submitter of a goal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoalResult {
    pub goal_id: GoalId,
    pub command: RobotCommand,
    pub status: TerminalStatus,
    pub outcome: ExecutionOutcome,
    pub attempts: u32,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub duration_ms: i64,
}

impl GoalResult {
    /// Build the notification for a goal that just reached `status`.
    pub fn from_goal(goal: &Goal, status: TerminalStatus, outcome: ExecutionOutcome) -> Self {
        let now = Utc::now();
        Self {
            goal_id: goal.id,
            command: goal.command.clone(),
            status,
            outcome,
            attempts: goal.attempts,
            started_at: goal.created_at,
            completed_at: now,
            duration_ms: (now - goal.created_at).num_milliseconds(),
        }
    }
}
