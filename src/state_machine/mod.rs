mod goal;
mod resolution;
mod slot;

pub use goal::{Goal, GoalId, GoalResult, GoalStatus, TerminalStatus};
pub use resolution::{Execution, Reason, Resolution, resolve};
pub use slot::GoalSlot;
