//! Inbound command payloads.
//!
//! A [`RobotCommand`] is either an arm motion or a tool action. Both enums
//! are tagged on the wire; a tag this build does not know deserializes to
//! an `Unknown` variant instead of failing, so the execution path can report
//! `UNKNOWN_COMMAND` like any other outcome.

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rpy {
    pub roll: f64,
    pub pitch: f64,
    pub yaw: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quaternion {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub w: f64,
}

/// Axis along which a relative pose shift is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShiftAxis {
    X,
    Y,
    Z,
    Roll,
    Pitch,
    Yaw,
}

/// One arm motion request. Each variant is routed to exactly one handler of
/// the arm executor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "move_type", rename_all = "snake_case")]
pub enum ArmCommand {
    Joints { joints: Vec<f64> },
    Pose { position: Point, rpy: Rpy },
    Position { position: Point },
    Rpy { rpy: Rpy },
    PoseQuat { position: Point, orientation: Quaternion },
    LinearPose { position: Point, rpy: Rpy },
    ShiftPose { axis: ShiftAxis, value: f64 },
    ExecuteTrajectory { waypoints: Vec<Vec<f64>> },
    DrawSpiral { radius: f64, angle_step: f64, steps: u32 },
    #[serde(other)]
    Unknown,
}

impl ArmCommand {
    pub fn kind(&self) -> &'static str {
        match self {
            ArmCommand::Joints { .. } => "joints",
            ArmCommand::Pose { .. } => "pose",
            ArmCommand::Position { .. } => "position",
            ArmCommand::Rpy { .. } => "rpy",
            ArmCommand::PoseQuat { .. } => "pose_quat",
            ArmCommand::LinearPose { .. } => "linear_pose",
            ArmCommand::ShiftPose { .. } => "shift_pose",
            ArmCommand::ExecuteTrajectory { .. } => "execute_trajectory",
            ArmCommand::DrawSpiral { .. } => "draw_spiral",
            ArmCommand::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolAction {
    OpenGripper,
    CloseGripper,
    PullAir,
    PushAir,
    ActivateDigitalIo,
    DeactivateDigitalIo,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCommand {
    pub tool_id: u8,
    pub action: ToolAction,
    #[serde(default)]
    pub speed: u16,
}

/// A goal payload as received from a client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "cmd_type", rename_all = "snake_case")]
pub enum RobotCommand {
    MoveOnly { arm_cmd: ArmCommand },
    ToolOnly { tool_cmd: ToolCommand },
    #[serde(other)]
    Unknown,
}

impl RobotCommand {
    /// Tool-only commands skip the learning mode check at admission.
    pub fn is_tool_only(&self) -> bool {
        matches!(self, RobotCommand::ToolOnly { .. })
    }

    pub fn joints(joints: Vec<f64>) -> Self {
        RobotCommand::MoveOnly {
            arm_cmd: ArmCommand::Joints { joints },
        }
    }

    pub fn tool(tool_id: u8, action: ToolAction) -> Self {
        RobotCommand::ToolOnly {
            tool_cmd: ToolCommand {
                tool_id,
                action,
                speed: 0,
            },
        }
    }
}

impl fmt::Display for RobotCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RobotCommand::MoveOnly { arm_cmd } => write!(f, "move({})", arm_cmd.kind()),
            RobotCommand::ToolOnly { tool_cmd } => {
                write!(f, "tool({}, {:?})", tool_cmd.tool_id, tool_cmd.action)
            }
            RobotCommand::Unknown => write!(f, "unknown"),
        }
    }
}
