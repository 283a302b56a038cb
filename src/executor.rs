//! Dispatch of admitted commands to the arm and tool executors.
//!
//! The motion and tool algorithms live behind [`ArmCommander`] and
//! [`ToolCommander`]. [`CommandExecutor`] owns only the routing from command
//! kind to handler and the best-effort cancellation policy.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::command::{ArmCommand, Point, Quaternion, RobotCommand, Rpy, ShiftAxis, ToolCommand};
use crate::error::CommandError;
use crate::status::{CommandStatus, ExecutionOutcome};

/// Result contract shared by every executor handler.
pub type HandlerResult = Result<ExecutionOutcome, CommandError>;

/// Arm motion executor. Every handler may block until the motion finishes;
/// `stop_current_plan` is called from another task to interrupt it.
#[async_trait]
pub trait ArmCommander: Send + Sync {
    async fn set_joint_target(&self, joints: &[f64]) -> HandlerResult;
    async fn set_pose_target(&self, position: Point, rpy: Rpy) -> HandlerResult;
    async fn set_position_target(&self, position: Point) -> HandlerResult;
    async fn set_rpy_target(&self, rpy: Rpy) -> HandlerResult;
    async fn set_pose_quat_target(&self, position: Point, orientation: Quaternion) -> HandlerResult;
    async fn set_linear_trajectory(&self, position: Point, rpy: Rpy) -> HandlerResult;
    async fn set_shift_pose_target(&self, axis: ShiftAxis, value: f64) -> HandlerResult;
    async fn execute_trajectory(&self, waypoints: &[Vec<f64>]) -> HandlerResult;
    async fn draw_spiral_trajectory(&self, radius: f64, angle_step: f64, steps: u32)
    -> HandlerResult;

    /// Ask the planner to abandon the plan being executed.
    async fn stop_current_plan(&self) -> Result<(), CommandError>;

    /// Halt the arm immediately (used when learning mode switches on).
    async fn stop_arm(&self) -> Result<(), CommandError>;
}

#[async_trait]
pub trait ToolCommander: Send + Sync {
    async fn send_tool_command(&self, cmd: &ToolCommand) -> HandlerResult;
    async fn stop_tool_command(&self) -> Result<(), CommandError>;
}

/// Routes a [`RobotCommand`] to the matching executor handler.
#[derive(Clone)]
pub struct CommandExecutor {
    arm: Arc<dyn ArmCommander>,
    tool: Arc<dyn ToolCommander>,
}

impl CommandExecutor {
    pub fn new(arm: Arc<dyn ArmCommander>, tool: Arc<dyn ToolCommander>) -> Self {
        Self { arm, tool }
    }

    pub async fn execute(&self, cmd: &RobotCommand) -> HandlerResult {
        match cmd {
            RobotCommand::MoveOnly { arm_cmd } => self.execute_arm(arm_cmd).await,
            RobotCommand::ToolOnly { tool_cmd } => self.tool.send_tool_command(tool_cmd).await,
            RobotCommand::Unknown => Ok(unknown_command()),
        }
    }

    async fn execute_arm(&self, cmd: &ArmCommand) -> HandlerResult {
        debug!(kind = cmd.kind(), "dispatching arm command");
        let arm = &self.arm;
        match cmd {
            ArmCommand::Joints { joints } => arm.set_joint_target(joints).await,
            ArmCommand::Pose { position, rpy } => arm.set_pose_target(*position, *rpy).await,
            ArmCommand::Position { position } => arm.set_position_target(*position).await,
            ArmCommand::Rpy { rpy } => arm.set_rpy_target(*rpy).await,
            ArmCommand::PoseQuat {
                position,
                orientation,
            } => arm.set_pose_quat_target(*position, *orientation).await,
            ArmCommand::LinearPose { position, rpy } => {
                arm.set_linear_trajectory(*position, *rpy).await
            }
            ArmCommand::ShiftPose { axis, value } => arm.set_shift_pose_target(*axis, *value).await,
            ArmCommand::ExecuteTrajectory { waypoints } => arm.execute_trajectory(waypoints).await,
            ArmCommand::DrawSpiral {
                radius,
                angle_step,
                steps,
            } => {
                arm.draw_spiral_trajectory(*radius, *angle_step, *steps)
                    .await
            }
            ArmCommand::Unknown => Ok(unknown_command()),
        }
    }

    /// Best-effort cancellation of whatever the executors are running.
    ///
    /// Never fails: errors from either executor are logged and dropped, and
    /// the running execution path is left to observe the stop and finalize
    /// its goal.
    pub async fn cancel(&self) {
        if let Err(e) = self.arm.stop_current_plan().await {
            warn!(error = %e, "could not cancel current arm plan");
        }
        if let Err(e) = self.tool.stop_tool_command().await {
            warn!(error = %e, "could not cancel current tool command");
        }
    }

    /// Best-effort arm halt, same error policy as [`cancel`](Self::cancel).
    pub async fn stop_arm(&self) {
        if let Err(e) = self.arm.stop_arm().await {
            warn!(error = %e, "could not stop arm");
        }
    }
}

fn unknown_command() -> ExecutionOutcome {
    ExecutionOutcome::new(CommandStatus::UnknownCommand, "Unknown command")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::ToolAction;
    use std::sync::Mutex;

    /// Records which handler was hit.
    #[derive(Default)]
    struct RecordingArm {
        calls: Mutex<Vec<&'static str>>,
        fail_stop: bool,
    }

    impl RecordingArm {
        fn hit(&self, name: &'static str) -> HandlerResult {
            self.calls.lock().unwrap().push(name);
            Ok(ExecutionOutcome::success(name))
        }
    }

    #[async_trait]
    impl ArmCommander for RecordingArm {
        async fn set_joint_target(&self, _joints: &[f64]) -> HandlerResult {
            self.hit("joints")
        }
        async fn set_pose_target(&self, _p: Point, _r: Rpy) -> HandlerResult {
            self.hit("pose")
        }
        async fn set_position_target(&self, _p: Point) -> HandlerResult {
            self.hit("position")
        }
        async fn set_rpy_target(&self, _r: Rpy) -> HandlerResult {
            self.hit("rpy")
        }
        async fn set_pose_quat_target(&self, _p: Point, _q: Quaternion) -> HandlerResult {
            self.hit("pose_quat")
        }
        async fn set_linear_trajectory(&self, _p: Point, _r: Rpy) -> HandlerResult {
            self.hit("linear_pose")
        }
        async fn set_shift_pose_target(&self, _a: ShiftAxis, _v: f64) -> HandlerResult {
            self.hit("shift_pose")
        }
        async fn execute_trajectory(&self, _w: &[Vec<f64>]) -> HandlerResult {
            self.hit("execute_trajectory")
        }
        async fn draw_spiral_trajectory(&self, _r: f64, _a: f64, _s: u32) -> HandlerResult {
            Err(CommandError::new(
                CommandStatus::ControllerProblems,
                "spiral out of workspace",
            ))
        }
        async fn stop_current_plan(&self) -> Result<(), CommandError> {
            self.calls.lock().unwrap().push("stop_current_plan");
            if self.fail_stop {
                return Err(CommandError::new(CommandStatus::Stopped, "planner offline"));
            }
            Ok(())
        }
        async fn stop_arm(&self) -> Result<(), CommandError> {
            self.calls.lock().unwrap().push("stop_arm");
            Ok(())
        }
    }

    #[derive(Default)]
    struct RecordingTool {
        stopped: Mutex<bool>,
    }

    #[async_trait]
    impl ToolCommander for RecordingTool {
        async fn send_tool_command(&self, cmd: &ToolCommand) -> HandlerResult {
            Ok(ExecutionOutcome::success(format!("tool {} {:?}", cmd.tool_id, cmd.action)))
        }
        async fn stop_tool_command(&self) -> Result<(), CommandError> {
            *self.stopped.lock().unwrap() = true;
            Ok(())
        }
    }

    fn executor(arm: Arc<RecordingArm>, tool: Arc<RecordingTool>) -> CommandExecutor {
        CommandExecutor::new(arm, tool)
    }

    #[tokio::test]
    async fn routes_each_arm_kind_to_its_handler() {
        let arm = Arc::new(RecordingArm::default());
        let exec = executor(arm.clone(), Arc::new(RecordingTool::default()));
        let origin = Point { x: 0.2, y: 0.0, z: 0.3 };
        let rpy = Rpy { roll: 0.0, pitch: 1.57, yaw: 0.0 };

        let cmds = vec![
            ArmCommand::Joints { joints: vec![0.0; 6] },
            ArmCommand::Pose { position: origin, rpy },
            ArmCommand::Position { position: origin },
            ArmCommand::Rpy { rpy },
            ArmCommand::PoseQuat {
                position: origin,
                orientation: Quaternion { x: 0.0, y: 0.0, z: 0.0, w: 1.0 },
            },
            ArmCommand::LinearPose { position: origin, rpy },
            ArmCommand::ShiftPose { axis: ShiftAxis::Z, value: 0.05 },
            ArmCommand::ExecuteTrajectory { waypoints: vec![vec![0.0; 6]] },
        ];
        for arm_cmd in cmds {
            let outcome = exec.execute(&RobotCommand::MoveOnly { arm_cmd }).await.unwrap();
            assert!(outcome.is_success());
        }

        assert_eq!(
            *arm.calls.lock().unwrap(),
            vec![
                "joints",
                "pose",
                "position",
                "rpy",
                "pose_quat",
                "linear_pose",
                "shift_pose",
                "execute_trajectory"
            ]
        );
    }

    #[tokio::test]
    async fn handler_failure_is_returned_as_error() {
        let exec = executor(Arc::new(RecordingArm::default()), Arc::new(RecordingTool::default()));
        let cmd = RobotCommand::MoveOnly {
            arm_cmd: ArmCommand::DrawSpiral { radius: 2.0, angle_step: 5.0, steps: 3 },
        };
        let err = exec.execute(&cmd).await.unwrap_err();
        assert_eq!(err.status, CommandStatus::ControllerProblems);
    }

    #[tokio::test]
    async fn unknown_kinds_report_unknown_command() {
        let exec = executor(Arc::new(RecordingArm::default()), Arc::new(RecordingTool::default()));

        let outcome = exec.execute(&RobotCommand::Unknown).await.unwrap();
        assert_eq!(outcome.status, CommandStatus::UnknownCommand);

        let cmd = RobotCommand::MoveOnly { arm_cmd: ArmCommand::Unknown };
        let outcome = exec.execute(&cmd).await.unwrap();
        assert_eq!(outcome.status, CommandStatus::UnknownCommand);
    }

    #[tokio::test]
    async fn tool_commands_go_to_tool_executor() {
        let exec = executor(Arc::new(RecordingArm::default()), Arc::new(RecordingTool::default()));
        let outcome = exec
            .execute(&RobotCommand::tool(11, ToolAction::CloseGripper))
            .await
            .unwrap();
        assert_eq!(outcome.message, "tool 11 CloseGripper");
    }

    #[tokio::test]
    async fn cancel_swallows_arm_errors_and_still_stops_tool() {
        let arm = Arc::new(RecordingArm {
            fail_stop: true,
            ..Default::default()
        });
        let tool = Arc::new(RecordingTool::default());
        let exec = executor(arm.clone(), tool.clone());

        exec.cancel().await;

        assert_eq!(*arm.calls.lock().unwrap(), vec!["stop_current_plan"]);
        assert!(*tool.stopped.lock().unwrap());
    }
}
