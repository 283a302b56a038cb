//! Simulated collaborators used when no hardware is attached.
//!
//! Motions take a fixed time and end early with `STOPPED` when the plan is
//! cancelled, which is enough to exercise every pause and cancel path.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;
use tokio::time::sleep;
use tracing::debug;

use crate::command::{Point, Quaternion, Rpy, ShiftAxis, ToolCommand};
use crate::config::CommanderConfig;
use crate::controller::{ControllerSettings, GoalController};
use crate::error::{CommandError, ServiceError};
use crate::executor::{ArmCommander, CommandExecutor, HandlerResult, ToolCommander};
use crate::learning_mode::{LearningModeService, LearningModeToggler};
use crate::status::{CommandStatus, ExecutionOutcome};

/// Stop requests counted by generation, so a stop issued between the start
/// of a motion and its first poll is not lost.
#[derive(Default)]
struct StopSignal {
    notify: Notify,
    generation: AtomicU64,
}

impl StopSignal {
    fn current(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    fn stop(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    /// Runs `duration` or until a stop newer than `started` fires.
    async fn interruptible(&self, duration: Duration, started: u64) -> ExecutionOutcome {
        let stopped = self.notify.notified();
        tokio::pin!(stopped);
        stopped.as_mut().enable();
        if self.current() != started {
            return ExecutionOutcome::stopped("Command has been stopped");
        }
        tokio::select! {
            _ = sleep(duration) => ExecutionOutcome::success("Command has been successfully processed"),
            _ = stopped => ExecutionOutcome::stopped("Command has been stopped"),
        }
    }
}

pub struct SimulatedArm {
    motion: Duration,
    stop: StopSignal,
    executions: AtomicUsize,
    arm_stops: AtomicUsize,
    script: Mutex<VecDeque<HandlerResult>>,
}

impl SimulatedArm {
    pub fn new(motion: Duration) -> Self {
        Self {
            motion,
            stop: StopSignal::default(),
            executions: AtomicUsize::new(0),
            arm_stops: AtomicUsize::new(0),
            script: Mutex::new(VecDeque::new()),
        }
    }

    /// Queue results returned, in order, instead of simulating a motion.
    pub fn with_script(self, results: impl IntoIterator<Item = HandlerResult>) -> Self {
        self.script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend(results);
        self
    }

    /// Number of commands handed to this arm so far.
    pub fn executions(&self) -> usize {
        self.executions.load(Ordering::SeqCst)
    }

    pub fn arm_stops(&self) -> usize {
        self.arm_stops.load(Ordering::SeqCst)
    }

    async fn run_motion(&self, what: &str) -> HandlerResult {
        let started = self.stop.current();
        self.executions.fetch_add(1, Ordering::SeqCst);
        let scripted = self
            .script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();
        if let Some(result) = scripted {
            return result;
        }
        debug!(motion = what, "simulating arm motion");
        Ok(self.stop.interruptible(self.motion, started).await)
    }
}

#[async_trait]
impl ArmCommander for SimulatedArm {
    async fn set_joint_target(&self, joints: &[f64]) -> HandlerResult {
        if joints.len() != 6 {
            return Err(CommandError::new(
                CommandStatus::UnknownCommand,
                format!("Expected 6 joint values, got {}", joints.len()),
            ));
        }
        self.run_motion("joints").await
    }

    async fn set_pose_target(&self, _position: Point, _rpy: Rpy) -> HandlerResult {
        self.run_motion("pose").await
    }

    async fn set_position_target(&self, _position: Point) -> HandlerResult {
        self.run_motion("position").await
    }

    async fn set_rpy_target(&self, _rpy: Rpy) -> HandlerResult {
        self.run_motion("rpy").await
    }

    async fn set_pose_quat_target(&self, _position: Point, _orientation: Quaternion) -> HandlerResult {
        self.run_motion("pose_quat").await
    }

    async fn set_linear_trajectory(&self, _position: Point, _rpy: Rpy) -> HandlerResult {
        self.run_motion("linear_pose").await
    }

    async fn set_shift_pose_target(&self, _axis: ShiftAxis, _value: f64) -> HandlerResult {
        self.run_motion("shift_pose").await
    }

    async fn execute_trajectory(&self, waypoints: &[Vec<f64>]) -> HandlerResult {
        if waypoints.is_empty() {
            return Err(CommandError::new(
                CommandStatus::UnknownCommand,
                "Trajectory has no waypoints",
            ));
        }
        self.run_motion("execute_trajectory").await
    }

    async fn draw_spiral_trajectory(
        &self,
        radius: f64,
        _angle_step: f64,
        _steps: u32,
    ) -> HandlerResult {
        if radius <= 0.0 {
            return Err(CommandError::new(
                CommandStatus::ControllerProblems,
                "Spiral radius must be positive",
            ));
        }
        self.run_motion("draw_spiral").await
    }

    async fn stop_current_plan(&self) -> Result<(), CommandError> {
        self.stop.stop();
        Ok(())
    }

    async fn stop_arm(&self) -> Result<(), CommandError> {
        self.arm_stops.fetch_add(1, Ordering::SeqCst);
        self.stop.stop();
        Ok(())
    }
}

pub struct SimulatedTool {
    action: Duration,
    stop: StopSignal,
}

impl SimulatedTool {
    pub fn new(action: Duration) -> Self {
        Self {
            action,
            stop: StopSignal::default(),
        }
    }
}

#[async_trait]
impl ToolCommander for SimulatedTool {
    async fn send_tool_command(&self, cmd: &ToolCommand) -> HandlerResult {
        let started = self.stop.current();
        debug!(tool_id = cmd.tool_id, action = ?cmd.action, "simulating tool action");
        Ok(self.stop.interruptible(self.action, started).await)
    }

    async fn stop_tool_command(&self) -> Result<(), CommandError> {
        self.stop.stop();
        Ok(())
    }
}

/// Learning mode service that answers immediately.
pub struct SimulatedLearningMode {
    available: AtomicBool,
    calls: AtomicUsize,
}

impl Default for SimulatedLearningMode {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedLearningMode {
    pub fn new() -> Self {
        Self {
            available: AtomicBool::new(true),
            calls: AtomicUsize::new(0),
        }
    }

    /// When unavailable, every call fails like an unreachable service.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LearningModeService for SimulatedLearningMode {
    async fn activate(&self, enabled: bool) -> Result<ExecutionOutcome, ServiceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.available.load(Ordering::SeqCst) {
            return Err(ServiceError::Unavailable("learning_mode/activate".into()));
        }
        let state = if enabled { "activated" } else { "deactivated" };
        Ok(ExecutionOutcome::success(format!("Learning mode {state}")))
    }
}

/// Controller wired to simulated collaborators, as used by `run` and `demo`.
pub fn simulated_controller(config: &CommanderConfig) -> GoalController {
    let motion = config.simulated_motion();
    let executor = CommandExecutor::new(
        Arc::new(SimulatedArm::new(motion)),
        Arc::new(SimulatedTool::new(motion / 4)),
    );
    let toggler = LearningModeToggler::new(
        Arc::new(SimulatedLearningMode::new()),
        config.learning_mode_timeout(),
    );
    GoalController::new(ControllerSettings::from(config), executor, toggler)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn motion_completes() {
        let arm = SimulatedArm::new(Duration::from_millis(10));
        let outcome = arm.set_joint_target(&[0.0; 6]).await.unwrap();
        assert!(outcome.is_success());
        assert_eq!(arm.executions(), 1);
    }

    #[tokio::test]
    async fn stop_interrupts_motion() {
        let arm = Arc::new(SimulatedArm::new(Duration::from_secs(10)));
        let running = {
            let arm = arm.clone();
            tokio::spawn(async move { arm.set_rpy_target(Rpy { roll: 0.0, pitch: 0.0, yaw: 1.0 }).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        arm.stop_current_plan().await.unwrap();

        let outcome = running.await.unwrap().unwrap();
        assert_eq!(outcome.status, CommandStatus::Stopped);
    }

    #[tokio::test]
    async fn stop_before_first_poll_is_not_lost() {
        let stop = StopSignal::default();
        let started = stop.current();
        stop.stop();

        let outcome = stop.interruptible(Duration::from_secs(10), started).await;
        assert_eq!(outcome.status, CommandStatus::Stopped);
    }

    #[tokio::test]
    async fn earlier_stop_does_not_leak_into_next_motion() {
        let arm = SimulatedArm::new(Duration::from_millis(10));
        arm.stop_current_plan().await.unwrap();
        assert!(arm.set_joint_target(&[0.0; 6]).await.unwrap().is_success());
    }

    #[tokio::test]
    async fn script_takes_precedence() {
        let arm = SimulatedArm::new(Duration::from_secs(10)).with_script([Ok(
            ExecutionOutcome::new(CommandStatus::ControllerProblems, "collision"),
        )]);
        let outcome = arm.set_position_target(Point { x: 0.1, y: 0.0, z: 0.2 }).await.unwrap();
        assert_eq!(outcome.status, CommandStatus::ControllerProblems);
    }

    #[tokio::test]
    async fn invalid_joint_count_raises() {
        let arm = SimulatedArm::new(Duration::ZERO);
        let err = arm.set_joint_target(&[0.0; 3]).await.unwrap_err();
        assert!(err.message.contains("6 joint"));
    }

    #[tokio::test]
    async fn learning_mode_availability() {
        let service = SimulatedLearningMode::new();
        assert!(service.activate(false).await.unwrap().is_success());
        service.set_available(false);
        assert!(service.activate(false).await.is_err());
        assert_eq!(service.calls(), 2);
    }
}
