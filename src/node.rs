//! The commander node: one control task consuming inbound signals.
//!
//! Hardware status, learning mode, jog and pause signals, goal submissions
//! and cancellations all arrive on one channel and are handled in order.
//! Admission and goal execution run on their own tasks, so the loop keeps
//! handling signals while a submission retries or a motion is in progress.

use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, info};

use crate::command::RobotCommand;
use crate::controller::{GoalController, GoalHandle};
use crate::error::CommanderError;
use crate::pause::PauseState;
use crate::readiness::{HardwareStatus, Rejection};
use crate::state_machine::GoalId;
use crate::status::ExecutionOutcome;

/// A message for the control loop.
#[derive(Debug)]
pub enum NodeEvent {
    HardwareStatus(HardwareStatus),
    LearningMode(bool),
    JogEnabled(bool),
    Pause(PauseState),
    Submit {
        command: RobotCommand,
        reply: oneshot::Sender<Result<GoalHandle, Rejection>>,
    },
    Cancel(GoalId),
    Stop {
        reply: oneshot::Sender<ExecutionOutcome>,
    },
    IsActive {
        reply: oneshot::Sender<bool>,
    },
}

/// Wire form of the signals accepted by the line transport.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Inbound {
    HardwareStatus(HardwareStatus),
    LearningMode(bool),
    JogEnabled(bool),
    Pause(PauseState),
    Goal(RobotCommand),
    Cancel(GoalId),
    Stop(Option<()>),
    IsActive(Option<()>),
}

/// Cloneable sender side of the node.
#[derive(Debug, Clone)]
pub struct NodeHandle {
    tx: mpsc::Sender<NodeEvent>,
}

impl NodeHandle {
    async fn send(&self, event: NodeEvent) -> Result<(), CommanderError> {
        self.tx.send(event).await.map_err(|_| CommanderError::NodeStopped)
    }

    pub async fn hardware_status(&self, status: HardwareStatus) -> Result<(), CommanderError> {
        self.send(NodeEvent::HardwareStatus(status)).await
    }

    pub async fn learning_mode(&self, active: bool) -> Result<(), CommanderError> {
        self.send(NodeEvent::LearningMode(active)).await
    }

    pub async fn jog_enabled(&self, enabled: bool) -> Result<(), CommanderError> {
        self.send(NodeEvent::JogEnabled(enabled)).await
    }

    pub async fn pause(&self, state: PauseState) -> Result<(), CommanderError> {
        self.send(NodeEvent::Pause(state)).await
    }

    pub async fn cancel(&self, id: GoalId) -> Result<(), CommanderError> {
        self.send(NodeEvent::Cancel(id)).await
    }

    pub async fn submit(
        &self,
        command: RobotCommand,
    ) -> Result<Result<GoalHandle, Rejection>, CommanderError> {
        let (reply, rx) = oneshot::channel();
        self.send(NodeEvent::Submit { command, reply }).await?;
        rx.await.map_err(|_| CommanderError::NodeStopped)
    }

    pub async fn stop_command(&self) -> Result<ExecutionOutcome, CommanderError> {
        let (reply, rx) = oneshot::channel();
        self.send(NodeEvent::Stop { reply }).await?;
        rx.await.map_err(|_| CommanderError::NodeStopped)
    }

    pub async fn is_active(&self) -> Result<bool, CommanderError> {
        let (reply, rx) = oneshot::channel();
        self.send(NodeEvent::IsActive { reply }).await?;
        rx.await.map_err(|_| CommanderError::NodeStopped)
    }
}

pub struct CommanderNode {
    controller: GoalController,
    rx: mpsc::Receiver<NodeEvent>,
}

impl CommanderNode {
    pub fn new(controller: GoalController, capacity: usize) -> (Self, NodeHandle) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { controller, rx }, NodeHandle { tx })
    }

    /// Process events until every handle is dropped or `shutdown` flips to
    /// `true`.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        info!("robot commander started");
        loop {
            tokio::select! {
                event = self.rx.recv() => match event {
                    Some(event) => self.handle(event).await,
                    None => break,
                },
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        info!("robot commander stopped");
    }

    async fn handle(&self, event: NodeEvent) {
        match event {
            NodeEvent::HardwareStatus(status) => {
                debug!(?status, "hardware status update");
                self.controller.on_hardware_status(status);
            }
            NodeEvent::LearningMode(active) => self.controller.on_learning_mode(active).await,
            NodeEvent::JogEnabled(enabled) => self.controller.on_jog_enabled(enabled),
            NodeEvent::Pause(state) => self.controller.on_pause_signal(state).await,
            NodeEvent::Submit { command, reply } => {
                // Admission may wait on retries and the learning mode service.
                let controller = self.controller.clone();
                tokio::spawn(async move {
                    let admission = controller.submit(command).await;
                    if reply.send(admission).is_err() {
                        debug!("submitter went away before the admission answer");
                    }
                });
            }
            NodeEvent::Cancel(id) => self.controller.cancel(id).await,
            NodeEvent::Stop { reply } => {
                if reply.send(self.controller.stop_command().await).is_err() {
                    debug!("requester went away before the stop answer");
                }
            }
            NodeEvent::IsActive { reply } => {
                if reply.send(self.controller.is_active()).is_err() {
                    debug!("requester went away before the activity answer");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::ControllerSettings;
    use crate::executor::CommandExecutor;
    use crate::learning_mode::LearningModeToggler;
    use crate::sim::{SimulatedArm, SimulatedLearningMode, SimulatedTool};
    use crate::state_machine::TerminalStatus;
    use crate::status::CommandStatus;
    use std::sync::Arc;
    use std::time::Duration;

    fn start(motion_ms: u64) -> (NodeHandle, watch::Sender<bool>, tokio::task::JoinHandle<()>) {
        let executor = CommandExecutor::new(
            Arc::new(SimulatedArm::new(Duration::from_millis(motion_ms))),
            Arc::new(SimulatedTool::new(Duration::from_millis(5))),
        );
        let toggler =
            LearningModeToggler::new(Arc::new(SimulatedLearningMode::new()), Duration::from_millis(50));
        let settings = ControllerSettings {
            pause_timeout: Duration::from_secs(1),
            still_active_max_tries: 1,
            still_active_retry_delay: Duration::from_millis(5),
            max_resume_cycles: 4,
        };
        let controller = GoalController::new(settings, executor, toggler);
        let (node, handle) = CommanderNode::new(controller, 16);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(node.run(shutdown_rx));
        (handle, shutdown_tx, task)
    }

    #[tokio::test]
    async fn signals_flow_through_the_loop() {
        let (node, shutdown, task) = start(20);

        let rejection = node.submit(RobotCommand::joints(vec![0.0; 6])).await.unwrap().unwrap_err();
        assert_eq!(rejection.status, CommandStatus::HardwareNotOk);

        node.hardware_status(HardwareStatus::ready()).await.unwrap();
        let goal = node.submit(RobotCommand::joints(vec![0.0; 6])).await.unwrap().unwrap();
        assert!(node.is_active().await.unwrap());
        assert_eq!(goal.wait().await.unwrap().status, TerminalStatus::Succeeded);
        assert!(!node.is_active().await.unwrap());

        shutdown.send(true).unwrap();
        task.await.unwrap();
    }

    #[tokio::test]
    async fn pause_and_resume_through_the_loop() {
        let (node, _shutdown, _task) = start(100);
        node.hardware_status(HardwareStatus::ready()).await.unwrap();
        node.learning_mode(false).await.unwrap();

        let goal = node.submit(RobotCommand::joints(vec![0.0; 6])).await.unwrap().unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        node.pause(PauseState::Pause).await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        node.pause(PauseState::Resume).await.unwrap();

        let result = goal.wait().await.unwrap();
        assert_eq!(result.status, TerminalStatus::Succeeded);
        assert_eq!(result.attempts, 2);
    }

    #[tokio::test]
    async fn cancel_and_stop_through_the_loop() {
        let (node, _shutdown, _task) = start(1000);
        node.hardware_status(HardwareStatus::ready()).await.unwrap();

        let goal = node.submit(RobotCommand::joints(vec![0.0; 6])).await.unwrap().unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        node.cancel(goal.id).await.unwrap();
        assert_eq!(goal.wait().await.unwrap().status, TerminalStatus::Canceled);

        let answer = node.stop_command().await.unwrap();
        assert_eq!(answer.message, "Command stopped");
    }

    #[tokio::test]
    async fn pause_is_applied_while_a_submission_is_retrying() {
        let executor = CommandExecutor::new(
            Arc::new(SimulatedArm::new(Duration::from_millis(2000))),
            Arc::new(SimulatedTool::new(Duration::from_millis(5))),
        );
        let toggler =
            LearningModeToggler::new(Arc::new(SimulatedLearningMode::new()), Duration::from_millis(50));
        let settings = ControllerSettings {
            pause_timeout: Duration::from_secs(5),
            still_active_max_tries: 10,
            still_active_retry_delay: Duration::from_millis(100),
            max_resume_cycles: 4,
        };
        let controller = GoalController::new(settings, executor, toggler);
        let (node, handle) = CommanderNode::new(controller.clone(), 16);
        let (_shutdown, shutdown_rx) = watch::channel(false);
        tokio::spawn(node.run(shutdown_rx));

        handle.hardware_status(HardwareStatus::ready()).await.unwrap();
        let first = handle.submit(RobotCommand::joints(vec![0.0; 6])).await.unwrap().unwrap();

        let retrying = {
            let handle = handle.clone();
            tokio::spawn(async move { handle.submit(RobotCommand::joints(vec![0.0; 6])).await })
        };
        tokio::time::sleep(Duration::from_millis(30)).await;

        handle.pause(PauseState::Pause).await.unwrap();
        tokio::time::timeout(Duration::from_millis(20), async {
            while controller.pause_state() != PauseState::Pause {
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("pause should not wait behind admission");
        assert!(!retrying.is_finished());

        handle.cancel(first.id).await.unwrap();
        handle.pause(PauseState::Resume).await.unwrap();
        assert_eq!(first.wait().await.unwrap().status, TerminalStatus::Canceled);
        retrying.abort();
    }

    #[tokio::test]
    async fn dropping_every_handle_ends_the_loop() {
        let (node, _shutdown, task) = start(10);
        drop(node);
        task.await.unwrap();
    }

    #[test]
    fn inbound_lines_parse() {
        let msg: Inbound = serde_json::from_str(r#"{"pause":"resume"}"#).unwrap();
        assert!(matches!(msg, Inbound::Pause(PauseState::Resume)));

        let msg: Inbound = serde_json::from_str(
            r#"{"hardware_status":{"connection_up":true,"calibration_needed":false,"calibration_in_progress":false}}"#,
        )
        .unwrap();
        assert!(matches!(msg, Inbound::HardwareStatus(hw) if hw == HardwareStatus::ready()));

        let msg: Inbound = serde_json::from_str(r#"{"stop":null}"#).unwrap();
        assert!(matches!(msg, Inbound::Stop(None)));

        let msg: Inbound =
            serde_json::from_str(r#"{"goal":{"cmd_type":"tool_only","tool_cmd":{"tool_id":1,"action":"push_air"}}}"#)
                .unwrap();
        assert!(matches!(msg, Inbound::Goal(cmd) if cmd.is_tool_only()));
    }
}
