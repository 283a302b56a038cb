use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::command::RobotCommand;
use crate::config::CommanderConfig;
use crate::error::CommanderError;
use crate::executor::CommandExecutor;
use crate::learning_mode::LearningModeToggler;
use crate::pause::{PauseCancel, PauseCoordinator, PauseState};
use crate::readiness::{HardwareStatus, Rejection, check_admissible};
use crate::state_machine::{
    Execution, Goal, GoalId, GoalResult, GoalSlot, Reason, Resolution, TerminalStatus, resolve,
};
use crate::status::{CommandStatus, ExecutionOutcome};

/// Timing knobs of the goal lifecycle.
#[derive(Debug, Clone)]
pub struct ControllerSettings {
    pub pause_timeout: Duration,
    pub still_active_max_tries: u32,
    pub still_active_retry_delay: Duration,
    pub max_resume_cycles: u32,
}

impl From<&CommanderConfig> for ControllerSettings {
    fn from(config: &CommanderConfig) -> Self {
        Self {
            pause_timeout: config.pause_timeout(),
            still_active_max_tries: config.command_still_active_max_tries,
            still_active_retry_delay: config.still_active_retry_delay(),
            max_resume_cycles: config.max_resume_cycles,
        }
    }
}

/// Handle returned for an admitted goal.
#[derive(Debug)]
pub struct GoalHandle {
    pub id: GoalId,
    result: oneshot::Receiver<GoalResult>,
}

impl GoalHandle {
    /// Wait for the goal's terminal notification.
    pub async fn wait(self) -> Result<GoalResult, CommanderError> {
        self.result
            .await
            .map_err(|_| CommanderError::GoalDropped(self.id.to_string()))
    }
}

struct Shared {
    settings: ControllerSettings,
    slot: GoalSlot,
    pause: PauseCoordinator,
    executor: CommandExecutor,
    toggler: LearningModeToggler,
    hardware: RwLock<Option<HardwareStatus>>,
    jog_enabled: AtomicBool,
    learning_mode_on: AtomicBool,
}

/// Owns the current-goal slot: admits goals, runs them one at a time and
/// reports exactly one terminal result per admitted goal.
#[derive(Clone)]
pub struct GoalController {
    shared: Arc<Shared>,
}

impl GoalController {
    /// Learning mode is assumed on until told otherwise, so the first motion
    /// always tries to disengage it.
    pub fn new(
        settings: ControllerSettings,
        executor: CommandExecutor,
        toggler: LearningModeToggler,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                settings,
                slot: GoalSlot::new(),
                pause: PauseCoordinator::new(),
                executor,
                toggler,
                hardware: RwLock::new(None),
                jog_enabled: AtomicBool::new(false),
                learning_mode_on: AtomicBool::new(true),
            }),
        }
    }

    pub fn is_active(&self) -> bool {
        self.shared.slot.is_active()
    }

    #[allow(dead_code)]
    pub fn current_goal(&self) -> Option<Goal> {
        self.shared.slot.snapshot()
    }

    pub fn pause_state(&self) -> PauseState {
        self.shared.pause.state()
    }

    pub fn hardware_status(&self) -> Option<HardwareStatus> {
        *self
            .shared
            .hardware
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub fn on_hardware_status(&self, status: HardwareStatus) {
        *self
            .shared
            .hardware
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(status);
    }

    pub fn on_jog_enabled(&self, enabled: bool) {
        self.shared.jog_enabled.store(enabled, Ordering::SeqCst);
    }

    /// Track the learning mode state. Switching it on while it was off halts
    /// the arm.
    pub async fn on_learning_mode(&self, active: bool) {
        let was_on = self.shared.learning_mode_on.swap(active, Ordering::SeqCst);
        if !was_on && active {
            info!("learning mode switched on, stopping arm");
            self.shared.executor.stop_arm().await;
        }
    }

    pub async fn on_pause_signal(&self, state: PauseState) {
        match state {
            PauseState::Pause => info!("received pause request"),
            PauseState::Cancel => info!("received cancel request"),
            PauseState::Standby | PauseState::Resume => debug!(%state, "received pause signal"),
        }
        if self.shared.pause.on_signal(state) {
            self.shared.executor.cancel().await;
        }
    }

    /// Admit `command` as the new goal, or say why not.
    ///
    /// On success the command is already running on its own task; the
    /// returned handle yields its terminal result.
    pub async fn submit(&self, command: RobotCommand) -> Result<GoalHandle, Rejection> {
        info!(%command, "received goal, checking if it can be executed");

        let hardware = self.hardware_status();
        let jog_enabled = self.shared.jog_enabled.load(Ordering::SeqCst);
        if let Err(rejection) = check_admissible(hardware.as_ref(), jog_enabled) {
            return Err(rejected(rejection));
        }

        if self.shared.slot.is_active() && !self.wait_for_free_slot().await {
            return Err(rejected(Rejection::new(
                CommandStatus::GoalStillActive,
                "Current command is still active",
            )));
        }

        if !command.is_tool_only()
            && self.shared.learning_mode_on.load(Ordering::SeqCst)
            && !self.shared.toggler.disengage().await
        {
            return Err(rejected(Rejection::new(
                CommandStatus::LearningModeOn,
                "Learning mode could not be deactivated",
            )));
        }

        let goal = Goal::new(command.clone());
        let Ok(id) = self.shared.slot.try_install(goal) else {
            return Err(rejected(Rejection::new(
                CommandStatus::GoalStillActive,
                "Current command is still active",
            )));
        };
        info!(goal_id = %id, "goal has been accepted");

        let (tx, rx) = oneshot::channel();
        let controller = self.clone();
        tokio::spawn(async move {
            controller.execute_goal(id, command, tx).await;
        });
        debug!(goal_id = %id, "executing command in a new task");

        Ok(GoalHandle { id, result: rx })
    }

    /// Re-check a busy slot a bounded number of times.
    ///
    /// A goal that is finishing may still occupy the slot for a moment after
    /// its executor returned, so a short wait avoids rejecting a command that
    /// would have been admissible.
    async fn wait_for_free_slot(&self) -> bool {
        let tries = self.shared.settings.still_active_max_tries;
        for attempt in 0..tries {
            warn!(
                remaining = tries - attempt,
                "current goal seems to be still active, will retry"
            );
            sleep(self.shared.settings.still_active_retry_delay).await;
            if !self.shared.slot.is_active() {
                return true;
            }
        }
        false
    }

    /// Ask the executors to stop goal `id` if it is the current one.
    ///
    /// The request is recorded on the goal, so it also applies while the goal
    /// waits at the pause gate or has not reached the executor yet. The
    /// execution path reports the goal as canceled. Unknown or stale ids are
    /// ignored.
    pub async fn cancel(&self, id: GoalId) {
        info!(goal_id = %id, "received cancel command");
        if self.shared.slot.request_cancel(id) {
            self.shared.executor.cancel().await;
        } else {
            debug!(goal_id = %id, "not the current goal, nothing to do");
        }
    }

    /// Stop whatever is running, whichever goal it belongs to.
    pub async fn stop_command(&self) -> ExecutionOutcome {
        self.shared.executor.cancel().await;
        ExecutionOutcome::success("Command stopped")
    }

    async fn execute_goal(
        self,
        id: GoalId,
        command: RobotCommand,
        reply: oneshot::Sender<GoalResult>,
    ) {
        let result = self.run_execution(id, &command).await;
        // A new goal must never start already gated.
        self.shared.pause.clear_gate();

        match result {
            Some(result) => {
                if reply.send(result).is_err() {
                    debug!(goal_id = %id, "submitter went away before the result");
                }
            }
            None => warn!(goal_id = %id, "goal left the slot before it was finalized"),
        }
    }

    async fn run_execution(&self, id: GoalId, command: &RobotCommand) -> Option<GoalResult> {
        let pause = &self.shared.pause;
        let limit = self.shared.settings.pause_timeout;
        let mut resumes = 0u32;

        loop {
            if let Some(cause) = pause.cancel_due_to_pause(limit).await {
                pause.reset();
                return self.finalize_canceled(id, cause);
            }

            if self.shared.slot.cancel_requested(id) {
                return self.finalize_requested_cancel(id);
            }

            self.shared.slot.record_attempt(id);
            let execution = match self.shared.executor.execute(command).await {
                Ok(outcome) => Execution::Responded(outcome),
                Err(e) => {
                    info!(goal_id = %id, error = %e, "command execution raised a failure");
                    Execution::Failed(e.into())
                }
            };

            if self.shared.slot.cancel_requested(id) && pause.state() != PauseState::Pause {
                return self.finalize_requested_cancel(id);
            }

            if pause.state() != PauseState::Pause {
                let resolution = resolve(&execution);
                return self.finalize(id, resolution, execution.into_outcome());
            }

            // Paused mid-execution: wait for the pause to resolve.
            if let Some(cause) = pause.cancel_due_to_pause(limit).await {
                pause.reset();
                return self.finalize_canceled(id, cause);
            }
            if pause.state() != PauseState::Resume {
                let resolution = Resolution::new(TerminalStatus::Aborted, Reason::UnknownResult);
                return self.finalize(id, resolution, execution.into_outcome());
            }

            resumes += 1;
            if resumes > self.shared.settings.max_resume_cycles {
                let resolution = Resolution::new(TerminalStatus::Aborted, Reason::TooManyResumes);
                let outcome = ExecutionOutcome::new(
                    execution.outcome().status,
                    format!("Goal resumed more than {} times", self.shared.settings.max_resume_cycles),
                );
                return self.finalize(id, resolution, outcome);
            }
            info!(goal_id = %id, resumes, "resuming goal");
        }
    }

    fn finalize_canceled(&self, id: GoalId, cause: PauseCancel) -> Option<GoalResult> {
        let (reason, message) = match cause {
            PauseCancel::Timeout => (Reason::PauseTimeout, "Goal has been paused for too long"),
            PauseCancel::Canceled => (Reason::CancelSignal, "Goal has been canceled"),
        };
        self.finalize(
            id,
            Resolution::new(TerminalStatus::Canceled, reason),
            ExecutionOutcome::stopped(message),
        )
    }

    fn finalize_requested_cancel(&self, id: GoalId) -> Option<GoalResult> {
        self.finalize(
            id,
            Resolution::new(TerminalStatus::Canceled, Reason::CancelRequested),
            ExecutionOutcome::stopped("Goal has been canceled"),
        )
    }

    fn finalize(
        &self,
        id: GoalId,
        resolution: Resolution,
        outcome: ExecutionOutcome,
    ) -> Option<GoalResult> {
        let goal = self.shared.slot.finish(id, resolution.status.into())?;
        match resolution.status {
            TerminalStatus::Aborted => {
                warn!(goal_id = %id, %outcome, "{}", resolution.reason)
            }
            TerminalStatus::Succeeded | TerminalStatus::Canceled => {
                info!(goal_id = %id, %outcome, "{}", resolution.reason)
            }
        }
        Some(GoalResult::from_goal(&goal, resolution.status, outcome))
    }
}

fn rejected(rejection: Rejection) -> Rejection {
    warn!(status = %rejection.status, "goal rejected: {}", rejection.message);
    rejection
}
