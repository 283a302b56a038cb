//! Scripted walk through the goal lifecycle against simulated hardware.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use console::style;
use tokio::sync::watch;
use tokio::time::sleep;
use tracing::info;

use crate::command::{ArmCommand, Point, RobotCommand, Rpy, ToolAction};
use crate::config::CommanderConfig;
use crate::error::CommanderError;
use crate::node::{CommanderNode, NodeHandle};
use crate::pause::PauseState;
use crate::readiness::HardwareStatus;
use crate::sim::simulated_controller;
use crate::ui::GoalProgress;

const DEMO_PAUSE_LIMIT: Duration = Duration::from_secs(2);

/// Run every scenario in order on a fresh node.
pub async fn run(mut config: CommanderConfig) -> Result<(), CommanderError> {
    config.pause_timeout_secs = config.pause_timeout_secs.min(DEMO_PAUSE_LIMIT.as_secs());
    let motion = config.simulated_motion();

    let (node, handle) = CommanderNode::new(simulated_controller(&config), 32);
    let (shutdown, rx) = watch::channel(false);
    let task = tokio::spawn(node.run(rx));

    let pose = RobotCommand::MoveOnly {
        arm_cmd: ArmCommand::Pose {
            position: Point { x: 0.25, y: 0.0, z: 0.3 },
            rpy: Rpy { roll: 0.0, pitch: 1.57, yaw: 0.0 },
        },
    };

    heading("1. goal before any hardware status");
    submit(&handle, RobotCommand::joints(vec![0.0; 6]), idle).await?;

    heading("2. hardware ready, joints goal");
    handle
        .hardware_status(HardwareStatus {
            connection_up: true,
            calibration_needed: false,
            calibration_in_progress: false,
        })
        .await?;
    submit(&handle, RobotCommand::joints(vec![0.0, 0.3, -0.5, 0.0, 0.2, 0.0]), idle).await?;

    heading("3. pose goal paused then resumed");
    submit(&handle, pose.clone(), |progress| {
        let handle = handle.clone();
        async move {
            sleep(motion / 3).await;
            handle.pause(PauseState::Pause).await?;
            progress.event("paused");
            sleep(motion / 2).await;
            handle.pause(PauseState::Resume).await?;
            progress.event("resumed");
            Ok::<_, CommanderError>(())
        }
    })
    .await?;

    heading("4. pose goal paused and never resumed");
    submit(&handle, pose, |progress| {
        let handle = handle.clone();
        async move {
            sleep(motion / 3).await;
            handle.pause(PauseState::Pause).await?;
            progress.event("paused, waiting for the pause limit");
            Ok::<_, CommanderError>(())
        }
    })
    .await?;
    handle.pause(PauseState::Standby).await?;

    heading("5. jog mode enabled");
    handle.jog_enabled(true).await?;
    submit(&handle, RobotCommand::joints(vec![0.0; 6]), idle).await?;
    handle.jog_enabled(false).await?;

    heading("6. tool command");
    submit(&handle, RobotCommand::tool(11, ToolAction::CloseGripper), idle).await?;

    let _ = shutdown.send(true);
    let _ = task.await;
    info!("demo finished");
    Ok(())
}

async fn idle(_progress: Arc<GoalProgress>) -> Result<(), CommanderError> {
    Ok(())
}

fn heading(title: &str) {
    println!();
    println!("{}", style(title).bold());
}

/// Submit `command`, run `during` while it executes, then show its result.
async fn submit<F, Fut>(
    handle: &NodeHandle,
    command: RobotCommand,
    during: F,
) -> Result<(), CommanderError>
where
    F: FnOnce(Arc<GoalProgress>) -> Fut,
    Fut: Future<Output = Result<(), CommanderError>>,
{
    let progress = Arc::new(GoalProgress::start(&command));
    let goal = match handle.submit(command).await? {
        Ok(goal) => goal,
        Err(rejection) => {
            progress.rejected(&rejection);
            return Ok(());
        }
    };
    progress.update(format!("RUNNING: goal {}", goal.id));

    during(progress.clone()).await?;
    let result = goal.wait().await?;
    progress.complete(&result);
    Ok(())
}
