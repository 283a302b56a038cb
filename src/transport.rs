//! Line-oriented JSON transport for driving a node by hand.
//!
//! Each input line is one [`Inbound`] message; every answer is one
//! [`Outbound`] message. Bad lines are reported and skipped.

use serde::Serialize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc;
use tracing::debug;

use crate::error::CommanderError;
use crate::node::{Inbound, NodeHandle};
use crate::readiness::Rejection;
use crate::state_machine::{GoalId, GoalResult};
use crate::status::ExecutionOutcome;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outbound {
    Accepted { goal_id: GoalId },
    Rejected(Rejection),
    Result(GoalResult),
    Stopped(ExecutionOutcome),
    Active(bool),
    Error { line: usize, message: String },
}

/// Feed every line of `reader` to the node until EOF.
///
/// Terminal results of admitted goals are sent to `out` from their own
/// tasks, so they may arrive after this function returns.
pub async fn serve_lines<R>(
    node: NodeHandle,
    reader: R,
    out: mpsc::UnboundedSender<Outbound>,
) -> Result<(), CommanderError>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    let mut line_no = 0usize;

    while let Some(line) = lines.next_line().await? {
        line_no += 1;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let inbound: Inbound = match serde_json::from_str(line) {
            Ok(msg) => msg,
            Err(e) => {
                let _ = out.send(Outbound::Error {
                    line: line_no,
                    message: e.to_string(),
                });
                continue;
            }
        };
        debug!(line = line_no, ?inbound, "inbound message");

        match inbound {
            Inbound::HardwareStatus(status) => node.hardware_status(status).await?,
            Inbound::LearningMode(active) => node.learning_mode(active).await?,
            Inbound::JogEnabled(enabled) => node.jog_enabled(enabled).await?,
            Inbound::Pause(state) => node.pause(state).await?,
            Inbound::Cancel(id) => node.cancel(id).await?,
            Inbound::Stop(_) => {
                let answer = node.stop_command().await?;
                let _ = out.send(Outbound::Stopped(answer));
            }
            Inbound::IsActive(_) => {
                let active = node.is_active().await?;
                let _ = out.send(Outbound::Active(active));
            }
            Inbound::Goal(command) => match node.submit(command).await? {
                Ok(handle) => {
                    let _ = out.send(Outbound::Accepted { goal_id: handle.id });
                    let out = out.clone();
                    tokio::spawn(async move {
                        match handle.wait().await {
                            Ok(result) => {
                                let _ = out.send(Outbound::Result(result));
                            }
                            Err(e) => debug!(error = %e, "goal ended without a result"),
                        }
                    });
                }
                Err(rejection) => {
                    let _ = out.send(Outbound::Rejected(rejection));
                }
            },
        }
    }

    Ok(())
}
