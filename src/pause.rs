//! Pause/resume/cancel bookkeeping shared between the signal handler and the
//! execution path.
//!
//! Pause requests come from a different control path (the physical button)
//! than goal submission, so this is the single place both sides read and
//! write. The gate is a `watch` channel: `true` while a pause is pending.

use std::fmt;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::time::timeout;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PauseState {
    #[default]
    Standby,
    Pause,
    Resume,
    Cancel,
}

impl fmt::Display for PauseState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PauseState::Standby => write!(f, "STANDBY"),
            PauseState::Pause => write!(f, "PAUSE"),
            PauseState::Resume => write!(f, "RESUME"),
            PauseState::Cancel => write!(f, "CANCEL"),
        }
    }
}

/// Result of waiting on the pause gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateWait {
    Cleared,
    Expired,
}

/// Why the execution path must cancel instead of running the command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PauseCancel {
    /// Paused and nobody resumed before the deadline.
    Timeout,
    /// A cancel was signaled.
    Canceled,
}

pub struct PauseCoordinator {
    state: Mutex<PauseState>,
    gate: watch::Sender<bool>,
}

impl Default for PauseCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl PauseCoordinator {
    pub fn new() -> Self {
        let (gate, _) = watch::channel(false);
        Self {
            state: Mutex::new(PauseState::Standby),
            gate,
        }
    }

    pub fn state(&self) -> PauseState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[allow(dead_code)]
    pub fn is_blocked(&self) -> bool {
        *self.gate.borrow()
    }

    /// Record an external pause signal and update the gate.
    ///
    /// Returns `true` when the current goal must be asked to stop, which is
    /// the case for `Pause` and `Cancel`. The state is recorded before the
    /// gate moves so a waiter woken by the gate always sees the new state.
    pub fn on_signal(&self, new_state: PauseState) -> bool {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = new_state;
        match new_state {
            PauseState::Pause => {
                self.gate.send_replace(true);
                true
            }
            PauseState::Cancel => {
                self.gate.send_replace(false);
                true
            }
            PauseState::Standby | PauseState::Resume => {
                self.gate.send_replace(false);
                false
            }
        }
    }

    /// Block until the gate is cleared or `limit` elapses.
    pub async fn await_clear_or_timeout(&self, limit: Duration) -> GateWait {
        let mut rx = self.gate.subscribe();
        let cleared = timeout(limit, async move { rx.wait_for(|blocked| !*blocked).await.is_ok() })
            .await
            .unwrap_or(false);
        if cleared {
            GateWait::Cleared
        } else {
            GateWait::Expired
        }
    }

    /// Pre-execution check: wait out a pending pause, then decide whether the
    /// goal has to be canceled instead of executed.
    pub async fn cancel_due_to_pause(&self, limit: Duration) -> Option<PauseCancel> {
        if self.await_clear_or_timeout(limit).await == GateWait::Expired {
            return Some(PauseCancel::Timeout);
        }
        if self.state() == PauseState::Cancel {
            return Some(PauseCancel::Canceled);
        }
        None
    }

    /// Forget any pause: gate cleared, state back to standby.
    pub fn reset(&self) {
        self.gate.send_replace(false);
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = PauseState::Standby;
    }

    /// Clear the gate only; the recorded state is kept.
    pub fn clear_gate(&self) {
        self.gate.send_replace(false);
    }
}
