use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::status::{CommandStatus, ExecutionOutcome};

/// Latest hardware report. Replaced wholesale on every update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HardwareStatus {
    pub connection_up: bool,
    pub calibration_needed: bool,
    pub calibration_in_progress: bool,
}

impl HardwareStatus {
    /// Connected and calibrated.
    pub fn ready() -> Self {
        Self {
            connection_up: true,
            calibration_needed: false,
            calibration_in_progress: false,
        }
    }
}

/// A goal request refused at admission.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("rejected with {status}: {message}")]
pub struct Rejection {
    pub status: CommandStatus,
    pub message: String,
}

impl Rejection {
    pub fn new(status: CommandStatus, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

impl From<Rejection> for ExecutionOutcome {
    fn from(rejection: Rejection) -> Self {
        ExecutionOutcome::new(rejection.status, rejection.message)
    }
}

/// Decides whether a new goal may be admitted given the latest snapshots.
///
/// Checks run in a fixed order and the first failing one wins: unknown
/// hardware status, connection down, calibration needed, calibration in
/// progress, jog controller enabled. `None` means no hardware report has
/// been received yet, which fails closed.
pub fn check_admissible(
    hardware: Option<&HardwareStatus>,
    jog_enabled: bool,
) -> Result<(), Rejection> {
    let Some(hw) = hardware else {
        return Err(Rejection::new(
            CommandStatus::HardwareNotOk,
            "Hardware Status still not received, please restart the robot",
        ));
    };

    if !hw.connection_up {
        return Err(Rejection::new(
            CommandStatus::HardwareNotOk,
            "Motor connection problem, you can't send a command now",
        ));
    }

    if hw.calibration_needed {
        return Err(Rejection::new(
            CommandStatus::CalibrationNotDone,
            "You need to calibrate the robot before sending a command",
        ));
    }

    if hw.calibration_in_progress {
        return Err(Rejection::new(
            CommandStatus::CalibrationNotDone,
            "Calibration in progress, wait until it ends to send a command",
        ));
    }

    if jog_enabled {
        return Err(Rejection::new(
            CommandStatus::JogControllerEnabled,
            "You need to deactivate jog controller to execute a new command",
        ));
    }

    Ok(())
}
