use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::timeout;
use tracing::warn;

use crate::error::ServiceError;
use crate::status::ExecutionOutcome;

/// External service switching the arm's learning (freewheel) mode.
#[async_trait]
pub trait LearningModeService: Send + Sync {
    async fn activate(&self, enabled: bool) -> Result<ExecutionOutcome, ServiceError>;
}

/// Turns learning mode off before a motion, within a bounded time.
#[derive(Clone)]
pub struct LearningModeToggler {
    service: Arc<dyn LearningModeService>,
    limit: Duration,
}

impl LearningModeToggler {
    pub fn new(service: Arc<dyn LearningModeService>, limit: Duration) -> Self {
        Self { service, limit }
    }

    /// Returns `true` only if the service answered `SUCCESS` in time.
    /// Timeouts and service errors are logged and reported as `false`.
    pub async fn disengage(&self) -> bool {
        match timeout(self.limit, self.service.activate(false)).await {
            Ok(Ok(outcome)) if outcome.is_success() => true,
            Ok(Ok(outcome)) => {
                warn!(%outcome, "learning mode service refused to deactivate");
                false
            }
            Ok(Err(e)) => {
                warn!(error = %e, "learning mode service call failed");
                false
            }
            Err(_) => {
                warn!(timeout_ms = self.limit.as_millis() as u64, "learning mode service timed out");
                false
            }
        }
    }
}
