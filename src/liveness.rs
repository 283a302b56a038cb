use std::time::Duration;

use thiserror::Error;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tracing::debug;

use crate::controller::GoalController;

#[derive(Debug, Error)]
#[error("publish failed: {0}")]
pub struct PublishError(pub String);

/// Sink for the periodic "is a goal active" report.
pub trait ActivityPublisher: Send + Sync + 'static {
    fn publish(&self, active: bool) -> Result<(), PublishError>;
}

/// Publishes into a broadcast channel. Having no subscriber is a publish
/// error like any other, and is swallowed by the publishing task.
#[derive(Debug, Clone)]
pub struct BroadcastPublisher {
    tx: broadcast::Sender<bool>,
}

impl BroadcastPublisher {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<bool> {
        self.tx.subscribe()
    }
}

impl ActivityPublisher for BroadcastPublisher {
    fn publish(&self, active: bool) -> Result<(), PublishError> {
        self.tx
            .send(active)
            .map(|_| ())
            .map_err(|e| PublishError(e.to_string()))
    }
}

/// Publish `controller.is_active()` every `period` until the task is aborted.
pub fn spawn_liveness<P: ActivityPublisher>(
    controller: GoalController,
    publisher: P,
    period: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if let Err(e) = publisher.publish(controller.is_active()) {
                debug!(error = %e, "could not publish activity state");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::RobotCommand;
    use crate::controller::ControllerSettings;
    use crate::executor::CommandExecutor;
    use crate::learning_mode::LearningModeToggler;
    use crate::readiness::HardwareStatus;
    use crate::sim::{SimulatedArm, SimulatedLearningMode, SimulatedTool};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn controller(motion: Duration) -> GoalController {
        let executor = CommandExecutor::new(
            Arc::new(SimulatedArm::new(motion)),
            Arc::new(SimulatedTool::new(Duration::ZERO)),
        );
        let toggler =
            LearningModeToggler::new(Arc::new(SimulatedLearningMode::new()), Duration::from_millis(50));
        let settings = ControllerSettings {
            pause_timeout: Duration::from_secs(1),
            still_active_max_tries: 0,
            still_active_retry_delay: Duration::ZERO,
            max_resume_cycles: 1,
        };
        let controller = GoalController::new(settings, executor, toggler);
        controller.on_hardware_status(HardwareStatus::ready());
        controller
    }

    struct FailingPublisher(Arc<AtomicUsize>);

    impl ActivityPublisher for FailingPublisher {
        fn publish(&self, _active: bool) -> Result<(), PublishError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Err(PublishError("transport down".into()))
        }
    }

    #[tokio::test]
    async fn reports_activity_changes() {
        let controller = controller(Duration::from_millis(80));
        let publisher = BroadcastPublisher::new(64);
        let mut rx = publisher.subscribe();
        let task = spawn_liveness(controller.clone(), publisher, Duration::from_millis(10));

        assert!(!rx.recv().await.unwrap());

        let handle = controller.submit(RobotCommand::joints(vec![0.0; 6])).await.unwrap();
        loop {
            if rx.recv().await.unwrap() {
                break;
            }
        }
        handle.wait().await.unwrap();

        // Drain what was published before the goal finished, then the next
        // report must be inactive.
        while rx.try_recv().is_ok() {}
        assert!(!rx.recv().await.unwrap());
        task.abort();
    }

    #[tokio::test]
    async fn publish_errors_do_not_stop_the_task() {
        let count = Arc::new(AtomicUsize::new(0));
        let task = spawn_liveness(
            controller(Duration::ZERO),
            FailingPublisher(count.clone()),
            Duration::from_millis(5),
        );
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!task.is_finished());
        assert!(count.load(Ordering::SeqCst) >= 3);
        task.abort();
    }

    #[test]
    fn broadcast_without_subscriber_is_an_error() {
        let publisher = BroadcastPublisher::new(4);
        assert!(publisher.publish(true).is_err());
    }
}
