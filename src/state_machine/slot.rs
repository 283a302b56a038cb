use std::sync::{Mutex, MutexGuard, PoisonError};

use super::goal::{Goal, GoalId, GoalStatus};

/// The single current-goal slot.
///
/// Installing is a check-and-set under one lock, so two admissions can never
/// both succeed. The raw goal never leaves the slot; readers get clones.
#[derive(Debug, Default)]
pub struct GoalSlot {
    current: Mutex<Option<Goal>>,
}

impl GoalSlot {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Option<Goal>> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Install `goal` as the active goal unless another one is still active.
    /// On refusal the goal is handed back untouched.
    pub fn try_install(&self, mut goal: Goal) -> Result<GoalId, Goal> {
        let mut current = self.lock();
        if current.as_ref().is_some_and(|g| g.status.is_active()) {
            return Err(goal);
        }
        goal.transition(GoalStatus::Active);
        let id = goal.id;
        *current = Some(goal);
        Ok(id)
    }

    pub fn snapshot(&self) -> Option<Goal> {
        self.lock().clone()
    }

    pub fn is_active(&self) -> bool {
        self.lock().as_ref().is_some_and(|g| g.status.is_active())
    }

    /// Id of the goal occupying the slot, if it is still active.
    pub fn active_id(&self) -> Option<GoalId> {
        self.lock()
            .as_ref()
            .filter(|g| g.status.is_active())
            .map(|g| g.id)
    }

    /// Count one more executor attempt for goal `id`.
    pub fn record_attempt(&self, id: GoalId) {
        if let Some(goal) = self.lock().as_mut().filter(|g| g.id == id) {
            goal.attempts += 1;
        }
    }

    /// Flag goal `id` for cancellation. Returns `false` when `id` is not the
    /// active goal.
    pub fn request_cancel(&self, id: GoalId) -> bool {
        match self
            .lock()
            .as_mut()
            .filter(|g| g.id == id && g.status.is_active())
        {
            Some(goal) => {
                goal.cancel_requested = true;
                true
            }
            None => false,
        }
    }

    pub fn cancel_requested(&self, id: GoalId) -> bool {
        self.lock()
            .as_ref()
            .is_some_and(|g| g.id == id && g.cancel_requested)
    }

    /// Move goal `id` to its terminal status and empty the slot.
    ///
    /// Returns the finished goal, or `None` if `id` is not the current goal
    /// or it already finished.
    pub fn finish(&self, id: GoalId, status: GoalStatus) -> Option<Goal> {
        let mut current = self.lock();
        let matches = current
            .as_ref()
            .is_some_and(|g| g.id == id && g.status.can_transition_to(status));
        if !matches {
            return None;
        }
        let mut goal = current.take()?;
        goal.transition(status);
        Some(goal)
    }

    #[allow(dead_code)]
    pub fn clear(&self) {
        self.lock().take();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::RobotCommand;

    fn goal() -> Goal {
        Goal::new(RobotCommand::joints(vec![0.0; 6]))
    }

    #[test]
    fn install_into_empty_slot() {
        let slot = GoalSlot::new();
        assert!(!slot.is_active());

        let id = slot.try_install(goal()).unwrap();
        assert!(slot.is_active());
        assert_eq!(slot.active_id(), Some(id));
        assert_eq!(slot.snapshot().unwrap().status, GoalStatus::Active);
    }

    #[test]
    fn second_install_is_refused() {
        let slot = GoalSlot::new();
        let first = slot.try_install(goal()).unwrap();

        let second = goal();
        let second_id = second.id;
        let refused = slot.try_install(second).unwrap_err();
        assert_eq!(refused.id, second_id);
        assert_eq!(refused.status, GoalStatus::Pending);
        assert_eq!(slot.active_id(), Some(first));
    }

    #[test]
    fn finish_empties_slot_once() {
        let slot = GoalSlot::new();
        let id = slot.try_install(goal()).unwrap();
        slot.record_attempt(id);

        let done = slot.finish(id, GoalStatus::Succeeded).unwrap();
        assert_eq!(done.status, GoalStatus::Succeeded);
        assert_eq!(done.attempts, 1);
        assert!(!slot.is_active());
        assert!(slot.snapshot().is_none());

        assert!(slot.finish(id, GoalStatus::Aborted).is_none());
    }

    #[test]
    fn finish_with_stale_id_is_ignored() {
        let slot = GoalSlot::new();
        let id = slot.try_install(goal()).unwrap();

        assert!(slot.finish(GoalId::new_v4(), GoalStatus::Canceled).is_none());
        assert_eq!(slot.active_id(), Some(id));
    }

    #[test]
    fn cancel_request_sticks_to_the_active_goal() {
        let slot = GoalSlot::new();
        let id = slot.try_install(goal()).unwrap();

        assert!(!slot.request_cancel(GoalId::new_v4()));
        assert!(!slot.cancel_requested(id));

        assert!(slot.request_cancel(id));
        assert!(slot.cancel_requested(id));

        let done = slot.finish(id, GoalStatus::Canceled).unwrap();
        assert!(done.cancel_requested);
        assert!(!slot.request_cancel(id));
        assert!(!slot.cancel_requested(id));
    }

    #[test]
    fn install_after_finish() {
        let slot = GoalSlot::new();
        let id = slot.try_install(goal()).unwrap();
        slot.finish(id, GoalStatus::Canceled);
        assert!(slot.try_install(goal()).is_ok());

        slot.clear();
        assert!(!slot.is_active());
    }
}
