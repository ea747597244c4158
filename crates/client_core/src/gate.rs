use std::{collections::HashMap, hash::Hash, time::Duration};

use tokio::{sync::Mutex, time::Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ActionState {
    Idle,
    Pending,
    Applied,
    Failed,
}

/// Per-key action gate: at most one in-flight request per key, and a
/// repeat of an action that just applied is dropped for the dedup window.
/// Failed actions may be re-triggered immediately.
pub(crate) struct ActionGate<K> {
    window: Duration,
    states: Mutex<HashMap<K, (ActionState, Instant)>>,
}

impl<K: Eq + Hash> ActionGate<K> {
    pub(crate) fn new(window: Duration) -> Self {
        Self {
            window,
            states: Mutex::new(HashMap::new()),
        }
    }

    /// Returns false when the trigger must be dropped.
    pub(crate) async fn try_begin(&self, key: K) -> bool {
        let mut states = self.states.lock().await;
        let now = Instant::now();
        match states.get(&key) {
            Some((ActionState::Pending, _)) => return false,
            Some((ActionState::Applied, at)) if now.duration_since(*at) < self.window => {
                return false
            }
            _ => {}
        }
        states.insert(key, (ActionState::Pending, now));
        true
    }

    pub(crate) async fn complete(&self, key: K, ok: bool) {
        let state = if ok {
            ActionState::Applied
        } else {
            ActionState::Failed
        };
        self.states.lock().await.insert(key, (state, Instant::now()));
    }

    #[cfg(test)]
    pub(crate) async fn state(&self, key: &K) -> ActionState {
        self.states
            .lock()
            .await
            .get(key)
            .map(|(state, _)| *state)
            .unwrap_or(ActionState::Idle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn pending_and_freshly_applied_triggers_are_dropped() {
        let gate = ActionGate::new(Duration::from_millis(500));

        assert!(gate.try_begin("archive").await);
        assert_eq!(gate.state(&"archive").await, ActionState::Pending);
        assert!(!gate.try_begin("archive").await);

        gate.complete("archive", true).await;
        assert!(!gate.try_begin("archive").await);

        tokio::time::sleep(Duration::from_millis(600)).await;
        assert!(gate.try_begin("archive").await);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_actions_may_be_retried_immediately() {
        let gate = ActionGate::new(Duration::from_millis(500));

        assert!(gate.try_begin("delete").await);
        gate.complete("delete", false).await;
        assert_eq!(gate.state(&"delete").await, ActionState::Failed);
        assert!(gate.try_begin("delete").await);
    }

    #[tokio::test]
    async fn unknown_keys_start_idle() {
        let gate: ActionGate<&str> = ActionGate::new(Duration::from_millis(500));
        assert_eq!(gate.state(&"register").await, ActionState::Idle);
    }
}
