use std::{
    future::Future,
    sync::atomic::{AtomicBool, Ordering},
};

use async_trait::async_trait;
use tokio::task::JoinHandle;

/// Resolution of a modal dialog. Dismissal is a value, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogVerdict {
    Confirmed,
    Dismissed,
}

/// Translation keys plus the one substitution parameter for the generic
/// yes/no confirmation dialog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmationPrompt {
    pub title_key: String,
    pub question_key: String,
    pub description_key: String,
    pub confirm_button_key: String,
    pub channel_name: String,
}

/// Opens a generic confirmation modal and resolves the user's verdict.
#[async_trait]
pub trait ConfirmationDialogs: Send + Sync {
    async fn confirm(&self, prompt: ConfirmationPrompt) -> DialogVerdict;
}

pub struct DismissingDialogs;

#[async_trait]
impl ConfirmationDialogs for DismissingDialogs {
    async fn confirm(&self, _prompt: ConfirmationPrompt) -> DialogVerdict {
        DialogVerdict::Dismissed
    }
}

/// Couples a dialog's asynchronous resolution to a one-shot side effect.
/// The effect runs at most once per dialog instance, only on confirmation;
/// `close` (or dropping the bridge) tears the subscription down so nothing
/// fires after the hosting view is gone.
pub struct DialogResultBridge {
    task: JoinHandle<()>,
}

impl DialogResultBridge {
    pub fn spawn<R, F, Fut>(result: R, on_confirm: F) -> Self
    where
        R: Future<Output = DialogVerdict> + Send + 'static,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send,
    {
        let task = tokio::spawn(async move {
            if result.await == DialogVerdict::Confirmed {
                on_confirm().await;
            }
        });
        Self { task }
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    pub fn close(&self) {
        self.task.abort();
    }
}

impl Drop for DialogResultBridge {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetailDialogResolution {
    Closed,
    Dismissed,
}

/// Shell state of the conversation detail dialog: remembers whether a
/// hosted tab performed changes so closing reports the right resolution to
/// the opener.
#[derive(Debug, Default)]
pub struct ConversationDetailDialog {
    changes_were_performed: AtomicBool,
}

impl ConversationDetailDialog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark_changes_performed(&self) {
        self.changes_were_performed.store(true, Ordering::Relaxed);
    }

    pub fn changes_were_performed(&self) -> bool {
        self.changes_were_performed.load(Ordering::Relaxed)
    }

    pub fn close(&self) -> DetailDialogResolution {
        if self.changes_were_performed() {
            DetailDialogResolution::Closed
        } else {
            DetailDialogResolution::Dismissed
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicU32, Ordering},
        Arc,
    };

    use tokio::sync::oneshot;

    use super::*;

    #[tokio::test]
    async fn confirmation_fires_effect_exactly_once() {
        let fired = Arc::new(AtomicU32::new(0));
        let (tx, rx) = oneshot::channel();
        let counter = Arc::clone(&fired);
        let bridge = DialogResultBridge::spawn(
            async move { rx.await.unwrap_or(DialogVerdict::Dismissed) },
            move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
            },
        );

        tx.send(DialogVerdict::Confirmed).expect("send verdict");
        while !bridge.is_finished() {
            tokio::task::yield_now().await;
        }
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn dismissal_and_dropped_dialog_fire_nothing() {
        let fired = Arc::new(AtomicU32::new(0));
        let (tx, rx) = oneshot::channel::<DialogVerdict>();
        let counter = Arc::clone(&fired);
        let bridge = DialogResultBridge::spawn(
            async move { rx.await.unwrap_or(DialogVerdict::Dismissed) },
            move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
            },
        );

        drop(tx);
        while !bridge.is_finished() {
            tokio::task::yield_now().await;
        }
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn closing_the_bridge_cancels_a_pending_resolution() {
        let fired = Arc::new(AtomicU32::new(0));
        let (tx, rx) = oneshot::channel();
        let counter = Arc::clone(&fired);
        let bridge = DialogResultBridge::spawn(
            async move { rx.await.unwrap_or(DialogVerdict::Dismissed) },
            move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
            },
        );

        bridge.close();
        while !bridge.is_finished() {
            tokio::task::yield_now().await;
        }
        // The verdict arrives after teardown and must not trigger anything.
        let _ = tx.send(DialogVerdict::Confirmed);
        tokio::task::yield_now().await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn detail_dialog_resolution_tracks_dirty_flag() {
        let dialog = ConversationDetailDialog::new();
        assert_eq!(dialog.close(), DetailDialogResolution::Dismissed);

        dialog.mark_changes_performed();
        assert_eq!(dialog.close(), DetailDialogResolution::Closed);
    }
}
