use std::sync::Arc;

use shared::domain::{ChannelId, Conversation, CourseId};
use tokio::sync::{broadcast, watch, Mutex};
use tracing::info;

use crate::{
    config::Settings,
    dialog::{ConfirmationDialogs, ConfirmationPrompt, DialogResultBridge},
    gate::ActionGate,
    AlertSink, ConversationApi,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum SettingsAction {
    Archive,
    Unarchive,
    Delete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsEvent {
    ArchivalChanged,
    ChannelDeleted,
}

/// Channel lifecycle actions for one active conversation: archive and
/// unarchive behind a confirmation modal, delete with an inline
/// dialog-local error slot. All actions are no-ops unless the active
/// conversation is a channel.
pub struct ConversationSettingsCoordinator {
    api: Arc<dyn ConversationApi>,
    alerts: Arc<dyn AlertSink>,
    dialogs: Arc<dyn ConfirmationDialogs>,
    course_id: CourseId,
    active_conversation: Conversation,
    gate: ActionGate<(ChannelId, SettingsAction)>,
    events: broadcast::Sender<SettingsEvent>,
    dialog_error: watch::Sender<Option<String>>,
    bridges: Mutex<Vec<DialogResultBridge>>,
}

impl ConversationSettingsCoordinator {
    pub fn open(
        api: Arc<dyn ConversationApi>,
        alerts: Arc<dyn AlertSink>,
        dialogs: Arc<dyn ConfirmationDialogs>,
        course_id: CourseId,
        active_conversation: Conversation,
        settings: &Settings,
    ) -> Arc<Self> {
        let (events, _) = broadcast::channel(16);
        let (dialog_error, _) = watch::channel(None);
        Arc::new(Self {
            api,
            alerts,
            dialogs,
            course_id,
            active_conversation,
            gate: ActionGate::new(settings.channel_action_debounce),
            events,
            dialog_error,
            bridges: Mutex::new(Vec::new()),
        })
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SettingsEvent> {
        self.events.subscribe()
    }

    /// Dialog-local error slot; `None` means no pending error.
    pub fn dialog_error(&self) -> watch::Receiver<Option<String>> {
        self.dialog_error.subscribe()
    }

    pub async fn request_archival(self: &Arc<Self>) {
        self.confirm_then_toggle_archival(SettingsAction::Archive, "pages.archiveChannel")
            .await;
    }

    pub async fn request_unarchival(self: &Arc<Self>) {
        self.confirm_then_toggle_archival(SettingsAction::Unarchive, "pages.unArchiveChannel")
            .await;
    }

    /// Deletes the active channel. Invoked from inside an already-open
    /// confirmation dialog, so failures surface inline through the
    /// dialog-local error slot rather than the general alert channel.
    pub async fn delete_channel(&self) {
        let Some(channel_id) = self.active_conversation.channel_id() else {
            return;
        };
        let key = (channel_id, SettingsAction::Delete);
        if !self.gate.try_begin(key).await {
            return;
        }
        match self.api.delete_channel(self.course_id, channel_id).await {
            Ok(()) => {
                self.gate.complete(key, true).await;
                let _ = self.dialog_error.send(None);
                info!(
                    course_id = self.course_id.0,
                    channel_id = channel_id.0,
                    "channel deleted"
                );
                let _ = self.events.send(SettingsEvent::ChannelDeleted);
            }
            Err(err) => {
                self.gate.complete(key, false).await;
                let _ = self.dialog_error.send(Some(err.to_string()));
            }
        }
    }

    /// Tears down pending dialog bridges; a confirmation resolving after
    /// close has no effect.
    pub async fn close(&self) {
        for bridge in self.bridges.lock().await.drain(..) {
            bridge.close();
        }
    }

    async fn confirm_then_toggle_archival(
        self: &Arc<Self>,
        action: SettingsAction,
        key_prefix: &str,
    ) {
        let Some(details) = self.active_conversation.channel_details() else {
            return;
        };
        let Some(channel_id) = self.active_conversation.channel_id() else {
            return;
        };

        let prompt = ConfirmationPrompt {
            title_key: format!("{key_prefix}.title"),
            question_key: format!("{key_prefix}.question"),
            description_key: format!("{key_prefix}.description"),
            confirm_button_key: format!("{key_prefix}.confirmButton"),
            channel_name: details.name.clone(),
        };

        let dialogs = Arc::clone(&self.dialogs);
        let this = Arc::clone(self);
        let bridge = DialogResultBridge::spawn(
            async move { dialogs.confirm(prompt).await },
            move || async move {
                let key = (channel_id, action);
                if !this.gate.try_begin(key).await {
                    return;
                }
                let result = match action {
                    SettingsAction::Archive => {
                        this.api.archive_channel(this.course_id, channel_id).await
                    }
                    SettingsAction::Unarchive => {
                        this.api.unarchive_channel(this.course_id, channel_id).await
                    }
                    SettingsAction::Delete => return,
                };
                match result {
                    Ok(()) => {
                        this.gate.complete(key, true).await;
                        info!(
                            course_id = this.course_id.0,
                            channel_id = channel_id.0,
                            archived = matches!(action, SettingsAction::Archive),
                            "channel archival state changed"
                        );
                        let _ = this.events.send(SettingsEvent::ArchivalChanged);
                    }
                    Err(err) => {
                        this.gate.complete(key, false).await;
                        // The confirmation modal is already closed here, so
                        // the failure goes to the general alert channel.
                        this.alerts.error(&err.to_string());
                    }
                }
            },
        );

        let mut bridges = self.bridges.lock().await;
        bridges.retain(|bridge| !bridge.is_finished());
        bridges.push(bridge);
    }
}

#[cfg(test)]
#[path = "tests/settings_tests.rs"]
mod tests;
