use std::{sync::Arc, time::Duration};

use shared::{
    domain::{ChannelId, CourseId},
    protocol::ChannelOverview,
};
use tokio::{
    sync::{broadcast, mpsc, oneshot, Mutex},
    task::JoinHandle,
};
use tracing::info;

use crate::{config::Settings, gate::ActionGate, AlertSink, ConversationApi};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelActionKind {
    Register,
    Deregister,
    View,
}

/// A discrete user-triggered channel action. Created on interaction,
/// consumed once by the queue, then discarded.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelAction {
    pub action: ChannelActionKind,
    pub channel: ChannelOverview,
}

/// Value the channels overview dialog resolves with toward its opener.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DialogResolution {
    /// Closed after at least one successful action; carries every channel
    /// id the user deregistered from while the dialog was open.
    UnsubscribedChannels(Vec<ChannelId>),
    /// The user picked a channel to view.
    SelectedChannel(ChannelId),
    Dismissed,
}

#[derive(Debug, Clone)]
pub enum ChannelsOverviewEvent {
    ChannelsLoaded { no_of_channels: usize },
}

struct ChannelsOverviewState {
    channels: Vec<ChannelOverview>,
    no_of_channels: usize,
    ids_of_unsubscribed_channels: Vec<ChannelId>,
    channel_action_performed: bool,
    is_loading: bool,
}

/// Applies register/deregister/view actions for the per-course channel
/// directory exactly once per user trigger, reconciling the local
/// unsubscribed-channel tracking and the dirty flag the dialog reports on
/// close.
pub struct ChannelsOverviewCoordinator {
    api: Arc<dyn ConversationApi>,
    alerts: Arc<dyn AlertSink>,
    course_id: CourseId,
    state: Mutex<ChannelsOverviewState>,
    actions: mpsc::UnboundedSender<ChannelAction>,
    events: broadcast::Sender<ChannelsOverviewEvent>,
    gate: ActionGate<(ChannelId, ChannelActionKind)>,
    resolution: Mutex<Option<oneshot::Sender<DialogResolution>>>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl ChannelsOverviewCoordinator {
    /// Spawns the action queue, kicks off the initial channel load, and
    /// hands the dialog's resolution receiver to the opener.
    pub async fn open(
        api: Arc<dyn ConversationApi>,
        alerts: Arc<dyn AlertSink>,
        course_id: CourseId,
        settings: &Settings,
    ) -> (Arc<Self>, oneshot::Receiver<DialogResolution>) {
        let (actions, action_rx) = mpsc::unbounded_channel();
        let (events, _) = broadcast::channel(64);
        let (resolution_tx, resolution_rx) = oneshot::channel();
        let coordinator = Arc::new(Self {
            api,
            alerts,
            course_id,
            state: Mutex::new(ChannelsOverviewState {
                channels: Vec::new(),
                no_of_channels: 0,
                ids_of_unsubscribed_channels: Vec::new(),
                channel_action_performed: false,
                is_loading: false,
            }),
            actions,
            events,
            gate: ActionGate::new(settings.channel_action_debounce),
            resolution: Mutex::new(Some(resolution_tx)),
            tasks: Mutex::new(Vec::new()),
        });

        let queue = tokio::spawn(
            Arc::clone(&coordinator).run_action_queue(action_rx, settings.channel_action_debounce),
        );
        let initial = tokio::spawn({
            let this = Arc::clone(&coordinator);
            async move {
                this.load_channels().await;
            }
        });
        coordinator.tasks.lock().await.extend([queue, initial]);

        (coordinator, resolution_rx)
    }

    pub fn send_action(&self, action: ChannelAction) {
        let _ = self.actions.send(action);
    }

    /// Reloads the channel directory, replacing the list wholesale.
    pub async fn load_channels(&self) {
        self.state.lock().await.is_loading = true;
        let result = self.api.list_channels_of_course(self.course_id).await;
        let mut state = self.state.lock().await;
        state.is_loading = false;
        match result {
            Ok(channels) => {
                state.no_of_channels = channels.len();
                state.channels = channels;
                let event = ChannelsOverviewEvent::ChannelsLoaded {
                    no_of_channels: state.no_of_channels,
                };
                drop(state);
                let _ = self.events.send(event);
            }
            Err(err) => {
                drop(state);
                self.alerts.error(&err.to_string());
            }
        }
    }

    pub async fn channels(&self) -> Vec<ChannelOverview> {
        self.state.lock().await.channels.clone()
    }

    pub async fn is_loading(&self) -> bool {
        self.state.lock().await.is_loading
    }

    pub async fn unsubscribed_channel_ids(&self) -> Vec<ChannelId> {
        self.state
            .lock()
            .await
            .ids_of_unsubscribed_channels
            .clone()
    }

    pub async fn channel_action_performed(&self) -> bool {
        self.state.lock().await.channel_action_performed
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChannelsOverviewEvent> {
        self.events.subscribe()
    }

    /// Closes the dialog: after at least one successful action the opener
    /// receives the accumulated unsubscribed ids, otherwise a dismissal.
    pub async fn close(&self) {
        let resolution = {
            let state = self.state.lock().await;
            if state.channel_action_performed {
                DialogResolution::UnsubscribedChannels(state.ids_of_unsubscribed_channels.clone())
            } else {
                DialogResolution::Dismissed
            }
        };
        self.resolve(resolution).await;
        for task in self.tasks.lock().await.drain(..) {
            task.abort();
        }
    }

    async fn resolve(&self, resolution: DialogResolution) {
        if let Some(tx) = self.resolution.lock().await.take() {
            let _ = tx.send(resolution);
        }
    }

    async fn run_action_queue(
        self: Arc<Self>,
        mut actions: mpsc::UnboundedReceiver<ChannelAction>,
        window: Duration,
    ) {
        while let Some(first) = actions.recv().await {
            // Coalesce bursts; only the last action of a burst is applied.
            let mut latest = first;
            loop {
                match tokio::time::timeout(window, actions.recv()).await {
                    Ok(Some(next)) => latest = next,
                    Ok(None) => return,
                    Err(_) => break,
                }
            }
            self.perform(latest).await;
        }
    }

    async fn perform(&self, action: ChannelAction) {
        let channel_id = action.channel.channel_id;
        match action.action {
            ChannelActionKind::Register => {
                let key = (channel_id, ChannelActionKind::Register);
                if !self.gate.try_begin(key).await {
                    return;
                }
                match self.api.register_to_channel(self.course_id, channel_id).await {
                    Ok(()) => {
                        self.gate.complete(key, true).await;
                        {
                            let mut state = self.state.lock().await;
                            state
                                .ids_of_unsubscribed_channels
                                .retain(|id| *id != channel_id);
                            state.channel_action_performed = true;
                        }
                        info!(
                            course_id = self.course_id.0,
                            channel_id = channel_id.0,
                            "registered to channel"
                        );
                        self.load_channels().await;
                    }
                    Err(err) => {
                        self.gate.complete(key, false).await;
                        self.alerts.error(&err.to_string());
                    }
                }
            }
            ChannelActionKind::Deregister => {
                let key = (channel_id, ChannelActionKind::Deregister);
                if !self.gate.try_begin(key).await {
                    return;
                }
                match self
                    .api
                    .deregister_from_channel(self.course_id, channel_id)
                    .await
                {
                    Ok(()) => {
                        self.gate.complete(key, true).await;
                        {
                            let mut state = self.state.lock().await;
                            if !state.ids_of_unsubscribed_channels.contains(&channel_id) {
                                state.ids_of_unsubscribed_channels.push(channel_id);
                            }
                            state.channel_action_performed = true;
                        }
                        info!(
                            course_id = self.course_id.0,
                            channel_id = channel_id.0,
                            "deregistered from channel"
                        );
                        self.load_channels().await;
                    }
                    Err(err) => {
                        self.gate.complete(key, false).await;
                        self.alerts.error(&err.to_string());
                    }
                }
            }
            ChannelActionKind::View => {
                self.resolve(DialogResolution::SelectedChannel(channel_id))
                    .await;
            }
        }
    }
}

#[cfg(test)]
#[path = "tests/channels_tests.rs"]
mod tests;
