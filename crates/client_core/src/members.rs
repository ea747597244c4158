use std::{future::Future, sync::Arc, time::Duration};

use shared::{
    domain::{ConversationId, ConversationMemberSearchFilter, CourseId},
    error::ApiError,
    protocol::{ConversationUser, MemberPage},
};
use tokio::{
    sync::{broadcast, mpsc, Mutex},
    task::JoinHandle,
};
use tracing::debug;

use crate::{
    config::Settings,
    dialog::{DialogResultBridge, DialogVerdict},
    AlertSink, ConversationApi,
};

/// One raw search input. `force` bypasses deduplication against the
/// previously committed query; normal typing uses `force = false`,
/// pagination, filter changes and explicit refreshes use `force = true`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub search_term: String,
    pub force: bool,
}

/// Currently loaded member window, mutated only by a successful search
/// response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageState {
    /// 1-based page number as shown by the pagination UI.
    pub page: u32,
    pub items_per_page: u32,
    pub total_items: i64,
}

#[derive(Debug, Clone)]
pub enum MemberSearchEvent {
    PageLoaded {
        members: Vec<ConversationUser>,
        total_items: i64,
    },
    ChangesPerformed,
}

struct MemberSearchState {
    members: Vec<ConversationUser>,
    page: u32,
    total_items: i64,
    searching: bool,
    committed_term: String,
    filter: ConversationMemberSearchFilter,
    /// Request generation of the most recently committed query; responses
    /// carrying an older generation are discarded.
    generation: u64,
}

/// Debounces raw member-search input into committed paginated queries and
/// caches the last successfully retrieved page. Owned exclusively by one
/// dialog; lives until [`MemberSearchCoordinator::close`].
pub struct MemberSearchCoordinator {
    api: Arc<dyn ConversationApi>,
    alerts: Arc<dyn AlertSink>,
    course_id: CourseId,
    conversation_id: ConversationId,
    items_per_page: u32,
    state: Mutex<MemberSearchState>,
    queries: mpsc::UnboundedSender<SearchQuery>,
    events: broadcast::Sender<MemberSearchEvent>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    bridges: Mutex<Vec<DialogResultBridge>>,
}

impl MemberSearchCoordinator {
    /// Spawns the query stream and issues the initial forced empty search.
    pub async fn open(
        api: Arc<dyn ConversationApi>,
        alerts: Arc<dyn AlertSink>,
        course_id: CourseId,
        conversation_id: ConversationId,
        settings: &Settings,
    ) -> Arc<Self> {
        let (queries, query_rx) = mpsc::unbounded_channel();
        let (events, _) = broadcast::channel(64);
        let coordinator = Arc::new(Self {
            api,
            alerts,
            course_id,
            conversation_id,
            items_per_page: settings.items_per_page,
            state: Mutex::new(MemberSearchState {
                members: Vec::new(),
                page: 1,
                total_items: 0,
                searching: true,
                committed_term: String::new(),
                filter: ConversationMemberSearchFilter::All,
                generation: 0,
            }),
            queries,
            events,
            tasks: Mutex::new(Vec::new()),
            bridges: Mutex::new(Vec::new()),
        });

        let stream = tokio::spawn(
            Arc::clone(&coordinator).run_query_stream(query_rx, settings.member_search_debounce),
        );
        coordinator.tasks.lock().await.push(stream);

        coordinator.enqueue(SearchQuery {
            search_term: String::new(),
            force: true,
        });

        coordinator
    }

    /// Keystroke input; trimmed and lower-cased like the UI input handler.
    pub fn search(&self, raw_term: &str) {
        self.enqueue(SearchQuery {
            search_term: raw_term.trim().to_lowercase(),
            force: false,
        });
    }

    /// Re-issues the committed query, bypassing deduplication.
    pub async fn refresh(&self) {
        let search_term = self.state.lock().await.committed_term.clone();
        self.enqueue(SearchQuery {
            search_term,
            force: true,
        });
    }

    /// Pagination transition; always forces a fresh round-trip.
    pub async fn set_page(&self, page: u32) {
        let search_term = {
            let mut state = self.state.lock().await;
            state.page = page.max(1);
            state.committed_term.clone()
        };
        self.enqueue(SearchQuery {
            search_term,
            force: true,
        });
    }

    /// Role-filter change; resets to the first page and forces a query.
    pub async fn set_filter(&self, filter: ConversationMemberSearchFilter) {
        let search_term = {
            let mut state = self.state.lock().await;
            state.filter = filter;
            state.page = 1;
            state.committed_term.clone()
        };
        self.enqueue(SearchQuery {
            search_term,
            force: true,
        });
    }

    /// Wires the add-users dialog's resolution to a forced refresh plus a
    /// single `ChangesPerformed` notification toward the hosting view.
    pub async fn bridge_add_users_dialog<R>(self: &Arc<Self>, dialog_result: R)
    where
        R: Future<Output = DialogVerdict> + Send + 'static,
    {
        let this = Arc::clone(self);
        let bridge = DialogResultBridge::spawn(dialog_result, move || async move {
            this.refresh().await;
            let _ = this.events.send(MemberSearchEvent::ChangesPerformed);
        });
        let mut bridges = self.bridges.lock().await;
        bridges.retain(|bridge| !bridge.is_finished());
        bridges.push(bridge);
    }

    pub async fn members(&self) -> Vec<ConversationUser> {
        self.state.lock().await.members.clone()
    }

    pub async fn page_state(&self) -> PageState {
        let state = self.state.lock().await;
        PageState {
            page: state.page,
            items_per_page: self.items_per_page,
            total_items: state.total_items,
        }
    }

    pub async fn is_searching(&self) -> bool {
        self.state.lock().await.searching
    }

    pub fn subscribe(&self) -> broadcast::Receiver<MemberSearchEvent> {
        self.events.subscribe()
    }

    /// Tears down the query stream, in-flight requests and dialog bridges.
    /// Inputs after close are ignored.
    pub async fn close(&self) {
        for task in self.tasks.lock().await.drain(..) {
            task.abort();
        }
        for bridge in self.bridges.lock().await.drain(..) {
            bridge.close();
        }
    }

    fn enqueue(&self, query: SearchQuery) {
        let _ = self.queries.send(query);
    }

    async fn run_query_stream(
        self: Arc<Self>,
        mut queries: mpsc::UnboundedReceiver<SearchQuery>,
        window: Duration,
    ) {
        let mut last_committed: Option<SearchQuery> = None;
        while let Some(first) = queries.recv().await {
            // Coalesce further inputs until the quiet period elapses.
            let mut latest = first;
            loop {
                match tokio::time::timeout(window, queries.recv()).await {
                    Ok(Some(next)) => latest = next,
                    Ok(None) => return,
                    Err(_) => break,
                }
            }
            if !latest.force && last_committed.as_ref() == Some(&latest) {
                continue;
            }
            last_committed = Some(latest.clone());
            self.commit(latest).await;
        }
    }

    async fn commit(self: &Arc<Self>, query: SearchQuery) {
        let term = query.search_term.trim().to_lowercase();
        let (generation, page, filter) = {
            let mut state = self.state.lock().await;
            // Stale rows would flash while the request is in flight.
            state.members.clear();
            state.searching = true;
            state.committed_term = term.clone();
            state.generation += 1;
            (state.generation, state.page, state.filter)
        };
        debug!(
            course_id = self.course_id.0,
            conversation_id = self.conversation_id.0,
            %term,
            page,
            "member search committed"
        );

        let this = Arc::clone(self);
        let request = tokio::spawn(async move {
            let result = this
                .api
                .search_members(
                    this.course_id,
                    this.conversation_id,
                    &term,
                    page - 1,
                    this.items_per_page,
                    filter,
                )
                .await;
            this.apply_search_result(generation, result).await;
        });
        let mut tasks = self.tasks.lock().await;
        tasks.retain(|task| !task.is_finished());
        tasks.push(request);
    }

    async fn apply_search_result(&self, generation: u64, result: Result<MemberPage, ApiError>) {
        let mut state = self.state.lock().await;
        if state.generation != generation {
            debug!(
                generation,
                latest = state.generation,
                "discarding superseded member search response"
            );
            return;
        }
        state.searching = false;
        match result {
            Ok(page) => {
                state.total_items = page.total_count.max(0);
                state.members = page.items;
                state.members.truncate(self.items_per_page as usize);
                let event = MemberSearchEvent::PageLoaded {
                    members: state.members.clone(),
                    total_items: state.total_items,
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
}

#[cfg(test)]
#[path = "tests/members_tests.rs"]
mod tests;
