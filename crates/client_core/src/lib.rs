use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;
use shared::{
    domain::{ChannelId, Conversation, ConversationId, ConversationMemberSearchFilter, CourseId},
    error::{ApiError, ErrorBody, ErrorKind},
    protocol::{
        conversations_from_payloads, ChannelOverview, ConversationPayload, ConversationUser,
        MemberPage,
    },
};
use tracing::debug;
use url::Url;

pub mod channels;
pub mod config;
pub mod dialog;
mod gate;
pub mod members;
pub mod naming;
pub mod settings;

pub use channels::{
    ChannelAction, ChannelActionKind, ChannelsOverviewCoordinator, ChannelsOverviewEvent,
    DialogResolution,
};
pub use config::{load_settings, Settings};
pub use dialog::{
    ConfirmationDialogs, ConfirmationPrompt, ConversationDetailDialog, DetailDialogResolution,
    DialogResultBridge, DialogVerdict, DismissingDialogs,
};
pub use members::{MemberSearchCoordinator, MemberSearchEvent, PageState, SearchQuery};
pub use naming::{conversation_name, user_label, EnglishTranslations, Translations};
pub use settings::{ConversationSettingsCoordinator, SettingsEvent};

/// REST collaborator for the conversation subsystem. Stateless and shared
/// between coordinators; each implementation may serve overlapping calls.
#[async_trait]
pub trait ConversationApi: Send + Sync {
    /// Paginated member search. `page_index` is 0-based on the wire.
    async fn search_members(
        &self,
        course_id: CourseId,
        conversation_id: ConversationId,
        login_or_name: &str,
        page_index: u32,
        page_size: u32,
        filter: ConversationMemberSearchFilter,
    ) -> Result<MemberPage, ApiError>;

    async fn list_conversations(&self, course_id: CourseId)
        -> Result<Vec<Conversation>, ApiError>;

    async fn register_to_channel(
        &self,
        course_id: CourseId,
        channel_id: ChannelId,
    ) -> Result<(), ApiError>;

    async fn deregister_from_channel(
        &self,
        course_id: CourseId,
        channel_id: ChannelId,
    ) -> Result<(), ApiError>;

    async fn archive_channel(
        &self,
        course_id: CourseId,
        channel_id: ChannelId,
    ) -> Result<(), ApiError>;

    async fn unarchive_channel(
        &self,
        course_id: CourseId,
        channel_id: ChannelId,
    ) -> Result<(), ApiError>;

    async fn delete_channel(
        &self,
        course_id: CourseId,
        channel_id: ChannelId,
    ) -> Result<(), ApiError>;

    async fn list_channels_of_course(
        &self,
        course_id: CourseId,
    ) -> Result<Vec<ChannelOverview>, ApiError>;
}

/// General alert mechanism of the hosting application.
pub trait AlertSink: Send + Sync {
    fn error(&self, message: &str);
}

pub struct NullAlertSink;

impl AlertSink for NullAlertSink {
    fn error(&self, _message: &str) {}
}

/// `ConversationApi` over HTTP, mirroring the server's
/// `/api/courses/{courseId}/...` routes.
pub struct HttpConversationApi {
    http: Client,
    base_url: String,
}

impl HttpConversationApi {
    pub fn new(base_url: &str) -> anyhow::Result<Self> {
        let parsed =
            Url::parse(base_url).with_context(|| format!("invalid base url '{base_url}'"))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            anyhow::bail!("base url must use http or https: '{base_url}'");
        }
        Ok(Self {
            http: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        Self::new(&settings.base_url)
    }
}

fn transport_error(err: reqwest::Error) -> ApiError {
    ApiError::new(ErrorKind::Internal, format!("transport failure: {err}"))
}

async fn ok_or_api_error(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.json::<ErrorBody>().await.ok();
    Err(ApiError::from_status_body(status.as_u16(), body))
}

#[async_trait]
impl ConversationApi for HttpConversationApi {
    async fn search_members(
        &self,
        course_id: CourseId,
        conversation_id: ConversationId,
        login_or_name: &str,
        page_index: u32,
        page_size: u32,
        filter: ConversationMemberSearchFilter,
    ) -> Result<MemberPage, ApiError> {
        let mut query: Vec<(&str, String)> = vec![
            ("loginOrName", login_or_name.to_string()),
            ("sort", "firstName,asc".to_string()),
            ("sort", "lastName,asc".to_string()),
            ("page", page_index.to_string()),
            ("size", page_size.to_string()),
        ];
        if let Some(filter) = filter.as_query_value() {
            query.push(("filter", filter.to_string()));
        }

        let response = self
            .http
            .get(format!(
                "{}/api/courses/{}/conversations/{}/members/search",
                self.base_url, course_id.0, conversation_id.0
            ))
            .query(&query)
            .send()
            .await
            .map_err(transport_error)?;
        let response = ok_or_api_error(response).await?;

        let total_count = response
            .headers()
            .get("x-total-count")
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.parse::<i64>().ok());
        let items: Vec<ConversationUser> = response.json().await.map_err(transport_error)?;
        let total_count = total_count.unwrap_or(items.len() as i64);
        debug!(
            course_id = course_id.0,
            conversation_id = conversation_id.0,
            total_count,
            "member search page fetched"
        );

        Ok(MemberPage { items, total_count })
    }

    async fn list_conversations(
        &self,
        course_id: CourseId,
    ) -> Result<Vec<Conversation>, ApiError> {
        let response = self
            .http
            .get(format!(
                "{}/api/courses/{}/conversations",
                self.base_url, course_id.0
            ))
            .send()
            .await
            .map_err(transport_error)?;
        let payloads: Vec<ConversationPayload> = ok_or_api_error(response)
            .await?
            .json()
            .await
            .map_err(transport_error)?;
        Ok(conversations_from_payloads(payloads))
    }

    async fn register_to_channel(
        &self,
        course_id: CourseId,
        channel_id: ChannelId,
    ) -> Result<(), ApiError> {
        self.post_channel_action(course_id, channel_id, "register")
            .await
    }

    async fn deregister_from_channel(
        &self,
        course_id: CourseId,
        channel_id: ChannelId,
    ) -> Result<(), ApiError> {
        self.post_channel_action(course_id, channel_id, "deregister")
            .await
    }

    async fn archive_channel(
        &self,
        course_id: CourseId,
        channel_id: ChannelId,
    ) -> Result<(), ApiError> {
        self.post_channel_action(course_id, channel_id, "archive")
            .await
    }

    async fn unarchive_channel(
        &self,
        course_id: CourseId,
        channel_id: ChannelId,
    ) -> Result<(), ApiError> {
        self.post_channel_action(course_id, channel_id, "unarchive")
            .await
    }

    async fn delete_channel(
        &self,
        course_id: CourseId,
        channel_id: ChannelId,
    ) -> Result<(), ApiError> {
        let response = self
            .http
            .delete(format!(
                "{}/api/courses/{}/channels/{}",
                self.base_url, course_id.0, channel_id.0
            ))
            .send()
            .await
            .map_err(transport_error)?;
        ok_or_api_error(response).await?;
        Ok(())
    }

    async fn list_channels_of_course(
        &self,
        course_id: CourseId,
    ) -> Result<Vec<ChannelOverview>, ApiError> {
        let response = self
            .http
            .get(format!(
                "{}/api/courses/{}/channels/overview",
                self.base_url, course_id.0
            ))
            .send()
            .await
            .map_err(transport_error)?;
        ok_or_api_error(response)
            .await?
            .json()
            .await
            .map_err(transport_error)
    }
}

impl HttpConversationApi {
    async fn post_channel_action(
        &self,
        course_id: CourseId,
        channel_id: ChannelId,
        action: &str,
    ) -> Result<(), ApiError> {
        let response = self
            .http
            .post(format!(
                "{}/api/courses/{}/channels/{}/{action}",
                self.base_url, course_id.0, channel_id.0
            ))
            .send()
            .await
            .map_err(transport_error)?;
        ok_or_api_error(response).await?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
