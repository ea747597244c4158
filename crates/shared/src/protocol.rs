use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{
    ChannelDetails, ChannelId, Conversation, ConversationId, ConversationKind, CourseId,
    GroupChatDetails, OneToOneChatDetails, UserId,
};

/// One member of a conversation as returned by the member search endpoint.
/// `login` is unique within a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationUser {
    pub user_id: UserId,
    pub login: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default)]
    pub is_instructor: bool,
    #[serde(default)]
    pub is_editor: bool,
    #[serde(default)]
    pub is_tutor: bool,
    #[serde(default)]
    pub is_student: bool,
    #[serde(default)]
    pub is_channel_admin: bool,
}

/// One page of a member search response plus the total match count taken
/// from the `X-Total-Count` header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemberPage {
    pub items: Vec<ConversationUser>,
    pub total_count: i64,
}

/// Channel directory row for the per-course channel overview.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelOverview {
    pub channel_id: ChannelId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub is_public: bool,
    #[serde(default)]
    pub is_archived: bool,
    #[serde(default)]
    pub is_member: bool,
}

/// Wire form of a conversation. Timestamps travel as serialized strings and
/// are converted to `DateTime<Utc>` on load and back on save.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationPayload {
    pub id: ConversationId,
    pub course_id: CourseId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creation_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_message_date: Option<String>,
    #[serde(flatten)]
    pub kind: ConversationKindPayload,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ConversationKindPayload {
    #[serde(rename_all = "camelCase")]
    Channel {
        name: String,
        #[serde(default)]
        is_archived: bool,
        #[serde(default)]
        is_public: bool,
    },
    #[serde(rename_all = "camelCase")]
    GroupChat {
        #[serde(default)]
        names_of_other_members: Vec<String>,
    },
    #[serde(rename_all = "camelCase")]
    OneToOneChat {
        #[serde(default)]
        name_of_other_member: Option<String>,
    },
}

impl ConversationPayload {
    pub fn into_conversation(self) -> Conversation {
        Conversation {
            id: self.id,
            course_id: self.course_id,
            creation_date: parse_server_date(self.creation_date.as_deref()),
            last_message_date: parse_server_date(self.last_message_date.as_deref()),
            kind: match self.kind {
                ConversationKindPayload::Channel {
                    name,
                    is_archived,
                    is_public,
                } => ConversationKind::Channel(ChannelDetails {
                    name,
                    is_archived,
                    is_public,
                }),
                ConversationKindPayload::GroupChat {
                    names_of_other_members,
                } => ConversationKind::GroupChat(GroupChatDetails {
                    names_of_other_members,
                }),
                ConversationKindPayload::OneToOneChat {
                    name_of_other_member,
                } => ConversationKind::OneToOneChat(OneToOneChatDetails {
                    name_of_other_member,
                }),
            },
        }
    }
}

impl Conversation {
    pub fn to_payload(&self) -> ConversationPayload {
        ConversationPayload {
            id: self.id,
            course_id: self.course_id,
            creation_date: self.creation_date.map(format_server_date),
            last_message_date: self.last_message_date.map(format_server_date),
            kind: match &self.kind {
                ConversationKind::Channel(details) => ConversationKindPayload::Channel {
                    name: details.name.clone(),
                    is_archived: details.is_archived,
                    is_public: details.is_public,
                },
                ConversationKind::GroupChat(details) => ConversationKindPayload::GroupChat {
                    names_of_other_members: details.names_of_other_members.clone(),
                },
                ConversationKind::OneToOneChat(details) => ConversationKindPayload::OneToOneChat {
                    name_of_other_member: details.name_of_other_member.clone(),
                },
            },
        }
    }
}

pub fn conversations_from_payloads(payloads: Vec<ConversationPayload>) -> Vec<Conversation> {
    payloads
        .into_iter()
        .map(ConversationPayload::into_conversation)
        .collect()
}

/// Invalid or absent date strings load as `None` rather than failing the
/// whole payload.
fn parse_server_date(raw: Option<&str>) -> Option<DateTime<Utc>> {
    let raw = raw?;
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|parsed| parsed.with_timezone(&Utc))
}

fn format_server_date(date: DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Millis, true)
}
