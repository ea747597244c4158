use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(pub i64);
    };
}

id_newtype!(CourseId);
id_newtype!(ConversationId);
id_newtype!(ChannelId);
id_newtype!(UserId);

/// Role filter for the paginated member search. `ChannelAdmin` is only
/// meaningful when the searched conversation is a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConversationMemberSearchFilter {
    #[default]
    All,
    Instructor,
    Editor,
    Tutor,
    Student,
    ChannelAdmin,
}

impl ConversationMemberSearchFilter {
    /// Wire value for the `filter` query parameter. `All` sends no
    /// parameter at all.
    pub fn as_query_value(self) -> Option<&'static str> {
        match self {
            Self::All => None,
            Self::Instructor => Some("INSTRUCTOR"),
            Self::Editor => Some("EDITOR"),
            Self::Tutor => Some("TUTOR"),
            Self::Student => Some("STUDENT"),
            Self::ChannelAdmin => Some("CHANNEL_ADMIN"),
        }
    }
}

/// A course conversation. Kind-specific fields live behind the closed
/// [`ConversationKind`] sum so they can only be reached after matching the
/// active variant.
#[derive(Debug, Clone, PartialEq)]
pub struct Conversation {
    pub id: ConversationId,
    pub course_id: CourseId,
    pub creation_date: Option<DateTime<Utc>>,
    pub last_message_date: Option<DateTime<Utc>>,
    pub kind: ConversationKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConversationKind {
    Channel(ChannelDetails),
    GroupChat(GroupChatDetails),
    OneToOneChat(OneToOneChatDetails),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelDetails {
    pub name: String,
    pub is_archived: bool,
    pub is_public: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupChatDetails {
    /// Display names of all participants except the current user, in
    /// server-provided order.
    pub names_of_other_members: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OneToOneChatDetails {
    pub name_of_other_member: Option<String>,
}

impl Conversation {
    pub fn channel_details(&self) -> Option<&ChannelDetails> {
        match &self.kind {
            ConversationKind::Channel(details) => Some(details),
            ConversationKind::GroupChat(_) | ConversationKind::OneToOneChat(_) => None,
        }
    }

    /// Channel id of this conversation, present only for the channel
    /// variant. Channels share the conversation id space.
    pub fn channel_id(&self) -> Option<ChannelId> {
        self.channel_details().map(|_| ChannelId(self.id.0))
    }

    pub fn is_channel(&self) -> bool {
        self.channel_details().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn channel_conversation() -> Conversation {
        Conversation {
            id: ConversationId(7),
            course_id: CourseId(1),
            creation_date: None,
            last_message_date: None,
            kind: ConversationKind::Channel(ChannelDetails {
                name: "general".into(),
                is_archived: false,
                is_public: true,
            }),
        }
    }

    #[test]
    fn channel_id_is_present_only_for_channels() {
        assert_eq!(channel_conversation().channel_id(), Some(ChannelId(7)));

        let group = Conversation {
            kind: ConversationKind::GroupChat(GroupChatDetails {
                names_of_other_members: vec![],
            }),
            ..channel_conversation()
        };
        assert_eq!(group.channel_id(), None);
        assert!(!group.is_channel());
    }

    #[test]
    fn all_filter_sends_no_query_parameter() {
        assert_eq!(ConversationMemberSearchFilter::All.as_query_value(), None);
        assert_eq!(
            ConversationMemberSearchFilter::ChannelAdmin.as_query_value(),
            Some("CHANNEL_ADMIN")
        );
    }
}
