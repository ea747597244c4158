use shared::{
    domain::{Conversation, ConversationKind},
    protocol::ConversationUser,
};

/// Locale seam for the display strings the resolver needs.
pub trait Translations: Send + Sync {
    /// Suffix word appended to archived channel names.
    fn channel_archived(&self) -> String;
    /// Pluralized phrase for group-chat members beyond the first two.
    fn conversation_others(&self, count: usize) -> String;
}

pub struct EnglishTranslations;

impl Translations for EnglishTranslations {
    fn channel_archived(&self) -> String {
        "archived".to_string()
    }

    fn conversation_others(&self, count: usize) -> String {
        format!("and {count} more")
    }
}

/// Display name of a conversation. Never fails; unknown data resolves to
/// an empty string rather than an error.
pub fn conversation_name(conversation: &Conversation, translations: &dyn Translations) -> String {
    match &conversation.kind {
        ConversationKind::Channel(details) => {
            let mut name = details.name.clone();
            if details.is_archived {
                name.push_str(&format!(" ({})", translations.channel_archived()));
            }
            name
        }
        ConversationKind::OneToOneChat(details) => {
            details.name_of_other_member.clone().unwrap_or_default()
        }
        ConversationKind::GroupChat(details) => {
            match details.names_of_other_members.as_slice() {
                [] => String::new(),
                [only] => only.clone(),
                [first, second] => format!("{first}, {second}"),
                [first, second, rest @ ..] => format!(
                    "{first}, {second}, {}",
                    translations.conversation_others(rest.len())
                ),
            }
        }
    }
}

/// `"First Last (login)"`, skipping absent parts.
pub fn user_label(user: &ConversationUser) -> String {
    let mut label = String::new();
    if let Some(first_name) = &user.first_name {
        label.push_str(first_name);
        label.push(' ');
    }
    if let Some(last_name) = &user.last_name {
        label.push_str(last_name);
        label.push(' ');
    }
    if !user.login.is_empty() {
        label.push('(');
        label.push_str(&user.login);
        label.push(')');
    }
    label.trim().to_string()
}

#[cfg(test)]
mod tests {
    use shared::domain::{
        ChannelDetails, ConversationId, CourseId, GroupChatDetails, OneToOneChatDetails, UserId,
    };

    use super::*;

    fn conversation(kind: ConversationKind) -> Conversation {
        Conversation {
            id: ConversationId(1),
            course_id: CourseId(1),
            creation_date: None,
            last_message_date: None,
            kind,
        }
    }

    fn group_chat(names: &[&str]) -> Conversation {
        conversation(ConversationKind::GroupChat(GroupChatDetails {
            names_of_other_members: names.iter().map(|name| name.to_string()).collect(),
        }))
    }

    #[test]
    fn group_chat_names_follow_member_count() {
        let translations = EnglishTranslations;
        assert_eq!(conversation_name(&group_chat(&[]), &translations), "");
        assert_eq!(conversation_name(&group_chat(&["A"]), &translations), "A");
        assert_eq!(
            conversation_name(&group_chat(&["A", "B"]), &translations),
            "A, B"
        );
        assert_eq!(
            conversation_name(&group_chat(&["A", "B", "C", "D"]), &translations),
            "A, B, and 2 more"
        );
    }

    #[test]
    fn archived_channels_carry_the_suffix() {
        let translations = EnglishTranslations;
        let mut details = ChannelDetails {
            name: "general".into(),
            is_archived: true,
            is_public: true,
        };
        let archived = conversation(ConversationKind::Channel(details.clone()));
        assert_eq!(
            conversation_name(&archived, &translations),
            "general (archived)"
        );

        details.is_archived = false;
        let active = conversation(ConversationKind::Channel(details));
        assert_eq!(conversation_name(&active, &translations), "general");
    }

    #[test]
    fn one_to_one_resolves_to_the_other_participant() {
        let translations = EnglishTranslations;
        let named = conversation(ConversationKind::OneToOneChat(OneToOneChatDetails {
            name_of_other_member: Some("Grace Hopper".into()),
        }));
        assert_eq!(conversation_name(&named, &translations), "Grace Hopper");

        let unknown = conversation(ConversationKind::OneToOneChat(OneToOneChatDetails {
            name_of_other_member: None,
        }));
        assert_eq!(conversation_name(&unknown, &translations), "");
    }

    #[test]
    fn user_label_skips_absent_parts() {
        let user = ConversationUser {
            user_id: UserId(1),
            login: "ghopper".into(),
            first_name: Some("Grace".into()),
            last_name: Some("Hopper".into()),
            is_instructor: true,
            is_editor: false,
            is_tutor: false,
            is_student: false,
            is_channel_admin: false,
        };
        assert_eq!(user_label(&user), "Grace Hopper (ghopper)");

        let login_only = ConversationUser {
            first_name: None,
            last_name: None,
            ..user
        };
        assert_eq!(user_label(&login_only), "(ghopper)");
    }
}
