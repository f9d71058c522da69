use super::index::{NotificationLevel, PreferenceIndex};
use super::settings::MessageEvent;

/// Why a message did not produce a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuppressReason {
    OwnMessage,
    Muted,
    EveryoneSuppressed,
    NotMentioned,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Deliver,
    Suppress(SuppressReason),
}

impl Decision {
    pub fn is_deliver(self) -> bool {
        matches!(self, Decision::Deliver)
    }
}

/// Decide whether a message should raise a desktop notification.
///
/// Order matters: own messages, then mutes, then @everyone suppression,
/// then mentions-only. An @everyone message in a suppressing guild stays
/// suppressed even when the user is also mentioned by name.
pub fn classify_message(
    message: &MessageEvent,
    index: &PreferenceIndex,
    current_user_id: &str,
) -> Decision {
    if message.author_id == current_user_id {
        return Decision::Suppress(SuppressReason::OwnMessage);
    }

    let guild = message
        .guild_id
        .as_deref()
        .map(|id| index.classify(id))
        .unwrap_or_default();
    let channel = index.classify(&message.channel_id);

    if guild == NotificationLevel::Muted || channel == NotificationLevel::Muted {
        return Decision::Suppress(SuppressReason::Muted);
    }

    if message.mention_everyone
        && message
            .guild_id
            .as_deref()
            .is_some_and(|id| index.is_suppressing_everyone(id))
    {
        return Decision::Suppress(SuppressReason::EveryoneSuppressed);
    }

    if guild == NotificationLevel::MentionsOnly || channel == NotificationLevel::MentionsOnly {
        if message.mentions.contains(current_user_id) {
            return Decision::Deliver;
        }
        return Decision::Suppress(SuppressReason::NotMentioned);
    }

    Decision::Deliver
}
