use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

/// Notification level for a guild or channel.
///
/// Wire values: 0 = all messages, 1 = only mentions, 2 = nothing,
/// 3 = inherit from the parent. Inherit and anything unknown map to `Default`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "u8", into = "u8")]
pub enum NotificationLevel {
    #[default]
    Default,
    MentionsOnly,
    Muted,
}

impl From<u8> for NotificationLevel {
    fn from(value: u8) -> Self {
        match value {
            1 => Self::MentionsOnly,
            2 => Self::Muted,
            _ => Self::Default,
        }
    }
}

impl From<NotificationLevel> for u8 {
    fn from(level: NotificationLevel) -> Self {
        match level {
            NotificationLevel::Default => 0,
            NotificationLevel::MentionsOnly => 1,
            NotificationLevel::Muted => 2,
        }
    }
}

/// Where a muted guild (muted flag set, level not "nothing") lands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GuildMutePolicy {
    /// Muted guilds still surface direct mentions.
    #[default]
    AllowMentions,
    /// Muted guilds are fully silent, the same as muted channels.
    Silent,
}

/// In-memory notification policy index for the current session.
///
/// Guild and channel ids share the mute and mentions-only sets; ids are
/// globally unique on the platform. An id is never in both sets.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PreferenceIndex {
    mute: HashSet<String>,
    mentions_only: HashSet<String>,
    suppress_everyone: HashSet<String>,
    /// Channels that currently carry an override, per guild.
    guild_channels: HashMap<String, HashSet<String>>,
    guild_mute_policy: GuildMutePolicy,
}

impl PreferenceIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_guild_mute_policy(policy: GuildMutePolicy) -> Self {
        Self {
            guild_mute_policy: policy,
            ..Self::default()
        }
    }

    pub fn guild_mute_policy(&self) -> GuildMutePolicy {
        self.guild_mute_policy
    }

    /// Classify a guild or channel id. Unknown ids are `Default`.
    pub fn classify(&self, id: &str) -> NotificationLevel {
        if self.mute.contains(id) {
            NotificationLevel::Muted
        } else if self.mentions_only.contains(id) {
            NotificationLevel::MentionsOnly
        } else {
            NotificationLevel::Default
        }
    }

    pub fn is_suppressing_everyone(&self, guild_id: &str) -> bool {
        self.suppress_everyone.contains(guild_id)
    }

    /// Re-derive a guild's classification from its settings.
    ///
    /// A "nothing" level mutes the guild. A muted flag or "only mentions"
    /// level makes it mentions-only, unless the index is configured with
    /// [`GuildMutePolicy::Silent`].
    ///
    /// The level is checked before the muted flag, so a muted guild whose
    /// level is "nothing" stays muted instead of dropping to mentions-only.
    pub fn set_guild_level(
        &mut self,
        guild_id: &str,
        level: NotificationLevel,
        muted: bool,
        suppress_everyone: bool,
    ) {
        self.unclassify(guild_id);

        let muted_target = match self.guild_mute_policy {
            GuildMutePolicy::AllowMentions => NotificationLevel::MentionsOnly,
            GuildMutePolicy::Silent => NotificationLevel::Muted,
        };
        let target = match level {
            NotificationLevel::Muted => NotificationLevel::Muted,
            _ if muted => muted_target,
            NotificationLevel::MentionsOnly => NotificationLevel::MentionsOnly,
            NotificationLevel::Default => NotificationLevel::Default,
        };
        self.insert(guild_id, target);

        if suppress_everyone {
            self.suppress_everyone.insert(guild_id.to_string());
        } else {
            self.suppress_everyone.remove(guild_id);
        }
    }

    /// Re-derive a channel's classification. Muted channels are fully silent.
    pub fn set_channel_level(&mut self, channel_id: &str, level: NotificationLevel, muted: bool) {
        self.unclassify(channel_id);

        let target = if muted || level == NotificationLevel::Muted {
            NotificationLevel::Muted
        } else {
            level
        };
        self.insert(channel_id, target);
    }

    /// Remove an id from every set. Returns whether anything was removed.
    pub fn remove_all(&mut self, id: &str) -> bool {
        let classified = self.unclassify(id);
        let everyone = self.suppress_everyone.remove(id);
        classified || everyone
    }

    /// Remove an id from the mute and mentions-only sets only.
    pub fn unclassify(&mut self, id: &str) -> bool {
        let muted = self.mute.remove(id);
        let mentions = self.mentions_only.remove(id);
        muted || mentions
    }

    /// Remove a guild from the suppress-everyone set.
    pub fn clear_suppress_everyone(&mut self, guild_id: &str) -> bool {
        self.suppress_everyone.remove(guild_id)
    }

    /// Record the channels currently carrying an override for a guild,
    /// returning the previously recorded set.
    pub fn replace_guild_channels(
        &mut self,
        guild_id: &str,
        channels: HashSet<String>,
    ) -> HashSet<String> {
        if channels.is_empty() {
            self.guild_channels.remove(guild_id).unwrap_or_default()
        } else {
            self.guild_channels
                .insert(guild_id.to_string(), channels)
                .unwrap_or_default()
        }
    }

    /// Drop everything. The mute policy is kept.
    pub fn clear(&mut self) {
        self.mute.clear();
        self.mentions_only.clear();
        self.suppress_everyone.clear();
        self.guild_channels.clear();
    }

    pub fn muted_count(&self) -> usize {
        self.mute.len()
    }

    pub fn mentions_only_count(&self) -> usize {
        self.mentions_only.len()
    }

    pub fn suppress_everyone_count(&self) -> usize {
        self.suppress_everyone.len()
    }

    fn insert(&mut self, id: &str, level: NotificationLevel) {
        match level {
            NotificationLevel::Muted => {
                self.mute.insert(id.to_string());
            }
            NotificationLevel::MentionsOnly => {
                self.mentions_only.insert(id.to_string());
            }
            NotificationLevel::Default => {}
        }
    }

    #[cfg(test)]
    pub(crate) fn in_both_sets(&self, id: &str) -> bool {
        self.mute.contains(id) && self.mentions_only.contains(id)
    }
}
