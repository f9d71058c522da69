use std::collections::HashSet;

use super::index::NotificationLevel;

/// A user's notification preferences for one guild.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GuildPreferences {
    pub guild_id: String,
    pub level: NotificationLevel,
    pub muted: bool,
    pub suppress_everyone: bool,
    pub channel_overrides: Vec<ChannelOverride>,
}

/// A per-channel override nested under a guild's preferences.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelOverride {
    pub channel_id: String,
    pub level: NotificationLevel,
    pub muted: bool,
}

/// A guild the user belongs to, as listed in the ready snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GuildSummary {
    pub id: String,
    pub name: String,
    /// Server-wide default notification level.
    pub default_level: NotificationLevel,
    pub icon: Option<String>,
}

/// Full preference state delivered once at session start.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PreferenceSnapshot {
    pub user_id: String,
    pub guilds: Vec<GuildSummary>,
    pub settings: Vec<GuildPreferences>,
}

impl PreferenceSnapshot {
    pub fn settings_for(&self, guild_id: &str) -> Option<&GuildPreferences> {
        self.settings.iter().find(|s| s.guild_id == guild_id)
    }
}

/// An incoming chat message, reduced to what classification needs.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MessageEvent {
    pub id: String,
    pub author_id: String,
    pub author_name: String,
    /// `None` for direct messages.
    pub guild_id: Option<String>,
    pub channel_id: String,
    /// @everyone or @here was used.
    pub mention_everyone: bool,
    /// Users mentioned explicitly and individually.
    pub mentions: HashSet<String>,
}
