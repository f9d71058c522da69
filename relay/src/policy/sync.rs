use std::collections::HashSet;

use super::index::{NotificationLevel, PreferenceIndex};
use super::settings::{GuildPreferences, PreferenceSnapshot};

/// Counts reported after a snapshot or update is applied.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SyncSummary {
    pub guilds: usize,
    pub channels: usize,
    /// Channels reset because their override disappeared.
    pub reset_channels: usize,
    /// Set sizes once the change is applied.
    pub muted: usize,
    pub mentions_only: usize,
    pub suppress_everyone: usize,
}

impl SyncSummary {
    fn with_totals(self, index: &PreferenceIndex) -> Self {
        Self {
            muted: index.muted_count(),
            mentions_only: index.mentions_only_count(),
            suppress_everyone: index.suppress_everyone_count(),
            ..self
        }
    }
}

/// Rebuild the index from a ready snapshot.
///
/// Guilds without a settings record fall back to their server default:
/// "only mentions" classifies the guild, "all messages" leaves it alone.
/// Settings for guilds missing from the guild list are ignored.
pub fn apply_snapshot(index: &mut PreferenceIndex, snapshot: &PreferenceSnapshot) -> SyncSummary {
    index.clear();

    let mut summary = SyncSummary::default();
    for guild in &snapshot.guilds {
        match snapshot.settings_for(&guild.id) {
            Some(settings) => {
                summary.channels += apply_guild(index, settings);
                summary.guilds += 1;
            }
            None if guild.default_level == NotificationLevel::MentionsOnly => {
                index.set_guild_level(&guild.id, NotificationLevel::MentionsOnly, false, false);
                summary.guilds += 1;
            }
            None => {}
        }
    }
    summary.with_totals(index)
}

/// Apply a settings-update for one guild. The update carries the complete
/// new state for the guild and its channel overrides.
pub fn apply_update(index: &mut PreferenceIndex, settings: &GuildPreferences) -> SyncSummary {
    let guild_id = settings.guild_id.as_str();

    index.clear_suppress_everyone(guild_id);
    index.unclassify(guild_id);

    let mut summary = SyncSummary {
        guilds: 1,
        ..SyncSummary::default()
    };

    let previous = index.replace_guild_channels(guild_id, HashSet::new());
    for channel in &settings.channel_overrides {
        index.unclassify(&channel.channel_id);
    }
    summary.channels = apply_guild(index, settings);

    for stale in previous
        .iter()
        .filter(|id| !settings.channel_overrides.iter().any(|c| &c.channel_id == *id))
    {
        index.unclassify(stale);
        summary.reset_channels += 1;
    }
    summary.with_totals(index)
}

/// Classify a guild and its channel overrides. Returns the number of
/// overrides applied.
fn apply_guild(index: &mut PreferenceIndex, settings: &GuildPreferences) -> usize {
    index.set_guild_level(
        &settings.guild_id,
        settings.level,
        settings.muted,
        settings.suppress_everyone,
    );

    let mut channels = HashSet::with_capacity(settings.channel_overrides.len());
    for channel in &settings.channel_overrides {
        index.set_channel_level(&channel.channel_id, channel.level, channel.muted);
        channels.insert(channel.channel_id.clone());
    }
    let count = channels.len();
    index.replace_guild_channels(&settings.guild_id, channels);
    count
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::settings::{ChannelOverride, GuildSummary};

    fn guild(id: &str, default_level: NotificationLevel) -> GuildSummary {
        GuildSummary {
            id: id.into(),
            name: format!("guild {id}"),
            default_level,
            icon: None,
        }
    }

    fn prefs(
        guild_id: &str,
        level: NotificationLevel,
        muted: bool,
        suppress_everyone: bool,
        channels: &[(&str, NotificationLevel, bool)],
    ) -> GuildPreferences {
        GuildPreferences {
            guild_id: guild_id.into(),
            level,
            muted,
            suppress_everyone,
            channel_overrides: channels
                .iter()
                .map(|(id, level, muted)| ChannelOverride {
                    channel_id: (*id).into(),
                    level: *level,
                    muted: *muted,
                })
                .collect(),
        }
    }

    fn snapshot() -> PreferenceSnapshot {
        PreferenceSnapshot {
            user_id: "me".into(),
            guilds: vec![
                guild("g1", NotificationLevel::Default),
                guild("g2", NotificationLevel::MentionsOnly),
                guild("g3", NotificationLevel::Default),
                guild("g4", NotificationLevel::MentionsOnly),
            ],
            settings: vec![
                prefs(
                    "g1",
                    NotificationLevel::Muted,
                    false,
                    true,
                    &[("c1", NotificationLevel::MentionsOnly, false)],
                ),
                prefs(
                    "g4",
                    NotificationLevel::Default,
                    false,
                    false,
                    &[("c4", NotificationLevel::Default, true)],
                ),
                // Not in the guild list.
                prefs("gx", NotificationLevel::Muted, false, false, &[]),
            ],
        }
    }

    #[test]
    fn test_snapshot_classifies_guilds_and_channels() {
        let mut index = PreferenceIndex::new();
        let summary = apply_snapshot(&mut index, &snapshot());

        assert_eq!(index.classify("g1"), NotificationLevel::Muted);
        assert!(index.is_suppressing_everyone("g1"));
        assert_eq!(index.classify("c1"), NotificationLevel::MentionsOnly);

        // No settings record, server default is mentions-only.
        assert_eq!(index.classify("g2"), NotificationLevel::MentionsOnly);
        // No settings record, server default is all messages.
        assert_eq!(index.classify("g3"), NotificationLevel::Default);

        // Explicit settings win over the server default.
        assert_eq!(index.classify("g4"), NotificationLevel::Default);
        assert_eq!(index.classify("c4"), NotificationLevel::Muted);

        assert_eq!(index.classify("gx"), NotificationLevel::Default);
        assert_eq!(summary.guilds, 3);
        assert_eq!(summary.channels, 2);
        // g1 and c4 muted; c1 and g2 mentions-only; g1 suppresses @everyone.
        assert_eq!(summary.muted, 2);
        assert_eq!(summary.mentions_only, 2);
        assert_eq!(summary.suppress_everyone, 1);
    }

    #[test]
    fn test_snapshot_is_idempotent() {
        let mut once = PreferenceIndex::new();
        apply_snapshot(&mut once, &snapshot());

        let mut twice = PreferenceIndex::new();
        apply_snapshot(&mut twice, &snapshot());
        apply_snapshot(&mut twice, &snapshot());

        assert_eq!(once, twice);
    }

    #[test]
    fn test_snapshot_replaces_previous_state() {
        let mut index = PreferenceIndex::new();
        index.set_guild_level("old", NotificationLevel::Muted, false, true);

        apply_snapshot(&mut index, &snapshot());
        assert_eq!(index.classify("old"), NotificationLevel::Default);
        assert!(!index.is_suppressing_everyone("old"));
    }

    #[test]
    fn test_update_replaces_guild_classification() {
        let mut index = PreferenceIndex::new();
        apply_snapshot(&mut index, &snapshot());

        apply_update(
            &mut index,
            &prefs(
                "g1",
                NotificationLevel::MentionsOnly,
                false,
                false,
                &[("c1", NotificationLevel::MentionsOnly, false)],
            ),
        );
        assert_eq!(index.classify("g1"), NotificationLevel::MentionsOnly);
        assert!(!index.is_suppressing_everyone("g1"));
        assert!(!index.in_both_sets("g1"));

        apply_update(
            &mut index,
            &prefs(
                "g1",
                NotificationLevel::Default,
                false,
                false,
                &[("c1", NotificationLevel::MentionsOnly, false)],
            ),
        );
        assert_eq!(index.classify("g1"), NotificationLevel::Default);
    }

    #[test]
    fn test_update_replaces_channel_classification() {
        let mut index = PreferenceIndex::new();
        apply_snapshot(&mut index, &snapshot());

        apply_update(
            &mut index,
            &prefs(
                "g1",
                NotificationLevel::Muted,
                false,
                true,
                &[("c1", NotificationLevel::Muted, false)],
            ),
        );
        assert_eq!(index.classify("c1"), NotificationLevel::Muted);
        assert!(!index.in_both_sets("c1"));
    }

    #[test]
    fn test_update_resets_dropped_channel_override() {
        let mut index = PreferenceIndex::new();
        apply_snapshot(&mut index, &snapshot());
        assert_eq!(index.classify("c1"), NotificationLevel::MentionsOnly);

        let summary = apply_update(
            &mut index,
            &prefs(
                "g1",
                NotificationLevel::Muted,
                false,
                true,
                &[("c2", NotificationLevel::Muted, false)],
            ),
        );
        assert_eq!(index.classify("c1"), NotificationLevel::Default);
        assert_eq!(index.classify("c2"), NotificationLevel::Muted);
        assert_eq!(summary.reset_channels, 1);
        assert_eq!(summary.channels, 1);
        // g1, c2 and g4's c4 muted; g2 still mentions-only.
        assert_eq!(summary.muted, 3);
        assert_eq!(summary.mentions_only, 1);
        assert_eq!(summary.suppress_everyone, 1);
    }

    #[test]
    fn test_update_for_unknown_guild() {
        let mut index = PreferenceIndex::new();
        apply_update(
            &mut index,
            &prefs("new", NotificationLevel::Default, true, true, &[]),
        );
        assert_eq!(index.classify("new"), NotificationLevel::MentionsOnly);
        assert!(index.is_suppressing_everyone("new"));
    }

    #[test]
    fn test_update_same_twice_is_stable() {
        let mut index = PreferenceIndex::new();
        apply_snapshot(&mut index, &snapshot());

        let update = prefs(
            "g3",
            NotificationLevel::MentionsOnly,
            false,
            true,
            &[("c3", NotificationLevel::Muted, false)],
        );
        apply_update(&mut index, &update);
        let after_once = index.clone();
        apply_update(&mut index, &update);
        assert_eq!(index, after_once);
    }
}
