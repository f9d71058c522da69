use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::policy::{
    ChannelOverride, GuildPreferences, GuildSummary, MessageEvent, NotificationLevel,
    PreferenceSnapshot,
};

use super::error::GatewayError;

/// Opcode of a dispatch frame. Every other opcode is control traffic.
pub const OP_DISPATCH: u8 = 0;
/// Opcode of the identify frame sent when a session starts.
pub const OP_IDENTIFY: u8 = 2;

/// Events the relay consumes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayEvent {
    /// Session established; carries the full preference snapshot.
    Ready(PreferenceSnapshot),
    MessageCreate(MessageEvent),
    /// Preferences for one guild changed.
    SettingsUpdate(GuildPreferences),
}

/// A raw gateway frame: `{"op": 0, "t": "READY", "d": {...}}`. Sequence
/// numbers and other fields are ignored.
#[derive(Debug, Deserialize, Serialize)]
pub struct Frame {
    pub op: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub t: Option<String>,
    #[serde(default)]
    pub d: Value,
}

impl Frame {
    pub fn identify(token: &str) -> Self {
        Self {
            op: OP_IDENTIFY,
            t: None,
            d: serde_json::json!({ "token": token }),
        }
    }
}

/// Decode one line into an event.
///
/// Returns `Ok(None)` for control frames and dispatch types the relay
/// doesn't consume.
pub fn decode_frame(line: &str) -> Result<Option<GatewayEvent>, GatewayError> {
    let frame: Frame = serde_json::from_str(line)?;
    if frame.op != OP_DISPATCH {
        return Ok(None);
    }

    let event = match frame.t.as_deref() {
        Some("READY") => {
            let ready: ReadyPayload = serde_json::from_value(frame.d)?;
            GatewayEvent::Ready(ready.into())
        }
        Some("MESSAGE_CREATE") => {
            let message: MessagePayload = serde_json::from_value(frame.d)?;
            GatewayEvent::MessageCreate(message.into())
        }
        Some("USER_GUILD_SETTINGS_UPDATE") => {
            let settings: GuildSettingsPayload = serde_json::from_value(frame.d)?;
            GatewayEvent::SettingsUpdate(settings.into())
        }
        _ => return Ok(None),
    };
    Ok(Some(event))
}

// ── Wire payloads ───────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct UserPayload {
    id: String,
    #[serde(default)]
    username: String,
}

#[derive(Debug, Deserialize)]
struct ReadyPayload {
    user: UserPayload,
    #[serde(default)]
    guilds: Vec<GuildPayload>,
    #[serde(default)]
    user_guild_settings: GuildSettingsList,
}

#[derive(Debug, Deserialize)]
struct GuildPayload {
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    icon: Option<String>,
    #[serde(default)]
    default_message_notifications: Option<u8>,
}

/// Settings arrive either as a bare array or wrapped in `{"entries": [...]}`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum GuildSettingsList {
    Plain(Vec<GuildSettingsPayload>),
    Versioned { entries: Vec<GuildSettingsPayload> },
}

impl Default for GuildSettingsList {
    fn default() -> Self {
        Self::Plain(Vec::new())
    }
}

impl GuildSettingsList {
    fn into_vec(self) -> Vec<GuildSettingsPayload> {
        match self {
            Self::Plain(v) | Self::Versioned { entries: v } => v,
        }
    }
}

#[derive(Debug, Deserialize)]
struct GuildSettingsPayload {
    /// Null for the direct-message settings entry.
    #[serde(default)]
    guild_id: Option<String>,
    #[serde(default)]
    message_notifications: Option<u8>,
    #[serde(default)]
    muted: bool,
    #[serde(default)]
    suppress_everyone: bool,
    #[serde(default)]
    channel_overrides: Vec<ChannelOverridePayload>,
}

#[derive(Debug, Deserialize)]
struct ChannelOverridePayload {
    channel_id: String,
    #[serde(default)]
    message_notifications: Option<u8>,
    #[serde(default)]
    muted: bool,
}

#[derive(Debug, Deserialize)]
struct MessagePayload {
    id: String,
    channel_id: String,
    #[serde(default)]
    guild_id: Option<String>,
    author: UserPayload,
    #[serde(default)]
    mention_everyone: bool,
    #[serde(default)]
    mentions: Vec<UserPayload>,
}

fn level(value: Option<u8>) -> NotificationLevel {
    value.map(NotificationLevel::from).unwrap_or_default()
}

impl From<ReadyPayload> for PreferenceSnapshot {
    fn from(ready: ReadyPayload) -> Self {
        Self {
            user_id: ready.user.id,
            guilds: ready
                .guilds
                .into_iter()
                .map(|g| GuildSummary {
                    id: g.id,
                    name: g.name,
                    default_level: level(g.default_message_notifications),
                    icon: g.icon,
                })
                .collect(),
            settings: ready
                .user_guild_settings
                .into_vec()
                .into_iter()
                .filter(|s| s.guild_id.is_some())
                .map(GuildPreferences::from)
                .collect(),
        }
    }
}

impl From<GuildSettingsPayload> for GuildPreferences {
    fn from(settings: GuildSettingsPayload) -> Self {
        Self {
            guild_id: settings.guild_id.unwrap_or_default(),
            level: level(settings.message_notifications),
            muted: settings.muted,
            suppress_everyone: settings.suppress_everyone,
            channel_overrides: settings
                .channel_overrides
                .into_iter()
                .map(|c| ChannelOverride {
                    channel_id: c.channel_id,
                    level: level(c.message_notifications),
                    muted: c.muted,
                })
                .collect(),
        }
    }
}

impl From<MessagePayload> for MessageEvent {
    fn from(message: MessagePayload) -> Self {
        Self {
            id: message.id,
            author_id: message.author.id,
            author_name: message.author.username,
            guild_id: message.guild_id,
            channel_id: message.channel_id,
            mention_everyone: message.mention_everyone,
            mentions: message.mentions.into_iter().map(|u| u.id).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_ready_plain_settings() {
        let line = r#"{"op":0,"t":"READY","s":1,"d":{
            "user":{"id":"me","username":"alice"},
            "guilds":[
                {"id":"g1","name":"One","icon":"abc","default_message_notifications":0},
                {"id":"g2","name":"Two","default_message_notifications":1}
            ],
            "user_guild_settings":[
                {"guild_id":"g1","message_notifications":2,"muted":false,"suppress_everyone":true,
                 "channel_overrides":[{"channel_id":"c1","message_notifications":1,"muted":false}]}
            ]}}"#
            .replace('\n', "");

        let Some(GatewayEvent::Ready(snapshot)) = decode_frame(&line).unwrap() else {
            panic!("expected ready event");
        };
        assert_eq!(snapshot.user_id, "me");
        assert_eq!(snapshot.guilds.len(), 2);
        assert_eq!(snapshot.guilds[0].icon.as_deref(), Some("abc"));
        assert_eq!(snapshot.guilds[1].default_level, NotificationLevel::MentionsOnly);

        let g1 = snapshot.settings_for("g1").unwrap();
        assert_eq!(g1.level, NotificationLevel::Muted);
        assert!(g1.suppress_everyone);
        assert_eq!(g1.channel_overrides[0].level, NotificationLevel::MentionsOnly);
    }

    #[test]
    fn test_decode_ready_versioned_settings() {
        let line = r#"{"op":0,"t":"READY","d":{"user":{"id":"me"},"guilds":[{"id":"g1"}],
            "user_guild_settings":{"version":3,"partial":false,"entries":[
                {"guild_id":null,"message_notifications":0},
                {"guild_id":"g1","message_notifications":3,"muted":true}
            ]}}}"#
            .replace('\n', "");

        let Some(GatewayEvent::Ready(snapshot)) = decode_frame(&line).unwrap() else {
            panic!("expected ready event");
        };
        // The direct-message entry has no guild and is dropped.
        assert_eq!(snapshot.settings.len(), 1);
        assert_eq!(snapshot.settings[0].level, NotificationLevel::Default);
        assert!(snapshot.settings[0].muted);
    }

    #[test]
    fn test_decode_message_create() {
        let line = r#"{"op":0,"t":"MESSAGE_CREATE","d":{"id":"m1","channel_id":"c1","guild_id":"g1",
            "author":{"id":"u2","username":"bob"},"content":"hi","mention_everyone":true,
            "mentions":[{"id":"me","username":"alice"}]}}"#
            .replace('\n', "");

        let Some(GatewayEvent::MessageCreate(msg)) = decode_frame(&line).unwrap() else {
            panic!("expected message event");
        };
        assert_eq!(msg.author_id, "u2");
        assert_eq!(msg.author_name, "bob");
        assert_eq!(msg.guild_id.as_deref(), Some("g1"));
        assert!(msg.mention_everyone);
        assert!(msg.mentions.contains("me"));
    }

    #[test]
    fn test_decode_direct_message() {
        let line =
            r#"{"op":0,"t":"MESSAGE_CREATE","d":{"id":"m1","channel_id":"dm","author":{"id":"u2"}}}"#;
        let Some(GatewayEvent::MessageCreate(msg)) = decode_frame(line).unwrap() else {
            panic!("expected message event");
        };
        assert!(msg.guild_id.is_none());
        assert!(msg.mentions.is_empty());
    }

    #[test]
    fn test_decode_settings_update() {
        let line = r#"{"op":0,"t":"USER_GUILD_SETTINGS_UPDATE","d":{"guild_id":"g1",
            "message_notifications":1,"muted":false,"suppress_everyone":false,
            "channel_overrides":[{"channel_id":"c1","message_notifications":3,"muted":true}]}}"#
            .replace('\n', "");

        let Some(GatewayEvent::SettingsUpdate(settings)) = decode_frame(&line).unwrap() else {
            panic!("expected settings update");
        };
        assert_eq!(settings.guild_id, "g1");
        assert_eq!(settings.level, NotificationLevel::MentionsOnly);
        assert!(settings.channel_overrides[0].muted);
    }

    #[test]
    fn test_ignores_other_frames() {
        assert!(decode_frame(r#"{"op":11}"#).unwrap().is_none());
        assert!(
            decode_frame(r#"{"op":10,"d":{"heartbeat_interval":41250}}"#)
                .unwrap()
                .is_none()
        );
        assert!(
            decode_frame(r#"{"op":0,"t":"TYPING_START","d":{"channel_id":"c1"}}"#)
                .unwrap()
                .is_none()
        );
    }

    #[test]
    fn test_rejects_malformed_frames() {
        assert!(matches!(decode_frame("not json"), Err(GatewayError::Decode(_))));
        // Dispatch with a payload missing required fields.
        assert!(decode_frame(r#"{"op":0,"t":"MESSAGE_CREATE","d":{"id":"m1"}}"#).is_err());
    }

    #[test]
    fn test_identify_frame() {
        let json = serde_json::to_string(&Frame::identify("secret")).unwrap();
        assert_eq!(json, r#"{"op":2,"d":{"token":"secret"}}"#);
    }
}
