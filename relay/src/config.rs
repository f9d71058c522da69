use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::info;

use crate::gateway::DEFAULT_MAX_FRAME_BYTES;
use crate::policy::GuildMutePolicy;

/// Directory name under the per-user config directory.
pub const CONFIG_DIR_NAME: &str = "discordnotify";

/// Per-user config directory for the relay, e.g. `~/.config/discordnotify`.
pub fn config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join(CONFIG_DIR_NAME))
}

/// Top-level relay configuration, loaded from relay.toml.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    pub gateway: GatewaySection,
    pub notifications: NotificationSection,
    pub policy: PolicySection,
    /// Default tracing filter when RUST_LOG is unset.
    pub log_level: String,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            gateway: GatewaySection::default(),
            notifications: NotificationSection::default(),
            policy: PolicySection::default(),
            log_level: "info".into(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct GatewaySection {
    /// Address of the gateway bridge. Frames are read from stdin when unset.
    pub address: Option<String>,
    pub max_frame_bytes: usize,
}

impl Default for GatewaySection {
    fn default() -> Self {
        Self {
            address: None,
            max_frame_bytes: DEFAULT_MAX_FRAME_BYTES,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct NotificationSection {
    pub app_name: String,
    pub body: String,
    /// Append the author's name to the notification body.
    pub show_author: bool,
    pub icon_timeout_secs: u64,
    pub cdn_url: String,
}

impl Default for NotificationSection {
    fn default() -> Self {
        Self {
            app_name: "Discord".into(),
            body: "New message".into(),
            show_author: false,
            icon_timeout_secs: 5,
            cdn_url: "https://cdn.discordapp.com".into(),
        }
    }
}

impl NotificationSection {
    pub fn icon_timeout(&self) -> Duration {
        Duration::from_secs(self.icon_timeout_secs)
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct PolicySection {
    /// Muted guilds still notify on direct mentions. When false a muted
    /// guild is fully silent.
    pub muted_guilds_allow_mentions: bool,
}

impl Default for PolicySection {
    fn default() -> Self {
        Self {
            muted_guilds_allow_mentions: true,
        }
    }
}

impl PolicySection {
    pub fn guild_mute_policy(&self) -> GuildMutePolicy {
        if self.muted_guilds_allow_mentions {
            GuildMutePolicy::AllowMentions
        } else {
            GuildMutePolicy::Silent
        }
    }
}

impl RelayConfig {
    /// Default location of relay.toml.
    pub fn default_path() -> Option<PathBuf> {
        config_dir().map(|p| p.join("relay.toml"))
    }

    /// Load config from a TOML file. Falls back to defaults if the file doesn't exist.
    /// Environment variables override TOML values.
    pub fn load(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read config file {}", path.display()))?;
            Self::parse(&contents)
                .with_context(|| format!("failed to parse config file {}", path.display()))?
        } else {
            info!("No config file found at {}, using defaults", path.display());
            Self::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    pub fn parse(contents: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }

    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(v) = var("DISCORD_NOTIFY_GATEWAY") {
            self.gateway.address = Some(v).filter(|s| !s.is_empty());
        }
        if let Some(v) = var("DISCORD_NOTIFY_APP_NAME") {
            self.notifications.app_name = v;
        }
        if let Some(v) = var("DISCORD_NOTIFY_ICON_TIMEOUT")
            && let Ok(secs) = v.parse()
        {
            self.notifications.icon_timeout_secs = secs;
        }
    }
}
