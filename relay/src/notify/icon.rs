use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use dashmap::DashMap;
use tracing::debug;
use uuid::Uuid;

use crate::policy::GuildSummary;

/// Fetches guild icons. `Ok(None)` means the guild has no icon.
pub trait IconStore: Send + Sync + 'static {
    fn fetch_guild_icon(
        &self,
        guild_id: &str,
    ) -> impl Future<Output = Result<Option<Vec<u8>>>> + Send;
}

/// Icon hashes for the guilds in the current session, keyed by guild id.
#[derive(Debug, Default)]
pub struct GuildDirectory {
    icons: DashMap<String, String>,
}

impl GuildDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the directory with the guilds from a ready snapshot.
    pub fn load(&self, guilds: &[GuildSummary]) {
        self.icons.clear();
        for guild in guilds {
            if let Some(icon) = &guild.icon {
                self.icons.insert(guild.id.clone(), icon.clone());
            }
        }
    }

    pub fn icon_hash(&self, guild_id: &str) -> Option<String> {
        self.icons.get(guild_id).map(|r| r.value().clone())
    }

    /// Number of guilds with a known icon.
    pub fn icon_count(&self) -> usize {
        self.icons.len()
    }
}

/// Downloads guild icons from the platform CDN.
pub struct CdnIconStore {
    client: reqwest::Client,
    base_url: String,
    directory: Arc<GuildDirectory>,
}

impl CdnIconStore {
    pub fn new(base_url: &str, timeout: Duration, directory: Arc<GuildDirectory>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            directory,
        })
    }

    pub fn icon_url(&self, guild_id: &str, hash: &str) -> String {
        format!("{}/icons/{}/{}.png", self.base_url, guild_id, hash)
    }
}

impl IconStore for CdnIconStore {
    async fn fetch_guild_icon(&self, guild_id: &str) -> Result<Option<Vec<u8>>> {
        let Some(hash) = self.directory.icon_hash(guild_id) else {
            return Ok(None);
        };

        let url = self.icon_url(guild_id, &hash);
        debug!(%url, "fetching guild icon");
        let bytes = self
            .client
            .get(&url)
            .send()
            .await
            .context("icon request failed")?
            .error_for_status()
            .context("icon request rejected")?
            .bytes()
            .await
            .context("failed to read icon body")?;
        Ok(Some(bytes.to_vec()))
    }
}

/// An icon written to a temp file, removed on drop.
#[derive(Debug)]
pub struct IconFile {
    path: PathBuf,
}

impl IconFile {
    pub async fn write(bytes: &[u8]) -> Result<Self> {
        let path = std::env::temp_dir().join(format!("discord-notify-{}.png", Uuid::new_v4()));
        tokio::fs::write(&path, bytes)
            .await
            .with_context(|| format!("failed to write icon to {}", path.display()))?;
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for IconFile {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}
