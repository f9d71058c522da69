//! The user token, persisted as `{"Token": "..."}` in the config directory.

use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::config_dir;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    #[serde(rename = "Token", default)]
    pub token: String,
}

impl Credentials {
    pub fn has_token(&self) -> bool {
        !self.token.trim().is_empty()
    }
}

/// Default location of the credentials file.
pub fn default_path() -> Option<PathBuf> {
    config_dir().map(|p| p.join("config.json"))
}

/// Read credentials, creating the directory and an empty file on first run.
pub fn load_or_create(path: &Path) -> Result<Credentials> {
    if !path.exists() {
        let creds = Credentials::default();
        save(path, &creds)?;
        info!("created credentials file at {}", path.display());
        return Ok(creds);
    }

    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read credentials file {}", path.display()))?;
    serde_json::from_str(&contents)
        .with_context(|| format!("failed to decode credentials file {}", path.display()))
}

pub fn save(path: &Path, creds: &Credentials) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create config directory {}", parent.display()))?;
    }
    let json = serde_json::to_string(creds).context("failed to encode credentials")?;
    std::fs::write(path, json)
        .with_context(|| format!("failed to write credentials file {}", path.display()))
}

/// Load the token, asking for one and saving it when the file has none.
/// A non-empty `env_token` wins over the file and is not persisted.
pub fn resolve_token(
    path: &Path,
    env_token: Option<String>,
    prompt: impl FnOnce() -> Result<String>,
) -> Result<String> {
    if let Some(token) = env_token.filter(|t| !t.trim().is_empty()) {
        return Ok(token.trim().to_string());
    }

    let mut creds = load_or_create(path)?;
    if creds.has_token() {
        return Ok(creds.token);
    }

    let token = prompt()?.trim().to_string();
    if token.is_empty() {
        bail!("no token provided");
    }
    creds.token = token.clone();
    save(path, &creds)?;
    info!("saved token to {}", path.display());
    Ok(token)
}

const TOKEN_PROMPT: &str = "Enter token: ";

/// Ask for a token on the terminal without echoing it.
pub fn prompt_token_hidden() -> Result<String> {
    read_hidden_token(|prompt| rpassword::prompt_password(prompt))
}

fn read_hidden_token(read: impl FnOnce(&str) -> io::Result<String>) -> Result<String> {
    let token = read(TOKEN_PROMPT).context("failed to read token")?;
    Ok(token.trim().to_string())
}

/// Ask for a token on a non-terminal input, e.g. a pipe.
pub fn prompt_token(mut input: impl BufRead, mut output: impl Write) -> Result<String> {
    write!(output, "{TOKEN_PROMPT}")?;
    output.flush()?;
    let mut line = String::new();
    input.read_line(&mut line).context("failed to read token")?;
    Ok(line.trim().to_string())
}
