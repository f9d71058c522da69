use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use discord_notify::config::RelayConfig;
use discord_notify::credentials;
use discord_notify::gateway::{self, GatewaySession};
use discord_notify::notify::dispatcher::is_notification_available;
use discord_notify::notify::{CdnIconStore, DesktopNotifier, GuildDirectory};
use discord_notify::policy::PreferenceStore;
use discord_notify::relay::{NotificationTemplate, Relay};

#[derive(Parser, Debug)]
#[command(name = "discord-notify")]
#[command(about = "Desktop notifications for chat messages, honouring notification settings")]
struct Args {
    /// Path to relay.toml (default: <config dir>/discordnotify/relay.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Gateway bridge address; overrides the config file. Reads stdin when unset.
    #[arg(short, long)]
    gateway: Option<String>,

    /// Path to the credentials file (default: <config dir>/discordnotify/config.json)
    #[arg(long)]
    credentials: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_path = args
        .config
        .or_else(RelayConfig::default_path)
        .ok_or_else(|| anyhow!("could not determine the config directory"))?;
    let mut config = RelayConfig::load(&config_path)?;
    if let Some(addr) = args.gateway {
        config.gateway.address = Some(addr);
    }

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .init();

    if !is_notification_available().await {
        warn!("no desktop notifier found, notifications will only be logged");
    }

    let store = Arc::new(PreferenceStore::new(config.policy.guild_mute_policy()));
    let directory = Arc::new(GuildDirectory::new());
    let icons = CdnIconStore::new(
        &config.notifications.cdn_url,
        config.notifications.icon_timeout(),
        directory.clone(),
    )?;
    let relay = Relay::new(
        store,
        directory,
        DesktopNotifier::new(config.notifications.app_name.clone()),
        icons,
        NotificationTemplate::from(&config.notifications),
    );

    let cancel = CancellationToken::new();
    tokio::spawn(shutdown_signal(cancel.clone()));

    match config.gateway.address.as_deref() {
        Some(addr) => {
            let creds_path = args
                .credentials
                .or_else(credentials::default_path)
                .ok_or_else(|| anyhow!("could not determine the config directory"))?;
            let token = tokio::task::spawn_blocking(move || {
                credentials::resolve_token(&creds_path, std::env::var("DISCORD_TOKEN").ok(), || {
                    if std::io::stdin().is_terminal() {
                        credentials::prompt_token_hidden()
                    } else {
                        credentials::prompt_token(std::io::stdin().lock(), std::io::stdout())
                    }
                })
            })
            .await
            .context("token prompt panicked")??;

            let mut session = gateway::connect_tcp(addr, &token, config.gateway.max_frame_bytes)
                .await
                .with_context(|| format!("failed to connect to gateway at {addr}"))?;
            run(&relay, &mut session, cancel).await
        }
        None => {
            info!("reading gateway frames from stdin");
            let mut session = gateway::stdio(config.gateway.max_frame_bytes)
                .context("failed to start the stdin reader")?;
            run(&relay, &mut session, cancel).await
        }
    }
}

async fn run<G: GatewaySession>(
    relay: &Relay<DesktopNotifier, CdnIconStore>,
    session: &mut G,
    cancel: CancellationToken,
) -> Result<()> {
    relay
        .run(session, cancel)
        .await
        .context("gateway session failed")?;
    info!("relay stopped");
    Ok(())
}

/// Cancel on Ctrl-C or SIGTERM.
async fn shutdown_signal(cancel: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("termination signal received");
    cancel.cancel();
}
