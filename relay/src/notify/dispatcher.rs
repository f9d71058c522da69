//! Platform-native desktop notifications.

use std::future::Future;
use std::path::Path;

use tokio::process::Command;
use tracing::{debug, info, warn};

/// Renders a desktop notification. Fire and forget: failures are logged,
/// never returned.
pub trait NotificationDispatcher: Send + Sync + 'static {
    fn show(
        &self,
        title: &str,
        body: &str,
        icon: Option<&Path>,
    ) -> impl Future<Output = ()> + Send;
}

/// Shells out to `notify-send` on Linux and `osascript` on macOS. Anything
/// else, or a missing tool, falls back to a log line.
#[derive(Debug, Clone)]
pub struct DesktopNotifier {
    app_name: String,
}

impl DesktopNotifier {
    pub fn new(app_name: impl Into<String>) -> Self {
        Self {
            app_name: app_name.into(),
        }
    }
}

impl NotificationDispatcher for DesktopNotifier {
    async fn show(&self, title: &str, body: &str, icon: Option<&Path>) {
        #[cfg(target_os = "linux")]
        {
            if notify_linux(&self.app_name, title, body, icon).await {
                return;
            }
        }

        #[cfg(target_os = "macos")]
        {
            let _ = icon;
            if notify_macos(title, body).await {
                return;
            }
        }

        #[cfg(not(any(target_os = "linux", target_os = "macos")))]
        let _ = icon;

        info!(app = %self.app_name, %title, %body, "notification (no desktop notifier available)");
    }
}

/// Linux notification using notify-send
#[cfg(target_os = "linux")]
async fn notify_linux(app_name: &str, title: &str, body: &str, icon: Option<&Path>) -> bool {
    let mut cmd = Command::new("notify-send");
    cmd.args(["-a", app_name]);
    if let Some(icon) = icon {
        cmd.arg("-i").arg(icon);
    }
    cmd.args([title, body]);

    match cmd.output().await {
        Ok(out) if out.status.success() => {
            debug!(%title, "notification shown");
            true
        }
        Ok(out) => {
            warn!(status = %out.status, "notify-send failed");
            false
        }
        Err(e) => {
            warn!(error = %e, "could not run notify-send");
            false
        }
    }
}

/// macOS notification using osascript
#[cfg(target_os = "macos")]
async fn notify_macos(title: &str, body: &str) -> bool {
    let script = format!(
        "display notification \"{}\" with title \"{}\"",
        body.replace('"', "\\\""),
        title.replace('"', "\\\"")
    );
    Command::new("osascript")
        .args(["-e", &script])
        .output()
        .await
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// Check if a desktop notifier is available
pub async fn is_notification_available() -> bool {
    if cfg!(target_os = "macos") {
        // osascript is always available on macOS
        true
    } else if cfg!(target_os = "linux") {
        Command::new("which")
            .arg("notify-send")
            .output()
            .await
            .map(|o| o.status.success())
            .unwrap_or(false)
    } else {
        false
    }
}
