use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::NotificationSection;
use crate::gateway::{GatewayError, GatewayEvent, GatewaySession};
use crate::notify::{GuildDirectory, IconFile, IconStore, NotificationDispatcher};
use crate::policy::{Decision, GuildPreferences, MessageEvent, PreferenceSnapshot, PreferenceStore};

/// What a delivered notification looks like.
#[derive(Debug, Clone)]
pub struct NotificationTemplate {
    pub title: String,
    pub body: String,
    pub show_author: bool,
    pub icon_timeout: Duration,
}

impl NotificationTemplate {
    pub fn body_for(&self, message: &MessageEvent) -> String {
        if self.show_author && !message.author_name.is_empty() {
            format!("{} from {}", self.body, message.author_name)
        } else {
            self.body.clone()
        }
    }
}

impl From<&NotificationSection> for NotificationTemplate {
    fn from(section: &NotificationSection) -> Self {
        Self {
            title: section.app_name.clone(),
            body: section.body.clone(),
            show_author: section.show_author,
            icon_timeout: section.icon_timeout(),
        }
    }
}

/// Renders notifications off the event loop.
struct Notifier<D, I> {
    dispatcher: D,
    icons: I,
    template: NotificationTemplate,
}

impl<D: NotificationDispatcher, I: IconStore> Notifier<D, I> {
    async fn deliver(&self, message: MessageEvent) {
        let icon = match &message.guild_id {
            Some(guild_id) => self.icon_file(guild_id).await,
            None => None,
        };
        let body = self.template.body_for(&message);
        self.dispatcher
            .show(&self.template.title, &body, icon.as_ref().map(|f| f.path()))
            .await;
        // The icon file is removed when `icon` drops here.
    }

    /// Fetch and stage the guild icon. Any failure means no icon.
    async fn icon_file(&self, guild_id: &str) -> Option<IconFile> {
        let fetched =
            tokio::time::timeout(self.template.icon_timeout, self.icons.fetch_guild_icon(guild_id))
                .await;
        let bytes = match fetched {
            Ok(Ok(Some(bytes))) => bytes,
            Ok(Ok(None)) => return None,
            Ok(Err(e)) => {
                warn!(%guild_id, error = %e, "guild icon unavailable");
                return None;
            }
            Err(_) => {
                warn!(%guild_id, "guild icon fetch timed out");
                return None;
            }
        };

        match IconFile::write(&bytes).await {
            Ok(file) => Some(file),
            Err(e) => {
                warn!(%guild_id, error = %e, "could not stage guild icon");
                None
            }
        }
    }
}

/// The event loop: keeps preferences in step with the gateway and raises
/// notifications for messages that pass the classifier.
pub struct Relay<D, I> {
    store: Arc<PreferenceStore>,
    directory: Arc<GuildDirectory>,
    notifier: Arc<Notifier<D, I>>,
}

impl<D: NotificationDispatcher, I: IconStore> Relay<D, I> {
    pub fn new(
        store: Arc<PreferenceStore>,
        directory: Arc<GuildDirectory>,
        dispatcher: D,
        icons: I,
        template: NotificationTemplate,
    ) -> Self {
        Self {
            store,
            directory,
            notifier: Arc::new(Notifier {
                dispatcher,
                icons,
                template,
            }),
        }
    }

    pub fn store(&self) -> &PreferenceStore {
        &self.store
    }

    /// Consume gateway events until the session ends or `cancel` fires.
    /// Events are handled one at a time, in arrival order.
    pub async fn run<G: GatewaySession>(
        &self,
        gateway: &mut G,
        cancel: CancellationToken,
    ) -> Result<(), GatewayError> {
        let result = loop {
            let event = tokio::select! {
                _ = cancel.cancelled() => {
                    info!("relay shutting down");
                    break Ok(());
                }
                event = gateway.next_event() => event,
            };

            match event {
                Ok(Some(event)) => {
                    let user_id = gateway.current_user_id().map(str::to_owned);
                    self.handle_event(event, user_id.as_deref());
                }
                Ok(None) => {
                    info!("gateway session ended");
                    break Ok(());
                }
                Err(e) => break Err(e),
            }
        };

        // Preferences only live as long as the session.
        self.store.reset();
        result
    }

    pub fn handle_event(&self, event: GatewayEvent, current_user_id: Option<&str>) {
        match event {
            GatewayEvent::Ready(snapshot) => self.handle_ready(&snapshot),
            GatewayEvent::SettingsUpdate(settings) => self.handle_settings_update(&settings),
            GatewayEvent::MessageCreate(message) => {
                let Some(user_id) = current_user_id else {
                    debug!(message_id = %message.id, "message before ready, ignoring");
                    return;
                };
                self.handle_message(message, user_id);
            }
        }
    }

    pub fn handle_ready(&self, snapshot: &PreferenceSnapshot) {
        let summary = self.store.apply_snapshot(snapshot);
        self.directory.load(&snapshot.guilds);
        info!(
            user_id = %snapshot.user_id,
            guilds = snapshot.guilds.len(),
            classified_guilds = summary.guilds,
            channel_overrides = summary.channels,
            muted = summary.muted,
            mentions_only = summary.mentions_only,
            suppress_everyone = summary.suppress_everyone,
            guild_icons = self.directory.icon_count(),
            "preferences loaded"
        );
    }

    pub fn handle_settings_update(&self, settings: &GuildPreferences) {
        let summary = self.store.apply_update(settings);
        debug!(
            guild_id = %settings.guild_id,
            channel_overrides = summary.channels,
            reset_channels = summary.reset_channels,
            muted = summary.muted,
            mentions_only = summary.mentions_only,
            suppress_everyone = summary.suppress_everyone,
            "preferences updated"
        );
    }

    /// Classify a message and, if it should alert, spawn the notification.
    pub fn handle_message(
        &self,
        message: MessageEvent,
        current_user_id: &str,
    ) -> (Decision, Option<JoinHandle<()>>) {
        let decision = self.store.classify_message(&message, current_user_id);
        debug!(
            message_id = %message.id,
            channel_id = %message.channel_id,
            ?decision,
            "message classified"
        );
        if !decision.is_deliver() {
            return (decision, None);
        }

        let notifier = self.notifier.clone();
        let handle = tokio::spawn(async move { notifier.deliver(message).await });
        (decision, Some(handle))
    }
}
