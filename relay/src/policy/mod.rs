//! Notification preferences: the policy index, the message classifier and
//! the synchronizer that keeps the index in step with gateway updates.

pub mod classifier;
pub mod index;
pub mod settings;
pub mod store;
pub mod sync;

pub use classifier::{Decision, SuppressReason, classify_message};
pub use index::{GuildMutePolicy, NotificationLevel, PreferenceIndex};
pub use settings::{
    ChannelOverride, GuildPreferences, GuildSummary, MessageEvent, PreferenceSnapshot,
};
pub use store::PreferenceStore;
pub use sync::SyncSummary;
