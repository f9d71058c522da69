//! Notification delivery: desktop dispatcher and guild icons.

pub mod dispatcher;
pub mod icon;

pub use dispatcher::{DesktopNotifier, NotificationDispatcher};
pub use icon::{CdnIconStore, GuildDirectory, IconFile, IconStore};
