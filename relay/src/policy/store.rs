use std::sync::{Mutex, MutexGuard, PoisonError};

use super::classifier::{Decision, classify_message};
use super::index::{GuildMutePolicy, NotificationLevel, PreferenceIndex};
use super::settings::{GuildPreferences, MessageEvent, PreferenceSnapshot};
use super::sync::{self, SyncSummary};

/// Shared owner of the preference index.
///
/// Every snapshot, update and classification runs under one lock, so a
/// reader never sees an update half applied. Nothing here awaits while
/// holding the lock.
#[derive(Debug, Default)]
pub struct PreferenceStore {
    index: Mutex<PreferenceIndex>,
}

impl PreferenceStore {
    pub fn new(policy: GuildMutePolicy) -> Self {
        Self {
            index: Mutex::new(PreferenceIndex::with_guild_mute_policy(policy)),
        }
    }

    pub fn apply_snapshot(&self, snapshot: &PreferenceSnapshot) -> SyncSummary {
        sync::apply_snapshot(&mut self.lock(), snapshot)
    }

    pub fn apply_update(&self, settings: &GuildPreferences) -> SyncSummary {
        sync::apply_update(&mut self.lock(), settings)
    }

    pub fn classify_message(&self, message: &MessageEvent, current_user_id: &str) -> Decision {
        classify_message(message, &self.lock(), current_user_id)
    }

    pub fn classify(&self, id: &str) -> NotificationLevel {
        self.lock().classify(id)
    }

    /// Drop all preferences, e.g. when the session ends.
    pub fn reset(&self) {
        self.lock().clear();
    }

    /// Copy of the current index.
    pub fn snapshot(&self) -> PreferenceIndex {
        self.lock().clone()
    }

    // The index is only mutated by synchronous, non-panicking code, so a
    // poisoned lock still guards a consistent value.
    fn lock(&self) -> MutexGuard<'_, PreferenceIndex> {
        self.index.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
