//! Fakes shared by unit and integration tests.

use std::path::Path;
use std::time::Duration;

use anyhow::anyhow;
use tokio::sync::mpsc;

use crate::notify::{IconStore, NotificationDispatcher};

/// A notification as the dispatcher saw it.
#[derive(Debug, PartialEq)]
pub struct Shown {
    pub title: String,
    pub body: String,
    pub icon_bytes: Option<Vec<u8>>,
}

/// Dispatcher that forwards every notification to a channel.
pub struct ChannelDispatcher(pub mpsc::UnboundedSender<Shown>);

impl NotificationDispatcher for ChannelDispatcher {
    async fn show(&self, title: &str, body: &str, icon: Option<&Path>) {
        let icon_bytes = icon.map(|p| std::fs::read(p).unwrap());
        let _ = self.0.send(Shown {
            title: title.into(),
            body: body.into(),
            icon_bytes,
        });
    }
}

pub enum FakeIcons {
    None,
    Bytes(Vec<u8>),
    Fail,
    Hang,
}

impl IconStore for FakeIcons {
    async fn fetch_guild_icon(&self, _guild_id: &str) -> anyhow::Result<Option<Vec<u8>>> {
        match self {
            FakeIcons::None => Ok(None),
            FakeIcons::Bytes(b) => Ok(Some(b.clone())),
            FakeIcons::Fail => Err(anyhow!("cdn down")),
            FakeIcons::Hang => {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok(None)
            }
        }
    }
}
