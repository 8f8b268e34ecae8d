//! Best-effort outbound notifications.
//!
//! One implementation per channel; the channel is chosen once when the
//! notifier is built. Delivery failures are logged and swallowed, callers
//! never see them.

use crate::config::NotifierConfig;
use crate::errors::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

pub mod webhook;

pub use webhook::{DiscordNotifier, SlackNotifier, TelegramNotifier};

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, message: &str);
}

/// Writes messages to the log only.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, message: &str) {
        info!("[NOTIFY] {message}");
    }
}

/// Build the notifier selected by `config`.
pub fn build_notifier(config: &NotifierConfig) -> Result<Arc<dyn Notifier>> {
    let notifier: Arc<dyn Notifier> = match config {
        NotifierConfig::Log => Arc::new(LogNotifier),
        NotifierConfig::Telegram { bot_token, chat_id } => {
            Arc::new(TelegramNotifier::new(bot_token, chat_id)?)
        }
        NotifierConfig::Discord { webhook_url } => {
            Arc::new(DiscordNotifier::new(webhook_url.clone())?)
        }
        NotifierConfig::Slack { webhook_url } => Arc::new(SlackNotifier::new(webhook_url.clone())?),
    };
    info!(channel = ?config, "[INIT] notifier ready");
    Ok(notifier)
}
