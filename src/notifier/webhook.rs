//! HTTP chat channels: Telegram Bot API, Discord and Slack incoming webhooks.

use super::Notifier;
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;
use tracing::warn;
use url::Url;

const TELEGRAM_API: &str = "https://api.telegram.org";
const TELEGRAM_MAX_CHARS: usize = 4096;
const DISCORD_MAX_CHARS: usize = 2000;
const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Serialize)]
struct TelegramMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct DiscordMessage<'a> {
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct SlackMessage<'a> {
    text: &'a str,
}

fn http_client() -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder().timeout(HTTP_TIMEOUT).build()?)
}

async fn post_json<T: Serialize + ?Sized>(
    client: &reqwest::Client,
    url: Url,
    body: &T,
) -> Result<()> {
    let resp = client.post(url).json(body).send().await?;
    let status = resp.status();
    if !status.is_success() {
        let detail = resp.text().await.unwrap_or_default();
        return Err(AppError::Notification(format!("HTTP {status}: {detail}")));
    }
    Ok(())
}

/// Cut `message` to at most `max` characters, on a char boundary.
fn truncate(message: &str, max: usize) -> &str {
    match message.char_indices().nth(max) {
        Some((idx, _)) => &message[..idx],
        None => message,
    }
}

pub struct TelegramNotifier {
    client: reqwest::Client,
    endpoint: Url,
    chat_id: String,
}

impl TelegramNotifier {
    pub fn new(bot_token: &str, chat_id: &str) -> Result<Self> {
        let endpoint = Url::parse(&format!("{TELEGRAM_API}/bot{bot_token}/sendMessage"))?;
        Ok(Self {
            client: http_client()?,
            endpoint,
            chat_id: chat_id.to_string(),
        })
    }

    pub async fn send(&self, message: &str) -> Result<()> {
        let body = TelegramMessage {
            chat_id: &self.chat_id,
            text: truncate(message, TELEGRAM_MAX_CHARS),
        };
        post_json(&self.client, self.endpoint.clone(), &body).await
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn notify(&self, message: &str) {
        if let Err(e) = self.send(message).await {
            warn!(error = %e, channel = "telegram", "[NOTIFY] delivery failed");
        }
    }
}

pub struct DiscordNotifier {
    client: reqwest::Client,
    webhook_url: Url,
}

impl DiscordNotifier {
    pub fn new(webhook_url: Url) -> Result<Self> {
        Ok(Self {
            client: http_client()?,
            webhook_url,
        })
    }

    pub async fn send(&self, message: &str) -> Result<()> {
        let body = DiscordMessage {
            content: truncate(message, DISCORD_MAX_CHARS),
        };
        post_json(&self.client, self.webhook_url.clone(), &body).await
    }
}

#[async_trait]
impl Notifier for DiscordNotifier {
    async fn notify(&self, message: &str) {
        if let Err(e) = self.send(message).await {
            warn!(error = %e, channel = "discord", "[NOTIFY] delivery failed");
        }
    }
}

pub struct SlackNotifier {
    client: reqwest::Client,
    webhook_url: Url,
}

impl SlackNotifier {
    pub fn new(webhook_url: Url) -> Result<Self> {
        Ok(Self {
            client: http_client()?,
            webhook_url,
        })
    }

    pub async fn send(&self, message: &str) -> Result<()> {
        let body = SlackMessage { text: message };
        post_json(&self.client, self.webhook_url.clone(), &body).await
    }
}

#[async_trait]
impl Notifier for SlackNotifier {
    async fn notify(&self, message: &str) {
        if let Err(e) = self.send(message).await {
            warn!(error = %e, channel = "slack", "[NOTIFY] delivery failed");
        }
    }
}
