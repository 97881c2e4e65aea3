//! Telegram Bot API client used to deliver incident alerts and daily reports.
//!
//! One message is one `POST {api_base}/bot{token}/sendMessage` with a JSON
//! body `{chat_id, text}`. Anything other than `200 OK` is a delivery failure.
//! There are no retries and no queue; timeouts are reqwest's defaults.

mod error;

use std::fmt;

use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

pub use error::{Error, Result};

/// Production Bot API endpoint.
pub const DEFAULT_API_BASE: &str = "https://api.telegram.org";

/// Destination chat: a numeric id or an `@channel` username.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChatId {
  Id(i64),
  Name(String),
}

impl ChatId {
  pub fn is_empty(&self) -> bool {
    matches!(self, Self::Name(name) if name.trim().is_empty())
  }
}

impl Default for ChatId {
  fn default() -> Self { Self::Name(String::new()) }
}

impl fmt::Display for ChatId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Id(id) => write!(f, "{id}"),
      Self::Name(name) => f.write_str(name),
    }
  }
}

impl From<i64> for ChatId {
  fn from(id: i64) -> Self { Self::Id(id) }
}

impl From<&str> for ChatId {
  fn from(name: &str) -> Self { Self::Name(name.to_owned()) }
}

/// Connection settings for the Bot API.
#[derive(Debug, Clone)]
pub struct TelegramConfig {
  pub api_base: String,
  pub token:    String,
  pub chat_id:  ChatId,
}

#[derive(Serialize)]
struct SendMessage<'a> {
  chat_id: &'a ChatId,
  text:    &'a str,
}

/// Sends text messages to one preconfigured chat.
///
/// Cheap to clone; the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct TelegramClient {
  client: Client,
  config: TelegramConfig,
}

impl TelegramClient {
  /// Fails with [`Error::NotConfigured`] when the token or chat id is blank.
  pub fn new(config: TelegramConfig) -> Result<Self> {
    if config.token.trim().is_empty() {
      return Err(Error::NotConfigured("telegram.token"));
    }
    if config.chat_id.is_empty() {
      return Err(Error::NotConfigured("telegram.chat_id"));
    }
    let client = Client::builder().build().map_err(Error::Transport)?;
    Ok(Self { client, config })
  }

  fn url(&self, method: &str) -> String {
    format!(
      "{}/bot{}/{}",
      self.config.api_base.trim_end_matches('/'),
      self.config.token,
      method
    )
  }

  /// Deliver `text` with a single request.
  pub async fn send_message(&self, text: &str) -> Result<()> {
    let body = SendMessage { chat_id: &self.config.chat_id, text };

    // The request URL carries the bot token; keep it out of error messages.
    let resp = self
      .client
      .post(self.url("sendMessage"))
      .json(&body)
      .send()
      .await
      .map_err(|e| Error::Transport(e.without_url()))?;

    let status = resp.status();
    if status != StatusCode::OK {
      let body = resp.text().await.unwrap_or_default();
      tracing::warn!(status = status.as_u16(), "telegram rejected message");
      return Err(Error::Delivery { status: status.as_u16(), body });
    }

    tracing::debug!(chat_id = %self.config.chat_id, chars = text.chars().count(), "message sent");
    Ok(())
  }
}
