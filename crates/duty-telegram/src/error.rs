//! Error type for `duty-telegram`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("telegram is not configured: {0} is empty")]
  NotConfigured(&'static str),

  /// The endpoint answered with something other than `200 OK`.
  #[error("telegram API error: {status} {body}")]
  Delivery { status: u16, body: String },

  /// No response: DNS, connect, TLS or read failure.
  #[error("telegram request failed: {0}")]
  Transport(#[source] reqwest::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
