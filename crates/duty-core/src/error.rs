//! Error types for `duty-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// Malformed or missing operator input. Nothing has been persisted.
  #[error("validation failed: {0}")]
  Validation(String),

  #[error("incident not found: {0}")]
  IncidentNotFound(u64),
}

impl Error {
  pub fn validation(msg: impl Into<String>) -> Self { Self::Validation(msg.into()) }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
