//! Error type for `duty-store-sqlite`.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// Validation and not-found failures. Nothing was written.
  #[error("{0}")]
  Core(#[from] duty_core::Error),

  /// The database file could not be read or written (missing permissions,
  /// locked by another process, not a database, disk full).
  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("cannot create store directory {path:?}: {source}")]
  CreateDir {
    path:   PathBuf,
    #[source]
    source: std::io::Error,
  },
}

impl Error {
  pub fn is_validation(&self) -> bool {
    matches!(self, Self::Core(duty_core::Error::Validation(_)))
  }

  pub fn is_not_found(&self) -> bool {
    matches!(self, Self::Core(duty_core::Error::IncidentNotFound(_)))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
