//! The YAML settings document.
//!
//! Layered with the `config` crate: built-in defaults, then the file, then
//! `DUTY__SECTION__KEY` environment variables. Nested tables merge key by key,
//! so a file that sets only `telegram.token` keeps every other default. A
//! missing file is created from the defaults first.

use std::path::{Path, PathBuf};

use duty_telegram::{ChatId, DEFAULT_API_BASE, TelegramClient, TelegramConfig};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SettingsError {
  #[error("cannot read configuration: {0}")]
  Read(#[from] config::ConfigError),

  #[error("cannot write default configuration to {path:?}: {source}")]
  Write {
    path:   PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("cannot encode default configuration: {0}")]
  Encode(#[from] serde_yaml::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TelegramSettings {
  pub token:    String,
  pub chat_id:  ChatId,
  pub api_base: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageSettings {
  /// Path of the store file. The key name predates the SQLite store and is
  /// kept so existing documents keep working.
  pub excel_path: PathBuf,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UiSettings {
  /// Pre-filled duty officer on new incidents.
  pub default_duty: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
  pub telegram: TelegramSettings,
  pub storage:  StorageSettings,
  pub ui:       UiSettings,
}

impl Default for Settings {
  fn default() -> Self {
    Self {
      telegram: TelegramSettings {
        token:    String::new(),
        chat_id:  ChatId::default(),
        api_base: DEFAULT_API_BASE.to_owned(),
      },
      storage:  StorageSettings { excel_path: PathBuf::from("data/incidents.db") },
      ui:       UiSettings::default(),
    }
  }
}

impl Settings {
  /// Load `path`, writing the defaults there first if it does not exist.
  pub fn load(path: &Path) -> Result<Self, SettingsError> {
    if !path.exists() {
      write_defaults(path)?;
      tracing::info!(path = %path.display(), "wrote default configuration");
    }

    let settings = config::Config::builder()
      .add_source(config::Config::try_from(&Self::default())?)
      .add_source(config::File::from(path).format(config::FileFormat::Yaml))
      .add_source(
        config::Environment::with_prefix("DUTY")
          .prefix_separator("__")
          .separator("__"),
      )
      .build()?;

    Ok(settings.try_deserialize()?)
  }

  /// The store file, with a leading `~` expanded.
  pub fn store_path(&self) -> PathBuf { expand_tilde(&self.storage.excel_path) }

  /// A client for the configured chat. Fails when the token or chat id is
  /// blank.
  pub fn telegram(&self) -> duty_telegram::Result<TelegramClient> {
    TelegramClient::new(TelegramConfig {
      api_base: self.telegram.api_base.clone(),
      token:    self.telegram.token.clone(),
      chat_id:  self.telegram.chat_id.clone(),
    })
  }
}

fn write_defaults(path: &Path) -> Result<(), SettingsError> {
  let yaml = serde_yaml::to_string(&Settings::default())?;
  let write = || -> std::io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
      std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, yaml)
  };
  write().map_err(|source| SettingsError::Write { path: path.to_path_buf(), source })
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
