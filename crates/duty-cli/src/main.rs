//! `duty`: incident log for the duty officer.
//!
//! # Usage
//!
//! ```text
//! duty add --location "Building A" --address "1 Main St" --type "Service outage" "Router down"
//! duty list --date 01.03.2024
//! duty status 7 closed --comment "replaced PSU"
//! duty daily-report
//! duty --config ~/duty/config.yaml incident --type alert "Smoke detector in B2"
//! ```

mod commands;
mod registry;
mod settings;

use std::{
  path::{Path, PathBuf},
  process::ExitCode,
};

use anyhow::{Context as _, Result, bail};
use chrono::Local;
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use commands::Delivery;
use duty_core::{
  form::{DATETIME_FORMAT, IncidentForm, StatusForm},
  incident::Status,
  report,
  store::IncidentStore as _,
};
use duty_store_sqlite::SqliteStore;
use settings::Settings;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "duty", version, about = "Duty-officer incident log")]
struct Cli {
  /// Path to the YAML settings document. Created with defaults if missing.
  #[arg(long, global = true, value_name = "FILE", default_value = "config.yaml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Send today's digest to the configured chat.
  DailyReport {
    /// Print the digest instead of sending it.
    #[arg(long)]
    print: bool,
  },

  /// Send an ad-hoc alert. Nothing is recorded.
  Incident {
    #[arg(long = "type", value_name = "TYPE")]
    kind:        Option<String>,
    description: String,
  },

  /// Record a new incident and alert the chat.
  Add {
    /// DD.MM.YYYY, defaults to today.
    #[arg(long)]
    date:        Option<String>,
    /// HH:MM, defaults to now.
    #[arg(long)]
    time:        Option<String>,
    #[arg(long)]
    location:    String,
    #[arg(long)]
    address:     String,
    /// Defaults to `ui.default_duty`.
    #[arg(long)]
    duty:        Option<String>,
    #[arg(long = "type", value_name = "TYPE", default_value = "")]
    kind:        String,
    /// Save without sending an alert.
    #[arg(long)]
    no_send:     bool,
    description: String,
  },

  /// Show the registry.
  List {
    /// Only incidents dated DD.MM.YYYY.
    #[arg(long)]
    date: Option<String>,
    #[arg(long)]
    json: bool,
  },

  /// Open or close an incident.
  Status {
    id:          u64,
    status:      StatusArg,
    /// DD.MM.YYYY HH:MM, defaults to now when closing.
    #[arg(long)]
    resolved_at: Option<String>,
    #[arg(long)]
    comment:     Option<String>,
  },

  /// Replace an incident's comment.
  Comment { id: u64, text: String },

  /// Edit the location directory.
  #[command(subcommand)]
  Locations(LocationsCommand),

  /// Send a test message to the configured chat.
  CheckTelegram,
}

#[derive(Subcommand, Debug)]
enum LocationsCommand {
  List,
  /// Register an address, creating the location if needed.
  Add { location: String, address: String },
  /// Remove one address, or the whole location when no address is given.
  Remove { location: String, address: Option<String> },
  /// Rename a location, or one of its addresses with `--address`.
  Rename {
    location: String,
    new_name: String,
    #[arg(long)]
    address:  Option<String>,
  },
  /// Replace the directory with a CSV/TSV table with `location` and
  /// `address` columns.
  Import { file: PathBuf },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum StatusArg {
  Open,
  Closed,
}

impl From<StatusArg> for Status {
  fn from(s: StatusArg) -> Self {
    match s {
      StatusArg::Open => Status::Open,
      StatusArg::Closed => Status::Closed,
    }
  }
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> ExitCode {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .with_writer(std::io::stderr)
    .init();

  let cli = match Cli::try_parse() {
    Ok(cli) => cli,
    Err(e) => {
      // --help and --version land here too and are not failures.
      let code = if e.use_stderr() { ExitCode::FAILURE } else { ExitCode::SUCCESS };
      e.print().ok();
      return code;
    }
  };

  let Some(command) = cli.command else {
    eprintln!("{}", Cli::command().render_help());
    return ExitCode::FAILURE;
  };

  match run(&cli.config, command).await {
    Ok(()) => ExitCode::SUCCESS,
    Err(e) => {
      eprintln!("error: {e:#}");
      ExitCode::FAILURE
    }
  }
}

async fn run(config: &Path, command: Command) -> Result<()> {
  let settings = Settings::load(config)
    .with_context(|| format!("loading settings from {}", config.display()))?;

  match command {
    Command::Incident { kind, description } => {
      let text = report::format_adhoc_alert(kind.as_deref(), &description);
      settings.telegram()?.send_message(&text).await?;
      println!("Alert sent.");
    }

    Command::CheckTelegram => {
      settings
        .telegram()?
        .send_message("Duty log: connection test")
        .await?;
      println!("Test message delivered.");
    }

    Command::DailyReport { print } => {
      let store = open_store(&settings).await?;
      let text = commands::daily_report(&store, None).await?;
      if print {
        println!("{text}");
      } else {
        settings.telegram()?.send_message(&text).await?;
        println!("Daily report sent.");
      }
    }

    Command::Add { date, time, location, address, duty, kind, no_send, description } => {
      let store = open_store(&settings).await?;
      let defaults = IncidentForm::prefilled(&settings.ui.default_duty);
      let form = IncidentForm {
        date: date.unwrap_or(defaults.date),
        time: time.unwrap_or(defaults.time),
        location,
        address,
        duty: duty.unwrap_or(defaults.duty),
        kind,
        description,
      };
      let incident = commands::add_incident(&store, &form).await?;
      println!("Incident #{} saved.", incident.id.unwrap_or_default());

      if !no_send {
        let alert = report::format_incident_alert(&incident);
        if let Delivery::Failed(e) = commands::deliver(settings.telegram(), &alert).await {
          eprintln!("warning: incident saved, but the alert was not delivered: {e}");
        }
      }
    }

    Command::List { date, json } => {
      let store = open_store(&settings).await?;
      let incidents = commands::registry(&store, date.as_deref()).await?;
      if json {
        println!("{}", serde_json::to_string_pretty(&incidents)?);
      } else {
        println!("{}", registry::render_incidents(&incidents));
      }
    }

    Command::Status { id, status, resolved_at, comment } => {
      let store = open_store(&settings).await?;
      let status = Status::from(status);
      let resolved_at = match (status, resolved_at) {
        (_, Some(at)) => at,
        (Status::Closed, None) => Local::now().format(DATETIME_FORMAT).to_string(),
        (Status::Open, None) => String::new(),
      };
      let form = StatusForm { status, resolved_at, comment };
      let incident = commands::set_status(&store, id, &form).await?;
      println!("Incident #{id} is now {}.", incident.status);
    }

    Command::Comment { id, text } => {
      let store = open_store(&settings).await?;
      commands::set_comment(&store, id, &text).await?;
      println!("Comment on incident #{id} updated.");
    }

    Command::Locations(cmd) => {
      let store = open_store(&settings).await?;
      locations(&store, cmd).await?;
    }
  }

  Ok(())
}

async fn open_store(settings: &Settings) -> Result<SqliteStore> {
  let path = settings.store_path();
  SqliteStore::open(&path)
    .await
    .with_context(|| format!("failed to open store at {path:?}"))
}

async fn locations(store: &SqliteStore, cmd: LocationsCommand) -> Result<()> {
  let saved = match cmd {
    LocationsCommand::List => {
      println!("{}", registry::render_directory(&store.load_locations().await?));
      return Ok(());
    }
    LocationsCommand::Add { location, address } => {
      commands::edit_directory(store, |d| commands::add_place(d, &location, &address)).await?
    }
    LocationsCommand::Remove { location, address: Some(address) } => {
      let (saved, dropped) = commands::remove_address(store, &location, &address).await?;
      if dropped {
        println!("{location:?} has no addresses left and was removed from the directory.");
      }
      saved
    }
    LocationsCommand::Remove { location, address: None } => {
      commands::edit_directory(store, |d| d.delete_location(&location)).await?
    }
    LocationsCommand::Rename { location, new_name, address: Some(address) } => {
      commands::edit_directory(store, |d| d.rename_address(&location, &address, &new_name))
        .await?
    }
    LocationsCommand::Rename { location, new_name, address: None } => {
      commands::edit_directory(store, |d| d.rename_location(&location, &new_name)).await?
    }
    LocationsCommand::Import { file } => {
      let text = std::fs::read_to_string(&file)
        .with_context(|| format!("reading {}", file.display()))?;
      let saved = commands::import_directory(store, &text).await?;
      if saved.is_empty() {
        bail!("{} contained no usable rows; directory is now empty", file.display());
      }
      saved
    }
  };
  println!("Directory saved ({} entries).", saved.len());
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn cli_is_well_formed() { Cli::command().debug_assert(); }

  #[test]
  fn config_defaults_to_config_yaml() {
    let cli = Cli::try_parse_from(["duty", "daily-report"]).unwrap();
    assert_eq!(cli.config, PathBuf::from("config.yaml"));
    assert!(matches!(cli.command, Some(Command::DailyReport { print: false })));
  }

  #[test]
  fn incident_takes_type_and_description() {
    let cli =
      Cli::try_parse_from(["duty", "--config", "x.yaml", "incident", "--type", "alert", "Smoke"])
        .unwrap();
    assert_eq!(cli.config, PathBuf::from("x.yaml"));
    match cli.command {
      Some(Command::Incident { kind, description }) => {
        assert_eq!(kind.as_deref(), Some("alert"));
        assert_eq!(description, "Smoke");
      }
      other => panic!("unexpected command: {other:?}"),
    }
  }

  #[test]
  fn missing_and_unknown_subcommands() {
    assert!(Cli::try_parse_from(["duty"]).unwrap().command.is_none());
    let err = Cli::try_parse_from(["duty", "frobnicate"]).unwrap_err();
    assert!(err.use_stderr());
    let help = Cli::try_parse_from(["duty", "--help"]).unwrap_err();
    assert!(!help.use_stderr());
  }

  #[test]
  fn status_parses_value() {
    let cli = Cli::try_parse_from(["duty", "status", "3", "closed"]).unwrap();
    assert!(matches!(
      cli.command,
      Some(Command::Status { id: 3, status: StatusArg::Closed, resolved_at: None, .. })
    ));
    assert!(Cli::try_parse_from(["duty", "status", "3", "pending"]).is_err());
  }
}
