//! Operator workflows, independent of argument parsing and printing.
//!
//! Each function validates first and touches the store only once the input
//! is known to be good, so a rejected command leaves nothing behind.

use anyhow::{Context as _, Result};
use chrono::NaiveDate;
use duty_core::{
  directory::{Directory, LocationEntry, parse_location_table},
  form::{IncidentForm, StatusForm, parse_filter_date},
  incident::{Incident, IncidentPatch},
  report,
  store::IncidentStore,
};
use duty_telegram::TelegramClient;

/// Outcome of a best-effort message delivery.
#[derive(Debug)]
pub enum Delivery {
  Sent,
  Failed(duty_telegram::Error),
}

/// Send `text` if a client could be built. A failure is reported, not
/// raised: callers that have already saved must not fail because of it.
pub async fn deliver(client: duty_telegram::Result<TelegramClient>, text: &str) -> Delivery {
  let result = match client {
    Ok(client) => client.send_message(text).await,
    Err(e) => Err(e),
  };
  match result {
    Ok(()) => Delivery::Sent,
    Err(e) => {
      tracing::warn!(error = %e, "message not delivered");
      Delivery::Failed(e)
    }
  }
}

// ─── Incidents ───────────────────────────────────────────────────────────────

/// Validate the create-incident form against the current directory and
/// append it.
pub async fn add_incident<S: IncidentStore>(store: &S, form: &IncidentForm) -> Result<Incident> {
  let directory = Directory::new(store.load_locations().await?);
  let input = form.validate(&directory)?;
  let incident = store.append_incident(input).await.context("saving incident")?;
  tracing::info!(id = ?incident.id, kind = %incident.kind, "incident recorded");
  Ok(incident)
}

/// The registry, optionally filtered by a `DD.MM.YYYY` date.
pub async fn registry<S: IncidentStore>(store: &S, date: Option<&str>) -> Result<Vec<Incident>> {
  match parse_filter_date(date.unwrap_or_default())? {
    Some(day) => Ok(store.incidents_on(day).await?),
    None => Ok(store.load_incidents().await?),
  }
}

pub async fn set_status<S: IncidentStore>(store: &S, id: u64, form: &StatusForm) -> Result<Incident> {
  let patch = form.validate()?;
  Ok(store.update_incident(id, patch).await?)
}

pub async fn set_comment<S: IncidentStore>(store: &S, id: u64, comment: &str) -> Result<Incident> {
  let patch = IncidentPatch { comment: Some(comment.trim().to_owned()), ..Default::default() };
  Ok(store.update_incident(id, patch).await?)
}

/// Today's digest (or `day`'s, when given).
pub async fn daily_report<S: IncidentStore>(store: &S, day: Option<NaiveDate>) -> Result<String> {
  let incidents = store.load_incidents().await.context("loading incidents for the report")?;
  Ok(match day {
    Some(day) => report::build_daily_report(&incidents, day),
    None => report::build_daily_report_now(&incidents),
  })
}

// ─── Directory ───────────────────────────────────────────────────────────────

/// Load the directory, apply `edit`, and save the result as one batch.
/// Returns the rows actually stored.
pub async fn edit_directory<S, F>(store: &S, edit: F) -> Result<Vec<LocationEntry>>
where
  S: IncidentStore,
  F: FnOnce(&mut Directory) -> duty_core::Result<()>,
{
  let mut directory = Directory::new(store.load_locations().await?);
  edit(&mut directory)?;
  Ok(store.save_locations(directory.into_entries()).await?)
}

/// Remove one address. The flag is set when the location went with it: a
/// location left without addresses is not stored.
pub async fn remove_address<S: IncidentStore>(
  store: &S,
  location: &str,
  address: &str,
) -> Result<(Vec<LocationEntry>, bool)> {
  let saved = edit_directory(store, |d| d.delete_address(location, address)).await?;
  let dropped = !saved.iter().any(|e| e.location == location);
  Ok((saved, dropped))
}

/// Replace the directory with the rows of a delimited table.
pub async fn import_directory<S: IncidentStore>(store: &S, text: &str) -> Result<Vec<LocationEntry>> {
  let entries = parse_location_table(text)?;
  Ok(store.save_locations(entries).await?)
}

/// `location add`: creates the location when needed.
pub fn add_place(directory: &mut Directory, location: &str, address: &str) -> duty_core::Result<()> {
  if !directory.has_location(location.trim()) {
    directory.add_location(location)?;
  }
  directory.add_address(location.trim(), address)
}

#[cfg(test)]
mod tests {
  use duty_core::incident::{NO_TYPE, Status};
  use duty_store_sqlite::SqliteStore;
  use duty_telegram::{ChatId, TelegramConfig};
  use tokio::net::TcpListener;

  use super::*;

  async fn store() -> SqliteStore {
    let s = SqliteStore::open_in_memory().await.unwrap();
    edit_directory(&s, |d| add_place(d, "Building A", "1 Main St"))
      .await
      .unwrap();
    s
  }

  fn form() -> IncidentForm {
    IncidentForm {
      date:        "01.03.2024".into(),
      time:        "14:30".into(),
      location:    "Building A".into(),
      address:     "1 Main St".into(),
      duty:        "Ivanov".into(),
      kind:        String::new(),
      description: "Router down".into(),
    }
  }

  #[tokio::test]
  async fn add_then_list() {
    let s = store().await;
    let saved = add_incident(&s, &form()).await.unwrap();
    assert_eq!(saved.id, Some(1));
    assert_eq!(saved.kind, NO_TYPE);

    assert_eq!(registry(&s, None).await.unwrap(), vec![saved.clone()]);
    assert_eq!(registry(&s, Some("01.03.2024")).await.unwrap(), vec![saved]);
    assert!(registry(&s, Some("02.03.2024")).await.unwrap().is_empty());
    assert!(registry(&s, Some("2024-03-02")).await.is_err());
  }

  #[tokio::test]
  async fn invalid_form_saves_nothing() {
    let s = store().await;
    let bad = IncidentForm { address: "9 Elm St".into(), ..form() };
    assert!(add_incident(&s, &bad).await.is_err());
    assert!(s.load_incidents().await.unwrap().is_empty());
  }

  #[tokio::test]
  async fn close_and_reopen() {
    let s = store().await;
    add_incident(&s, &form()).await.unwrap();

    let blank = StatusForm { status: Status::Closed, resolved_at: String::new(), comment: None };
    assert!(set_status(&s, 1, &blank).await.is_err());
    assert_eq!(s.load_incidents().await.unwrap()[0].status, Status::Open);

    let close = StatusForm {
      status:      Status::Closed,
      resolved_at: "01.03.2024 16:00".into(),
      comment:     Some("replaced PSU".into()),
    };
    let closed = set_status(&s, 1, &close).await.unwrap();
    assert_eq!(closed.status, Status::Closed);
    assert!(closed.resolved_at.is_some());

    let reopen = StatusForm { status: Status::Open, resolved_at: String::new(), comment: None };
    let reopened = set_status(&s, 1, &reopen).await.unwrap();
    assert_eq!(reopened.resolved_at, None);
    assert_eq!(reopened.comment, "replaced PSU");

    let commented = set_comment(&s, 1, " follow-up booked ").await.unwrap();
    assert_eq!(commented.comment, "follow-up booked");
    assert!(set_comment(&s, 9, "x").await.is_err());
  }

  #[tokio::test]
  async fn report_for_a_given_day() {
    let s = store().await;
    add_incident(&s, &form()).await.unwrap();
    let day = NaiveDate::from_ymd_opt(2024, 3, 1);
    let text = daily_report(&s, day).await.unwrap();
    assert_eq!(
      text,
      "Daily report for 01.03.2024\n\
       - 14:30 | No type | Building A, 1 Main St | Ivanov | OPEN | Router down"
    );
  }

  #[tokio::test]
  async fn directory_edits_are_saved_as_batch() {
    let s = store().await;
    let saved = edit_directory(&s, |d| {
      add_place(d, "Building A", "3 Main St")?;
      add_place(d, "Building B", "2 Oak Ave")
    })
    .await
    .unwrap();
    assert_eq!(saved.len(), 3);
    assert_eq!(s.get_addresses("Building A").await.unwrap(), vec!["1 Main St", "3 Main St"]);

    // Removing the only address drops the location on save.
    edit_directory(&s, |d| d.delete_address("Building B", "2 Oak Ave"))
      .await
      .unwrap();
    assert_eq!(s.get_locations().await.unwrap(), vec!["Building A"]);

    // A rejected edit leaves the stored directory alone.
    assert!(edit_directory(&s, |d| d.delete_location("Nowhere")).await.is_err());
    assert_eq!(s.load_locations().await.unwrap().len(), 2);
  }

  #[tokio::test]
  async fn removing_last_address_reports_dropped_location() {
    let s = store().await;
    edit_directory(&s, |d| add_place(d, "Building A", "3 Main St"))
      .await
      .unwrap();

    let (_, dropped) = remove_address(&s, "Building A", "3 Main St").await.unwrap();
    assert!(!dropped);
    let (saved, dropped) = remove_address(&s, "Building A", "1 Main St").await.unwrap();
    assert!(dropped);
    assert!(saved.is_empty());
    assert!(s.get_locations().await.unwrap().is_empty());
  }

  #[tokio::test]
  async fn import_replaces_directory() {
    let s = store().await;
    let saved = import_directory(&s, "location,address\nDepot,9 Yard Rd\n , \n")
      .await
      .unwrap();
    assert_eq!(saved, vec![LocationEntry::new("Depot", "9 Yard Rd")]);
    assert!(import_directory(&s, "name,street\nx,y\n").await.is_err());
    assert_eq!(s.get_locations().await.unwrap(), vec!["Depot"]);
  }

  #[tokio::test]
  async fn failed_delivery_after_save_is_not_an_error() {
    let s = store().await;
    let saved = add_incident(&s, &form()).await.unwrap();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    let client = TelegramClient::new(TelegramConfig {
      api_base: format!("http://{addr}"),
      token:    "t".into(),
      chat_id:  ChatId::Id(1),
    });

    let outcome = deliver(client, &report::format_incident_alert(&saved)).await;
    assert!(matches!(outcome, Delivery::Failed(duty_telegram::Error::Transport(_))));
    assert_eq!(s.load_incidents().await.unwrap(), vec![saved]);
  }

  #[tokio::test]
  async fn unconfigured_telegram_is_reported() {
    let client = TelegramClient::new(TelegramConfig {
      api_base: duty_telegram::DEFAULT_API_BASE.into(),
      token:    String::new(),
      chat_id:  ChatId::default(),
    });
    let outcome = deliver(client, "x").await;
    assert!(matches!(outcome, Delivery::Failed(duty_telegram::Error::NotConfigured(_))));
  }
}
