//! [`SqliteStore`]: the SQLite implementation of [`IncidentStore`].

use std::path::Path;

use chrono::NaiveDate;
use duty_core::{
  directory::{self, LocationEntry, clean_entries},
  incident::{Incident, IncidentPatch, MAX_ID, NewIncident, Status, next_id},
  normalize::{normalize_table, parse_date, parse_time},
  store::IncidentStore,
};

use crate::{
  Error, Result,
  encode::{read_incidents, read_locations, write_incidents, write_locations},
  schema::migrate,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// The incident log backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open the store at `path`, creating the file and its parent directories
  /// on first use, and migrate it to the current schema.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
      std::fs::create_dir_all(parent).map_err(|source| Error::CreateDir {
        path: parent.to_path_buf(),
        source,
      })?;
    }
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    tracing::debug!(path = %path.display(), "store opened");
    Ok(store)
  }

  /// Open an in-memory store, for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        migrate(conn)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── Validation ──────────────────────────────────────────────────────────────

/// Check `input` against the current table and directory and build the row to
/// append.
fn admit(
  incidents: &[Incident],
  locations: &[LocationEntry],
  input: NewIncident,
) -> duty_core::Result<Incident> {
  if input.description.trim().is_empty() {
    return Err(duty_core::Error::validation("description must not be empty"));
  }

  let location = input.location.as_str();
  let address = input.address.as_str();
  if !location.is_empty() && !directory::locations(locations).iter().any(|l| l == location) {
    return Err(duty_core::Error::validation(format!("unknown location {location:?}")));
  }
  if !address.is_empty() && !directory::addresses(locations, location).iter().any(|a| a == address) {
    return Err(duty_core::Error::validation(format!(
      "address {address:?} is not registered under {location:?}"
    )));
  }

  let id = match input.id {
    Some(0) => return Err(duty_core::Error::validation("incident id must be positive")),
    Some(id) if id > MAX_ID => {
      return Err(duty_core::Error::validation(format!("incident id {id} exceeds {MAX_ID}")));
    }
    Some(id) if incidents.iter().any(|i| i.id == Some(id)) => {
      return Err(duty_core::Error::validation(format!("incident id {id} is already taken")));
    }
    Some(id) => id,
    None => next_id(incidents)?,
  };

  Ok(input.into_incident(id))
}

/// Apply `patch` to one record. Date and time strings are re-parsed with the
/// load rules; a blank string clears the field.
fn apply_patch(incident: &mut Incident, patch: &IncidentPatch) -> duty_core::Result<()> {
  if let Some(date) = &patch.date {
    incident.date = match date.trim() {
      "" => None,
      s => Some(
        parse_date(s)
          .ok_or_else(|| duty_core::Error::validation(format!("invalid date {s:?}")))?,
      ),
    };
  }
  if let Some(time) = &patch.time {
    incident.time = match time.trim() {
      "" => None,
      s => Some(
        parse_time(s)
          .ok_or_else(|| duty_core::Error::validation(format!("invalid time {s:?}")))?,
      ),
    };
  }
  if let Some(comment) = &patch.comment {
    incident.comment = comment.clone();
  }
  if let Some(resolved_at) = patch.resolved_at {
    incident.resolved_at = resolved_at;
  }
  if let Some(status) = patch.status {
    incident.status = status;
    if status == Status::Open {
      incident.resolved_at = None;
    }
  }
  Ok(())
}

// ─── IncidentStore impl ──────────────────────────────────────────────────────

impl IncidentStore for SqliteStore {
  type Error = Error;

  // ── Incidents ─────────────────────────────────────────────────────────────

  async fn load_incidents(&self) -> Result<Vec<Incident>> {
    let raws = self
      .conn
      .call(|conn| Ok(read_incidents(conn)?))
      .await?;
    Ok(normalize_table(raws))
  }

  async fn incidents_on(&self, date: NaiveDate) -> Result<Vec<Incident>> {
    let mut incidents = self.load_incidents().await?;
    incidents.retain(|i| i.date == Some(date));
    Ok(incidents)
  }

  async fn append_incident(&self, input: NewIncident) -> Result<Incident> {
    let outcome = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let mut incidents = normalize_table(read_incidents(&tx)?);
        let locations = read_locations(&tx)?;

        let incident = match admit(&incidents, &locations, input) {
          Ok(incident) => incident,
          Err(e) => return Ok(Err(e)),
        };

        incidents.push(incident.clone());
        write_incidents(&tx, &incidents)?;
        tx.commit()?;
        Ok(Ok(incident))
      })
      .await?;

    let incident = outcome?;
    tracing::debug!(id = ?incident.id, "incident appended");
    Ok(incident)
  }

  async fn update_incident(&self, id: u64, patch: IncidentPatch) -> Result<Incident> {
    let outcome = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let mut incidents = normalize_table(read_incidents(&tx)?);

        let mut updated = None;
        for incident in incidents.iter_mut().filter(|i| i.id == Some(id)) {
          if let Err(e) = apply_patch(incident, &patch) {
            return Ok(Err(e));
          }
          updated.get_or_insert_with(|| incident.clone());
        }
        let Some(updated) = updated else {
          return Ok(Err(duty_core::Error::IncidentNotFound(id)));
        };

        write_incidents(&tx, &incidents)?;
        tx.commit()?;
        Ok(Ok(updated))
      })
      .await?;

    let incident = outcome?;
    tracing::debug!(id, status = %incident.status, "incident updated");
    Ok(incident)
  }

  // ── Directory ─────────────────────────────────────────────────────────────

  async fn get_locations(&self) -> Result<Vec<String>> {
    let entries = self.load_locations().await?;
    Ok(directory::locations(&entries))
  }

  async fn get_addresses(&self, location: &str) -> Result<Vec<String>> {
    if location.is_empty() {
      return Ok(Vec::new());
    }
    let entries = self.load_locations().await?;
    Ok(directory::addresses(&entries, location))
  }

  async fn load_locations(&self) -> Result<Vec<LocationEntry>> {
    let entries = self
      .conn
      .call(|conn| Ok(read_locations(conn)?))
      .await?;
    Ok(entries)
  }

  async fn save_locations(&self, entries: Vec<LocationEntry>) -> Result<Vec<LocationEntry>> {
    let cleaned = clean_entries(entries);
    let rows = cleaned.clone();
    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        write_locations(&tx, &rows)?;
        tx.commit()?;
        Ok(())
      })
      .await?;
    tracing::debug!(rows = cleaned.len(), "directory saved");
    Ok(cleaned)
  }
}
