//! Incident records: the stored row shape, the typed record, and the inputs
//! accepted by the store for creation and update.
//!
//! Rows cross the storage boundary as [`RawIncident`] and become
//! [`Incident`] only through [`crate::normalize::normalize`].

use std::fmt;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Canonical column order of the incidents table.
pub const INCIDENT_COLUMNS: [&str; 11] = [
  "id",
  "date",
  "time",
  "location",
  "address",
  "duty",
  "type",
  "description",
  "status",
  "resolved_at",
  "comment",
];

/// Columns of the legacy incidents table, before location and disposition
/// were tracked.
pub const LEGACY_INCIDENT_COLUMNS: [&str; 5] =
  ["date", "time", "duty", "type", "description"];

/// Incident types offered to the operator. The field itself is free text.
pub const SUGGESTED_TYPES: [&str; 4] =
  ["Service outage", "Security incident", "Alert", "Other"];

/// Type recorded when the operator leaves the field blank.
pub const NO_TYPE: &str = "No type";

// ─── Status ──────────────────────────────────────────────────────────────────

/// Disposition of an incident.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum Status {
  #[default]
  Open,
  Closed,
}

impl Status {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Open => "OPEN",
      Self::Closed => "CLOSED",
    }
  }

  /// Case-insensitive parse of `open` / `closed`.
  pub fn parse(s: &str) -> Option<Self> {
    match s.trim().to_ascii_lowercase().as_str() {
      "open" => Some(Self::Open),
      "closed" => Some(Self::Closed),
      _ => None,
    }
  }
}

impl fmt::Display for Status {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

// ─── Rows ────────────────────────────────────────────────────────────────────

/// One incidents-table row exactly as stored: every cell is optional text.
///
/// Nothing about a `RawIncident` is trusted. Cells may be missing (legacy
/// tables), blank, or hold values that do not parse.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawIncident {
  pub id:          Option<String>,
  pub date:        Option<String>,
  pub time:        Option<String>,
  pub location:    Option<String>,
  pub address:     Option<String>,
  pub duty:        Option<String>,
  pub kind:        Option<String>,
  pub description: Option<String>,
  pub status:      Option<String>,
  pub resolved_at: Option<String>,
  pub comment:     Option<String>,
}

/// A schema-normalised incident.
///
/// `id`, `date`, `time` and `resolved_at` are `None` when the stored value was
/// absent or did not parse. Text cells that were absent become empty strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Incident {
  pub id:          Option<u64>,
  pub date:        Option<NaiveDate>,
  pub time:        Option<NaiveTime>,
  pub location:    String,
  pub address:     String,
  pub duty:        String,
  #[serde(rename = "type")]
  pub kind:        String,
  pub description: String,
  pub status:      Status,
  pub resolved_at: Option<NaiveDateTime>,
  pub comment:     String,
}

// ─── Inputs ──────────────────────────────────────────────────────────────────

/// Input for [`crate::store::IncidentStore::append_incident`].
///
/// The store assigns `id` when it is `None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewIncident {
  pub id:          Option<u64>,
  pub date:        NaiveDate,
  pub time:        NaiveTime,
  pub location:    String,
  pub address:     String,
  pub duty:        String,
  pub kind:        String,
  pub description: String,
  pub status:      Status,
  pub resolved_at: Option<NaiveDateTime>,
  pub comment:     String,
}

impl NewIncident {
  /// An open incident with no location, no comment and no resolution.
  pub fn new(
    date: NaiveDate,
    time: NaiveTime,
    kind: impl Into<String>,
    description: impl Into<String>,
  ) -> Self {
    Self {
      id: None,
      date,
      time,
      location: String::new(),
      address: String::new(),
      duty: String::new(),
      kind: kind.into(),
      description: description.into(),
      status: Status::Open,
      resolved_at: None,
      comment: String::new(),
    }
  }

  pub fn at(mut self, location: impl Into<String>, address: impl Into<String>) -> Self {
    self.location = location.into();
    self.address = address.into();
    self
  }

  pub fn on_duty(mut self, duty: impl Into<String>) -> Self {
    self.duty = duty.into();
    self
  }

  /// The record as it will be stored under `id`.
  pub fn into_incident(self, id: u64) -> Incident {
    Incident {
      id:          Some(id),
      date:        Some(self.date),
      time:        Some(self.time),
      location:    self.location,
      address:     self.address,
      duty:        self.duty,
      kind:        self.kind,
      description: self.description,
      status:      self.status,
      resolved_at: self.resolved_at,
      comment:     self.comment,
    }
  }
}

/// Changes accepted by [`crate::store::IncidentStore::update_incident`].
///
/// Every other field is write-once. `date` and `time` are accepted as text so
/// the store can re-parse them with the same rules it applies on load.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IncidentPatch {
  pub status:      Option<Status>,
  pub comment:     Option<String>,
  /// `Some(None)` clears the resolution timestamp.
  pub resolved_at: Option<Option<NaiveDateTime>>,
  pub date:        Option<String>,
  pub time:        Option<String>,
}

impl IncidentPatch {
  pub fn is_empty(&self) -> bool { *self == Self::default() }
}

// ─── Id assignment ───────────────────────────────────────────────────────────

/// Largest id the store can hold; ids are SQLite `INTEGER`s.
pub const MAX_ID: u64 = i64::MAX as u64;

/// One past the largest id in `incidents`, or 1 when no row carries an id.
/// Gaps are never reused.
pub fn next_id<'a>(incidents: impl IntoIterator<Item = &'a Incident>) -> Result<u64> {
  match incidents.into_iter().filter_map(|i| i.id).max() {
    Some(max) => id_after(max),
    None => Ok(1),
  }
}

/// `id + 1`, unless that would pass [`MAX_ID`].
pub fn id_after(id: u64) -> Result<u64> {
  if id >= MAX_ID {
    Err(Error::validation(format!("no incident id is available after {id}")))
  } else {
    Ok(id + 1)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn with_id(id: Option<u64>) -> Incident {
    let mut incident = NewIncident::new(
      NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
      NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
      "Alert",
      "x",
    )
    .into_incident(0);
    incident.id = id;
    incident
  }

  #[test]
  fn next_id_on_empty_table_is_one() {
    assert_eq!(next_id(&Vec::<Incident>::new()).unwrap(), 1);
  }

  #[test]
  fn next_id_when_all_ids_null_is_one() {
    let rows = vec![with_id(None), with_id(None)];
    assert_eq!(next_id(&rows).unwrap(), 1);
  }

  #[test]
  fn next_id_ignores_gaps() {
    let rows = vec![with_id(Some(1)), with_id(None), with_id(Some(7)), with_id(Some(3))];
    assert_eq!(next_id(&rows).unwrap(), 8);
  }

  #[test]
  fn next_id_stops_at_max_id() {
    let rows = vec![with_id(Some(MAX_ID - 1))];
    assert_eq!(next_id(&rows).unwrap(), MAX_ID);
    let rows = vec![with_id(Some(MAX_ID))];
    assert!(matches!(next_id(&rows), Err(Error::Validation(_))));
    assert!(id_after(u64::MAX).is_err());
  }

  #[test]
  fn status_parse_is_case_insensitive() {
    assert_eq!(Status::parse(" Closed "), Some(Status::Closed));
    assert_eq!(Status::parse("OPEN"), Some(Status::Open));
    assert_eq!(Status::parse("pending"), None);
  }

  #[test]
  fn empty_patch() {
    assert!(IncidentPatch::default().is_empty());
    let patch = IncidentPatch { comment: Some("noted".into()), ..Default::default() };
    assert!(!patch.is_empty());
  }
}
