//! The boundary between stored rows and typed incidents.
//!
//! [`normalize`] maps a [`RawIncident`] into an [`Incident`]: ids become
//! positive integers, dates and times are parsed leniently and truncated to
//! whole seconds, unparseable values become `None`, a missing status becomes
//! [`Status::Open`]. [`Incident::to_raw`] writes the canonical encoding back
//! out. Normalising a canonical encoding yields the same record, so
//! normalisation is idempotent.

use chrono::{
  DateTime, NaiveDate, NaiveDateTime, NaiveTime, Timelike as _,
};

use crate::incident::{Incident, MAX_ID, RawIncident, Status};

/// Canonical stored date format.
pub const STORED_DATE: &str = "%Y-%m-%d";
/// Canonical stored time format.
pub const STORED_TIME: &str = "%H:%M:%S";
/// Canonical stored timestamp format.
pub const STORED_DATETIME: &str = "%Y-%m-%d %H:%M:%S";

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d.%m.%Y", "%Y/%m/%d"];

const TIME_FORMATS: &[&str] = &["%H:%M:%S", "%H:%M", "%H:%M:%S%.f"];

const DATETIME_FORMATS: &[&str] = &[
  "%Y-%m-%d %H:%M:%S",
  "%Y-%m-%dT%H:%M:%S",
  "%Y-%m-%d %H:%M:%S%.f",
  "%Y-%m-%dT%H:%M:%S%.f",
  "%Y-%m-%d %H:%M",
  "%Y-%m-%dT%H:%M",
  "%d.%m.%Y %H:%M:%S",
  "%d.%m.%Y %H:%M",
];

// ─── Cell parsers ────────────────────────────────────────────────────────────

fn non_blank(s: &str) -> Option<&str> {
  let s = s.trim();
  (!s.is_empty()).then_some(s)
}

/// A positive integer id no larger than [`MAX_ID`]. Integral floats
/// (`"3.0"`) are accepted since spreadsheets and SQLite `REAL` columns
/// produce them.
pub fn parse_id(s: &str) -> Option<u64> {
  let s = non_blank(s)?;
  if let Ok(n) = s.parse::<i64>() {
    return u64::try_from(n).ok().filter(|&n| n > 0);
  }
  let f = s.parse::<f64>().ok()?;
  (f.is_finite() && f.fract() == 0.0 && f >= 1.0 && f < MAX_ID as f64)
    .then_some(f as u64)
}

/// A timestamp in any of the accepted layouts. A bare date means midnight.
pub fn parse_datetime(s: &str) -> Option<NaiveDateTime> {
  let s = non_blank(s)?;
  let parsed = DATETIME_FORMATS
    .iter()
    .find_map(|f| NaiveDateTime::parse_from_str(s, f).ok())
    .or_else(|| DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.naive_local()))
    .or_else(|| {
      DATE_FORMATS
        .iter()
        .find_map(|f| NaiveDate::parse_from_str(s, f).ok())
        .and_then(|d| d.and_hms_opt(0, 0, 0))
    })?;
  parsed.with_nanosecond(0)
}

/// A calendar date; the date part of a timestamp is accepted too.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
  let s = non_blank(s)?;
  DATE_FORMATS
    .iter()
    .find_map(|f| NaiveDate::parse_from_str(s, f).ok())
    .or_else(|| parse_datetime(s).map(|dt| dt.date()))
}

/// A wall-clock time, truncated to whole seconds; the time part of a
/// timestamp is accepted too.
pub fn parse_time(s: &str) -> Option<NaiveTime> {
  let s = non_blank(s)?;
  TIME_FORMATS
    .iter()
    .find_map(|f| NaiveTime::parse_from_str(s, f).ok())
    .or_else(|| parse_datetime(s).map(|dt| dt.time()))
    .and_then(|t| t.with_nanosecond(0))
}

/// Unrecognised or missing statuses read as open.
fn parse_status(s: &str) -> Status { Status::parse(s).unwrap_or_default() }

// ─── Row mapping ─────────────────────────────────────────────────────────────

/// Map a stored row into a typed incident. Never fails: a bad cell becomes
/// `None` (or an empty string) without affecting the rest of the row.
pub fn normalize(raw: RawIncident) -> Incident {
  fn cell<T>(c: &Option<String>, parse: impl Fn(&str) -> Option<T>) -> Option<T> {
    c.as_deref().and_then(parse)
  }
  let text = |c: Option<String>| c.unwrap_or_default();

  Incident {
    id:          cell(&raw.id, parse_id),
    date:        cell(&raw.date, parse_date),
    time:        cell(&raw.time, parse_time),
    status:      raw.status.as_deref().map(parse_status).unwrap_or_default(),
    resolved_at: cell(&raw.resolved_at, parse_datetime),
    location:    text(raw.location),
    address:     text(raw.address),
    duty:        text(raw.duty),
    kind:        text(raw.kind),
    description: text(raw.description),
    comment:     text(raw.comment),
  }
}

/// Normalise a whole table, keeping row order.
pub fn normalize_table(rows: impl IntoIterator<Item = RawIncident>) -> Vec<Incident> {
  rows.into_iter().map(normalize).collect()
}

impl Incident {
  /// The canonical stored encoding of this record.
  pub fn to_raw(&self) -> RawIncident {
    RawIncident {
      id:          self.id.map(|id| id.to_string()),
      date:        self.date.map(|d| d.format(STORED_DATE).to_string()),
      time:        self.time.map(|t| t.format(STORED_TIME).to_string()),
      location:    Some(self.location.clone()),
      address:     Some(self.address.clone()),
      duty:        Some(self.duty.clone()),
      kind:        Some(self.kind.clone()),
      description: Some(self.description.clone()),
      status:      Some(self.status.as_str().to_owned()),
      resolved_at: self
        .resolved_at
        .map(|dt| dt.format(STORED_DATETIME).to_string()),
      comment:     Some(self.comment.clone()),
    }
  }
}
