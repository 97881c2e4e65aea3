//! What the operator types, and the checks it must pass before anything
//! reaches the store.
//!
//! Forms hold raw text. `validate` turns them into store inputs or returns
//! [`Error::Validation`]; a form that fails validation has no side effects.

use chrono::{Local, NaiveDate, NaiveDateTime, NaiveTime};

use crate::{
  Error, Result,
  directory::Directory,
  incident::{IncidentPatch, NO_TYPE, NewIncident, Status},
  normalize,
};

/// Date format shown to and typed by the operator.
pub const DATE_FORMAT: &str = "%d.%m.%Y";
/// Time format shown to and typed by the operator.
pub const TIME_FORMAT: &str = "%H:%M";
/// Timestamp format shown to and typed by the operator.
pub const DATETIME_FORMAT: &str = "%d.%m.%Y %H:%M";

pub fn parse_form_date(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s.trim(), DATE_FORMAT)
    .map_err(|_| Error::validation("invalid date, expected DD.MM.YYYY"))
}

pub fn parse_form_time(s: &str) -> Result<NaiveTime> {
  NaiveTime::parse_from_str(s.trim(), TIME_FORMAT)
    .map_err(|_| Error::validation("invalid time, expected HH:MM"))
}

/// `DD.MM.YYYY HH:MM`, or any timestamp the store itself accepts.
pub fn parse_form_datetime(s: &str) -> Result<NaiveDateTime> {
  NaiveDateTime::parse_from_str(s.trim(), DATETIME_FORMAT)
    .ok()
    .or_else(|| normalize::parse_datetime(s))
    .ok_or_else(|| Error::validation("invalid timestamp, expected DD.MM.YYYY HH:MM"))
}

/// Registry date filter. Blank means no filter.
pub fn parse_filter_date(s: &str) -> Result<Option<NaiveDate>> {
  if s.trim().is_empty() {
    Ok(None)
  } else {
    parse_form_date(s).map(Some)
  }
}

// ─── New incident ────────────────────────────────────────────────────────────

/// The create-incident form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IncidentForm {
  pub date:        String,
  pub time:        String,
  pub location:    String,
  pub address:     String,
  pub duty:        String,
  pub kind:        String,
  pub description: String,
}

impl IncidentForm {
  /// A form pre-filled with the current local date and time and the
  /// configured duty officer.
  pub fn prefilled(default_duty: &str) -> Self {
    let now = Local::now().naive_local();
    Self {
      date: now.format(DATE_FORMAT).to_string(),
      time: now.format(TIME_FORMAT).to_string(),
      duty: default_duty.to_owned(),
      ..Default::default()
    }
  }

  /// Check every field and build the store input.
  ///
  /// Location and address must both be selected and the address must be
  /// registered under the location in `directory`.
  pub fn validate(&self, directory: &Directory) -> Result<NewIncident> {
    let date = parse_form_date(&self.date)?;
    let time = parse_form_time(&self.time)?;

    let location = self.location.trim();
    let address = self.address.trim();
    if location.is_empty() {
      return Err(Error::validation("select a location"));
    }
    if address.is_empty() {
      return Err(Error::validation("select an address"));
    }
    if !directory.contains(location, address) {
      return Err(Error::validation(format!(
        "address {address:?} is not registered under {location:?}"
      )));
    }

    let description = self.description.trim();
    if description.is_empty() {
      return Err(Error::validation("description must not be empty"));
    }

    let kind = match self.kind.trim() {
      "" => NO_TYPE,
      k => k,
    };

    Ok(
      NewIncident::new(date, time, kind, description)
        .at(location, address)
        .on_duty(self.duty.trim()),
    )
  }
}

// ─── Status edit ─────────────────────────────────────────────────────────────

/// The edit-status form of the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusForm {
  pub status:      Status,
  /// Required when closing; ignored when reopening.
  pub resolved_at: String,
  /// `None` leaves the comment untouched.
  pub comment:     Option<String>,
}

impl StatusForm {
  /// Closing requires a resolution timestamp. Reopening clears it.
  pub fn validate(&self) -> Result<IncidentPatch> {
    let resolved_at = match self.status {
      Status::Closed => {
        if self.resolved_at.trim().is_empty() {
          return Err(Error::validation("closing an incident requires a resolution time"));
        }
        Some(parse_form_datetime(&self.resolved_at)?)
      }
      Status::Open => None,
    };

    Ok(IncidentPatch {
      status: Some(self.status),
      resolved_at: Some(resolved_at),
      comment: self.comment.as_ref().map(|c| c.trim().to_owned()),
      ..Default::default()
    })
  }
}
