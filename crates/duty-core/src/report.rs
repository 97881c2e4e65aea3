//! Message texts: the daily digest and single-incident alerts.

use chrono::{Local, NaiveDate};

use crate::{
  form::{DATE_FORMAT, TIME_FORMAT},
  incident::{Incident, NO_TYPE},
};

/// Second line of a digest with nothing to report.
pub const NO_INCIDENTS: &str = "No incidents recorded.";

pub fn report_title(day: NaiveDate) -> String {
  format!("Daily report for {}", day.format(DATE_FORMAT))
}

/// The digest of every incident dated `today`, in the order given.
///
/// ```text
/// Daily report for 01.03.2024
/// - 14:30 | Service outage | Building A, 1 Main St | Ivanov | OPEN | Router down
/// ```
pub fn build_daily_report(incidents: &[Incident], today: NaiveDate) -> String {
  let mut lines = vec![report_title(today)];
  lines.extend(
    incidents
      .iter()
      .filter(|i| i.date == Some(today))
      .map(format_report_line),
  );
  if lines.len() == 1 {
    lines.push(NO_INCIDENTS.to_owned());
  }
  lines.join("\n")
}

/// [`build_daily_report`] for the local calendar date.
pub fn build_daily_report_now(incidents: &[Incident]) -> String {
  build_daily_report(incidents, Local::now().date_naive())
}

/// One digest line: time, type, place, duty officer, status, description.
pub fn format_report_line(incident: &Incident) -> String {
  let time = incident
    .time
    .map_or_else(|| "-".to_owned(), |t| t.format(TIME_FORMAT).to_string());

  let mut fields = vec![time, incident.kind.clone()];
  if let Some(place) = place(incident) {
    fields.push(place);
  }
  fields.push(incident.duty.clone());
  fields.push(incident.status.to_string());
  fields.push(incident.description.clone());

  format!("- {}", fields.join(" | "))
}

/// The alert sent right after an incident is saved.
pub fn format_incident_alert(incident: &Incident) -> String {
  let date = incident
    .date
    .map_or_else(|| "-".to_owned(), |d| d.format(DATE_FORMAT).to_string());
  let time = incident
    .time
    .map_or_else(|| "-".to_owned(), |t| t.format(TIME_FORMAT).to_string());

  let mut lines = vec![
    "INCIDENT".to_owned(),
    format!("Date: {date}"),
    format!("Time: {time}"),
  ];
  if let Some(place) = place(incident) {
    lines.push(format!("Location: {place}"));
  }
  lines.push(format!("Duty: {}", incident.duty));
  lines.push(format!("Type: {}", incident.kind));
  lines.push(format!("Description: {}", incident.description));
  lines.join("\n")
}

/// An unrecorded alert: type and description only.
pub fn format_adhoc_alert(kind: Option<&str>, description: &str) -> String {
  let kind = kind.map(str::trim).filter(|k| !k.is_empty()).unwrap_or(NO_TYPE);
  format!("INCIDENT: {kind}\n{description}")
}

fn place(incident: &Incident) -> Option<String> {
  match (incident.location.as_str(), incident.address.as_str()) {
    ("", "") => None,
    (loc, "") => Some(loc.to_owned()),
    ("", addr) => Some(addr.to_owned()),
    (loc, addr) => Some(format!("{loc}, {addr}")),
  }
}
