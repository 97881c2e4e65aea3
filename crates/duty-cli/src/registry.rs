//! Plain-text rendering of the incident registry and the directory.

use duty_core::{
  directory::LocationEntry,
  form::{DATE_FORMAT, DATETIME_FORMAT, TIME_FORMAT},
  incident::Incident,
};

const HEADERS: [&str; 10] = [
  "ID", "Date", "Time", "Location", "Address", "Duty", "Type", "Status", "Resolved",
  "Description",
];

fn cells(i: &Incident) -> [String; 10] {
  [
    i.id.map(|id| id.to_string()).unwrap_or_default(),
    i.date.map(|d| d.format(DATE_FORMAT).to_string()).unwrap_or_default(),
    i.time.map(|t| t.format(TIME_FORMAT).to_string()).unwrap_or_default(),
    i.location.clone(),
    i.address.clone(),
    i.duty.clone(),
    i.kind.clone(),
    i.status.to_string(),
    i.resolved_at
      .map(|dt| dt.format(DATETIME_FORMAT).to_string())
      .unwrap_or_default(),
    i.description.replace('\n', " "),
  ]
}

fn aligned<S: AsRef<str>>(cells: impl IntoIterator<Item = S>, widths: &[usize]) -> String {
  let padded: Vec<String> = cells
    .into_iter()
    .zip(widths)
    .map(|(c, &w)| format!("{:<w$}", c.as_ref()))
    .collect();
  padded.join("  ").trim_end().to_owned()
}

/// Aligned columns, one incident per line. Comments follow on an indented
/// line of their own.
pub fn render_incidents(incidents: &[Incident]) -> String {
  if incidents.is_empty() {
    return "No incidents.".to_owned();
  }

  let rows: Vec<[String; 10]> = incidents.iter().map(cells).collect();
  let mut widths = HEADERS.map(|h| h.chars().count());
  for row in &rows {
    for (w, cell) in widths.iter_mut().zip(row) {
      *w = (*w).max(cell.chars().count());
    }
  }

  let mut out = vec![aligned(HEADERS, &widths)];
  for (row, incident) in rows.iter().zip(incidents) {
    out.push(aligned(row, &widths));
    if !incident.comment.is_empty() {
      out.push(format!("    comment: {}", incident.comment));
    }
  }
  out.join("\n")
}

/// `location: address` lines grouped by location.
pub fn render_directory(entries: &[LocationEntry]) -> String {
  if entries.is_empty() {
    return "No locations.".to_owned();
  }
  let mut sorted = entries.to_vec();
  sorted.sort();
  sorted
    .iter()
    .map(|e| format!("{}: {}", e.location, e.address))
    .collect::<Vec<_>>()
    .join("\n")
}

#[cfg(test)]
mod tests {
  use chrono::{NaiveDate, NaiveTime};
  use duty_core::incident::NewIncident;

  use super::*;

  #[test]
  fn columns_are_aligned() {
    let mut a = NewIncident::new(
      NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
      NaiveTime::from_hms_opt(14, 30, 0).unwrap(),
      "Service outage",
      "Router down",
    )
    .at("Building A", "1 Main St")
    .on_duty("Ivanov")
    .into_incident(1);
    a.comment = "vendor called".into();
    let mut b = a.clone();
    b.id = Some(12);
    b.time = None;
    b.comment.clear();

    let text = render_incidents(&[a, b]);
    let lines: Vec<_> = text.lines().collect();
    assert_eq!(lines.len(), 4);
    assert!(lines[0].starts_with("ID  Date"));
    assert!(lines[1].starts_with("1   01.03.2024  14:30"));
    assert_eq!(lines[2], "    comment: vendor called");
    assert!(lines[3].starts_with("12  01.03.2024         Building A"));
    let desc_col = lines[0].find("Description").unwrap();
    assert_eq!(lines[1].find("Router down"), Some(desc_col));
    assert_eq!(lines[3].find("Router down"), Some(desc_col));
  }

  #[test]
  fn empty_views() {
    assert_eq!(render_incidents(&[]), "No incidents.");
    assert_eq!(render_directory(&[]), "No locations.");
  }

  #[test]
  fn directory_is_sorted() {
    let text = render_directory(&[
      LocationEntry::new("B", "2"),
      LocationEntry::new("A", "9"),
      LocationEntry::new("A", "1"),
    ]);
    assert_eq!(text, "A: 1\nA: 9\nB: 2");
  }
}
