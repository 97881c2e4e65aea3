//! The location directory: which addresses exist under which location.
//!
//! Stored as flat `(location, address)` rows. [`Directory`] is the in-memory
//! editor used before a batch save; [`clean_entries`] is the filter every
//! batch save goes through.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Column names of the locations table.
pub const LOCATION_COLUMNS: [&str; 2] = ["location", "address"];

/// One directory row. An empty `address` marks a location that currently has
/// no addresses.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LocationEntry {
  pub location: String,
  pub address:  String,
}

impl LocationEntry {
  pub fn new(location: impl Into<String>, address: impl Into<String>) -> Self {
    Self { location: location.into(), address: address.into() }
  }

  fn is_placeholder(&self) -> bool { self.address.trim().is_empty() }
}

/// Trim both fields and drop rows where either is blank.
pub fn clean_entries(entries: impl IntoIterator<Item = LocationEntry>) -> Vec<LocationEntry> {
  entries
    .into_iter()
    .map(|e| LocationEntry::new(e.location.trim(), e.address.trim()))
    .filter(|e| !e.location.is_empty() && !e.address.is_empty())
    .collect()
}

/// Sorted distinct non-empty location names.
pub fn locations<'a>(entries: impl IntoIterator<Item = &'a LocationEntry>) -> Vec<String> {
  entries
    .into_iter()
    .map(|e| e.location.as_str())
    .filter(|l| !l.is_empty())
    .collect::<BTreeSet<_>>()
    .into_iter()
    .map(str::to_owned)
    .collect()
}

/// Sorted distinct non-empty addresses under `location`. Empty for an empty or
/// unknown location.
pub fn addresses<'a>(
  entries: impl IntoIterator<Item = &'a LocationEntry>,
  location: &str,
) -> Vec<String> {
  if location.is_empty() {
    return Vec::new();
  }
  entries
    .into_iter()
    .filter(|e| e.location == location && !e.address.is_empty())
    .map(|e| e.address.as_str())
    .collect::<BTreeSet<_>>()
    .into_iter()
    .map(str::to_owned)
    .collect()
}

// ─── Editor ──────────────────────────────────────────────────────────────────

/// In-memory directory editor.
///
/// Edits never touch storage. The caller persists [`Directory::into_entries`]
/// as one batch, at which point placeholder rows are dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Directory {
  entries: Vec<LocationEntry>,
}

impl Directory {
  pub fn new(entries: Vec<LocationEntry>) -> Self { Self { entries } }

  pub fn entries(&self) -> &[LocationEntry] { &self.entries }

  pub fn into_entries(self) -> Vec<LocationEntry> { self.entries }

  pub fn locations(&self) -> Vec<String> { locations(&self.entries) }

  pub fn addresses(&self, location: &str) -> Vec<String> {
    addresses(&self.entries, location)
  }

  pub fn has_location(&self, location: &str) -> bool {
    self.entries.iter().any(|e| e.location == location)
  }

  pub fn contains(&self, location: &str, address: &str) -> bool {
    self
      .entries
      .iter()
      .any(|e| e.location == location && e.address == address)
  }

  /// Add a location with no addresses yet.
  pub fn add_location(&mut self, name: &str) -> Result<()> {
    let name = required("location", name)?;
    if self.has_location(name) {
      return Err(Error::validation(format!("location {name:?} already exists")));
    }
    self.entries.push(LocationEntry::new(name, ""));
    Ok(())
  }

  /// Rename a location, carrying all of its addresses along.
  pub fn rename_location(&mut self, old: &str, new: &str) -> Result<()> {
    let new = required("location", new)?;
    self.require_location(old)?;
    if old != new && self.has_location(new) {
      return Err(Error::validation(format!("location {new:?} already exists")));
    }
    for e in self.entries.iter_mut().filter(|e| e.location == old) {
      e.location = new.to_owned();
    }
    Ok(())
  }

  /// Remove a location and every address under it.
  pub fn delete_location(&mut self, name: &str) -> Result<()> {
    self.require_location(name)?;
    self.entries.retain(|e| e.location != name);
    Ok(())
  }

  pub fn add_address(&mut self, location: &str, address: &str) -> Result<()> {
    let address = required("address", address)?;
    self.require_location(location)?;
    if self.contains(location, address) {
      return Err(Error::validation(format!(
        "address {address:?} already exists under {location:?}"
      )));
    }
    // The first real address takes over the placeholder row.
    self
      .entries
      .retain(|e| !(e.location == location && e.is_placeholder()));
    self.entries.push(LocationEntry::new(location, address));
    Ok(())
  }

  pub fn rename_address(&mut self, location: &str, old: &str, new: &str) -> Result<()> {
    let new = required("address", new)?;
    self.require_address(location, old)?;
    if old != new && self.contains(location, new) {
      return Err(Error::validation(format!(
        "address {new:?} already exists under {location:?}"
      )));
    }
    for e in self
      .entries
      .iter_mut()
      .filter(|e| e.location == location && e.address == old)
    {
      e.address = new.to_owned();
    }
    Ok(())
  }

  /// Remove one address. Removing the last address under a location leaves a
  /// placeholder row so the location itself survives until removed
  /// explicitly.
  pub fn delete_address(&mut self, location: &str, address: &str) -> Result<()> {
    self.require_address(location, address)?;
    self
      .entries
      .retain(|e| !(e.location == location && e.address == address));
    if !self.has_location(location) {
      self.entries.push(LocationEntry::new(location, ""));
    }
    Ok(())
  }

  fn require_location(&self, location: &str) -> Result<()> {
    if self.has_location(location) {
      Ok(())
    } else {
      Err(Error::validation(format!("unknown location {location:?}")))
    }
  }

  fn require_address(&self, location: &str, address: &str) -> Result<()> {
    self.require_location(location)?;
    if self.contains(location, address) {
      Ok(())
    } else {
      Err(Error::validation(format!(
        "unknown address {address:?} under {location:?}"
      )))
    }
  }
}

fn required<'a>(field: &str, value: &'a str) -> Result<&'a str> {
  let value = value.trim();
  if value.is_empty() {
    Err(Error::validation(format!("{field} must not be blank")))
  } else {
    Ok(value)
  }
}

// ─── Tabular import ──────────────────────────────────────────────────────────

/// Parse a delimited table (comma, semicolon or tab, chosen from the header
/// line) with `location` and `address` columns in any position.
///
/// Other columns are ignored. Rows are returned as read; blank rows are left
/// for [`clean_entries`] to drop.
pub fn parse_location_table(text: &str) -> Result<Vec<LocationEntry>> {
  let header = text.lines().next().unwrap_or_default();
  let delimiter = [b'\t', b';']
    .into_iter()
    .find(|d| header.as_bytes().contains(d))
    .unwrap_or(b',');

  let mut reader = csv::ReaderBuilder::new()
    .delimiter(delimiter)
    .flexible(true)
    .trim(csv::Trim::All)
    .from_reader(text.as_bytes());

  let headers = reader
    .headers()
    .map_err(|e| Error::validation(format!("unreadable location table: {e}")))?
    .clone();
  let column = |name: &str| {
    headers
      .iter()
      .position(|h| h.eq_ignore_ascii_case(name))
      .ok_or_else(|| {
        Error::validation(format!(
          "location table must have columns: {}",
          LOCATION_COLUMNS.join(", ")
        ))
      })
  };
  let (loc_idx, addr_idx) = (column("location")?, column("address")?);

  reader
    .records()
    .map(|record| {
      let record = record
        .map_err(|e| Error::validation(format!("unreadable location table: {e}")))?;
      Ok(LocationEntry::new(
        record.get(loc_idx).unwrap_or_default(),
        record.get(addr_idx).unwrap_or_default(),
      ))
    })
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;

  fn dir() -> Directory {
    Directory::new(vec![
      LocationEntry::new("Building A", "1 Main St"),
      LocationEntry::new("Building A", "3 Main St"),
      LocationEntry::new("Building B", "2 Oak Ave"),
    ])
  }

  #[test]
  fn clean_trims_and_drops_blanks() {
    let cleaned = clean_entries(vec![
      LocationEntry::new("  Building A ", " 1 Main St"),
      LocationEntry::new("Building B", "   "),
      LocationEntry::new("", "2 Oak Ave"),
    ]);
    assert_eq!(cleaned, vec![LocationEntry::new("Building A", "1 Main St")]);
  }

  #[test]
  fn lookups_are_sorted_and_distinct() {
    let mut entries = dir().into_entries();
    entries.push(LocationEntry::new("Building A", "1 Main St"));
    entries.push(LocationEntry::new("Annex", ""));
    assert_eq!(locations(&entries), vec!["Annex", "Building A", "Building B"]);
    assert_eq!(addresses(&entries, "Building A"), vec!["1 Main St", "3 Main St"]);
    assert!(addresses(&entries, "Annex").is_empty());
    assert!(addresses(&entries, "Nowhere").is_empty());
    assert!(addresses(&entries, "").is_empty());
  }

  #[test]
  fn deleting_last_address_leaves_placeholder() {
    let mut d = dir();
    d.delete_address("Building B", "2 Oak Ave").unwrap();
    assert!(d.has_location("Building B"));
    assert!(d.addresses("Building B").is_empty());
    assert!(d.contains("Building B", ""));

    // The placeholder never reaches storage.
    let saved = clean_entries(d.into_entries());
    assert!(saved.iter().all(|e| e.location != "Building B"));
  }

  #[test]
  fn first_address_replaces_placeholder() {
    let mut d = Directory::default();
    d.add_location("Depot").unwrap();
    d.add_address("Depot", "9 Yard Rd").unwrap();
    assert_eq!(d.entries(), &[LocationEntry::new("Depot", "9 Yard Rd")]);
  }

  #[test]
  fn rename_location_moves_addresses() {
    let mut d = dir();
    d.rename_location("Building A", "HQ").unwrap();
    assert_eq!(d.addresses("HQ"), vec!["1 Main St", "3 Main St"]);
    assert!(!d.has_location("Building A"));
    assert!(d.rename_location("HQ", "Building B").is_err());
  }

  #[test]
  fn editor_rejects_bad_input() {
    let mut d = dir();
    assert!(matches!(d.add_location("  "), Err(Error::Validation(_))));
    assert!(d.add_location("Building A").is_err());
    assert!(d.add_address("Nowhere", "x").is_err());
    assert!(d.add_address("Building A", "1 Main St").is_err());
    assert!(d.delete_address("Building A", "7 Main St").is_err());
    assert!(d.rename_address("Building A", "1 Main St", "3 Main St").is_err());
    assert!(d.delete_location("Nowhere").is_err());
  }

  #[test]
  fn rename_and_delete_address() {
    let mut d = dir();
    d.rename_address("Building A", "3 Main St", "5 Main St").unwrap();
    assert_eq!(d.addresses("Building A"), vec!["1 Main St", "5 Main St"]);
    d.delete_address("Building A", "1 Main St").unwrap();
    assert_eq!(d.addresses("Building A"), vec!["5 Main St"]);
    assert!(!d.contains("Building A", ""));
  }

  #[test]
  fn parse_table_finds_columns_by_name() {
    let text = "address;note;location\n1 Main St;x;Building A\n;;Building B\n";
    let rows = parse_location_table(text).unwrap();
    assert_eq!(rows, vec![
      LocationEntry::new("Building A", "1 Main St"),
      LocationEntry::new("Building B", ""),
    ]);
  }

  #[test]
  fn parse_table_requires_both_columns() {
    let err = parse_location_table("location,street\nA,1\n").unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
    assert!(parse_location_table("").is_err());
  }
}
