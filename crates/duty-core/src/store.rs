//! The `IncidentStore` trait.
//!
//! Implemented by storage backends (e.g. `duty-store-sqlite`). The `duty`
//! binary drives its commands through this abstraction rather than a concrete
//! backend.

use std::future::Future;

use chrono::NaiveDate;

use crate::{
  directory::LocationEntry,
  incident::{Incident, IncidentPatch, NewIncident},
};

/// Sole authority over the incidents table and the location directory.
///
/// Every method completes its read or write before returning. Callers issue
/// one operation at a time; there is no internal locking beyond that.
pub trait IncidentStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Incidents ─────────────────────────────────────────────────────────

  /// All incidents in table order, schema-normalised.
  fn load_incidents(
    &self,
  ) -> impl Future<Output = Result<Vec<Incident>, Self::Error>> + Send + '_;

  /// Incidents dated `date`, in table order.
  fn incidents_on(
    &self,
    date: NaiveDate,
  ) -> impl Future<Output = Result<Vec<Incident>, Self::Error>> + Send + '_;

  /// Validate and append one incident, assigning its id when absent.
  /// Returns the record as stored.
  fn append_incident(
    &self,
    input: NewIncident,
  ) -> impl Future<Output = Result<Incident, Self::Error>> + Send + '_;

  /// Apply `patch` to incident `id`. Returns the record as stored.
  ///
  /// Reopening clears `resolved_at`. Closing without a timestamp is accepted
  /// here; the operator form is what requires one.
  fn update_incident(
    &self,
    id: u64,
    patch: IncidentPatch,
  ) -> impl Future<Output = Result<Incident, Self::Error>> + Send + '_;

  // ── Directory ─────────────────────────────────────────────────────────

  /// Sorted distinct location names.
  fn get_locations(
    &self,
  ) -> impl Future<Output = Result<Vec<String>, Self::Error>> + Send + '_;

  /// Sorted distinct addresses under `location`; empty when unknown.
  fn get_addresses<'a>(
    &'a self,
    location: &'a str,
  ) -> impl Future<Output = Result<Vec<String>, Self::Error>> + Send + 'a;

  fn load_locations(
    &self,
  ) -> impl Future<Output = Result<Vec<LocationEntry>, Self::Error>> + Send + '_;

  /// Replace the whole directory. Rows are trimmed and rows with a blank
  /// field are dropped. Returns the rows actually stored.
  fn save_locations(
    &self,
    entries: Vec<LocationEntry>,
  ) -> impl Future<Output = Result<Vec<LocationEntry>, Self::Error>> + Send + '_;
}
