//! Reading and writing whole tables.
//!
//! Incident rows are read as [`RawIncident`] (every cell cast to text, so a
//! number typed into a text column or vice versa still loads) and written from
//! the canonical encoding of [`Incident::to_raw`]. Each writer replaces one
//! table and leaves the other untouched.

use duty_core::{
  directory::LocationEntry,
  incident::{Incident, RawIncident},
};
use rusqlite::Connection;

const SELECT_INCIDENTS: &str = "
SELECT CAST(id AS TEXT), CAST(date AS TEXT), CAST(time AS TEXT),
       CAST(location AS TEXT), CAST(address AS TEXT), CAST(duty AS TEXT),
       CAST(\"type\" AS TEXT), CAST(description AS TEXT), CAST(status AS TEXT),
       CAST(resolved_at AS TEXT), CAST(comment AS TEXT)
FROM incidents
ORDER BY rowid";

const INSERT_INCIDENT: &str = "
INSERT INTO incidents (
    id, date, time, location, address, duty, \"type\",
    description, status, resolved_at, comment
) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)";

// ─── Incidents ───────────────────────────────────────────────────────────────

/// Every incidents row in table order.
pub fn read_incidents(conn: &Connection) -> rusqlite::Result<Vec<RawIncident>> {
  let mut stmt = conn.prepare(SELECT_INCIDENTS)?;
  let rows = stmt
    .query_map([], |row| {
      Ok(RawIncident {
        id:          row.get(0)?,
        date:        row.get(1)?,
        time:        row.get(2)?,
        location:    row.get(3)?,
        address:     row.get(4)?,
        duty:        row.get(5)?,
        kind:        row.get(6)?,
        description: row.get(7)?,
        status:      row.get(8)?,
        resolved_at: row.get(9)?,
        comment:     row.get(10)?,
      })
    })?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  Ok(rows)
}

/// Replace the incidents table with `incidents`, in order.
///
/// Call inside a transaction; on error the caller drops it and nothing is
/// committed.
pub fn write_incidents(conn: &Connection, incidents: &[Incident]) -> rusqlite::Result<()> {
  conn.execute("DELETE FROM incidents", [])?;
  let mut stmt = conn.prepare(INSERT_INCIDENT)?;
  for incident in incidents {
    let raw = incident.to_raw();
    let id = incident
      .id
      .map(i64::try_from)
      .transpose()
      .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;
    stmt.execute(rusqlite::params![
      id,
      raw.date,
      raw.time,
      raw.location,
      raw.address,
      raw.duty,
      raw.kind,
      raw.description,
      raw.status,
      raw.resolved_at,
      raw.comment,
    ])?;
  }
  Ok(())
}

// ─── Locations ───────────────────────────────────────────────────────────────

/// Every locations row in table order; NULL cells read as empty strings.
pub fn read_locations(conn: &Connection) -> rusqlite::Result<Vec<LocationEntry>> {
  let mut stmt = conn.prepare(
    "SELECT COALESCE(CAST(location AS TEXT), ''), COALESCE(CAST(address AS TEXT), '')
     FROM locations
     ORDER BY rowid",
  )?;
  let rows = stmt
    .query_map([], |row| {
      Ok(LocationEntry { location: row.get(0)?, address: row.get(1)? })
    })?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  Ok(rows)
}

/// Replace the locations table with `entries`, in order.
pub fn write_locations(conn: &Connection, entries: &[LocationEntry]) -> rusqlite::Result<()> {
  conn.execute("DELETE FROM locations", [])?;
  let mut stmt = conn.prepare("INSERT INTO locations (location, address) VALUES (?1, ?2)")?;
  for entry in entries {
    stmt.execute(rusqlite::params![entry.location, entry.address])?;
  }
  Ok(())
}
