//! SQL schema and migrations for the duty SQLite store.
//!
//! Cells are stored loosely typed so that hand-edited or imported tables load;
//! every row goes through `duty_core::normalize` on the way in and is written
//! back in canonical form. `PRAGMA user_version` records the schema version:
//! `0` or `1` is a fresh or legacy table, [`SCHEMA_VERSION`] is canonical.

use duty_core::{
  incident::{INCIDENT_COLUMNS, id_after},
  normalize::normalize_table,
};
use rusqlite::Connection;

use crate::encode::{read_incidents, write_incidents};

/// The schema version written by [`migrate`].
pub const SCHEMA_VERSION: i64 = 2;

/// Table DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
const SCHEMA: &str = "
PRAGMA journal_mode = WAL;

-- No constraints: uniqueness of id and the date/time formats are maintained
-- by the store, and unparseable cells must still load.
CREATE TABLE IF NOT EXISTS incidents (
    id          INTEGER,
    date        TEXT,     -- YYYY-MM-DD
    time        TEXT,     -- HH:MM:SS
    location    TEXT,
    address     TEXT,
    duty        TEXT,
    \"type\"      TEXT,
    description TEXT,
    status      TEXT,     -- 'OPEN' | 'CLOSED'
    resolved_at TEXT,     -- YYYY-MM-DD HH:MM:SS
    comment     TEXT
);

CREATE TABLE IF NOT EXISTS locations (
    location TEXT,
    address  TEXT
);
";

fn sql_type(column: &str) -> &'static str {
  if column == "id" { "INTEGER" } else { "TEXT" }
}

fn table_columns(conn: &Connection, table: &str) -> rusqlite::Result<Vec<String>> {
  let mut stmt = conn.prepare("SELECT name FROM pragma_table_info(?1)")?;
  let names = stmt
    .query_map([table], |row| row.get(0))?
    .collect::<rusqlite::Result<Vec<String>>>()?;
  Ok(names)
}

fn add_missing_columns(
  conn: &Connection,
  table: &str,
  columns: &[&str],
) -> rusqlite::Result<()> {
  let present = table_columns(conn, table)?;
  for column in columns.iter().filter(|c| !present.iter().any(|p| p == *c)) {
    tracing::info!(table, column, "adding missing column");
    conn.execute_batch(&format!(
      "ALTER TABLE {table} ADD COLUMN \"{column}\" {}",
      sql_type(column)
    ))?;
  }
  Ok(())
}

/// Create the tables if absent and bring an older table up to
/// [`SCHEMA_VERSION`].
///
/// Migrating a legacy table adds the missing columns, backfills ids in table
/// order after the current maximum, and rewrites every row canonically (which
/// also fills a missing status with `OPEN`). Runs in one transaction.
pub fn migrate(conn: &mut Connection) -> rusqlite::Result<()> {
  conn.execute_batch(SCHEMA)?;

  let version: i64 = conn.pragma_query_value(None, "user_version", |r| r.get(0))?;
  if version >= SCHEMA_VERSION {
    return Ok(());
  }

  let tx = conn.transaction()?;
  add_missing_columns(&tx, "incidents", &INCIDENT_COLUMNS)?;
  add_missing_columns(&tx, "locations", &duty_core::directory::LOCATION_COLUMNS)?;

  let mut incidents = normalize_table(read_incidents(&tx)?);
  let mut last = incidents.iter().filter_map(|i| i.id).max().unwrap_or(0);
  let mut backfilled = 0usize;
  for incident in incidents.iter_mut().filter(|i| i.id.is_none()) {
    last = id_after(last).map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;
    incident.id = Some(last);
    backfilled += 1;
  }
  write_incidents(&tx, &incidents)?;

  tx.pragma_update(None, "user_version", SCHEMA_VERSION)?;
  tx.commit()?;

  tracing::info!(from = version, to = SCHEMA_VERSION, backfilled, "store schema migrated");
  Ok(())
}
