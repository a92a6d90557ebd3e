//! Versioned layout of the key-value database.
//!
//! Version `n` is reached by running `STEPS[n - 1]`; the reached version is
//! mirrored to `PRAGMA user_version`. Steps are append-only.

use crate::db::{DbError, DbResult};
use log::debug;
use rusqlite::Connection;

const STEPS: &[&str] = &[include_str!("kv_entries_v1.sql")];

/// Schema version written by this build.
pub const SCHEMA_VERSION: u32 = STEPS.len() as u32;

/// Reads the version recorded in the database header.
pub fn schema_version(conn: &Connection) -> DbResult<u32> {
    Ok(conn.pragma_query_value(None, "user_version", |row| row.get(0))?)
}

/// Runs every step past the recorded version inside one transaction.
///
/// # Errors
/// - [`DbError::SchemaTooNew`] when the file was written by a newer build.
pub fn upgrade(conn: &mut Connection) -> DbResult<()> {
    let found = schema_version(conn)?;
    if found > SCHEMA_VERSION {
        return Err(DbError::SchemaTooNew {
            found,
            supported: SCHEMA_VERSION,
        });
    }

    let pending = &STEPS[found as usize..];
    if pending.is_empty() {
        return Ok(());
    }

    let tx = conn.transaction()?;
    for step in pending {
        tx.execute_batch(step)?;
    }
    tx.pragma_update(None, "user_version", SCHEMA_VERSION)?;
    tx.commit()?;

    debug!("event=db_upgrade module=db status=ok from={found} to={SCHEMA_VERSION}");
    Ok(())
}
