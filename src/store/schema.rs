//! The `data` table and the statements that write to it.

use tracing::debug;

use super::{DbError, Store};

pub const TABLE: &str = "data";

pub const CREATE_TABLE: &str =
    "CREATE TABLE data (url VARCHAR, title VARCHAR, incognito INT, time VARCHAR, date VARCHAR)";

/// Columns in the order `INSERT_ITEM` expects them.
pub const INSERT_ITEM: &str = "INSERT INTO data VALUES (@url, @title, @incognito, @time, @date)";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bootstrap {
    Created,
    AlreadyExists,
}

/// Create the `data` table. An existing table is not an error.
///
/// SQLite may report the existing table either while compiling or while
/// stepping, so both paths are checked.
pub fn ensure_table(store: &Store) -> Result<Bootstrap, DbError> {
    let outcome = store.prepare(CREATE_TABLE).and_then(|mut create| {
        create.execute()?;
        create.destroy()
    });

    match outcome {
        Ok(()) => {
            debug!(table = TABLE, "table created");
            Ok(Bootstrap::Created)
        }
        Err(e) if e.is_already_exists() => {
            debug!(table = TABLE, "table already exists");
            Ok(Bootstrap::AlreadyExists)
        }
        Err(e) => Err(e),
    }
}
