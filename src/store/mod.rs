//! SQLite storage for the tab log.
//!
//! A `Store` owns exactly one connection for the life of the process.
//! Queries go through `Statement`, which borrows the store; the borrow
//! checker therefore rejects `close` while any statement is still alive.
//!
//! - `error`: native result codes mapped to `DbError`
//! - `value`: bindable and decoded values
//! - `statement`: compile once, bind and execute many times
//! - `schema`: one-time creation of the `data` table

pub mod error;
pub mod schema;
pub mod statement;
pub mod value;

use std::fmt;
use std::path::{Path, PathBuf};

use rusqlite::Connection;
use tracing::debug;

pub use error::DbError;
pub use statement::{RowCursor, Statement};
pub use value::{Decoded, Row, Value};

/// Path that selects an in-memory store.
pub const IN_MEMORY: &str = ":memory:";

/// Where the store lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    InMemory,
    File(PathBuf),
}

impl Target {
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        if path.as_os_str() == IN_MEMORY {
            Target::InMemory
        } else {
            Target::File(path.to_path_buf())
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::InMemory => f.write_str(IN_MEMORY),
            Target::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Version of the linked SQLite library.
pub fn sqlite_version() -> &'static str {
    rusqlite::version()
}

/// Database handle. Open once per process, reuse across all ticks.
#[derive(Debug)]
pub struct Store {
    conn: Connection,
    target: Target,
}

impl Store {
    /// Open or create the store. Failure here is fatal for the process.
    pub fn open(target: &Target) -> Result<Self, DbError> {
        let conn = match target {
            Target::InMemory => Connection::open_in_memory(),
            Target::File(path) => Connection::open(path),
        }
        .map_err(|e| DbError::open(&e))?;

        debug!(%target, sqlite = sqlite_version(), "store opened");

        Ok(Store {
            conn,
            target: target.clone(),
        })
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    /// Compile a statement against this store.
    pub fn prepare(&self, sql: &str) -> Result<Statement<'_>, DbError> {
        Statement::prepare(self, sql)
    }

    /// Run one or more semicolon separated statements without binding.
    pub fn execute_batch(&self, sql: &str) -> Result<(), DbError> {
        self.conn.execute_batch(sql).map_err(|e| DbError::step(&e))
    }

    /// Close the connection. Every statement prepared on this store must be
    /// gone by now, which the borrow on `Statement` guarantees.
    pub fn close(self) -> Result<(), DbError> {
        let target = self.target;
        self.conn.close().map_err(|(_, e)| DbError::close(&e))?;
        debug!(%target, "store closed");
        Ok(())
    }
}
