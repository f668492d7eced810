//! Structured errors for the store layer.
//!
//! Every native SQLite failure is mapped to a `DbError` carrying the
//! human-readable message and the extended result code, so callers can
//! branch on `code()` instead of matching strings. Errors raised by this
//! crate itself (unsupported bind types, unknown parameter names) use
//! code 0.

use rusqlite::ffi;
use thiserror::Error;

/// Code used for errors that did not come from SQLite.
pub const NOT_NATIVE: i32 = 0;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("cannot open store: {message} (code {code})")]
    Open { message: String, code: i32 },

    #[error("cannot close store: {message} (code {code})")]
    Close { message: String, code: i32 },

    #[error("cannot compile statement: {message} (code {code})")]
    Compile { message: String, code: i32 },

    #[error("cannot bind parameter {index}: {message} (code {code})")]
    Bind {
        index: usize,
        message: String,
        code: i32,
    },

    #[error("unsupported bind type for parameter {index}: {kind} values cannot be bound")]
    UnsupportedBindType { index: usize, kind: &'static str },

    #[error("statement has no parameter named {0}")]
    UnknownParameter(String),

    #[error("statement failed: {message} (code {code})")]
    Step { message: String, code: i32 },

    #[error("cannot finalize statement: {message} (code {code})")]
    Finalize { message: String, code: i32 },
}

impl DbError {
    pub(crate) fn open(err: &rusqlite::Error) -> Self {
        let (message, code) = native(err);
        DbError::Open { message, code }
    }

    pub(crate) fn close(err: &rusqlite::Error) -> Self {
        let (message, code) = native(err);
        DbError::Close { message, code }
    }

    pub(crate) fn compile(err: &rusqlite::Error) -> Self {
        let (message, code) = native(err);
        DbError::Compile { message, code }
    }

    pub(crate) fn bind(index: usize, err: &rusqlite::Error) -> Self {
        let (message, code) = native(err);
        DbError::Bind {
            index,
            message,
            code,
        }
    }

    /// A slot outside `1..=count`, reported with SQLite's range code.
    pub(crate) fn out_of_range(index: usize, count: usize) -> Self {
        DbError::Bind {
            index,
            message: format!("column index out of range, statement has {count} parameters"),
            code: ffi::SQLITE_RANGE,
        }
    }

    pub(crate) fn step(err: &rusqlite::Error) -> Self {
        let (message, code) = native(err);
        DbError::Step { message, code }
    }

    pub(crate) fn finalize(err: &rusqlite::Error) -> Self {
        let (message, code) = native(err);
        DbError::Finalize { message, code }
    }

    /// The message without the variant prefix added by `Display`.
    pub fn message(&self) -> String {
        match self {
            DbError::Open { message, .. }
            | DbError::Close { message, .. }
            | DbError::Compile { message, .. }
            | DbError::Bind { message, .. }
            | DbError::Step { message, .. }
            | DbError::Finalize { message, .. } => message.clone(),
            DbError::UnsupportedBindType { .. } | DbError::UnknownParameter(_) => self.to_string(),
        }
    }

    pub fn code(&self) -> i32 {
        match self {
            DbError::Open { code, .. }
            | DbError::Close { code, .. }
            | DbError::Compile { code, .. }
            | DbError::Bind { code, .. }
            | DbError::Step { code, .. }
            | DbError::Finalize { code, .. } => *code,
            DbError::UnsupportedBindType { .. } | DbError::UnknownParameter(_) => NOT_NATIVE,
        }
    }

    /// Connection-level failures. Everything else is scoped to one statement.
    pub fn is_fatal(&self) -> bool {
        matches!(self, DbError::Open { .. } | DbError::Close { .. })
    }

    /// SQLite reports existing tables only through the message text.
    pub fn is_already_exists(&self) -> bool {
        self.message().contains("already exists")
    }
}

/// Extract message and native code from a rusqlite error.
fn native(err: &rusqlite::Error) -> (String, i32) {
    match err {
        rusqlite::Error::SqliteFailure(e, Some(msg)) => (msg.clone(), e.extended_code),
        rusqlite::Error::SqliteFailure(e, None) => (e.to_string(), e.extended_code),
        rusqlite::Error::SqlInputError { error, msg, .. } => (msg.clone(), error.extended_code),
        // stepping a statement that yields rows where none were expected
        rusqlite::Error::ExecuteReturnedResults => (err.to_string(), ffi::SQLITE_ROW),
        other => (other.to_string(), NOT_NATIVE),
    }
}
