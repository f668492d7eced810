//! Compiled, reusable statements.
//!
//! A `Statement` is compiled once and then bound and executed any number
//! of times. It borrows the `Store` it was prepared on, so the store cannot
//! be closed while a statement is still alive, and `destroy` consumes the
//! handle so a finalized statement cannot be touched again.
//!
//! Every execution path leaves the statement reset and ready to run again:
//! `execute` resets after stepping, and a `RowCursor` resets once it is
//! exhausted or dropped. Bindings survive a reset; clear them with
//! `reset_bindings`.

use rusqlite::types::{Null, Value as SqlValue};

use super::error::DbError;
use super::value::{Decoded, Row, Value};
use super::Store;

#[derive(Debug)]
pub struct Statement<'s> {
    inner: rusqlite::Statement<'s>,
    sql: String,
}

impl<'s> Statement<'s> {
    /// Compile `sql` against `store`. Syntax errors are reported as
    /// `DbError::Compile`.
    pub fn prepare(store: &'s Store, sql: &str) -> Result<Self, DbError> {
        let inner = store.conn.prepare(sql).map_err(|e| DbError::compile(&e))?;
        Ok(Statement {
            inner,
            sql: sql.to_string(),
        })
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn parameter_count(&self) -> usize {
        self.inner.parameter_count()
    }

    /// One-based slot of a named parameter, including its prefix (`@url`).
    pub fn parameter_index(&self, name: &str) -> Result<usize, DbError> {
        match self.inner.parameter_index(name) {
            Ok(Some(index)) => Ok(index),
            Ok(None) => Err(DbError::UnknownParameter(name.to_string())),
            Err(e) => Err(DbError::bind(0, &e)),
        }
    }

    pub fn parameter_name(&self, index: usize) -> Option<&str> {
        self.inner.parameter_name(index)
    }

    /// Result column names; empty for statements that produce no rows.
    pub fn column_names(&self) -> Vec<&str> {
        self.inner.column_names()
    }

    /// Bind values left to right, starting at slot 1.
    ///
    /// Values are validated before anything is bound: a blob or NULL
    /// anywhere in `values`, or more values than the statement has slots,
    /// fails and leaves the existing bindings untouched.
    pub fn bind<I, V>(&mut self, values: I) -> Result<(), DbError>
    where
        I: IntoIterator<Item = V>,
        V: Into<SqlValue>,
    {
        let slots = values
            .into_iter()
            .enumerate()
            .map(|(i, value)| Value::for_slot(i + 1, value.into()).map(|v| (i + 1, v)))
            .collect::<Result<Vec<_>, _>>()?;

        self.bind_slots(slots)
    }

    /// Bind values by parameter name. Same validation rules as `bind`.
    pub fn bind_named<'n, I, V>(&mut self, values: I) -> Result<(), DbError>
    where
        I: IntoIterator<Item = (&'n str, V)>,
        V: Into<SqlValue>,
    {
        let mut slots = Vec::new();
        for (name, value) in values {
            let index = self.parameter_index(name)?;
            slots.push((index, Value::for_slot(index, value.into())?));
        }

        self.bind_slots(slots)
    }

    /// Bind values to explicit one-based slots. Same validation rules as
    /// `bind`; slot 0 or a slot past `parameter_count` is rejected.
    pub fn bind_indexed<I, V>(&mut self, values: I) -> Result<(), DbError>
    where
        I: IntoIterator<Item = (usize, V)>,
        V: Into<SqlValue>,
    {
        let slots = values
            .into_iter()
            .map(|(index, value)| Value::for_slot(index, value.into()).map(|v| (index, v)))
            .collect::<Result<Vec<_>, _>>()?;

        self.bind_slots(slots)
    }

    fn bind_slots(&mut self, slots: Vec<(usize, Value)>) -> Result<(), DbError> {
        let count = self.inner.parameter_count();
        if let Some(&(index, _)) = slots.iter().find(|(index, _)| *index == 0 || *index > count) {
            return Err(DbError::out_of_range(index, count));
        }

        for (index, value) in slots {
            let result = match value {
                Value::Integer(i) => self.inner.raw_bind_parameter(index, i),
                Value::Float(f) => self.inner.raw_bind_parameter(index, f),
                Value::Text(s) => self.inner.raw_bind_parameter(index, s),
            };
            result.map_err(|e| DbError::bind(index, &e))?;
        }
        Ok(())
    }

    /// Set every parameter slot back to NULL.
    pub fn reset_bindings(&mut self) -> Result<(), DbError> {
        for index in 1..=self.inner.parameter_count() {
            self.inner
                .raw_bind_parameter(index, Null)
                .map_err(|e| DbError::bind(index, &e))?;
        }
        Ok(())
    }

    /// Step to completion and return the number of rows changed.
    ///
    /// Statements that produce rows fail here with code 100; use `fetch_all`
    /// or `rows` for those.
    pub fn execute(&mut self) -> Result<usize, DbError> {
        self.inner.raw_execute().map_err(|e| DbError::step(&e))
    }

    /// Run the statement and collect every row. Only meant for small result
    /// sets, everything is held in memory.
    pub fn fetch_all(&mut self) -> Result<Vec<Row>, DbError> {
        let mut rows = Vec::new();
        self.for_each_row(|row| rows.push(row))?;
        Ok(rows)
    }

    /// Run the statement, handing each decoded row to `callback` as it is
    /// stepped. Works for statements without results too, which simply
    /// produce no rows. Returns how many rows were seen.
    pub fn for_each_row<F>(&mut self, mut callback: F) -> Result<usize, DbError>
    where
        F: FnMut(Row),
    {
        let mut cursor = self.rows();
        let mut seen = 0;
        while let Some(row) = cursor.next_row()? {
            callback(row);
            seen += 1;
        }
        Ok(seen)
    }

    /// Start stepping the statement one row at a time.
    pub fn rows(&mut self) -> RowCursor<'_> {
        let columns = self.inner.column_count();
        RowCursor {
            rows: self.inner.raw_query(),
            columns,
        }
    }

    /// Finalize the compiled statement.
    pub fn destroy(self) -> Result<(), DbError> {
        self.inner.finalize().map_err(|e| DbError::finalize(&e))
    }
}

/// Steps a statement one row per call. The statement is reset when the
/// cursor runs out of rows or is dropped.
pub struct RowCursor<'stmt> {
    rows: rusqlite::Rows<'stmt>,
    columns: usize,
}

impl RowCursor<'_> {
    /// Next decoded row, or `None` once the statement is done.
    pub fn next_row(&mut self) -> Result<Option<Row>, DbError> {
        let row = match self.rows.next() {
            Ok(Some(row)) => row,
            Ok(None) => return Ok(None),
            Err(e) => return Err(DbError::step(&e)),
        };

        let mut decoded = Vec::with_capacity(self.columns);
        for i in 0..self.columns {
            let raw = row.get_ref(i).map_err(|e| DbError::step(&e))?;
            decoded.push(Decoded::from(raw));
        }
        Ok(Some(decoded))
    }
}
