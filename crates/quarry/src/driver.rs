//! The interface between the query engine and a database client.

use std::fmt;

use quarry_core::query::{rewrite, Placeholder};
use quarry_core::{Dialect, Param, Value};

use crate::error::{Error, Result};

/// A forward-only sequence of rows borrowing its driver.
pub type Rows<'a> = Box<dyn Iterator<Item = Result<Row>> + 'a>;

/// A synchronous database client.
///
/// Implementations own a single connection. There is no pooling and no
/// concurrent access.
pub trait Driver {
    /// Returns the dialect of the connection.
    fn dialect(&self) -> Dialect;

    /// Prepares `sql`, rewriting `:name` and `?` markers to native ones.
    ///
    /// # Errors
    ///
    /// Implementations may reject the text up front.
    fn prepare(&self, sql: &str) -> Result<Statement> {
        Ok(Statement::new(sql, self.dialect()))
    }

    /// Runs a fully bound statement and returns the affected-row count.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SqlExecution`] on failure or unbound parameters.
    fn execute(&mut self, statement: &Statement) -> Result<u64>;

    /// Runs text without preparing it. Multiple statements are allowed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SqlExecution`] on failure.
    fn execute_unprepared(&mut self, sql: &str) -> Result<u64>;

    /// Runs a statement and collects every row.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SqlExecution`] on failure or unbound parameters.
    fn fetch_all(&mut self, statement: &Statement) -> Result<Vec<Row>>;

    /// Runs a statement and yields rows one at a time.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SqlExecution`] for unbound parameters. Failures
    /// while streaming are yielded by the iterator.
    fn fetch<'a>(&'a mut self, statement: &'a Statement) -> Result<Rows<'a>>;

    /// Opens a transaction.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SqlExecution`] if one is already open.
    fn begin(&mut self) -> Result<()>;

    /// Commits the open transaction.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SqlExecution`] if none is open.
    fn commit(&mut self) -> Result<()>;

    /// Rolls back the open transaction.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SqlExecution`] if none is open.
    fn rollback(&mut self) -> Result<()>;

    /// Returns whether a transaction is open.
    fn in_transaction(&self) -> bool;

    /// Quotes a string literal for this dialect.
    fn quote(&self, text: &str) -> String {
        self.dialect().quote_literal(text)
    }

    /// Closes the connection.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SqlExecution`] if the connection does not shut down
    /// cleanly.
    fn close(self: Box<Self>) -> Result<()>;
}

/// Identifies the parameter to bind: a 1-based position or a name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindKey {
    /// The n-th `?` marker, 1-based.
    Position(usize),
    /// A `:name` marker, without the colon.
    Name(String),
}

impl fmt::Display for BindKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Position(n) => write!(f, "#{n}"),
            Self::Name(name) => write!(f, ":{name}"),
        }
    }
}

impl From<usize> for BindKey {
    fn from(position: usize) -> Self {
        Self::Position(position)
    }
}

impl From<&str> for BindKey {
    fn from(name: &str) -> Self {
        Self::Name(name.to_string())
    }
}

impl From<String> for BindKey {
    fn from(name: String) -> Self {
        Self::Name(name)
    }
}

/// A prepared statement: native SQL plus one slot per marker occurrence.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    sql: String,
    slots: Vec<BindKey>,
    params: Vec<Option<Param>>,
}

impl Statement {
    /// Rewrites `sql` for `dialect`.
    ///
    /// Every marker outside strings, comments and `$$` blocks becomes the
    /// dialect's native placeholder, numbered by occurrence.
    #[must_use]
    pub fn new(sql: &str, dialect: Dialect) -> Self {
        let mut slots = Vec::new();
        let mut positional = 0;
        let sql = rewrite(sql, |index, placeholder| {
            slots.push(match placeholder {
                Placeholder::Named(name) => BindKey::Name(name.clone()),
                Placeholder::Positional => {
                    positional += 1;
                    BindKey::Position(positional)
                }
            });
            Some(dialect.placeholder(index + 1))
        });
        let params = vec![None; slots.len()];
        Self { sql, slots, params }
    }

    /// Returns the native SQL text.
    #[must_use]
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Returns the marker behind each native placeholder.
    #[must_use]
    pub fn slots(&self) -> &[BindKey] {
        &self.slots
    }

    /// Binds a value to every occurrence of `key`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SqlExecution`] if the statement has no such marker.
    pub fn bind(&mut self, key: impl Into<BindKey>, param: Param) -> Result<()> {
        let key = key.into();
        let mut used = false;
        for (slot, value) in self.slots.iter().zip(self.params.iter_mut()) {
            if *slot == key {
                *value = Some(param.clone());
                used = true;
            }
        }
        if used {
            Ok(())
        } else {
            Err(Error::sql(format!(
                "Parameter {key} is not used by the statement"
            )))
        }
    }

    /// Returns the bound values in placeholder order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SqlExecution`] naming the first unbound marker.
    pub fn params(&self) -> Result<Vec<Param>> {
        self.slots
            .iter()
            .zip(&self.params)
            .map(|(slot, param)| {
                param
                    .clone()
                    .ok_or_else(|| Error::sql(format!("Parameter {slot} is not bound")))
            })
            .collect()
    }
}

/// A result row: column names and decoded values.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    columns: Vec<String>,
    values: Vec<Value>,
}

impl Row {
    /// Creates a row from parallel column and value lists.
    #[must_use]
    pub const fn new(columns: Vec<String>, values: Vec<Value>) -> Self {
        Self { columns, values }
    }

    /// Returns the column names.
    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Returns the values in column order.
    #[must_use]
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Returns the value of the named column.
    #[must_use]
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns
            .iter()
            .position(|c| c == column)
            .and_then(|i| self.values.get(i))
    }

    /// Returns the values, consuming the row.
    #[must_use]
    pub fn into_values(self) -> Vec<Value> {
        self.values
    }
}
