//! Query handles.

use std::fmt;

use quarry_core::{interpolate, Args};

use crate::database::Database;
use crate::driver::{Row, Rows, Statement};
use crate::error::Result;

/// SQL text with its arguments, executed on demand.
///
/// # Example
///
/// ```no_run
/// use quarry::{Args, Connection, Database};
///
/// let conn = Connection::new("sqlite::memory:", Vec::<std::path::PathBuf>::new())?;
/// let mut db = Database::connect(&conn)?;
/// db.execute("CREATE TABLE t (v TEXT)", Args::none()).run()?;
/// db.execute("INSERT INTO t (v) VALUES (:v)", Args::named([("v", "a")])).run()?;
/// let rows = db.execute("SELECT v FROM t", Args::none()).all()?;
/// assert_eq!(rows.len(), 1);
/// # Ok::<(), quarry::Error>(())
/// ```
pub struct Query<'db> {
    db: &'db mut Database,
    sql: String,
    args: Args,
    buffered: Option<std::vec::IntoIter<Row>>,
    streamed: Option<Statement>,
}

impl<'db> Query<'db> {
    pub(crate) const fn new(db: &'db mut Database, sql: String, args: Args) -> Self {
        Self {
            db,
            sql,
            args,
            buffered: None,
            streamed: None,
        }
    }

    /// Returns the SQL text.
    #[must_use]
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Returns the arguments.
    #[must_use]
    pub const fn args(&self) -> &Args {
        &self.args
    }

    /// Returns the next row.
    ///
    /// The first call executes the query and buffers its result; later calls
    /// walk the buffer without executing again and return `None` once it is
    /// exhausted. Call [`Query::reset`] to execute anew.
    ///
    /// # Errors
    ///
    /// Returns `SqlExecution` on failure.
    pub fn one(&mut self) -> Result<Option<Row>> {
        if self.buffered.is_none() {
            let rows = self.fetch_all()?;
            self.buffered = Some(rows.into_iter());
        }
        Ok(self.buffered.as_mut().and_then(Iterator::next))
    }

    /// Discards the rows buffered by [`Query::one`].
    pub fn reset(&mut self) {
        self.buffered = None;
    }

    /// Executes the query and returns every row.
    ///
    /// # Errors
    ///
    /// Returns `SqlExecution` on failure.
    pub fn all(&mut self) -> Result<Vec<Row>> {
        self.fetch_all()
    }

    /// Executes the query and returns a single-pass row iterator.
    ///
    /// # Errors
    ///
    /// Returns `SqlExecution` if binding fails; failures while streaming are
    /// yielded by the iterator.
    pub fn lazy(&mut self) -> Result<Rows<'_>> {
        let statement = self.streamed.insert(self.db.prepare(&self.sql, &self.args)?);
        self.db.driver_mut().fetch(statement)
    }

    /// Executes the query for its side effects.
    ///
    /// # Errors
    ///
    /// Returns `SqlExecution` on failure.
    pub fn run(&mut self) -> Result<()> {
        self.len().map(|_| ())
    }

    /// Executes the query and returns the affected-row count.
    ///
    /// The count is whatever the driver reports; SQLite reports 0 for
    /// `SELECT`.
    ///
    /// # Errors
    ///
    /// Returns `SqlExecution` on failure.
    pub fn len(&mut self) -> Result<u64> {
        let statement = self.statement()?;
        self.db.driver_mut().execute(&statement)
    }

    /// Returns the SQL text with the argument values inlined.
    ///
    /// Strings, comments and `$$` blocks are left untouched. The result is
    /// meant for logs and may not be valid SQL.
    #[must_use]
    pub fn interpolate(&self) -> String {
        interpolate(&self.sql, &self.args, self.db.dialect())
    }

    fn statement(&self) -> Result<Statement> {
        self.db.prepare(&self.sql, &self.args)
    }

    fn fetch_all(&mut self) -> Result<Vec<Row>> {
        let statement = self.statement()?;
        self.db.driver_mut().fetch_all(&statement)
    }
}

impl fmt::Display for Query<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.interpolate())
    }
}

impl fmt::Debug for Query<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Query")
            .field("sql", &self.sql)
            .field("args", &self.args)
            .finish_non_exhaustive()
    }
}
