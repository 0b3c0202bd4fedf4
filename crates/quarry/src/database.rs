//! The owned database handle.

use quarry_core::{
    interpolate, Args, Dialect, DirectoryConfig, ScriptKind, ScriptLocator, TemplateEngine,
};
use tracing::{debug, info};

use crate::connection::Connection;
use crate::driver::{BindKey, Driver, Statement};
use crate::error::Result;
use crate::query::Query;
use crate::sqlx_driver::SqlxDriver;

/// An open database connection together with its settings.
///
/// Every query borrows the database mutably, so statements run one at a
/// time.
pub struct Database {
    driver: Box<dyn Driver>,
    connection: Connection,
    locator: ScriptLocator,
    templates: TemplateEngine,
}

impl Database {
    /// Opens the connection described by `connection`.
    ///
    /// # Errors
    ///
    /// Returns `SqlExecution` if the database cannot be reached.
    pub fn connect(connection: &Connection) -> Result<Self> {
        let driver = SqlxDriver::connect(connection.dsn())?;
        Ok(Self::with_driver(connection.clone(), Box::new(driver)))
    }

    /// Wraps an already connected driver.
    #[must_use]
    pub fn with_driver(connection: Connection, driver: Box<dyn Driver>) -> Self {
        let dialect = driver.dialect();
        Self {
            driver,
            connection,
            locator: ScriptLocator::new(),
            templates: TemplateEngine::new(dialect),
        }
    }

    /// Closes the connection.
    ///
    /// # Errors
    ///
    /// Returns `SqlExecution` if the driver fails to shut down cleanly.
    pub fn close(self) -> Result<()> {
        self.driver.close()
    }

    /// Returns the connection settings.
    #[must_use]
    pub const fn connection(&self) -> &Connection {
        &self.connection
    }

    /// Returns the dialect.
    #[must_use]
    pub fn dialect(&self) -> Dialect {
        self.driver.dialect()
    }

    /// Prepends SQL directories to the search path.
    ///
    /// # Errors
    ///
    /// Returns `PathNotFound` for a missing directory.
    pub fn add_sql_dirs(&mut self, dirs: impl Into<DirectoryConfig>) -> Result<()> {
        self.connection.add_sql_dirs(dirs)
    }

    /// Creates a query for literal SQL text.
    ///
    /// Nothing runs until one of the query's execution methods is called.
    pub fn execute(&mut self, sql: impl Into<String>, args: Args) -> Query<'_> {
        Query::new(self, sql.into(), args)
    }

    /// Runs text without preparing it, e.g. a multi-statement script.
    ///
    /// # Errors
    ///
    /// Returns `SqlExecution` on failure.
    pub fn execute_unprepared(&mut self, sql: &str) -> Result<u64> {
        debug!(sql, "Executing unprepared SQL");
        self.driver.execute_unprepared(sql)
    }

    /// Returns a handle on the scripts of `namespace`.
    ///
    /// # Errors
    ///
    /// Returns `FolderNotFound` unless some SQL directory contains it.
    pub fn folder(&mut self, namespace: &str) -> Result<Folder<'_>> {
        self.locator
            .require_namespace(self.connection.sql_dirs(), namespace)?;
        Ok(Folder {
            db: self,
            namespace: namespace.to_string(),
        })
    }

    /// Locates `namespace/name`, renders it if it is a template and creates
    /// a query for the result.
    ///
    /// # Errors
    ///
    /// Returns `ScriptNotFound`, `UnsupportedArgumentShape` for positional
    /// arguments to a template, and `TemplateRender` or `Io` failures.
    pub fn script(&mut self, namespace: &str, name: &str, args: Args) -> Result<Query<'_>> {
        let script = self
            .locator
            .locate(self.connection.sql_dirs(), namespace, name)?;
        let (sql, args) = match script.kind {
            ScriptKind::Plain => (script.source()?, args),
            ScriptKind::Template => {
                let rendered = self.templates.render(&script, &args)?;
                (rendered.sql, rendered.args)
            }
        };
        Ok(self.execute(sql, args))
    }

    /// Opens a transaction. Transactions do not nest.
    ///
    /// # Errors
    ///
    /// Returns `SqlExecution` if a transaction is already open.
    pub fn begin(&mut self) -> Result<()> {
        self.driver.begin()
    }

    /// Commits the open transaction.
    ///
    /// # Errors
    ///
    /// Returns `SqlExecution` if none is open or the commit fails.
    pub fn commit(&mut self) -> Result<()> {
        self.driver.commit()
    }

    /// Rolls back the open transaction.
    ///
    /// # Errors
    ///
    /// Returns `SqlExecution` if none is open or the rollback fails.
    pub fn rollback(&mut self) -> Result<()> {
        self.driver.rollback()
    }

    /// Returns whether a transaction is open.
    #[must_use]
    pub fn in_transaction(&self) -> bool {
        self.driver.in_transaction()
    }

    /// Quotes a string literal for the dialect.
    #[must_use]
    pub fn quote(&self, text: &str) -> String {
        self.driver.quote(text)
    }

    /// Prepares `sql` and binds `args` to it.
    pub(crate) fn prepare(&self, sql: &str, args: &Args) -> Result<Statement> {
        if self.connection.print() {
            info!(sql = %interpolate(sql, args, self.dialect()), "Executing query");
        } else {
            debug!(sql, args = args.len(), "Executing query");
        }

        let mut statement = self.driver.prepare(sql)?;
        match args {
            Args::Positional(values) => {
                for (i, value) in values.iter().enumerate() {
                    let key = BindKey::Position(i + 1);
                    let param = value.to_param(&key.to_string())?;
                    statement.bind(key, param)?;
                }
            }
            Args::Named(values) => {
                for (name, value) in values {
                    let key = BindKey::Name(name.clone());
                    let param = value.to_param(&key.to_string())?;
                    statement.bind(key, param)?;
                }
            }
        }
        Ok(statement)
    }

    pub(crate) fn driver_mut(&mut self) -> &mut dyn Driver {
        self.driver.as_mut()
    }
}

/// The scripts of one namespace.
pub struct Folder<'db> {
    db: &'db mut Database,
    namespace: String,
}

impl Folder<'_> {
    /// Returns the namespace.
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Creates a query for the script `name` of this namespace.
    ///
    /// # Errors
    ///
    /// See [`Database::script`].
    pub fn script(&mut self, name: &str, args: Args) -> Result<Query<'_>> {
        self.db.script(&self.namespace, name, args)
    }
}
