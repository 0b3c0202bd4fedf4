//! [`Driver`] implementation over a single `sqlx` connection.

use futures::stream::BoxStream;
use futures::StreamExt;
use quarry_core::{Dialect, Param, Value};
use sqlx::any::{AnyArguments, AnyRow};
use sqlx::AnyConnection;
use sqlx::query::Query;
use sqlx::{Any, Column, Connection, Row as _, ValueRef};
use tokio::runtime::Runtime;
use tracing::{debug, info};

use crate::driver::{Driver, Row, Rows, Statement};
use crate::error::{Error, Result};

/// A blocking driver backed by `sqlx::AnyConnection`.
///
/// The connection is driven on a private current-thread runtime, so the
/// driver must not be used from inside another async runtime.
pub struct SqlxDriver {
    runtime: Runtime,
    conn: AnyConnection,
    dialect: Dialect,
    in_transaction: bool,
}

impl SqlxDriver {
    /// Connects to `dsn`, a sqlx connection URL.
    ///
    /// A `pgsql:` scheme is accepted as an alias of `postgres:`.
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedDriver` for an unknown scheme and
    /// [`Error::SqlExecution`] if the connection cannot be opened.
    pub fn connect(dsn: &str) -> Result<Self> {
        let dialect = Dialect::from_dsn(dsn)?;
        sqlx::any::install_default_drivers();

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        let conn = runtime.block_on(AnyConnection::connect(&native_url(dsn)))?;
        info!(dialect = %dialect, "Connected to database");

        Ok(Self {
            runtime,
            conn,
            dialect,
            in_transaction: false,
        })
    }
}

impl Driver for SqlxDriver {
    fn dialect(&self) -> Dialect {
        self.dialect
    }

    fn execute(&mut self, statement: &Statement) -> Result<u64> {
        if statement.slots().is_empty() {
            return self.execute_unprepared(statement.sql());
        }
        let query = bound_query(statement)?;
        let result = self.runtime.block_on(query.execute(&mut self.conn))?;
        Ok(result.rows_affected())
    }

    fn execute_unprepared(&mut self, sql: &str) -> Result<u64> {
        let result = self
            .runtime
            .block_on(sqlx::raw_sql(sql).execute(&mut self.conn))?;
        Ok(result.rows_affected())
    }

    fn fetch_all(&mut self, statement: &Statement) -> Result<Vec<Row>> {
        let query = bound_query(statement)?;
        let rows = self.runtime.block_on(query.fetch_all(&mut self.conn))?;
        rows.iter().map(decode_row).collect()
    }

    fn fetch<'a>(&'a mut self, statement: &'a Statement) -> Result<Rows<'a>> {
        let query = bound_query(statement)?;
        let Self { runtime, conn, .. } = self;
        Ok(Box::new(RowStream {
            runtime,
            stream: query.fetch(conn),
        }))
    }

    fn begin(&mut self) -> Result<()> {
        if self.in_transaction {
            return Err(Error::sql("A transaction is already active"));
        }
        self.execute_unprepared("BEGIN")?;
        self.in_transaction = true;
        debug!("Transaction started");
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        if !self.in_transaction {
            return Err(Error::sql("No active transaction to commit"));
        }
        self.in_transaction = false;
        self.execute_unprepared("COMMIT")?;
        debug!("Transaction committed");
        Ok(())
    }

    fn rollback(&mut self) -> Result<()> {
        if !self.in_transaction {
            return Err(Error::sql("No active transaction to roll back"));
        }
        self.in_transaction = false;
        self.execute_unprepared("ROLLBACK")?;
        debug!("Transaction rolled back");
        Ok(())
    }

    fn in_transaction(&self) -> bool {
        self.in_transaction
    }

    fn close(self: Box<Self>) -> Result<()> {
        let Self { runtime, conn, .. } = *self;
        runtime.block_on(conn.close())?;
        debug!("Connection closed");
        Ok(())
    }
}

/// Pulls rows from a sqlx stream on the driver's runtime.
struct RowStream<'a> {
    runtime: &'a Runtime,
    stream: BoxStream<'a, std::result::Result<AnyRow, sqlx::Error>>,
}

impl Iterator for RowStream<'_> {
    type Item = Result<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        self.runtime
            .block_on(self.stream.next())
            .map(|row| row.map_err(Error::from).and_then(|row| decode_row(&row)))
    }
}

fn native_url(dsn: &str) -> String {
    dsn.strip_prefix("pgsql:")
        .map_or_else(|| dsn.to_string(), |rest| format!("postgres:{rest}"))
}

fn bound_query(statement: &Statement) -> Result<Query<'_, Any, AnyArguments<'_>>> {
    let mut query = sqlx::query(statement.sql());
    for param in statement.params()? {
        query = match param {
            Param::Null => query.bind(Option::<i64>::None),
            Param::Bool(b) => query.bind(b),
            Param::Int(i) => query.bind(i),
            Param::Text(s) => query.bind(s),
        };
    }
    Ok(query)
}

fn decode_row(row: &AnyRow) -> Result<Row> {
    let columns: Vec<String> = row
        .columns()
        .iter()
        .map(|column| column.name().to_string())
        .collect();
    let values = (0..columns.len())
        .map(|index| decode_value(row, index))
        .collect::<Result<Vec<_>>>()?;
    Ok(Row::new(columns, values))
}

fn decode_value(row: &AnyRow, index: usize) -> Result<Value> {
    if row.try_get_raw(index)?.is_null() {
        return Ok(Value::Null);
    }
    if let Ok(b) = row.try_get::<bool, _>(index) {
        return Ok(Value::Bool(b));
    }
    if let Ok(n) = row.try_get::<i64, _>(index) {
        return Ok(Value::Int(n));
    }
    if let Ok(f) = row.try_get::<f64, _>(index) {
        return Ok(Value::Float(f));
    }
    if let Ok(s) = row.try_get::<String, _>(index) {
        return Ok(Value::Text(s));
    }
    if let Ok(bytes) = row.try_get::<Vec<u8>, _>(index) {
        return Ok(Value::Bytes(bytes));
    }
    Err(Error::sql(format!(
        "Unsupported type in column '{}'",
        row.columns()[index].name()
    )))
}
