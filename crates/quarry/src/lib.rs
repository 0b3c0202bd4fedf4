//! # quarry
//!
//! Run SQL scripts kept as files against a live database.
//!
//! Scripts live in `<dir>/<namespace>/<name>.sql` or, for templates,
//! `<name>.tpql`. A [`Connection`] holds the search path and migration
//! settings; [`Database::connect`] opens it and hands out [`Query`] handles.
//!
//! ```no_run
//! use quarry::{Args, Connection, Database};
//!
//! let conn = Connection::new("sqlite:app.db?mode=rwc", "sql")?;
//! let mut db = Database::connect(&conn)?;
//!
//! let users = db
//!     .folder("users")?
//!     .script("by_name", Args::named([("name", "ann")]))?
//!     .all()?;
//! for user in users {
//!     println!("{:?}", user.get("id"));
//! }
//! db.close()?;
//! # Ok::<(), quarry::Error>(())
//! ```

pub mod connection;
pub mod database;
pub mod driver;
pub mod error;
pub mod query;
pub mod sqlx_driver;

pub use connection::{Connection, ConnectionConfig};
pub use database::{Database, Folder};
pub use driver::{BindKey, Driver, Row, Rows, Statement};
pub use error::{Error, Result};
pub use query::Query;
pub use sqlx_driver::SqlxDriver;

pub use quarry_core::{Args, Dialect, DirectoryConfig, Value};
