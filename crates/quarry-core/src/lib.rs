//! # quarry-core
//!
//! Driver-free building blocks for file-based SQL scripts.
//!
//! This crate provides:
//! - Resolution of nested, dialect-aware directory configurations into an
//!   ordered search path
//! - Lookup of `<namespace>/<name>.sql` and `.tpql` scripts along that path
//! - A sandboxed template language for `.tpql` scripts
//! - Masking of string literals, comments and `$$` blocks, so query text can
//!   be rewritten without corrupting them
//!
//! ## Interpolation
//!
//! Bound values can be inlined into the query text for diagnostics:
//!
//! ```rust
//! use quarry_core::{interpolate, Args, Dialect};
//!
//! let sql = interpolate(
//!     "SELECT * FROM t WHERE v = :val -- not :this",
//!     &Args::named([("val", "O'Reilly"), ("this", "x")]),
//!     Dialect::Sqlite,
//! );
//! assert_eq!(sql, "SELECT * FROM t WHERE v = 'O''Reilly' -- not :this");
//! ```
//!
//! ## Templates
//!
//! Templates see the active dialect and the caller's named values, nothing
//! else:
//!
//! ```rust
//! use quarry_core::template::{Context, Template};
//! use quarry_core::Dialect;
//!
//! let template = Template::parse(
//!     "SELECT id FROM users{% if active %} WHERE active = :active{% endif %}",
//! )
//! .unwrap();
//! let context = Context::new(Dialect::Sqlite).with("active", true);
//! assert_eq!(
//!     template.render(&context).unwrap(),
//!     "SELECT id FROM users WHERE active = :active"
//! );
//! ```

pub mod args;
pub mod dialect;
pub mod error;
pub mod identifier;
pub mod locator;
pub mod paths;
pub mod query;
pub mod template;
pub mod value;

pub use args::Args;
pub use dialect::Dialect;
pub use error::{Error, Result};
pub use identifier::TableName;
pub use locator::{Script, ScriptKind, ScriptLocator};
pub use paths::{DirectoryConfig, PathResolver, ResolvedPaths, DEFAULT_NAMESPACE};
pub use query::{interpolate, named_placeholders, MaskedSql};
pub use template::{Rendered, TemplateEngine, TemplateError};
pub use value::{Param, ParamType, Value};
