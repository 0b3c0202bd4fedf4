//! Sandboxed `.tpql` templates.
//!
//! A template is literal SQL interleaved with `{{ expr }}` output tags,
//! `{% if %}`/`{% for %}` blocks and `{# comments #}`. Templates only see the
//! variables of their [`Context`]; there is no way to call into host code.
//! SQL that itself contains `{{` goes inside `{% raw %} ... {% endraw %}`.
//!
//! [`TemplateEngine`] renders a located [`Script`] and narrows the caller's
//! named arguments to the placeholders that survive in the rendered SQL.

mod error;
mod lexer;
mod parser;
mod render;

use std::collections::BTreeMap;
use std::path::Path;

use serde_json::Map;
use tracing::debug;

pub use error::{Span, TemplateError};
pub use parser::{BinaryOp, Expr, Node};
pub use render::is_truthy;

use crate::args::Args;
use crate::dialect::Dialect;
use crate::error::{Error, Result};
use crate::locator::Script;
use crate::query::named_placeholders;
use crate::value::Value;

/// Context key holding the active dialect identifier.
pub const DIALECT_KEY: &str = "dialect";

/// A parsed template.
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    nodes: Vec<Node>,
}

impl Template {
    /// Parses template source.
    ///
    /// # Errors
    ///
    /// Returns a [`TemplateError`] for malformed tags or expressions.
    pub fn parse(source: &str) -> std::result::Result<Self, TemplateError> {
        Ok(Self {
            nodes: parser::parse(source)?,
        })
    }

    /// Returns the parsed nodes.
    #[must_use]
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Renders the template against a context.
    ///
    /// # Errors
    ///
    /// Returns a [`TemplateError`] if evaluation fails. No partial output is
    /// returned.
    pub fn render(&self, context: &Context) -> std::result::Result<String, TemplateError> {
        let mut out = String::new();
        render::Renderer::new(&context.vars).render(&self.nodes, &mut out)?;
        Ok(out)
    }
}

/// The variables visible to a template.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Context {
    vars: Map<String, serde_json::Value>,
}

impl Context {
    /// Creates a context holding the dialect identifier.
    #[must_use]
    pub fn new(dialect: Dialect) -> Self {
        Self::default().with(DIALECT_KEY, dialect.as_str())
    }

    /// Adds a variable, replacing any previous value.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// Adds a variable, replacing any previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) {
        self.vars.insert(key.into(), value.into());
    }

    /// Merges named values over the current variables.
    pub fn extend(&mut self, values: &BTreeMap<String, Value>) {
        for (key, value) in values {
            self.vars.insert(key.clone(), value.to_json());
        }
    }

    /// Returns a variable.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.vars.get(key)
    }
}

/// The result of rendering a template script.
#[derive(Debug, Clone, PartialEq)]
pub struct Rendered {
    /// The produced SQL text.
    pub sql: String,
    /// Named arguments referenced by `sql`.
    pub args: Args,
}

/// Renders template scripts for one dialect.
#[derive(Debug, Clone, Copy)]
pub struct TemplateEngine {
    dialect: Dialect,
}

impl TemplateEngine {
    /// Creates an engine for the active dialect.
    #[must_use]
    pub const fn new(dialect: Dialect) -> Self {
        Self { dialect }
    }

    /// Builds the rendering context for caller arguments.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedArgumentShape`] for non-empty positional
    /// arguments.
    pub fn context(&self, args: &Args) -> Result<Context> {
        let mut context = Context::new(self.dialect);
        match args {
            Args::Named(values) => context.extend(values),
            Args::Positional(values) if values.is_empty() => {}
            Args::Positional(_) => {
                return Err(Error::UnsupportedArgumentShape(String::from(
                    "templates only accept named arguments",
                )))
            }
        }
        Ok(context)
    }

    /// Renders a template script and narrows `args` to the placeholders of
    /// the produced SQL.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedArgumentShape`] for positional arguments,
    /// [`Error::Io`] if the script cannot be read and
    /// [`Error::TemplateRender`] if rendering fails.
    pub fn render(&self, script: &Script, args: &Args) -> Result<Rendered> {
        let context = self.context(args)?;
        let sql = self.render_source(&script.path, &script.source()?, &context)?;
        let args = narrow(&sql, args);
        debug!(
            namespace = %script.namespace,
            name = %script.name,
            args = args.len(),
            "Rendered template"
        );
        Ok(Rendered { sql, args })
    }

    /// Parses and renders template source read from `path`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TemplateRender`] on parse or evaluation failure.
    pub fn render_source(&self, path: &Path, source: &str, context: &Context) -> Result<String> {
        Template::parse(source)
            .and_then(|template| template.render(context))
            .map_err(|source| Error::TemplateRender {
                path: path.to_path_buf(),
                source,
            })
    }
}

/// Keeps only the named arguments whose `:name` placeholder occurs in `sql`.
///
/// Placeholders inside strings, comments and `$$` blocks do not count.
#[must_use]
pub fn narrow(sql: &str, args: &Args) -> Args {
    let used = named_placeholders(sql);
    match args {
        Args::Named(values) => Args::Named(
            values
                .iter()
                .filter(|(key, _)| used.contains(key.as_str()))
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect(),
        ),
        Args::Positional(_) => Args::Named(BTreeMap::new()),
    }
}
