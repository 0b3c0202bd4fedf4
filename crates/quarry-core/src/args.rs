//! Query arguments.
//!
//! Arguments are either positional (bound to `?` markers in order) or named
//! (bound to `:name` markers). The classification is fixed at construction.

use std::collections::BTreeMap;

use crate::value::Value;

/// Arguments for one query invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum Args {
    /// Ordered values, bound 1-indexed.
    Positional(Vec<Value>),
    /// Values keyed by placeholder name (without the leading `:`).
    Named(BTreeMap<String, Value>),
}

impl Default for Args {
    fn default() -> Self {
        Self::none()
    }
}

impl Args {
    /// No arguments.
    #[must_use]
    pub const fn none() -> Self {
        Self::Positional(Vec::new())
    }

    /// Creates positional arguments.
    pub fn positional<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self::Positional(values.into_iter().map(Into::into).collect())
    }

    /// Creates named arguments.
    pub fn named<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        Self::Named(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Classifies the argument list of a variadic call site.
    ///
    /// A single array or object argument is unwrapped and classified by its
    /// own shape (see [`Args::from_json`]). Any other list is positional.
    #[must_use]
    pub fn from_values(mut values: Vec<Value>) -> Self {
        if values.len() == 1 && matches!(values[0], Value::Json(_)) {
            if let Some(Value::Json(json)) = values.pop() {
                return Self::from_json(json);
            }
        }
        Self::Positional(values)
    }

    /// Classifies a JSON value by shape.
    ///
    /// Arrays and objects keyed exactly `"0"`, `"1"`, ... in order are
    /// positional; other objects are named; scalars become a single
    /// positional value.
    #[must_use]
    pub fn from_json(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Array(items) => {
                Self::Positional(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => {
                let mut indices: Vec<usize> = map.keys().filter_map(|k| index_key(k)).collect();
                indices.sort_unstable();
                let sequential = !map.is_empty()
                    && indices.len() == map.len()
                    && indices.iter().enumerate().all(|(i, k)| i == *k);
                if sequential {
                    let mut entries: Vec<(usize, serde_json::Value)> = map
                        .into_iter()
                        .filter_map(|(k, v)| index_key(&k).map(|k| (k, v)))
                        .collect();
                    entries.sort_by_key(|(k, _)| *k);
                    Self::Positional(entries.into_iter().map(|(_, v)| Value::from(v)).collect())
                } else {
                    Self::Named(map.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
                }
            }
            scalar => Self::Positional(vec![Value::from(scalar)]),
        }
    }

    /// Returns whether the arguments are named.
    #[must_use]
    pub const fn is_named(&self) -> bool {
        matches!(self, Self::Named(_))
    }

    /// Returns the number of values.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Positional(values) => values.len(),
            Self::Named(map) => map.len(),
        }
    }

    /// Returns whether there are no values.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the named value for `name`, if any.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        match self {
            Self::Named(map) => map.get(name),
            Self::Positional(_) => None,
        }
    }
}

/// Parses an object key in canonical integer form (`"7"`, not `"07"`).
fn index_key(key: &str) -> Option<usize> {
    key.parse::<usize>().ok().filter(|n| n.to_string() == key)
}

impl From<Vec<Value>> for Args {
    fn from(values: Vec<Value>) -> Self {
        Self::Positional(values)
    }
}

impl From<BTreeMap<String, Value>> for Args {
    fn from(map: BTreeMap<String, Value>) -> Self {
        Self::Named(map)
    }
}
