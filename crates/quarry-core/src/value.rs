//! Parameter and result values.
//!
//! [`Value`] covers everything a caller may hand over as an argument and
//! everything a driver hands back in a row. Only a closed subset can be
//! bound as a parameter; see [`Value::to_param`].

use std::fmt;

use crate::dialect::Dialect;
use crate::error::{Error, Result};

/// A value passed to or returned from a query.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// NULL value.
    Null,
    /// Boolean value.
    Bool(bool),
    /// Integer value.
    Int(i64),
    /// Float value. Returned by drivers, never bindable.
    Float(f64),
    /// Text value.
    Text(String),
    /// Binary value. Returned by drivers, never bindable.
    Bytes(Vec<u8>),
    /// Structured value, bound as its JSON text.
    Json(serde_json::Value),
}

/// Type tag handed to the driver together with a bound value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
    /// SQL NULL.
    Null,
    /// Boolean.
    Bool,
    /// 64-bit integer.
    Int,
    /// Text (also used for JSON-encoded structures).
    Text,
}

/// A value that passed the bind type check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Param {
    /// SQL NULL.
    Null,
    /// Boolean.
    Bool(bool),
    /// 64-bit integer.
    Int(i64),
    /// Text.
    Text(String),
}

impl Param {
    /// Returns the type tag for the driver.
    #[must_use]
    pub const fn param_type(&self) -> ParamType {
        match self {
            Self::Null => ParamType::Null,
            Self::Bool(_) => ParamType::Bool,
            Self::Int(_) => ParamType::Int,
            Self::Text(_) => ParamType::Text,
        }
    }
}

impl Value {
    /// Returns a short name of the value kind, used in error messages.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Text(_) => "string",
            Self::Bytes(_) => "bytes",
            Self::Json(serde_json::Value::Array(_)) => "array",
            Self::Json(serde_json::Value::Object(_)) => "object",
            Self::Json(_) => "json scalar",
        }
    }

    /// Returns whether the value is NULL.
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Converts the value into a bindable parameter.
    ///
    /// Arrays and objects are serialized to JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedParameterType`] for floats, bytes and
    /// JSON scalars. `parameter` names the parameter in the message.
    pub fn to_param(&self, parameter: &str) -> Result<Param> {
        match self {
            Self::Null => Ok(Param::Null),
            Self::Bool(b) => Ok(Param::Bool(*b)),
            Self::Int(n) => Ok(Param::Int(*n)),
            Self::Text(s) => Ok(Param::Text(s.clone())),
            Self::Json(json @ (serde_json::Value::Array(_) | serde_json::Value::Object(_))) => {
                Ok(Param::Text(json.to_string()))
            }
            Self::Float(_) | Self::Bytes(_) | Self::Json(_) => Err(Error::UnsupportedParameterType {
                parameter: parameter.to_string(),
                kind: self.kind(),
            }),
        }
    }

    /// Renders the value as an inline SQL literal for diagnostics.
    ///
    /// Strings and JSON structures are quoted with the dialect's quoting
    /// convention. The result is a debug aid, not safe SQL.
    #[must_use]
    pub fn to_literal(&self, dialect: Dialect) -> String {
        match self {
            Self::Null | Self::Json(serde_json::Value::Null) => String::from("NULL"),
            Self::Bool(b) => b.to_string(),
            Self::Int(n) => n.to_string(),
            Self::Float(f) => f.to_string(),
            Self::Text(s) => dialect.quote_literal(s),
            Self::Bytes(b) => {
                let hex: String = b.iter().map(|byte| format!("{byte:02X}")).collect();
                format!("X'{hex}'")
            }
            Self::Json(serde_json::Value::String(s)) => dialect.quote_literal(s),
            Self::Json(json @ (serde_json::Value::Array(_) | serde_json::Value::Object(_))) => {
                dialect.quote_literal(&json.to_string())
            }
            Self::Json(json) => json.to_string(),
        }
    }

    /// Converts the value to JSON, for template contexts.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Null => serde_json::Value::Null,
            Self::Bool(b) => serde_json::Value::Bool(*b),
            Self::Int(n) => serde_json::Value::from(*n),
            Self::Float(f) => serde_json::Value::from(*f),
            Self::Text(s) => serde_json::Value::String(s.clone()),
            Self::Bytes(b) => serde_json::Value::from(b.clone()),
            Self::Json(json) => json.clone(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("NULL"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(n) => write!(f, "{n}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Text(s) => f.write_str(s),
            Self::Bytes(b) => write!(f, "<{} bytes>", b.len()),
            Self::Json(json) => write!(f, "{json}"),
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(b),
            serde_json::Value::Number(n) => n
                .as_i64()
                .map_or_else(|| n.as_f64().map_or(Self::Null, Self::Float), Self::Int),
            serde_json::Value::String(s) => Self::Text(s),
            json @ (serde_json::Value::Array(_) | serde_json::Value::Object(_)) => Self::Json(json),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

macro_rules! impl_from_int {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Value {
                fn from(n: $ty) -> Self {
                    Self::Int(i64::from(n))
                }
            }
        )*
    };
}

impl_from_int!(i8, i16, i32, i64, u8, u16, u32);

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<Vec<u8>> for Value {
    fn from(b: Vec<u8>) -> Self {
        Self::Bytes(b)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        opt.map_or(Self::Null, Into::into)
    }
}
