//! Field types and values exchanged between entities and documents.

use chrono::{DateTime, Utc};
use serde_json::{Number, Value};
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

/// Date format Solr expects for date fields.
pub const SOLR_DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Declared type of a mapped field.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FieldType {
    /// Untokenized string.
    #[default]
    String,
    /// Tokenized full-text.
    Text,
    /// 32-bit integer.
    Integer,
    /// 64-bit integer.
    Long,
    /// Single precision float.
    Float,
    /// Double precision float.
    Double,
    /// Boolean.
    Boolean,
    /// Date, normalized to [`SOLR_DATE_FORMAT`].
    Date,
    /// Multi-valued string field.
    Strings,
    /// Schema-specific type passed through untouched.
    Custom(String),
}

impl FieldType {
    /// Name of the type as used in mapping tables.
    pub fn as_str(&self) -> &str {
        match self {
            FieldType::String => "string",
            FieldType::Text => "text",
            FieldType::Integer => "integer",
            FieldType::Long => "long",
            FieldType::Float => "float",
            FieldType::Double => "double",
            FieldType::Boolean => "boolean",
            FieldType::Date => "date",
            FieldType::Strings => "strings",
            FieldType::Custom(name) => name,
        }
    }

    /// Whether the field holds repeated values.
    pub fn is_multi_valued(&self) -> bool {
        matches!(self, FieldType::Strings)
    }

    /// Convert a value read from a search hit into a [`FieldValue`].
    pub fn read_json(&self, value: &Value) -> Result<FieldValue, String> {
        if value.is_null() {
            return Ok(FieldValue::Null);
        }

        if self.is_multi_valued() {
            return match value {
                Value::Array(items) => items
                    .iter()
                    .map(|item| FieldType::String.read_json(item))
                    .collect::<Result<Vec<_>, _>>()
                    .map(FieldValue::List),
                other => Ok(FieldValue::List(vec![FieldType::String.read_json(other)?])),
            };
        }

        // Solr may hand back single-valued fields as one-element arrays
        let value = match value {
            Value::Array(items) if items.len() == 1 => &items[0],
            Value::Array(_) => {
                return Err(format!("expected a single {} value, got an array", self.as_str()));
            }
            other => other,
        };

        match self {
            FieldType::Integer | FieldType::Long => match value {
                Value::Number(n) => n
                    .as_i64()
                    .map(FieldValue::Int)
                    .ok_or_else(|| format!("{} is not an integer", n)),
                Value::String(s) => s
                    .parse()
                    .map(FieldValue::Int)
                    .map_err(|_| format!("'{}' is not an integer", s)),
                other => Err(format!("cannot read {} as integer", other)),
            },
            FieldType::Float | FieldType::Double => match value {
                Value::Number(n) => n
                    .as_f64()
                    .map(FieldValue::Float)
                    .ok_or_else(|| format!("{} is not a number", n)),
                Value::String(s) => s
                    .parse()
                    .map(FieldValue::Float)
                    .map_err(|_| format!("'{}' is not a number", s)),
                other => Err(format!("cannot read {} as float", other)),
            },
            FieldType::Boolean => match value {
                Value::Bool(b) => Ok(FieldValue::Bool(*b)),
                Value::String(s) => s
                    .parse()
                    .map(FieldValue::Bool)
                    .map_err(|_| format!("'{}' is not a boolean", s)),
                other => Err(format!("cannot read {} as boolean", other)),
            },
            FieldType::Date => match value {
                Value::String(s) => DateTime::parse_from_rfc3339(s)
                    .map(|d| FieldValue::Date(d.with_timezone(&Utc)))
                    .map_err(|e| format!("'{}' is not a date: {}", s, e)),
                other => Err(format!("cannot read {} as date", other)),
            },
            FieldType::String | FieldType::Text | FieldType::Custom(_) | FieldType::Strings => {
                Ok(match value {
                    Value::String(s) => FieldValue::Text(s.clone()),
                    Value::Bool(b) => FieldValue::Bool(*b),
                    Value::Number(n) => match n.as_i64() {
                        Some(i) => FieldValue::Int(i),
                        None => FieldValue::Float(n.as_f64().unwrap_or_default()),
                    },
                    other => FieldValue::Text(other.to_string()),
                })
            }
        }
    }
}

impl FromStr for FieldType {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_lowercase().as_str() {
            "" | "string" => FieldType::String,
            "text" => FieldType::Text,
            "integer" | "int" => FieldType::Integer,
            "long" => FieldType::Long,
            "float" => FieldType::Float,
            "double" => FieldType::Double,
            "boolean" | "bool" => FieldType::Boolean,
            "date" => FieldType::Date,
            "strings" => FieldType::Strings,
            _ => FieldType::Custom(s.to_string()),
        })
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A value read from or written to an entity field.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum FieldValue {
    /// No value.
    #[default]
    Null,
    /// Boolean.
    Bool(bool),
    /// Integer.
    Int(i64),
    /// Floating point number.
    Float(f64),
    /// Text.
    Text(String),
    /// UTC timestamp.
    Date(DateTime<Utc>),
    /// Repeated values.
    List(Vec<FieldValue>),
}

impl FieldValue {
    /// Returns true for [`FieldValue::Null`] and empty lists.
    pub fn is_null(&self) -> bool {
        match self {
            FieldValue::Null => true,
            FieldValue::List(items) => items.is_empty(),
            _ => false,
        }
    }

    /// Borrow the text, if this is a text value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Read an integer, parsing text when needed.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            FieldValue::Int(i) => Some(*i),
            FieldValue::Text(s) => s.parse().ok(),
            _ => None,
        }
    }

    /// Read a float, widening integers.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Float(f) => Some(*f),
            FieldValue::Int(i) => Some(*i as f64),
            FieldValue::Text(s) => s.parse().ok(),
            _ => None,
        }
    }

    /// Read a boolean.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FieldValue::Bool(b) => Some(*b),
            FieldValue::Text(s) => s.parse().ok(),
            _ => None,
        }
    }

    /// Read a timestamp.
    pub fn as_date(&self) -> Option<DateTime<Utc>> {
        match self {
            FieldValue::Date(d) => Some(*d),
            _ => None,
        }
    }

    /// Convert into a string, if the value is a scalar.
    pub fn into_string(self) -> Option<String> {
        match self {
            FieldValue::Null | FieldValue::List(_) => None,
            other => Some(other.to_term()),
        }
    }

    /// Convert into a list of strings. Scalars become one-element lists.
    pub fn into_strings(self) -> Vec<String> {
        match self {
            FieldValue::List(items) => items
                .into_iter()
                .filter_map(FieldValue::into_string)
                .collect(),
            other => other.into_string().into_iter().collect(),
        }
    }

    /// Literal text form used in document keys and query terms.
    pub fn to_term(&self) -> String {
        match self {
            FieldValue::Null => String::new(),
            FieldValue::Bool(b) => b.to_string(),
            FieldValue::Int(i) => i.to_string(),
            FieldValue::Float(f) => f.to_string(),
            FieldValue::Text(s) => s.clone(),
            FieldValue::Date(d) => d.format(SOLR_DATE_FORMAT).to_string(),
            FieldValue::List(items) => items
                .iter()
                .map(FieldValue::to_term)
                .collect::<Vec<_>>()
                .join(" "),
        }
    }

    /// Normalize into the JSON representation sent to Solr.
    pub fn to_json(&self) -> Value {
        match self {
            FieldValue::Null => Value::Null,
            FieldValue::Bool(b) => Value::Bool(*b),
            FieldValue::Int(i) => Value::Number((*i).into()),
            FieldValue::Float(f) => Number::from_f64(*f)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            FieldValue::Text(s) => Value::String(s.clone()),
            FieldValue::Date(d) => Value::String(d.format(SOLR_DATE_FORMAT).to_string()),
            FieldValue::List(items) => Value::Array(
                items
                    .iter()
                    .filter(|item| !item.is_null())
                    .map(FieldValue::to_json)
                    .collect(),
            ),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<&String> for FieldValue {
    fn from(value: &String) -> Self {
        FieldValue::Text(value.clone())
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Bool(value)
    }
}

impl From<i32> for FieldValue {
    fn from(value: i32) -> Self {
        FieldValue::Int(value.into())
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Int(value)
    }
}

impl From<u32> for FieldValue {
    fn from(value: u32) -> Self {
        FieldValue::Int(value.into())
    }
}

impl From<f32> for FieldValue {
    fn from(value: f32) -> Self {
        FieldValue::Float(value.into())
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Float(value)
    }
}

impl From<DateTime<Utc>> for FieldValue {
    fn from(value: DateTime<Utc>) -> Self {
        FieldValue::Date(value)
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(FieldValue::Null)
    }
}

impl<T: Into<FieldValue>> From<Vec<T>> for FieldValue {
    fn from(value: Vec<T>) -> Self {
        FieldValue::List(value.into_iter().map(Into::into).collect())
    }
}
