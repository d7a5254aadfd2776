use chrono::NaiveDateTime;
use serde::Serialize;
use serde_json::Value as JsonValue;

/// Values that can be bound as query parameters or read back from a result row.
///
/// The same enum serves the legacy request path and the direct helpers, so route code never
/// touches driver types:
/// ```rust
/// use legacy_sql_bridge::prelude::*;
///
/// let params = vec![
///     RowValues::Int(1),
///     RowValues::Text("alice".into()),
///     RowValues::Bool(true),
/// ];
/// # let _ = params;
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RowValues {
    /// Integer value (64-bit)
    Int(i64),
    /// Floating point value (64-bit)
    Float(f64),
    /// Text/string value
    Text(String),
    /// Boolean value
    Bool(bool),
    /// Timestamp value
    Timestamp(NaiveDateTime),
    /// NULL value
    Null,
    /// JSON value
    JSON(JsonValue),
    /// Binary data
    Blob(Vec<u8>),
}

impl RowValues {
    /// Check if this value is NULL
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub fn as_int(&self) -> Option<&i64> {
        if let RowValues::Int(value) = self {
            Some(value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        if let RowValues::Text(value) = self {
            Some(value)
        } else {
            None
        }
    }

    /// Booleans, plus the `0`/`1` integers legacy `BIT` columns tend to produce.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            RowValues::Bool(value) => Some(*value),
            RowValues::Int(1) => Some(true),
            RowValues::Int(0) => Some(false),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_timestamp(&self) -> Option<NaiveDateTime> {
        if let RowValues::Timestamp(value) = self {
            return Some(*value);
        } else if let Some(s) = self.as_text() {
            // Try "YYYY-MM-DD HH:MM:SS"
            if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
                return Some(dt);
            }
            // Try "YYYY-MM-DD HH:MM:SS.SSS"
            if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S.%3f") {
                return Some(dt);
            }
        }
        None
    }

    #[must_use]
    pub fn as_float(&self) -> Option<f64> {
        if let RowValues::Float(value) = self {
            Some(*value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_blob(&self) -> Option<&[u8]> {
        if let RowValues::Blob(bytes) = self {
            Some(bytes)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_json(&self) -> Option<&JsonValue> {
        if let RowValues::JSON(value) = self {
            Some(value)
        } else {
            None
        }
    }
}

impl From<i64> for RowValues {
    fn from(value: i64) -> Self {
        RowValues::Int(value)
    }
}

impl From<i32> for RowValues {
    fn from(value: i32) -> Self {
        RowValues::Int(i64::from(value))
    }
}

impl From<f64> for RowValues {
    fn from(value: f64) -> Self {
        RowValues::Float(value)
    }
}

impl From<bool> for RowValues {
    fn from(value: bool) -> Self {
        RowValues::Bool(value)
    }
}

impl From<&str> for RowValues {
    fn from(value: &str) -> Self {
        RowValues::Text(value.to_string())
    }
}

impl From<String> for RowValues {
    fn from(value: String) -> Self {
        RowValues::Text(value)
    }
}

impl From<NaiveDateTime> for RowValues {
    fn from(value: NaiveDateTime) -> Self {
        RowValues::Timestamp(value)
    }
}

impl From<JsonValue> for RowValues {
    fn from(value: JsonValue) -> Self {
        RowValues::JSON(value)
    }
}

impl From<Vec<u8>> for RowValues {
    fn from(value: Vec<u8>) -> Self {
        RowValues::Blob(value)
    }
}

impl<T: Into<RowValues>> From<Option<T>> for RowValues {
    fn from(value: Option<T>) -> Self {
        value.map_or(RowValues::Null, Into::into)
    }
}

/// Column types a legacy call site declares when binding a named parameter.
///
/// Recorded alongside the binding so diagnostics can show what the caller meant; the value
/// itself is sent as-is and PostgreSQL infers the parameter type from the statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SqlType {
    Int,
    BigInt,
    SmallInt,
    TinyInt,
    Bit,
    Decimal,
    Float,
    Real,
    Money,
    NVarChar,
    VarChar,
    NChar,
    Char,
    NText,
    Text,
    DateTime,
    DateTime2,
    Date,
    Time,
    DateTimeOffset,
    UniqueIdentifier,
    VarBinary,
    Xml,
}
