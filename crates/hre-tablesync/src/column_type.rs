//! Column types as declared in the catalog
//!
//! Each variant knows how to coerce a CSV field into a [`Value`] and how to
//! format a stored value back into CSV text.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use hre_core::Value;
use serde::{Deserialize, Serialize};

const TIMESTAMP_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// SQL column type, normalised from the declared type string
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColumnType {
    Varchar,
    Char,
    Clob,
    TinyInt,
    SmallInt,
    Integer,
    BigInt,
    Double,
    Real,
    Decimal,
    Boolean,
    Date,
    Time,
    Timestamp,
    VarBinary,
    Blob,
    /// Anything not recognised, including SQLite columns with no declared type
    Other(String),
}

/// A declared type split into its base type and optional modifiers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDeclaration {
    pub sql_type: ColumnType,
    pub precision: Option<u32>,
    pub scale: Option<u32>,
}

impl ColumnType {
    /// Parse a declared type such as `VARCHAR(255)`, `DECIMAL(10, 2)` or
    /// `DOUBLE PRECISION`
    pub fn parse_declared(declared: &str) -> TypeDeclaration {
        let upper = declared.trim().to_uppercase();
        let (base, modifiers) = match upper.find('(') {
            Some(start) => (upper[..start].trim(), Some(&upper[start..])),
            None => (upper.as_str(), None),
        };
        let base = base
            .trim_end_matches(" UNSIGNED")
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ");

        let sql_type = match base.as_str() {
            "VARCHAR" | "VARCHAR2" | "NVARCHAR" | "CHARACTER VARYING" | "VARCHAR_IGNORECASE" => {
                ColumnType::Varchar
            }
            "CHAR" | "CHARACTER" | "NCHAR" => ColumnType::Char,
            "TEXT" | "CLOB" | "CHARACTER LARGE OBJECT" => ColumnType::Clob,
            "TINYINT" => ColumnType::TinyInt,
            "SMALLINT" | "INT2" => ColumnType::SmallInt,
            "INTEGER" | "INT" | "INT4" | "MEDIUMINT" => ColumnType::Integer,
            "BIGINT" | "INT8" => ColumnType::BigInt,
            "DOUBLE" | "DOUBLE PRECISION" | "FLOAT" | "FLOAT8" => ColumnType::Double,
            "REAL" | "FLOAT4" => ColumnType::Real,
            "DECIMAL" | "NUMERIC" | "NUMBER" | "DEC" => ColumnType::Decimal,
            "BOOLEAN" | "BOOL" | "BIT" => ColumnType::Boolean,
            "DATE" => ColumnType::Date,
            "TIME" => ColumnType::Time,
            "TIMESTAMP" | "DATETIME" => ColumnType::Timestamp,
            "VARBINARY" | "BINARY" | "BINARY VARYING" => ColumnType::VarBinary,
            "BLOB" | "BYTEA" | "BINARY LARGE OBJECT" => ColumnType::Blob,
            _ => ColumnType::Other(base.clone()),
        };

        let (precision, scale) = modifiers.map(parse_precision_scale).unwrap_or((None, None));
        TypeDeclaration {
            sql_type,
            precision,
            scale,
        }
    }

    /// Canonical SQL name of the type
    pub fn sql_name(&self) -> &str {
        match self {
            ColumnType::Varchar => "VARCHAR",
            ColumnType::Char => "CHAR",
            ColumnType::Clob => "CLOB",
            ColumnType::TinyInt => "TINYINT",
            ColumnType::SmallInt => "SMALLINT",
            ColumnType::Integer => "INTEGER",
            ColumnType::BigInt => "BIGINT",
            ColumnType::Double => "DOUBLE",
            ColumnType::Real => "REAL",
            ColumnType::Decimal => "DECIMAL",
            ColumnType::Boolean => "BOOLEAN",
            ColumnType::Date => "DATE",
            ColumnType::Time => "TIME",
            ColumnType::Timestamp => "TIMESTAMP",
            ColumnType::VarBinary => "VARBINARY",
            ColumnType::Blob => "BLOB",
            ColumnType::Other(name) => name,
        }
    }

    /// Precision reported when the declaration carries none
    pub fn default_precision(&self) -> u32 {
        match self {
            ColumnType::TinyInt => 3,
            ColumnType::SmallInt => 5,
            ColumnType::Integer => 10,
            ColumnType::BigInt => 19,
            ColumnType::Real => 7,
            ColumnType::Double => 17,
            _ => 0,
        }
    }

    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            ColumnType::TinyInt | ColumnType::SmallInt | ColumnType::Integer | ColumnType::BigInt
        )
    }

    pub fn is_textual(&self) -> bool {
        matches!(
            self,
            ColumnType::Varchar | ColumnType::Char | ColumnType::Clob
        )
    }

    pub fn is_binary(&self) -> bool {
        matches!(self, ColumnType::VarBinary | ColumnType::Blob)
    }

    /// Precision and scale carried into an export column.
    ///
    /// VARCHAR drops its length, numeric and VARBINARY columns keep what was
    /// declared, everything else is exported as (0, 0).
    pub fn export_precision_scale(&self, precision: u32, scale: u32) -> (u32, u32) {
        match self {
            ColumnType::Varchar => (0, scale),
            ColumnType::Double
            | ColumnType::VarBinary
            | ColumnType::TinyInt
            | ColumnType::SmallInt
            | ColumnType::Integer
            | ColumnType::BigInt => (precision, scale),
            _ => (0, 0),
        }
    }

    /// Coerce the text of one CSV field into a value of this type.
    ///
    /// Empty text is NULL for every typed non-character column. Lengths and integer
    /// widths are left to the engine, which stores what it accepts.
    pub fn coerce(&self, text: &str) -> Result<Value, String> {
        if text.is_empty() && !self.is_textual() && !matches!(self, ColumnType::Other(_)) {
            return Ok(Value::Null);
        }

        match self {
            ColumnType::Varchar | ColumnType::Char | ColumnType::Clob => {
                Ok(Value::String(text.to_string()))
            }
            ColumnType::TinyInt | ColumnType::SmallInt | ColumnType::Integer | ColumnType::BigInt => {
                parse_integer(text, self)
            }
            ColumnType::Double | ColumnType::Real => text
                .trim()
                .parse::<f64>()
                .map(Value::Float64)
                .map_err(|_| format!("'{}' is not a valid {}", text, self.sql_name())),
            ColumnType::Decimal => {
                let trimmed = text.trim();
                trimmed
                    .parse::<f64>()
                    .map(|_| Value::Decimal(trimmed.to_string()))
                    .map_err(|_| format!("'{}' is not a valid DECIMAL", text))
            }
            ColumnType::Boolean => match text.trim().to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" | "t" => Ok(Value::Bool(true)),
                "false" | "0" | "no" | "f" => Ok(Value::Bool(false)),
                _ => Err(format!("'{}' is not a valid BOOLEAN", text)),
            },
            ColumnType::Date => NaiveDate::parse_from_str(text.trim(), "%Y-%m-%d")
                .map(Value::Date)
                .map_err(|_| format!("'{}' is not a valid DATE (expected YYYY-MM-DD)", text)),
            ColumnType::Time => NaiveTime::parse_from_str(text.trim(), "%H:%M:%S%.f")
                .map(Value::Time)
                .map_err(|_| format!("'{}' is not a valid TIME (expected HH:MM:SS)", text)),
            ColumnType::Timestamp => {
                let trimmed = text.trim();
                TIMESTAMP_FORMATS
                    .iter()
                    .find_map(|fmt| NaiveDateTime::parse_from_str(trimmed, fmt).ok())
                    .map(Value::DateTime)
                    .ok_or_else(|| format!("'{}' is not a valid TIMESTAMP", text))
            }
            ColumnType::VarBinary | ColumnType::Blob => hex::decode(text.trim())
                .map(Value::Bytes)
                .map_err(|e| format!("'{}' is not valid hex for {}: {}", text, self.sql_name(), e)),
            // Column affinity decides what an untyped value becomes.
            ColumnType::Other(_) => Ok(Value::String(text.to_string())),
        }
    }

    /// Format a non-NULL stored value as CSV text.
    ///
    /// Returns `None` for NULL. Values are written in full; declared scale
    /// is column metadata only.
    pub fn format(&self, value: &Value) -> Option<String> {
        let text = match value {
            Value::Null => return None,
            Value::Bytes(bytes) => hex::encode(bytes),
            Value::String(s) if self.is_binary() => hex::encode(s.as_bytes()),
            Value::Bool(b) if self.is_integer() => (if *b { "1" } else { "0" }).to_string(),
            Value::DateTime(dt) => dt.format("%Y-%m-%d %H:%M:%S%.f").to_string(),
            other => other.to_string(),
        };
        Some(text)
    }
}

impl std::fmt::Display for ColumnType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.sql_name())
    }
}

/// Integers bind as `Int64`. Other numbers bind as `Float64` so rows the
/// engine stored with a fractional or oversized value still load.
fn parse_integer(text: &str, sql_type: &ColumnType) -> Result<Value, String> {
    let trimmed = text.trim();
    if let Ok(i) = trimmed.parse::<i64>() {
        return Ok(Value::Int64(i));
    }
    trimmed
        .parse::<f64>()
        .ok()
        .filter(|f| f.is_finite())
        .map(Value::Float64)
        .ok_or_else(|| format!("'{}' is not a valid {}", text, sql_type.sql_name()))
}

fn parse_precision_scale(modifiers: &str) -> (Option<u32>, Option<u32>) {
    if let Some(start) = modifiers.find('(')
        && let Some(end) = modifiers.find(')')
        && start < end
    {
        let inner = &modifiers[start + 1..end];
        let parts: Vec<&str> = inner.split(',').map(|s| s.trim()).collect();
        let precision = parts.first().and_then(|p| p.parse().ok());
        let scale = parts.get(1).and_then(|s| s.parse().ok());
        return (precision, scale);
    }
    (None, None)
}
