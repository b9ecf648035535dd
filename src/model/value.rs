//! Cell values and declared column types

use std::borrow::Cow;

use chrono::{NaiveDate, NaiveDateTime};
use serde::ser::{Serialize, Serializer};

use crate::error::{Result, TabError};

/// A single cell value in a dataset table
#[derive(Debug, Clone)]
pub enum CellValue {
    /// SQL NULL
    Null,
    /// No value was supplied for this column in this row (verbose XML `<none/>`);
    /// distinct from NULL
    NoValue,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
}

impl PartialEq for CellValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (CellValue::Null, CellValue::Null) => true,
            (CellValue::NoValue, CellValue::NoValue) => true,
            (CellValue::Bool(a), CellValue::Bool(b)) => a == b,
            (CellValue::Int(a), CellValue::Int(b)) => a == b,
            (CellValue::Float(a), CellValue::Float(b)) => {
                if a.is_nan() && b.is_nan() {
                    true
                } else {
                    a == b
                }
            }
            (CellValue::Str(a), CellValue::Str(b)) => a == b,
            (CellValue::Date(a), CellValue::Date(b)) => a == b,
            (CellValue::DateTime(a), CellValue::DateTime(b)) => a == b,
            // Cross-type numeric comparison
            (CellValue::Int(a), CellValue::Float(b)) => (*a as f64) == *b,
            (CellValue::Float(a), CellValue::Int(b)) => *a == (*b as f64),
            _ => false,
        }
    }
}

impl Eq for CellValue {}

impl CellValue {
    /// Check if the value is SQL NULL
    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }

    /// Check if the value is the no-value marker
    pub fn is_no_value(&self) -> bool {
        matches!(self, CellValue::NoValue)
    }

    /// Convert to a display string for diagnostics
    pub fn display(&self) -> Cow<'_, str> {
        match self {
            CellValue::Null => Cow::Borrowed("NULL"),
            CellValue::NoValue => Cow::Borrowed("[none]"),
            CellValue::Bool(b) => Cow::Owned(b.to_string()),
            CellValue::Int(i) => Cow::Owned(i.to_string()),
            CellValue::Float(f) => Cow::Owned(f.to_string()),
            CellValue::Str(s) => Cow::Borrowed(s.as_str()),
            CellValue::Date(d) => Cow::Owned(d.to_string()),
            CellValue::DateTime(dt) => Cow::Owned(dt.to_string()),
        }
    }

    /// Render the value as dataset file text (dates ISO, numbers plain).
    /// NULL and the no-value marker have no text form; formats encode them
    /// structurally.
    pub fn to_text(&self) -> String {
        match self {
            CellValue::DateTime(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
            other => other.display().into_owned(),
        }
    }

    /// Parse a raw CSV field into a value; empty fields and the literal
    /// `null`/`NA` markers map to NULL.
    pub fn parse(s: &str) -> CellValue {
        let trimmed = s.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("null") || trimmed == "NA" {
            return CellValue::Null;
        }
        Self::parse_literal(trimmed)
    }

    /// Parse element/attribute text into a value. Unlike [`CellValue::parse`],
    /// nothing maps to NULL here: XML encodes NULL structurally, so `"null"`
    /// stays a string and `""` stays the empty string.
    pub fn parse_literal(s: &str) -> CellValue {
        if s.eq_ignore_ascii_case("true") {
            return CellValue::Bool(true);
        }
        if s.eq_ignore_ascii_case("false") {
            return CellValue::Bool(false);
        }

        if let Ok(i) = s.parse::<i64>() {
            return CellValue::Int(i);
        }
        if let Ok(f) = s.parse::<f64>() {
            return CellValue::Float(f);
        }

        if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
            return CellValue::Date(date);
        }
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S") {
            return CellValue::DateTime(dt);
        }
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
            return CellValue::DateTime(dt);
        }

        CellValue::Str(s.to_string())
    }
}

impl std::fmt::Display for CellValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display())
    }
}

impl Serialize for CellValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            CellValue::Null => serializer.serialize_none(),
            CellValue::NoValue => serializer.serialize_str("[none]"),
            CellValue::Bool(b) => serializer.serialize_bool(*b),
            CellValue::Int(i) => serializer.serialize_i64(*i),
            CellValue::Float(f) => serializer.serialize_f64(*f),
            CellValue::Str(s) => serializer.serialize_str(s),
            CellValue::Date(d) => serializer.serialize_str(&d.to_string()),
            CellValue::DateTime(dt) => serializer.serialize_str(&dt.to_string()),
        }
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Str(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::Str(s)
    }
}

impl From<i64> for CellValue {
    fn from(i: i64) -> Self {
        CellValue::Int(i)
    }
}

impl From<f64> for CellValue {
    fn from(f: f64) -> Self {
        CellValue::Float(f)
    }
}

impl From<bool> for CellValue {
    fn from(b: bool) -> Self {
        CellValue::Bool(b)
    }
}

impl<T> From<Option<T>> for CellValue
where
    T: Into<CellValue>,
{
    fn from(opt: Option<T>) -> Self {
        match opt {
            Some(v) => v.into(),
            None => CellValue::Null,
        }
    }
}

/// Declared column type, used for comparison coercion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, serde::Serialize, serde::Deserialize)]
pub enum DataType {
    #[default]
    Unknown,
    Boolean,
    Integer,
    BigInt,
    Double,
    Decimal,
    Varchar,
    Date,
    Timestamp,
}

impl DataType {
    /// Declared-type name as written in dataset metadata
    pub fn name(&self) -> &'static str {
        match self {
            DataType::Unknown => "UNKNOWN",
            DataType::Boolean => "BOOLEAN",
            DataType::Integer => "INTEGER",
            DataType::BigInt => "BIGINT",
            DataType::Double => "DOUBLE",
            DataType::Decimal => "DECIMAL",
            DataType::Varchar => "VARCHAR",
            DataType::Date => "DATE",
            DataType::Timestamp => "TIMESTAMP",
        }
    }

    /// Parse a declared-type name; unrecognized names map to Unknown
    pub fn from_name(name: &str) -> DataType {
        match name.to_ascii_uppercase().as_str() {
            "BOOLEAN" | "BOOL" | "BIT" => DataType::Boolean,
            "INTEGER" | "INT" | "SMALLINT" | "TINYINT" => DataType::Integer,
            "BIGINT" => DataType::BigInt,
            "DOUBLE" | "FLOAT" | "REAL" => DataType::Double,
            "DECIMAL" | "NUMERIC" => DataType::Decimal,
            "VARCHAR" | "CHAR" | "TEXT" | "CLOB" => DataType::Varchar,
            "DATE" => DataType::Date,
            "TIMESTAMP" | "DATETIME" => DataType::Timestamp,
            _ => DataType::Unknown,
        }
    }

    /// The natural declared type of a value; used when a format carries no
    /// type metadata and types are inferred from the data.
    pub fn for_value(value: &CellValue) -> DataType {
        match value {
            CellValue::Null | CellValue::NoValue => DataType::Unknown,
            CellValue::Bool(_) => DataType::Boolean,
            CellValue::Int(i) => {
                if *i > i32::MAX as i64 || *i < i32::MIN as i64 {
                    DataType::BigInt
                } else {
                    DataType::Integer
                }
            }
            CellValue::Float(_) => DataType::Double,
            CellValue::Str(_) => DataType::Varchar,
            CellValue::Date(_) => DataType::Date,
            CellValue::DateTime(_) => DataType::Timestamp,
        }
    }

    /// Widen this type to accommodate another observed type
    pub fn widen(self, other: DataType) -> DataType {
        if self == other {
            return self;
        }
        match (self, other) {
            (DataType::Unknown, t) | (t, DataType::Unknown) => t,
            (DataType::Integer, DataType::BigInt) | (DataType::BigInt, DataType::Integer) => {
                DataType::BigInt
            }
            (DataType::Integer | DataType::BigInt, DataType::Double | DataType::Decimal)
            | (DataType::Double | DataType::Decimal, DataType::Integer | DataType::BigInt) => {
                DataType::Double
            }
            (DataType::Double, DataType::Decimal) | (DataType::Decimal, DataType::Double) => {
                DataType::Decimal
            }
            (DataType::Date, DataType::Timestamp) | (DataType::Timestamp, DataType::Date) => {
                DataType::Timestamp
            }
            _ => DataType::Varchar,
        }
    }

    /// Coerce a value for comparison under this declared type.
    ///
    /// NULL and the no-value marker always pass through unchanged; anything
    /// that cannot be represented in this type is a `TypeMismatch` error.
    pub fn coerce(&self, value: &CellValue) -> Result<CellValue> {
        if value.is_null() || value.is_no_value() {
            return Ok(value.clone());
        }

        let mismatch = || TabError::TypeMismatch {
            value: value.display().into_owned(),
            data_type: self.name().to_string(),
        };

        match self {
            DataType::Unknown => Ok(value.clone()),
            DataType::Boolean => match value {
                CellValue::Bool(b) => Ok(CellValue::Bool(*b)),
                CellValue::Int(0) => Ok(CellValue::Bool(false)),
                CellValue::Int(1) => Ok(CellValue::Bool(true)),
                CellValue::Str(s) => match s.to_ascii_lowercase().as_str() {
                    "true" | "1" => Ok(CellValue::Bool(true)),
                    "false" | "0" => Ok(CellValue::Bool(false)),
                    _ => Err(mismatch()),
                },
                _ => Err(mismatch()),
            },
            DataType::Integer | DataType::BigInt => match value {
                CellValue::Int(i) => Ok(CellValue::Int(*i)),
                CellValue::Bool(b) => Ok(CellValue::Int(*b as i64)),
                CellValue::Float(f) if f.fract() == 0.0 => Ok(CellValue::Int(*f as i64)),
                CellValue::Str(s) => s
                    .trim()
                    .parse::<i64>()
                    .map(CellValue::Int)
                    .map_err(|_| mismatch()),
                _ => Err(mismatch()),
            },
            DataType::Double | DataType::Decimal => match value {
                CellValue::Float(f) => Ok(CellValue::Float(*f)),
                CellValue::Int(i) => Ok(CellValue::Float(*i as f64)),
                CellValue::Str(s) => s
                    .trim()
                    .parse::<f64>()
                    .map(CellValue::Float)
                    .map_err(|_| mismatch()),
                _ => Err(mismatch()),
            },
            DataType::Varchar => Ok(CellValue::Str(value.to_text())),
            DataType::Date => match value {
                CellValue::Date(d) => Ok(CellValue::Date(*d)),
                CellValue::DateTime(dt) => Ok(CellValue::Date(dt.date())),
                CellValue::Str(s) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
                    .map(CellValue::Date)
                    .map_err(|_| mismatch()),
                _ => Err(mismatch()),
            },
            DataType::Timestamp => match value {
                CellValue::DateTime(dt) => Ok(CellValue::DateTime(*dt)),
                CellValue::Date(d) => Ok(CellValue::DateTime(
                    d.and_hms_opt(0, 0, 0).expect("midnight is always valid"),
                )),
                CellValue::Str(s) => {
                    let s = s.trim();
                    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
                        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S"))
                        .map(CellValue::DateTime)
                        .map_err(|_| mismatch())
                }
                _ => Err(mismatch()),
            },
        }
    }
}

impl std::fmt::Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for DataType {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(DataType::from_name(s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_csv_field() {
        assert_eq!(CellValue::parse(""), CellValue::Null);
        assert_eq!(CellValue::parse("null"), CellValue::Null);
        assert_eq!(CellValue::parse("true"), CellValue::Bool(true));
        assert_eq!(CellValue::parse("42"), CellValue::Int(42));
        assert_eq!(CellValue::parse("3.14"), CellValue::Float(3.14));
        assert_eq!(
            CellValue::parse("hello"),
            CellValue::Str("hello".to_string())
        );
    }

    #[test]
    fn parse_literal_keeps_null_words() {
        assert_eq!(
            CellValue::parse_literal("null"),
            CellValue::Str("null".to_string())
        );
        assert_eq!(CellValue::parse_literal(""), CellValue::Str(String::new()));
    }

    #[test]
    fn cross_type_numeric_equality() {
        assert_eq!(CellValue::Int(1), CellValue::Float(1.0));
        assert_ne!(CellValue::Int(1), CellValue::Str("1".to_string()));
    }

    #[test]
    fn coerce_string_to_integer() {
        let coerced = DataType::Integer.coerce(&CellValue::Str("42".to_string())).unwrap();
        assert_eq!(coerced, CellValue::Int(42));
        assert!(DataType::Integer
            .coerce(&CellValue::Str("forty-two".to_string()))
            .is_err());
    }

    #[test]
    fn coerce_passes_null_through() {
        assert_eq!(DataType::Integer.coerce(&CellValue::Null).unwrap(), CellValue::Null);
        assert_eq!(
            DataType::Boolean.coerce(&CellValue::NoValue).unwrap(),
            CellValue::NoValue
        );
    }

    #[test]
    fn widen_follows_numeric_ladder() {
        assert_eq!(DataType::Integer.widen(DataType::Double), DataType::Double);
        assert_eq!(DataType::Unknown.widen(DataType::Date), DataType::Date);
        assert_eq!(DataType::Date.widen(DataType::Timestamp), DataType::Timestamp);
        assert_eq!(DataType::Integer.widen(DataType::Varchar), DataType::Varchar);
    }

    #[test]
    fn type_names_round_trip() {
        for t in [
            DataType::Boolean,
            DataType::Integer,
            DataType::BigInt,
            DataType::Double,
            DataType::Decimal,
            DataType::Varchar,
            DataType::Date,
            DataType::Timestamp,
        ] {
            assert_eq!(DataType::from_name(t.name()), t);
        }
    }
}
