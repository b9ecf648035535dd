//! Cell-level value comparators

use crate::model::{CellValue, Column};

/// Decides whether an actual cell value matches the expected one
pub trait ValueComparator {
    fn matches(&self, column: &Column, expected: &CellValue, actual: &CellValue) -> bool;
}

/// Default comparator: coerces both sides through the expected column's
/// declared type, so `"42"` equals `42` under an INTEGER column.
///
/// A value that cannot be coerced to the declared type is a mismatch, not an
/// error.
#[derive(Debug, Default)]
pub struct TypedComparator;

impl TypedComparator {
    pub fn new() -> Self {
        Self
    }
}

impl ValueComparator for TypedComparator {
    fn matches(&self, column: &Column, expected: &CellValue, actual: &CellValue) -> bool {
        match (
            column.data_type.coerce(expected),
            column.data_type.coerce(actual),
        ) {
            (Ok(a), Ok(b)) => a == b,
            _ => false,
        }
    }
}

/// Comparator allowing numeric values to differ within a tolerance;
/// non-numeric values fall back to typed comparison
#[derive(Debug)]
pub struct ToleranceComparator {
    tolerance: f64,
    inner: TypedComparator,
}

impl ToleranceComparator {
    pub fn new(tolerance: f64) -> Self {
        Self {
            tolerance,
            inner: TypedComparator,
        }
    }

    fn as_number(value: &CellValue) -> Option<f64> {
        match value {
            CellValue::Int(i) => Some(*i as f64),
            CellValue::Float(f) => Some(*f),
            CellValue::Str(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        }
    }
}

impl ValueComparator for ToleranceComparator {
    fn matches(&self, column: &Column, expected: &CellValue, actual: &CellValue) -> bool {
        if let (Some(a), Some(b)) = (Self::as_number(expected), Self::as_number(actual)) {
            return (a - b).abs() <= self.tolerance;
        }
        self.inner.matches(column, expected, actual)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::DataType;

    #[test]
    fn typed_comparator_coerces_strings() {
        let comparator = TypedComparator::new();
        let column = Column::new("id", DataType::Integer);
        assert!(comparator.matches(&column, &CellValue::Int(42), &CellValue::Str("42".into())));
        assert!(!comparator.matches(&column, &CellValue::Int(42), &CellValue::Str("43".into())));
    }

    #[test]
    fn uncoercible_values_mismatch() {
        let comparator = TypedComparator::new();
        let column = Column::new("id", DataType::Integer);
        assert!(!comparator.matches(&column, &CellValue::Int(1), &CellValue::Str("one".into())));
    }

    #[test]
    fn null_only_matches_null() {
        let comparator = TypedComparator::new();
        let column = Column::new("val", DataType::Varchar);
        assert!(comparator.matches(&column, &CellValue::Null, &CellValue::Null));
        assert!(!comparator.matches(&column, &CellValue::Null, &CellValue::Str(String::new())));
    }

    #[test]
    fn tolerance_comparator_allows_drift() {
        let comparator = ToleranceComparator::new(0.01);
        let column = Column::new("amount", DataType::Double);
        assert!(comparator.matches(&column, &CellValue::Float(1.0), &CellValue::Float(1.005)));
        assert!(!comparator.matches(&column, &CellValue::Float(1.0), &CellValue::Float(1.02)));
        // Falls back to typed comparison for non-numerics
        let text_column = Column::new("label", DataType::Varchar);
        assert!(comparator.matches(
            &text_column,
            &CellValue::Str("x".into()),
            &CellValue::Str("x".into())
        ));
    }
}
