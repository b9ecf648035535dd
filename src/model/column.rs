//! Column metadata

use serde::{Deserialize, Serialize};

use super::value::DataType;

/// Column metadata: name, declared type, nullability
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Column {
    /// Column name (case-insensitively unique within a table)
    pub name: String,
    /// Declared data type, used for comparison coercion
    pub data_type: DataType,
    /// Whether the column accepts NULL
    pub nullable: bool,
}

impl Column {
    /// Create a nullable column
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            nullable: true,
        }
    }

    /// Create a column with no declared type
    pub fn untyped(name: impl Into<String>) -> Self {
        Self::new(name, DataType::Unknown)
    }

    /// Set nullability
    pub fn with_nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }
}
