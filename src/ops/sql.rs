//! SQL statement building for dataset operations

use crate::error::Result;
use crate::model::{CellValue, TableMetadata};

/// A parameterized SQL statement
#[derive(Debug, Clone, PartialEq)]
pub struct SqlStatement {
    pub sql: String,
    pub params: Vec<CellValue>,
}

impl SqlStatement {
    pub fn new(sql: impl Into<String>, params: Vec<CellValue>) -> Self {
        Self {
            sql: sql.into(),
            params,
        }
    }

    /// Substitute `?` placeholders with SQL literals, for script output
    pub fn render_literals(&self) -> String {
        let mut out = String::with_capacity(self.sql.len());
        let mut params = self.params.iter();
        for c in self.sql.chars() {
            if c == '?' {
                match params.next() {
                    Some(value) => out.push_str(&literal(value)),
                    None => out.push(c),
                }
            } else {
                out.push(c);
            }
        }
        out
    }
}

impl std::fmt::Display for SqlStatement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.render_literals())
    }
}

/// Double-quote an identifier, escaping embedded quotes
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Render a value as a SQL literal
pub fn literal(value: &CellValue) -> String {
    match value {
        CellValue::Null | CellValue::NoValue => "NULL".to_string(),
        CellValue::Bool(b) => if *b { "TRUE" } else { "FALSE" }.to_string(),
        CellValue::Int(i) => i.to_string(),
        CellValue::Float(f) => f.to_string(),
        CellValue::Str(s) => format!("'{}'", s.replace('\'', "''")),
        CellValue::Date(d) => format!("'{}'", d),
        CellValue::DateTime(dt) => format!("'{}'", dt.format("%Y-%m-%d %H:%M:%S")),
    }
}

/// INSERT for one row; columns with the no-value marker are omitted
pub fn insert_row(metadata: &TableMetadata, row: &[CellValue]) -> Option<SqlStatement> {
    let mut columns = Vec::new();
    let mut params = Vec::new();
    for (column, value) in metadata.columns().iter().zip(row) {
        if value.is_no_value() {
            continue;
        }
        columns.push(quote_ident(&column.name));
        params.push(value.clone());
    }
    if columns.is_empty() {
        return None;
    }
    let placeholders = vec!["?"; params.len()].join(", ");
    let sql = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        quote_ident(metadata.name()),
        columns.join(", "),
        placeholders
    );
    Some(SqlStatement::new(sql, params))
}

/// UPDATE for one row: SET non-key columns WHERE key columns
pub fn update_row(metadata: &TableMetadata, row: &[CellValue]) -> Result<Option<SqlStatement>> {
    let key_indices = metadata.key_column_indices()?;

    let mut assignments = Vec::new();
    let mut params = Vec::new();
    for (idx, (column, value)) in metadata.columns().iter().zip(row).enumerate() {
        if key_indices.contains(&idx) || value.is_no_value() {
            continue;
        }
        assignments.push(format!("{} = ?", quote_ident(&column.name)));
        params.push(value.clone());
    }
    if assignments.is_empty() {
        return Ok(None);
    }

    let mut conditions = Vec::new();
    for &idx in &key_indices {
        conditions.push(format!(
            "{} = ?",
            quote_ident(&metadata.columns()[idx].name)
        ));
        params.push(row[idx].clone());
    }

    let sql = format!(
        "UPDATE {} SET {} WHERE {}",
        quote_ident(metadata.name()),
        assignments.join(", "),
        conditions.join(" AND ")
    );
    Ok(Some(SqlStatement::new(sql, params)))
}

/// DELETE for one row, keyed by the declared key columns
pub fn delete_row(metadata: &TableMetadata, row: &[CellValue]) -> Result<SqlStatement> {
    let key_indices = metadata.key_column_indices()?;
    let mut conditions = Vec::new();
    let mut params = Vec::new();
    for &idx in &key_indices {
        conditions.push(format!(
            "{} = ?",
            quote_ident(&metadata.columns()[idx].name)
        ));
        params.push(row[idx].clone());
    }
    let sql = format!(
        "DELETE FROM {} WHERE {}",
        quote_ident(metadata.name()),
        conditions.join(" AND ")
    );
    Ok(SqlStatement::new(sql, params))
}

/// Unconditioned DELETE for a whole table
pub fn delete_all(metadata: &TableMetadata) -> SqlStatement {
    SqlStatement::new(
        format!("DELETE FROM {}", quote_ident(metadata.name())),
        Vec::new(),
    )
}

/// TRUNCATE TABLE
pub fn truncate(metadata: &TableMetadata) -> SqlStatement {
    SqlStatement::new(
        format!("TRUNCATE TABLE {}", quote_ident(metadata.name())),
        Vec::new(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Column, DataType};

    fn metadata() -> TableMetadata {
        TableMetadata::new(
            "PK_TABLE",
            vec![
                Column::new("id", DataType::Integer),
                Column::new("val", DataType::Varchar),
            ],
        )
        .with_key_columns(vec!["id".to_string()])
    }

    #[test]
    fn insert_skips_no_value_columns() {
        let stmt = insert_row(
            &metadata(),
            &[CellValue::Int(1), CellValue::NoValue],
        )
        .unwrap();
        assert_eq!(stmt.sql, "INSERT INTO \"PK_TABLE\" (\"id\") VALUES (?)");
        assert_eq!(stmt.params, vec![CellValue::Int(1)]);
    }

    #[test]
    fn update_sets_non_key_columns() {
        let stmt = update_row(
            &metadata(),
            &[CellValue::Int(1), CellValue::Str("row 1".into())],
        )
        .unwrap()
        .unwrap();
        assert_eq!(
            stmt.sql,
            "UPDATE \"PK_TABLE\" SET \"val\" = ? WHERE \"id\" = ?"
        );
        assert_eq!(
            stmt.params,
            vec![CellValue::Str("row 1".into()), CellValue::Int(1)]
        );
    }

    #[test]
    fn delete_uses_key_columns() {
        let stmt = delete_row(&metadata(), &[CellValue::Int(1), CellValue::Null]).unwrap();
        assert_eq!(stmt.sql, "DELETE FROM \"PK_TABLE\" WHERE \"id\" = ?");
        assert_eq!(stmt.params, vec![CellValue::Int(1)]);
    }

    #[test]
    fn literals_are_escaped() {
        assert_eq!(literal(&CellValue::Str("it's".into())), "'it''s'");
        assert_eq!(literal(&CellValue::Null), "NULL");
        assert_eq!(quote_ident("we\"ird"), "\"we\"\"ird\"");
    }

    #[test]
    fn render_literals_substitutes_in_order() {
        let stmt = insert_row(
            &metadata(),
            &[CellValue::Int(1), CellValue::Str("x".into())],
        )
        .unwrap();
        assert_eq!(
            stmt.render_literals(),
            "INSERT INTO \"PK_TABLE\" (\"id\", \"val\") VALUES (1, 'x')"
        );
    }
}
