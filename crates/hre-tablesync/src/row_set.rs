//! Materialised table contents

use hre_core::Value;

use crate::descriptor::ColumnDescriptor;

/// All rows of a table, each positionally aligned with `columns`
#[derive(Debug, Clone, PartialEq)]
pub struct RowSet {
    pub columns: Vec<ColumnDescriptor>,
    pub rows: Vec<Vec<Value>>,
}

impl RowSet {
    pub fn new(columns: Vec<ColumnDescriptor>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Rows rendered as text for display, NULL as the empty string
    pub fn display_rows(&self) -> Vec<Vec<String>> {
        self.rows
            .iter()
            .map(|row| {
                row.iter()
                    .zip(&self.columns)
                    .map(|(value, column)| column.format(value).unwrap_or_default())
                    .collect()
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column_type::ColumnType;
    use pretty_assertions::assert_eq;

    fn column(name: &str, sql_type: ColumnType, ordinal: usize) -> ColumnDescriptor {
        ColumnDescriptor {
            name: name.into(),
            sql_type,
            precision: 0,
            scale: 0,
            nullable: true,
            ordinal,
        }
    }

    #[test]
    fn test_display_rows_render_null_as_empty() {
        let mut rows = RowSet::new(vec![
            column("ID", ColumnType::Integer, 0),
            column("NAME", ColumnType::Varchar, 1),
            column("BIRTH", ColumnType::Double, 2),
        ]);
        rows.rows.push(vec![
            Value::Int64(2),
            Value::String("Bo".into()),
            Value::Null,
        ]);

        assert_eq!(rows.column_names(), vec!["ID", "NAME", "BIRTH"]);
        assert_eq!(rows.display_rows(), vec![vec!["2", "Bo", ""]]);
        assert_eq!(rows.len(), 1);
    }
}
