//! Column descriptors read from the catalog

use hre_core::{ColumnInfo, Value};
use serde::{Deserialize, Serialize};

use crate::column_type::ColumnType;

/// Metadata for one column of a table, in ordinal position
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    pub name: String,
    pub sql_type: ColumnType,
    /// Declared length or numeric precision. Numeric types without a
    /// declaration report their default precision; 0 elsewhere.
    pub precision: u32,
    pub scale: u32,
    pub nullable: bool,
    /// 0-based position in the table
    pub ordinal: usize,
}

impl ColumnDescriptor {
    pub fn from_column_info(info: &ColumnInfo) -> Self {
        let declaration = ColumnType::parse_declared(&info.data_type);
        let precision = declaration
            .precision
            .unwrap_or_else(|| declaration.sql_type.default_precision());
        Self {
            name: info.name.clone(),
            sql_type: declaration.sql_type,
            precision,
            scale: declaration.scale.unwrap_or(0),
            nullable: info.nullable,
            ordinal: info.ordinal,
        }
    }

    /// Declared type as it would appear in DDL, e.g. `DECIMAL(10,2)`
    pub fn declared_type(&self) -> String {
        if self.precision == self.sql_type.default_precision() && self.scale == 0 {
            return self.sql_type.sql_name().to_string();
        }
        match (self.precision, self.scale) {
            (0, _) => self.sql_type.sql_name().to_string(),
            (p, 0) => format!("{}({})", self.sql_type.sql_name(), p),
            (p, s) => format!("{}({},{})", self.sql_type.sql_name(), p, s),
        }
    }

    /// Coerce a CSV field into a value for this column. `None` is NULL.
    pub fn coerce(&self, text: Option<&str>) -> Result<Value, String> {
        let value = match text {
            None => Value::Null,
            Some(text) => self.sql_type.coerce(text)?,
        };
        if value.is_null() && !self.nullable {
            return Err("NULL is not allowed".to_string());
        }
        Ok(value)
    }

    /// Format a stored value for CSV. `None` is NULL.
    pub fn format(&self, value: &Value) -> Option<String> {
        self.sql_type.format(value)
    }
}

/// Typed column entry of an export, built from the column list in order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportColumn {
    pub name: String,
    pub sql_type: ColumnType,
    pub precision: u32,
    pub scale: u32,
}

impl From<&ColumnDescriptor> for ExportColumn {
    fn from(column: &ColumnDescriptor) -> Self {
        let (precision, scale) = column
            .sql_type
            .export_precision_scale(column.precision, column.scale);
        Self {
            name: column.name.clone(),
            sql_type: column.sql_type.clone(),
            precision,
            scale,
        }
    }
}

impl ExportColumn {
    /// Precision and scale describe the column; the value is written unrounded
    pub fn format(&self, value: &Value) -> Option<String> {
        self.sql_type.format(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn info(name: &str, data_type: &str, nullable: bool, ordinal: usize) -> ColumnInfo {
        ColumnInfo {
            name: name.into(),
            ordinal,
            data_type: data_type.into(),
            nullable,
            ..Default::default()
        }
    }

    #[test]
    fn test_descriptor_from_catalog() {
        let column = ColumnDescriptor::from_column_info(&info("PRICE", "decimal(10, 2)", true, 3));
        assert_eq!(column.sql_type, ColumnType::Decimal);
        assert_eq!(column.precision, 10);
        assert_eq!(column.scale, 2);
        assert_eq!(column.ordinal, 3);
        assert_eq!(column.declared_type(), "DECIMAL(10,2)");

        let id = ColumnDescriptor::from_column_info(&info("ID", "INT", false, 0));
        assert_eq!(id.precision, 10);
        assert_eq!(id.declared_type(), "INTEGER");
    }

    #[test]
    fn test_coerce_rejects_null_for_not_null_column() {
        let column = ColumnDescriptor::from_column_info(&info("NAME", "VARCHAR(40)", false, 1));
        assert!(column.coerce(None).is_err());
        assert_eq!(column.coerce(Some("")).unwrap(), Value::String(String::new()));
    }

    #[test]
    fn test_export_columns_follow_type_rules() {
        let columns = [
            ColumnDescriptor::from_column_info(&info("NAME", "VARCHAR(40)", true, 0)),
            ColumnDescriptor::from_column_info(&info("BIN", "VARBINARY(16)", true, 1)),
            ColumnDescriptor::from_column_info(&info("PRICE", "DECIMAL(10,2)", true, 2)),
            ColumnDescriptor::from_column_info(&info("ID", "INTEGER", true, 3)),
        ];
        let export: Vec<(u32, u32)> = columns
            .iter()
            .map(ExportColumn::from)
            .map(|c| (c.precision, c.scale))
            .collect();
        assert_eq!(export, vec![(0, 0), (16, 0), (0, 0), (10, 0)]);
    }

    #[test]
    fn test_export_scale_does_not_round() {
        let column = ColumnDescriptor::from_column_info(&info("WEIGHT", "DOUBLE(10,2)", true, 0));
        let export = ExportColumn::from(&column);
        assert_eq!((export.precision, export.scale), (10, 2));
        assert_eq!(export.format(&Value::Float64(1.234)), Some("1.234".into()));
    }
}
