//! Schema inference over parsed rows.

use std::fmt::{Display, Formatter, Write as _};

use serde::{Deserialize, Serialize};

use crate::layout::{ColumnKind, RecordLayout};
use crate::value::{Row, Value};
use crate::SchemaError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    String,
    Double,
}

impl DataType {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Double => "double",
        }
    }

    /// DuckDB column type used when the table is registered.
    pub const fn sql_type(self) -> &'static str {
        match self {
            Self::String => "VARCHAR",
            Self::Double => "DOUBLE",
        }
    }

    /// Map a DuckDB type name back to a schema type.
    pub fn from_sql_type(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "VARCHAR" | "TEXT" | "STRING" => Some(Self::String),
            "DOUBLE" | "FLOAT8" | "REAL" | "FLOAT" => Some(Self::Double),
            _ => None,
        }
    }

    fn of(value: &Value) -> Option<Self> {
        match value {
            Value::Text(_) => Some(Self::String),
            Value::Double(_) => Some(Self::Double),
            Value::Null => None,
        }
    }
}

impl Display for DataType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<ColumnKind> for DataType {
    fn from(kind: ColumnKind) -> Self {
        match kind {
            ColumnKind::Text => Self::String,
            ColumnKind::Double => Self::Double,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaField {
    pub name: String,
    pub data_type: DataType,
    pub nullable: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InferenceConfig {
    /// Number of leading rows inspected per column.
    pub sample_rows: usize,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self { sample_rows: 100 }
    }
}

/// Ordered column names and types of a registered table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSchema {
    pub fields: Vec<SchemaField>,
}

impl TableSchema {
    pub fn new(fields: Vec<SchemaField>) -> Self {
        Self { fields }
    }

    /// Declared schema of a layout, used when there are no rows to inspect.
    pub fn from_layout(layout: &RecordLayout) -> Self {
        Self {
            fields: layout
                .columns()
                .iter()
                .map(|column| SchemaField {
                    name: column.name.clone(),
                    data_type: column.kind.into(),
                    nullable: true,
                })
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn field(&self, name: &str) -> Option<&SchemaField> {
        self.fields.iter().find(|field| field.name == name)
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.fields.iter().map(|field| field.name.as_str()).collect()
    }

    /// Indented tree, one line per column.
    pub fn tree_string(&self) -> String {
        let mut output = String::from("root\n");
        for field in &self.fields {
            let _ = writeln!(
                output,
                " |-- {}: {} (nullable = {})",
                field.name, field.data_type, field.nullable
            );
        }
        output
    }
}

/// Infer column types from the first `config.sample_rows` rows.
///
/// A column is nullable when any row, sampled or not, holds a null.
pub fn infer_schema(
    names: &[String],
    rows: &[Row],
    config: &InferenceConfig,
) -> Result<TableSchema, SchemaError> {
    if rows.is_empty() {
        return Err(SchemaError::EmptyDataset);
    }

    let sample = &rows[..rows.len().min(config.sample_rows.max(1))];
    for (index, row) in rows.iter().enumerate() {
        if row.len() != names.len() {
            return Err(SchemaError::RowWidth {
                row: index,
                expected: names.len(),
                found: row.len(),
            });
        }
    }

    let mut fields = Vec::with_capacity(names.len());
    for (column, name) in names.iter().enumerate() {
        let mut data_type: Option<DataType> = None;
        for row in sample {
            let Some(observed) = DataType::of(&row.values()[column]) else {
                continue;
            };

            match data_type {
                None => data_type = Some(observed),
                Some(existing) if existing != observed => {
                    return Err(SchemaError::ConflictingTypes {
                        column: name.clone(),
                        first: existing.as_str(),
                        second: observed.as_str(),
                    });
                }
                Some(_) => {}
            }
        }

        let data_type = data_type.ok_or_else(|| SchemaError::UndeterminedType {
            column: name.clone(),
            sampled: sample.len(),
        })?;
        // Types come from the sample, nullability from every row.
        let nullable = rows.iter().any(|row| row.values()[column].is_null());
        fields.push(SchemaField {
            name: name.clone(),
            data_type,
            nullable,
        });
    }

    Ok(TableSchema { fields })
}
