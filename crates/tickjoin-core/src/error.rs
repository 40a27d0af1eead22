use std::path::PathBuf;

use thiserror::Error;

/// Validation and contract errors exposed by `tickjoin-core`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("unknown dataset kind '{value}', expected one of dividends, daily-prices")]
    InvalidLayoutKind { value: String },

    #[error("timestamp must be RFC3339 UTC (suffix Z): '{value}'")]
    TimestampNotUtc { value: String },

    #[error("request_id must be at least 8 characters")]
    InvalidRequestId,
    #[error("trace_id must be 32 hex characters")]
    InvalidTraceId,
    #[error("schema_version must match vMAJOR.MINOR.PATCH: '{value}'")]
    InvalidSchemaVersion { value: String },

    #[error("error code cannot be empty")]
    EmptyErrorCode,
    #[error("error message cannot be empty")]
    EmptyErrorMessage,
}

/// Problems with the column layout of a record shape.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LayoutError {
    #[error("header line is missing")]
    MissingHeader,
    #[error("column {index} has an empty name")]
    EmptyColumnName { index: usize },
    #[error("duplicate column name '{name}'")]
    DuplicateColumn { name: String },
    #[error("header has {found} columns, expected more than {text_columns} (at least one numeric column)")]
    NoNumericColumns { found: usize, text_columns: usize },
}

/// A line that could not be turned into a row.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ParseError {
    #[error("line {line}: expected {expected} fields, found {found}")]
    MissingFields {
        line: usize,
        expected: usize,
        found: usize,
    },
    #[error("line {line}: column '{column}' is not a number: '{value}'")]
    InvalidNumber {
        line: usize,
        column: String,
        value: String,
    },
    #[error("line {line}: unreadable record: {message}")]
    Record { line: usize, message: String },
}

impl ParseError {
    pub const fn line(&self) -> usize {
        match self {
            Self::MissingFields { line, .. }
            | Self::InvalidNumber { line, .. }
            | Self::Record { line, .. } => *line,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SchemaError {
    #[error("cannot infer schema from an empty dataset")]
    EmptyDataset,
    #[error("column '{column}' has conflicting types: {first} and {second}")]
    ConflictingTypes {
        column: String,
        first: &'static str,
        second: &'static str,
    },
    #[error("type of column '{column}' cannot be determined from the first {sampled} rows")]
    UndeterminedType { column: String, sampled: usize },
    #[error("row {row} has {found} values, schema has {expected} columns")]
    RowWidth {
        row: usize,
        expected: usize,
        found: usize,
    },
}

/// Errors raised while turning a CSV file into a dataset.
#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Layout(#[from] LayoutError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Schema(#[from] SchemaError),
}
