use thiserror::Error;
use tickjoin_warehouse::WarehouseError;

/// CLI-level error categories mapped to exit codes.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Validation(#[from] tickjoin_core::ValidationError),

    #[error(transparent)]
    Warehouse(#[from] WarehouseError),

    #[error("command error: {0}")]
    Command(String),

    #[error("strict mode failed: warnings={warning_count}")]
    StrictModeViolation { warning_count: usize },

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Validation(_) => 2,
            Self::Warehouse(_) => 3,
            Self::Command(_) => 2,
            Self::StrictModeViolation { .. } => 5,
            Self::Serialization(_) => 4,
            Self::Io(_) => 10,
        }
    }

    /// Stable error code for the `errors` array of a failure envelope.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_error",
            Self::Warehouse(error) => match error {
                WarehouseError::QueryRejected(_) => "query_rejected",
                WarehouseError::QueryTimeout { .. } => "query_timeout",
                WarehouseError::UnknownTable { .. } => "unknown_table",
                WarehouseError::InvalidIdentifier { .. } => "invalid_table_name",
                WarehouseError::Dataset(_) => "dataset_error",
                _ => "warehouse_error",
            },
            Self::Command(_) => "command_error",
            Self::StrictModeViolation { .. } => "strict_mode",
            Self::Serialization(_) => "serialization_error",
            Self::Io(_) => "io_error",
        }
    }
}
