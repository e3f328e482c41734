//! Error types for addrdiff

use thiserror::Error;

/// Result type used throughout the crate
pub type Result<T> = std::result::Result<T, AddrdiffError>;

/// Errors produced while loading, merging, or exporting address program tables
#[derive(Error, Debug)]
pub enum AddrdiffError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("DuckDB error: {0}")]
    DuckDb(#[from] duckdb::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Spreadsheet container error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Configuration error: {0}")]
    Config(#[from] anyhow::Error),

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("Data processing error: {message}")]
    DataProcessing { message: String },

    #[error("Table '{table}' is missing required columns: {}", .columns.join(", "))]
    MissingColumns { table: String, columns: Vec<String> },
}

impl AddrdiffError {
    /// Create an invalid input error
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Create a data processing error
    pub fn data_processing(message: impl Into<String>) -> Self {
        Self::DataProcessing {
            message: message.into(),
        }
    }

    /// Create a missing columns error
    pub fn missing_columns(table: impl Into<String>, columns: Vec<String>) -> Self {
        Self::MissingColumns {
            table: table.into(),
            columns,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_input_message() {
        let err = AddrdiffError::invalid_input("bad file");
        assert_eq!(err.to_string(), "Invalid input: bad file");
    }

    #[test]
    fn test_missing_columns_message() {
        let err = AddrdiffError::missing_columns(
            "old",
            vec!["GID".to_string(), "Округ".to_string()],
        );
        assert_eq!(
            err.to_string(),
            "Table 'old' is missing required columns: GID, Округ"
        );
    }
}
