use std::path::PathBuf;
use thiserror::Error;

/// Failures while reading the input workbooks. Any of these aborts the whole run.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Failed to open workbook {}: {source}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: calamine::Error,
    },

    #[error("Workbook {} contains no sheets", .path.display())]
    NoSheets { path: PathBuf },

    #[error("Sheet '{sheet}' not found in {}", .path.display())]
    MissingSheet { path: PathBuf, sheet: String },

    #[error("Failed to read sheet '{sheet}': {source}")]
    Read {
        sheet: String,
        #[source]
        source: calamine::Error,
    },

    #[error("Column '{column}' not found in sheet '{sheet}'")]
    MissingColumn { sheet: String, column: String },

    #[error("No row with {column} = '{value}' in sheet '{sheet}'")]
    MissingRow {
        sheet: String,
        column: String,
        value: String,
    },

    #[error("Invalid {column} in sheet '{sheet}' row {line}: {reason}")]
    InvalidCell {
        sheet: String,
        column: String,
        line: usize,
        reason: String,
    },
}
