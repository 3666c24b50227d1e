//! Unified error hierarchy for LoadWatch
//!
//! The analytics core models insufficient data as `None`, never as an error.
//! The types here cover the boundary: malformed input values, file ingestion,
//! configuration and report export.

use chrono::NaiveDate;
use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for all LoadWatch operations
#[derive(Debug, Error)]
pub enum LoadWatchError {
    /// Input value rejected at the boundary
    #[error("Validation error: {0}")]
    Validation(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Session / wellness file ingestion errors
    #[error("Import error: {0}")]
    Import(#[from] ImportError),

    /// Calculation contract errors
    #[error("Calculation error: {0}")]
    Calculation(#[from] CalculationError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Report export errors
    #[error("Export error: {0}")]
    Export(#[from] crate::export::ExportError),

    /// Generic internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Errors raised while reading session or wellness files
#[derive(Debug, Error)]
pub enum ImportError {
    /// File not found at specified path
    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    /// File could not be read
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Row could not be parsed
    #[error("Parse error in {path} at line {line}: {reason}")]
    ParseError {
        path: PathBuf,
        line: u64,
        reason: String,
    },

    /// Row parsed but carried an out-of-contract value
    #[error("Invalid value in {path} at line {line}: {reason}")]
    InvalidValue {
        path: PathBuf,
        line: u64,
        reason: String,
    },

    /// Header is missing a required column
    #[error("Missing column '{column}' in {path}")]
    MissingColumn { path: PathBuf, column: String },
}

/// Errors raised when a calculation is called outside its input contract
#[derive(Debug, Error)]
pub enum CalculationError {
    /// Invalid parameter
    #[error("Invalid parameter for {calculation}: {parameter}={value}")]
    InvalidParameter {
        calculation: String,
        parameter: String,
        value: String,
    },

    /// NaN or infinite input
    #[error("Non-finite value for {calculation}: {field}")]
    NonFinite { calculation: String, field: String },

    /// Window start after window end
    #[error("Invalid date range: {from} is after {to}")]
    InvalidDateRange { from: NaiveDate, to: NaiveDate },
}

/// Result type alias for LoadWatch operations
pub type Result<T> = std::result::Result<T, LoadWatchError>;

impl LoadWatchError {
    /// Get error severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            LoadWatchError::Validation(_) => ErrorSeverity::Warning,
            LoadWatchError::Import(ImportError::InvalidValue { .. }) => ErrorSeverity::Warning,
            LoadWatchError::Import(ImportError::FileNotFound { .. }) => ErrorSeverity::Error,
            LoadWatchError::Calculation(_) => ErrorSeverity::Error,
            LoadWatchError::Configuration(_) => ErrorSeverity::Error,
            LoadWatchError::Internal(_) => ErrorSeverity::Critical,
            _ => ErrorSeverity::Error,
        }
    }

    /// Get user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            LoadWatchError::Import(ImportError::FileNotFound { path }) => {
                format!("Could not find input file: {}", path.display())
            }
            LoadWatchError::Import(ImportError::InvalidValue { path, line, reason }) => {
                format!(
                    "Rejected row {} of {}: {}. Fix the input and re-run.",
                    line,
                    path.display(),
                    reason
                )
            }
            LoadWatchError::Calculation(CalculationError::InvalidDateRange { from, to }) => {
                format!(
                    "The analysis window is empty: {} comes after {}.",
                    from.format("%Y-%m-%d"),
                    to.format("%Y-%m-%d")
                )
            }
            _ => self.to_string(),
        }
    }
}

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    /// Critical system error requiring immediate attention
    Critical,
    /// Error that prevents operation but system can continue
    Error,
    /// Warning that doesn't prevent operation
    Warning,
    /// Informational message
    Info,
}

impl ErrorSeverity {
    /// Convert to tracing level
    pub fn to_tracing_level(&self) -> tracing::Level {
        match self {
            ErrorSeverity::Critical => tracing::Level::ERROR,
            ErrorSeverity::Error => tracing::Level::ERROR,
            ErrorSeverity::Warning => tracing::Level::WARN,
            ErrorSeverity::Info => tracing::Level::INFO,
        }
    }
}
