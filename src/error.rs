use thiserror::Error;

#[derive(Error, Debug)]
pub enum LadingError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid rule pattern: {0}")]
    Regex(#[from] regex::Error),

    #[error("{file}: {source}")]
    ReadFile {
        file: String,
        source: std::io::Error,
    },

    #[error("{file}: {source}")]
    ParseFile { file: String, source: csv::Error },

    #[error("{file}: invalid rules: {message}")]
    InvalidRules { file: String, message: String },

    #[cfg(feature = "xlsx")]
    #[error("Spreadsheet error: {0}")]
    Xlsx(String),

    #[error("{file}: missing required column '{column}'")]
    MissingColumn { file: String, column: String },

    #[error("{file}, line {line}: column '{column}' has invalid number '{value}'")]
    InvalidNumber {
        file: String,
        line: usize,
        column: String,
        value: String,
    },

    #[error("Unsupported input format: {0}")]
    UnsupportedFormat(String),

    #[error("Unknown grouping: {0} (expected origin, classification, category, description, code-group)")]
    UnknownGroupKey(String),

    #[error("Settings error: {0}")]
    Settings(String),

    #[cfg(feature = "pdf")]
    #[error("PDF error: {0}")]
    Pdf(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, LadingError>;
