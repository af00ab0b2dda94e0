use thiserror::Error;

#[derive(Error, Debug)]
pub enum JournalError {
    #[error("Validation failed for field '{field}': {message}")]
    Validation { field: String, message: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("CSV error: {0}")]
    Csv(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

impl JournalError {
    /// Shorthand for a per-field validation failure, always naming the
    /// offending field.
    pub fn validation(field: &str, message: impl Into<String>) -> Self {
        JournalError::Validation {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

impl From<rusqlite::Error> for JournalError {
    fn from(err: rusqlite::Error) -> Self {
        JournalError::Database(err.to_string())
    }
}

impl From<serde_json::Error> for JournalError {
    fn from(err: serde_json::Error) -> Self {
        JournalError::Parse(err.to_string())
    }
}

impl From<csv::Error> for JournalError {
    fn from(err: csv::Error) -> Self {
        JournalError::Csv(err.to_string())
    }
}
