use thiserror::Error;

/// Rejected input to the pairing engine. Nothing is paired when this is returned.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Duplicate path in input: {0}")]
    DuplicatePath(String),

    #[error("Malformed path '{path}': {reason}")]
    MalformedPath { path: String, reason: String },

    #[error("File name '{name}' does not match path '{path}'")]
    NameMismatch { path: String, name: String },

    #[error("Update refers to a file that was never paired: {0}")]
    UnknownFile(String),

    #[error("Invalid pairing option: {0}")]
    InvalidOption(String),
}

impl ValidationError {
    pub fn malformed(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedPath {
            path: path.into(),
            reason: reason.into(),
        }
    }
}
