use thiserror::Error;

/// A repository record failed its identity invariants.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RecordError {
    #[error("required field '{0}' is empty")]
    EmptyField(&'static str),

    #[error("name_with_owner '{actual}' does not match '{expected}'")]
    NameMismatch { expected: String, actual: String },
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing configuration: {0}")]
    Missing(&'static str),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}
