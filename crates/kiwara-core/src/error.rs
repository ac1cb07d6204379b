use crate::pkg::PkgError;
use thiserror::Error;

/// Core error type for kiwara operations.
#[derive(Error, Debug)]
pub enum Error {
    /// The tree could not be resolved. Fatal to the run.
    #[error("{0}")]
    Resolve(#[from] PkgError),

    #[error("Run was cancelled")]
    Cancelled,

    #[error("Invalid rule \"{rule}\": {reason}")]
    InvalidRule { rule: String, reason: String },

    #[error("Unknown rule \"{0}\"")]
    UnknownRule(String),

    #[error("No attachment data recorded for {full_name} under rule \"{rule}\"")]
    MissingAttachments { full_name: String, rule: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl Error {
    #[must_use]
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }

    pub fn invalid_rule(rule: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidRule {
            rule: rule.into(),
            reason: reason.into(),
        }
    }

    /// The registry code for resolution errors.
    #[must_use]
    pub fn code(&self) -> Option<&'static str> {
        match self {
            Self::Resolve(e) => Some(e.code()),
            _ => None,
        }
    }
}
