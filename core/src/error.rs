use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("unknown language '{0}'")]
    UnknownLanguage(String),

    #[error("stopword resource unavailable for '{language}': {reason}")]
    ResourceUnavailable { language: String, reason: String },

    #[error("not found: {0}")]
    NotFound(String),

    #[error("corrupt artifact {}: {reason}", path.display())]
    CorruptArtifact { path: PathBuf, reason: String },

    /// Artifact is intact but was built from a different corpus snapshot.
    #[error("stale artifact {}: {reason}", path.display())]
    StaleArtifact { path: PathBuf, reason: String },

    #[error("index for '{0}' has no documents")]
    EmptyIndex(String),

    #[error("corpus error in {}: {reason}", path.display())]
    Corpus { path: PathBuf, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn corrupt(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Error::CorruptArtifact { path: path.into(), reason: reason.into() }
    }

    /// True for errors that mean "the caller asked for a language we cannot serve".
    pub fn is_unsupported_language(&self) -> bool {
        matches!(self, Error::UnknownLanguage(_) | Error::NotFound(_))
    }
}
