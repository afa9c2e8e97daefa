use std::io;
use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Everything a session, the path resolver or the codec can reject.
///
/// Staged-operation variants (`DuplicateProperty`, `PropertyNotFound`,
/// `ValueNotFound`, `RootKindMismatch`, `Normalize`) are raised at the call that
/// caused them, after the owning session has discarded its pending edits.
#[derive(Debug, Error)]
pub enum Error {
    #[error("property `{name}` is already set")]
    DuplicateProperty { name: String },

    #[error("property `{name}` is not set")]
    PropertyNotFound { name: String },

    #[error("value `{key}` does not exist")]
    ValueNotFound { key: String },

    #[error("path `{path}` not found at segment `{segment}`")]
    PathNotFound { path: String, segment: String },

    #[error("document does not match shape `{shape}`")]
    ShapeMismatch { shape: String },

    #[error("shape `{shape}` is not registered")]
    UnknownShape { shape: String },

    #[error("expected a {expected} root, found {found}")]
    RootKindMismatch {
        expected: &'static str,
        found: &'static str,
    },

    #[error("content is already staged; nothing was written")]
    StagingNotEmpty,

    #[error("create session for {} was discarded", path.display())]
    SessionClosed { path: PathBuf },

    #[error("file already exists: {}", path.display())]
    FileExists { path: PathBuf },

    #[error("file not found: {}", path.display())]
    FileMissing { path: PathBuf },

    #[error("failed to read {}: {source}", path.display())]
    FileRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write {}: {source}", path.display())]
    FileWrite {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to back up {}: {source}", path.display())]
    Backup {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid json: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("failed to encode json: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("value cannot be represented as json: {0}")]
    Normalize(#[source] serde_json::Error),
}

impl Error {
    pub(crate) fn root_kind(expected: &'static str, found: &serde_json::Value) -> Self {
        Error::RootKindMismatch {
            expected,
            found: kind_name(found),
        }
    }
}

pub(crate) fn kind_name(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "sequence",
        serde_json::Value::Object(_) => "mapping",
    }
}
