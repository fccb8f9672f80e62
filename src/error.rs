//! Error types for Squeaker
//!
//! All modules use `SqueakerResult<T>` as their return type.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for Squeaker operations
pub type SqueakerResult<T> = Result<T, SqueakerError>;

/// All errors that can occur in Squeaker
#[derive(Error, Debug)]
pub enum SqueakerError {
    // Recipe errors
    #[error("Bad recipe chunk {chunk:?}: {reason}")]
    RecipeParse { chunk: String, reason: String },

    #[error("Required file is missing: {0}")]
    ResourceMissing(PathBuf),

    // Fetch errors
    #[error("Fetching {url} failed: {detail}")]
    FetchFailed { url: String, detail: String },

    // Archive errors
    #[error("Bad image archive: {0}")]
    ArchiveMalformed(String),

    // Cache errors
    #[error("Stage {0} is not in the cache")]
    CacheMiss(String),

    #[error("Reference '{prefix}' is ambiguous, matches more than one entry")]
    AmbiguousPrefix { prefix: String },

    #[error("No cached entry matches '{0}'")]
    UnknownReference(String),

    #[error("Tag not found: {0}")]
    TagNotFound(String),

    // VM errors
    #[error("VM exited with code {code}:\n{log}")]
    VmFailure { code: i32, log: String },

    #[error("No Smalltalk VM found. Tried:\n{0}\nUse --vm or set vm.path in the config.")]
    VmNotFound(String),

    // Configuration errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    // Transport and codec errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    // General errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl SqueakerError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a recipe parse error naming the offending chunk
    pub fn recipe(chunk: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::RecipeParse {
            chunk: chunk.into(),
            reason: reason.into(),
        }
    }

    /// Create a fetch failure with a detail message
    pub fn fetch(url: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::FetchFailed {
            url: url.into(),
            detail: detail.into(),
        }
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::VmNotFound(_) => Some("Run: squeaker print-autodetect"),
            Self::AmbiguousPrefix { .. } => Some("Supply more characters of the digest"),
            Self::CacheMiss(_) => Some("The stage graph is incomplete; rebuild from the recipe"),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = SqueakerError::TagNotFound("foo".to_string());
        assert!(err.to_string().contains("foo"));
    }

    #[test]
    fn error_hint() {
        let err = SqueakerError::VmNotFound(String::new());
        assert_eq!(err.hint(), Some("Run: squeaker print-autodetect"));
        assert!(SqueakerError::TagNotFound("x".into()).hint().is_none());
    }

    #[test]
    fn recipe_error_names_chunk() {
        let err = SqueakerError::recipe("from: bogus", "expected a string literal");
        assert!(err.to_string().contains("from: bogus"));
    }
}
