use std::path::PathBuf;

/// Errors loading or persisting the verification document
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Verification document not found: {0}")]
    Missing(PathBuf),

    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Failed to serialize verification document: {0}")]
    Serialize(#[from] serde_yaml::Error),

    #[error("Failed to write {path}: {source}")]
    Persist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors from state transitions; a failed transition mutates nothing
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("Feature not found: {0}")]
    FeatureNotFound(String),

    #[error("Checklist item {index} out of range for '{feature}' ({len} items)")]
    ChecklistItemOutOfRange {
        feature: String,
        index: usize,
        len: usize,
    },
}
