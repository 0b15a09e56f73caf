use guardian_core::{GuardianError, IntoGuardianError};

/// Leaf error for the DocStore facade; folds into [`GuardianError`] at
/// call sites via [`IntoGuardianError`].
#[derive(Debug, Clone, thiserror::Error)]
pub enum DocStoreError {
    #[error("docstore transport error: {0}")]
    Transport(String),

    #[error("docstore update conflicted on every retry")]
    ConflictExhausted,

    #[error("docstore: {0} not found")]
    NotFound(String),
}

impl IntoGuardianError for DocStoreError {
    fn into_guardian_error(self) -> GuardianError {
        match self {
            DocStoreError::Transport(msg) => GuardianError::Transport(msg),
            DocStoreError::ConflictExhausted => GuardianError::ConflictExhausted,
            DocStoreError::NotFound(what) => GuardianError::NotFound(what),
        }
    }
}

impl From<DocStoreError> for GuardianError {
    fn from(err: DocStoreError) -> Self {
        err.into_guardian_error()
    }
}

impl From<reqwest::Error> for DocStoreError {
    fn from(err: reqwest::Error) -> Self {
        DocStoreError::Transport(err.to_string())
    }
}
