use thiserror::Error;

pub type DaftResult<T> = std::result::Result<T, DaftError>;
pub type GenericError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum DaftError {
    #[error("{0:?}")]
    SerdeJsonError(#[from] serde_json::Error),
    #[error("{0}")]
    FieldNotFound(String),
    #[error("{0}")]
    SchemaMismatch(String),
    #[error("{0}")]
    ValueError(String),
    #[error("{0:?}")]
    FmtError(#[from] std::fmt::Error),
    /// A plan or pipeline was assembled against a collaborator in the wrong state.
    #[error("DaftError::ConfigurationError {0}")]
    ConfigurationError(String),
    /// A broken planner invariant. Never caused by data.
    #[error("DaftError::InternalError {0}")]
    InternalError(String),
    #[error("{0:?}")]
    External(GenericError),
}

impl DaftError {
    /// Whether this error signals a programming error in the planner rather than bad input.
    pub fn is_internal(&self) -> bool {
        matches!(self, Self::InternalError(_))
    }
}
