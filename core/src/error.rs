use thiserror::Error;

#[derive(Error, Debug)]
pub enum SimError {
    #[error("Invalid state for {entity}: {reason}")]
    InvalidState { entity: String, reason: String },

    #[error("Insufficient funds: need {required:.2}, have {available:.2}")]
    InsufficientFunds { required: f64, available: f64 },

    #[error("{kind} '{id}' not found")]
    NotFound { kind: &'static str, id: String },

    #[error("Snapshot data inconsistency: {0}")]
    DataInconsistency(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl SimError {
    pub fn invalid_state(entity: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidState { entity: entity.into(), reason: reason.into() }
    }

    pub fn not_found(kind: &'static str, id: impl ToString) -> Self {
        Self::NotFound { kind, id: id.to_string() }
    }
}

pub type SimResult<T> = Result<T, SimError>;
