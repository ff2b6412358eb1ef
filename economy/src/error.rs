use thiserror::Error;

/// Error kinds surfaced uniformly at the core boundary.
///
/// Every core operation either fully commits or returns one of these with no
/// side effect. `Storage` aborts the enclosing transaction and is the only
/// retriable kind; the rest are caller mistakes or domain-state rejections.
#[derive(Debug, Error)]
pub enum EconomyError {
    #[error("amount must be positive")]
    InvalidAmount,

    #[error("score out of range [0,10]: {score}")]
    InvalidScore { score: f64 },

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    #[error("insufficient funds: required {required}, available {available}")]
    InsufficientFunds { required: f64, available: f64 },

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("sandbox failure: {0}")]
    Sandbox(String),

    #[error("codec error: {0}")]
    Codec(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage error: {0}")]
    Storage(#[from] sqlx::Error),
}

impl EconomyError {
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        EconomyError::NotFound {
            entity,
            id: id.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, EconomyError>;
