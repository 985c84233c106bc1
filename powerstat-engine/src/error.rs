use powerstat_db::models::{Domain, DrawError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid draw: {0}")]
    InvalidDraw(#[from] DrawError),

    #[error("empty dataset: at least one draw is required")]
    EmptyDataset,

    #[error("insufficient data: need at least {needed} draws, got {got}")]
    InsufficientData { needed: usize, got: usize },

    #[error("{domain} pool exhausted: requested {requested} distinct values, only {available} available")]
    ExhaustedPool {
        domain: Domain,
        requested: usize,
        available: usize,
    },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("config I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config parse error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, EngineError>;
