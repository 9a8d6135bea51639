//! Error types for Allot

use thiserror::Error;

use crate::optimizer::Failure;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error(transparent)]
    Optimize(#[from] Failure),
}

pub type Result<T> = std::result::Result<T, Error>;
