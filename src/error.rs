//! Crate-level error type.

use crate::adapters::{AdapterError, FormatError};
use crate::analysis::shape_inference::ShapeInferenceError;
use crate::catalog::UnknownOpError;
use crate::config::ConfigError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Format(#[from] FormatError),

    #[error(transparent)]
    UnknownOp(#[from] UnknownOpError),

    #[error(transparent)]
    ShapeInference(#[from] ShapeInferenceError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<AdapterError> for Error {
    fn from(err: AdapterError) -> Self {
        match err {
            AdapterError::Format(e) => Error::Format(e),
            AdapterError::UnknownOp(e) => Error::UnknownOp(e),
            AdapterError::Io(e) => Error::Io(e),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
