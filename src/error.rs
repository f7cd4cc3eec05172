use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid model: {0}")]
    InvalidModel(String),

    #[error("Unsupported shape_predictor version: {0}")]
    UnsupportedVersion(i64),

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Buffer size mismatch: expected {expected} elements, got {actual}")]
    BufferSize { expected: usize, actual: usize },
}

pub type Result<T> = std::result::Result<T, Error>;
