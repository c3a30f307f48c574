use thiserror::Error;

#[derive(Debug, Error)]
pub enum PicError {
    #[error("unknown sampling mode: {0}")]
    UnknownSamplingMode(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),
}

pub type Result<T> = std::result::Result<T, PicError>;
