use thiserror::Error;

#[derive(Error, Debug)]
pub enum TsHlsError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("parser error: {0}")]
    Parser(String),

    #[error("invalid data: {0}")]
    InvalidData(String),

    #[error("unsupported: {0}")]
    Unsupported(String),
}

pub type Result<T> = std::result::Result<T, TsHlsError>;
