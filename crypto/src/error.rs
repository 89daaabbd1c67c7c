use thiserror::Error;

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("bad key material: {0}")]
    BadKey(String),

    #[error("key file error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}
