//! Errors raised while building or validating document-model values.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TypesError {
    #[error("bad digest length: expected {expected} bytes, got {got}")]
    BadDigest { expected: usize, got: usize },

    #[error("bad hex: {0}")]
    BadHex(String),

    #[error("bad timestamp: {0}")]
    BadTimestamp(String),

    #[error("unknown flavor: {0}")]
    UnknownFlavor(String),

    #[error("unknown digest algorithm: {0}")]
    UnknownDigestAlgorithm(String),

    #[error("bad network parameter: {0}")]
    BadParam(String),

    #[error("network parameters not sorted or not unique at {0}")]
    UnsortedParams(String),

    #[error("too many known flags: {count} (limit 64)")]
    TooManyFlags { count: usize },

    #[error("{0}")]
    Other(String),
}
