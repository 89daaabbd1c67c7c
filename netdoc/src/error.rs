use dirauth_types::TypesError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NetdocError {
    #[error("line {line}: missing keyword {keyword}")]
    Missing { line: usize, keyword: &'static str },

    #[error("line {line}: {keyword}: {reason}")]
    BadItem {
        line: usize,
        keyword: String,
        reason: String,
    },

    #[error("unterminated object at line {line}")]
    UnterminatedObject { line: usize },

    #[error("bad timing: {0}")]
    BadTiming(String),

    #[error("document has no signature section")]
    NoSignatureSection,

    #[error("unexpected document type: {0}")]
    WrongDocumentType(String),

    #[error(transparent)]
    Types(#[from] TypesError),

    #[error("{0}")]
    Other(String),
}

impl NetdocError {
    pub(crate) fn bad(line: usize, keyword: &str, reason: impl Into<String>) -> Self {
        Self::BadItem {
            line,
            keyword: keyword.to_string(),
            reason: reason.into(),
        }
    }
}
