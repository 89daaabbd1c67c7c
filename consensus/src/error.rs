use dirauth_netdoc::NetdocError;
use dirauth_types::TypesError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConsensusError {
    #[error("no votes to compute a consensus from")]
    NoVotes,

    #[error("no authority voted on the Running flag")]
    NoRunningConsensus,

    #[error("generated consensus is inconsistent: {0}")]
    InternalInconsistency(String),

    #[error("vote lists {count} known flags; at most 64 are allowed")]
    TooManyFlags { count: usize },

    #[error("cannot sign consensus: {0}")]
    Signing(String),

    #[error(transparent)]
    Netdoc(#[from] NetdocError),

    #[error("{0}")]
    Other(String),
}

impl From<TypesError> for ConsensusError {
    fn from(e: TypesError) -> Self {
        match e {
            TypesError::TooManyFlags { count } => Self::TooManyFlags { count },
            other => Self::Other(other.to_string()),
        }
    }
}
