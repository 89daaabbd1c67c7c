use thiserror::Error;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("not enough votes to compute a consensus: have {have}, need {need}")]
    InsufficientVotes { have: usize, need: usize },

    #[error("nobody has voted on the Running flag; not generating a consensus")]
    NoRunningConsensus,

    #[error("Vote not from a recognized v3 authority")]
    UnknownAuthority,

    #[error("Bad valid-after time")]
    BadValidAfter,

    #[error("Posted vote received too late, would be dangerous to count it")]
    PostedTooLate,

    #[error("Already have a newer pending vote")]
    NewerVotePending,

    #[error("unable to parse document: {0}")]
    Unparseable(String),

    #[error("vote carries no valid signature from its authority")]
    NoValidSignature,

    #[error("{0}")]
    SignatureTimesMismatch(&'static str),

    #[error("No signatures for given consensus flavor")]
    MissingFlavorSignatures,

    #[error("No digests for given consensus flavor")]
    MissingFlavorDigests,

    #[error("Mismatched digest.")]
    MismatchedDigest,

    #[error("No recognized digests for given consensus flavor")]
    NoRecognizedDigests,

    #[error("no pending consensus")]
    NoPendingConsensus,

    #[error("couldn't generate any consensus flavor")]
    NoFlavorComputed,

    #[error("{0}")]
    Other(String),
}

impl From<dirauth_netdoc::NetdocError> for LedgerError {
    fn from(e: dirauth_netdoc::NetdocError) -> Self {
        Self::Unparseable(e.to_string())
    }
}
