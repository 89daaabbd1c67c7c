use thiserror::Error;

#[derive(Debug, Error)]
pub enum NodeError {
    #[error("ledger error: {0}")]
    Ledger(#[from] dirauth_ledger::LedgerError),

    #[error("consensus error: {0}")]
    Consensus(#[from] dirauth_consensus::ConsensusError),

    #[error("key error: {0}")]
    Crypto(#[from] dirauth_crypto::CryptoError),

    #[error("document error: {0}")]
    Netdoc(#[from] dirauth_netdoc::NetdocError),

    #[error("config error: {0}")]
    Config(String),

    #[error("no vote of our own for this period: {0}")]
    NoOwnVote(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("publish error: {0}")]
    Publish(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}
