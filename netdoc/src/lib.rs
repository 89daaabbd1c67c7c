//! Text encoding of directory documents.
//!
//! Votes, consensuses and detached signature documents share one
//! line-oriented grammar: a keyword per line, optional arguments, and
//! optional base64 objects. This crate parses those documents into the
//! structures of `dirauth-types` and renders them back, byte for byte.

pub mod consensus;
pub mod detached;
pub mod encode;
pub mod error;
pub mod reader;
pub mod router;
pub mod signature;
pub mod split;
pub mod timing;
pub mod vote;

#[cfg(test)]
pub(crate) mod testutil;

pub use consensus::{format_consensus_unsigned, parse_consensus, LEGACY_NICKNAME_SUFFIX};
pub use detached::{format_detached_signatures, parse_detached_signatures};
pub use encode::{signature_section_start, signed_portion};
pub use error::NetdocError;
pub use signature::{format_signatures, good_signers, make_signature, sign_document};
pub use split::split_documents;
pub use timing::{TimingRules, MIN_VOTE_INTERVAL, MIN_VOTE_INTERVAL_TESTING};
pub use vote::{format_vote, format_vote_unsigned, parse_vote, VOTE_DIGEST_ALGORITHM};
