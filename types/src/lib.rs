//! Document model for the directory-authority voting protocol.
//!
//! This crate defines the data shared across every other crate in the
//! workspace: digests, timestamps, flavors, votes, consensuses, document
//! signatures and the authority roster. It carries no protocol behaviour.

pub mod consensus;
pub mod digest;
pub mod error;
pub mod flavor;
pub mod params;
pub mod roster;
pub mod signature;
pub mod time;
pub mod vote;

pub use consensus::{Consensus, ConsensusRouterStatus, ConsensusVoter};
pub use digest::{DescriptorDigest, Digest256, IdentityDigest};
pub use error::TypesError;
pub use flavor::{DigestAlgorithm, Flavor};
pub use params::{param_order, NetParams};
pub use roster::{AuthorityEntry, AuthorityRoster, PublicKey};
pub use signature::{DetachedSignatureSet, DocumentDigests, DocumentSignature, SignatureStatus};
pub use time::Timestamp;
pub use vote::{
    MicrodescHash, ProtocolLines, Vote, VoteRouterStatus, VoterInfo, MAX_KNOWN_FLAGS_IN_VOTE,
};
