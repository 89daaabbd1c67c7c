//! Consensus: the deterministic reduction of authority votes into a signed
//! consensus document.
//!
//! Every authority runs the same computation over the same votes and must
//! produce byte-identical output, so every choice below breaks ties
//! deterministically and never depends on vote order.
//!
//! ## Module overview
//!
//! - [`method`]: Consensus method negotiation and method-gated constants.
//! - [`collator`]: Joins votes by router identity, resolving ed25519 keys.
//! - [`flags`]: Canonical flag table and per-vote index translation.
//! - [`naming`]: Named/Unnamed nickname bindings.
//! - [`router`]: Reconciliation of one router across the votes listing it.
//! - [`versions`]: Recommended version lists.
//! - [`protover`]: Protocol-list voting.
//! - [`params`]: Network parameter medians.
//! - [`packages`]: Package lines.
//! - [`bw_weights`]: Bandwidth-weight balancing.
//! - [`reduce`]: [`ConsensusReducer`], the full pass for one flavor.
//! - [`error`]: Consensus error types.

pub mod bw_weights;
pub mod collator;
pub mod error;
pub mod flags;
pub mod method;
pub mod naming;
pub mod packages;
pub mod params;
pub mod protover;
pub mod reduce;
pub mod router;
pub mod versions;

#[cfg(test)]
pub(crate) mod testutil;

pub use bw_weights::{
    check_weights, compute_bandwidth_weights, solve, BandwidthTotals, WeightCase,
    WeightCheckError, WeightSet, WeightSolveError, BW_WEIGHT_MARGIN, BW_WEIGHT_SCALE,
};
pub use collator::{collate, CollatedRouter};
pub use error::ConsensusError;
pub use flags::{FlagTable, NO_ED_CONSENSUS_FLAG};
pub use method::{
    compute_consensus_method, negotiate_consensus_method, supported_methods,
    MAX_SUPPORTED_CONSENSUS_METHOD, MIN_SUPPORTED_CONSENSUS_METHOD,
};
pub use naming::{NameBinding, NameMap};
pub use reduce::{ConsensusReducer, ReducedConsensus, DEFAULT_MAX_UNMEASURED_BW_KB};
pub use versions::compare_versions;
