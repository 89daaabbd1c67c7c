//! Nullable infrastructure for deterministic testing.
//!
//! Each collaborator the scheduler talks to has a test implementation
//! here that records what it was asked to do, answers from a script, and
//! never touches the network or the filesystem.

pub mod clock;
pub mod publisher;
pub mod transport;
pub mod vote_provider;

pub use clock::NullClock;
pub use publisher::NullPublisher;
pub use transport::{NullTransport, TransportCall};
pub use vote_provider::NullVoteProvider;
