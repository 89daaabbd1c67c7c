//! Directory authority node: drives the voting protocol over time.
//!
//! ## Module overview
//!
//! - [`schedule`]: midnight-aligned period timing and phase bookkeeping
//! - [`state`]: the schedule, vote ledger and keys of one authority
//! - [`scheduler`]: the tick-driven phase machine
//! - [`collaborators`]: clock, own-vote, transport and publisher seams
//! - [`config`]: TOML configuration and the authority roster
//! - [`logging`], [`metrics`], [`shutdown`]: process plumbing

pub mod collaborators;
pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod schedule;
pub mod scheduler;
pub mod shutdown;
pub mod state;

pub use collaborators::{AuthorityTransport, Clock, ConsensusPublisher, OwnVoteProvider, SystemClock};
pub use config::{AuthorityConfig, NodeConfig};
pub use error::NodeError;
pub use logging::{init_logging, LogFormat};
pub use metrics::AuthorityMetrics;
pub use schedule::{start_of_interval_after, Phase, ScheduleTiming, ScheduledAction, VotingSchedule};
pub use scheduler::VotingScheduler;
pub use shutdown::{ShutdownController, StopListener, StopReason};
pub use state::AuthorityVotingState;
