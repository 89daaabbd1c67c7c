//! Period timing checks applied to every parsed vote and consensus.

use dirauth_types::Timestamp;

use crate::NetdocError;

/// Shortest allowed voting interval on a production network.
pub const MIN_VOTE_INTERVAL: u64 = 300;
/// Shortest allowed voting interval on a testing network.
pub const MIN_VOTE_INTERVAL_TESTING: u64 = 10;
pub const MIN_VOTE_SECONDS: u32 = 2;
pub const MIN_DIST_SECONDS: u32 = 2;

/// Bounds a document's period must satisfy.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimingRules {
    pub min_interval: u64,
}

impl TimingRules {
    pub const STANDARD: Self = Self {
        min_interval: MIN_VOTE_INTERVAL,
    };
    pub const TESTING: Self = Self {
        min_interval: MIN_VOTE_INTERVAL_TESTING,
    };

    pub fn for_network(testing: bool) -> Self {
        if testing {
            Self::TESTING
        } else {
            Self::STANDARD
        }
    }

    pub fn check(
        &self,
        valid_after: Timestamp,
        fresh_until: Timestamp,
        valid_until: Timestamp,
        vote_seconds: u32,
        dist_seconds: u32,
    ) -> Result<(), NetdocError> {
        if valid_after.plus(self.min_interval) > fresh_until {
            return Err(NetdocError::BadTiming(
                "vote/consensus freshness interval is too short".into(),
            ));
        }
        if fresh_until.plus(self.min_interval) > valid_until {
            return Err(NetdocError::BadTiming(
                "vote/consensus liveness interval is too short".into(),
            ));
        }
        if vote_seconds < MIN_VOTE_SECONDS {
            return Err(NetdocError::BadTiming("vote seconds is too short".into()));
        }
        if dist_seconds < MIN_DIST_SECONDS {
            return Err(NetdocError::BadTiming("dist seconds is too short".into()));
        }
        Ok(())
    }
}

impl Default for TimingRules {
    fn default() -> Self {
        Self::STANDARD
    }
}
