//! Prometheus metrics for the voting round.
//!
//! [`AuthorityMetrics`] owns a dedicated [`Registry`]; `gather_text`
//! renders it in the text exposition format for the daemon's `/metrics`
//! endpoint.

use prometheus::{
    register_int_counter_with_registry, register_int_gauge_with_registry, Encoder, IntCounter,
    IntGauge, Opts, Registry, TextEncoder,
};

use crate::NodeError;

#[derive(Clone)]
pub struct AuthorityMetrics {
    pub registry: Registry,

    // ── Counters ────────────────────────────────────────────────────────
    pub votes_accepted: IntCounter,
    pub votes_rejected: IntCounter,
    /// Flavors computed, summed over periods.
    pub consensuses_computed: IntCounter,
    pub signatures_added: IntCounter,
    pub consensuses_published: IntCounter,

    // ── Gauges ──────────────────────────────────────────────────────────
    pub pending_votes: IntGauge,
    pub pending_flavors: IntGauge,
}

impl AuthorityMetrics {
    pub fn new() -> Result<Self, NodeError> {
        let registry = Registry::new();
        let err = |e: prometheus::Error| NodeError::Other(format!("metrics registration: {e}"));

        let votes_accepted = register_int_counter_with_registry!(
            Opts::new("dirauth_votes_accepted_total", "Votes added to the pending set"),
            registry
        )
        .map_err(err)?;
        let votes_rejected = register_int_counter_with_registry!(
            Opts::new("dirauth_votes_rejected_total", "Vote documents refused"),
            registry
        )
        .map_err(err)?;
        let consensuses_computed = register_int_counter_with_registry!(
            Opts::new(
                "dirauth_consensuses_computed_total",
                "Consensus flavors computed from pending votes"
            ),
            registry
        )
        .map_err(err)?;
        let signatures_added = register_int_counter_with_registry!(
            Opts::new(
                "dirauth_signatures_added_total",
                "Detached signatures merged into pending consensuses"
            ),
            registry
        )
        .map_err(err)?;
        let consensuses_published = register_int_counter_with_registry!(
            Opts::new(
                "dirauth_consensuses_published_total",
                "Consensus flavors published after reaching signature quorum"
            ),
            registry
        )
        .map_err(err)?;

        let pending_votes = register_int_gauge_with_registry!(
            Opts::new("dirauth_pending_votes", "Votes held for the current period"),
            registry
        )
        .map_err(err)?;
        let pending_flavors = register_int_gauge_with_registry!(
            Opts::new(
                "dirauth_pending_flavors",
                "Consensus flavors waiting for signatures"
            ),
            registry
        )
        .map_err(err)?;

        Ok(Self {
            registry,
            votes_accepted,
            votes_rejected,
            consensuses_computed,
            signatures_added,
            consensuses_published,
            pending_votes,
            pending_flavors,
        })
    }

    /// Every registered metric in the Prometheus text format.
    pub fn gather_text(&self) -> Result<String, NodeError> {
        let mut buf = Vec::new();
        TextEncoder::new()
            .encode(&self.registry.gather(), &mut buf)
            .map_err(|e| NodeError::Other(format!("metrics encoding: {e}")))?;
        String::from_utf8(buf).map_err(|e| NodeError::Other(e.to_string()))
    }
}
