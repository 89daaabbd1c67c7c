//! Authority configuration with TOML file support.

use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};

use dirauth_crypto::{AuthorityKeys, KeySeed};
use dirauth_netdoc::TimingRules;
use dirauth_types::{AuthorityEntry, AuthorityRoster, IdentityDigest, PublicKey};

use crate::{NodeError, ScheduleTiming};

/// One known directory authority.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorityConfig {
    pub nickname: String,
    /// Hex fingerprint of the identity key.
    pub identity: String,
    pub address: String,
    pub ipv4: Ipv4Addr,
    #[serde(default = "default_dir_port")]
    pub dir_port: u16,
    #[serde(default = "default_or_port")]
    pub or_port: u16,
    #[serde(default)]
    pub contact: String,
    /// Hex ed25519 public key of the current signing key.
    pub signing_key: String,
    #[serde(default)]
    pub legacy_identity: Option<String>,
    #[serde(default)]
    pub legacy_signing_key: Option<String>,
}

impl AuthorityConfig {
    fn to_entry(&self) -> Result<AuthorityEntry, NodeError> {
        let bad = |field: &str, e: String| {
            NodeError::Config(format!("authority {}: bad {field}: {e}", self.nickname))
        };
        let identity =
            IdentityDigest::from_hex(&self.identity).map_err(|e| bad("identity", e.to_string()))?;
        let signing_key = parse_public_key(&self.signing_key).map_err(|e| bad("signing_key", e))?;
        let legacy_identity = self
            .legacy_identity
            .as_deref()
            .map(IdentityDigest::from_hex)
            .transpose()
            .map_err(|e| bad("legacy_identity", e.to_string()))?;
        let legacy_signing_key = self
            .legacy_signing_key
            .as_deref()
            .map(parse_public_key)
            .transpose()
            .map_err(|e| bad("legacy_signing_key", e))?;
        if legacy_identity.is_some() != legacy_signing_key.is_some() {
            return Err(NodeError::Config(format!(
                "authority {}: legacy_identity and legacy_signing_key go together",
                self.nickname
            )));
        }
        Ok(AuthorityEntry {
            nickname: self.nickname.clone(),
            identity,
            address: self.address.clone(),
            ipv4: self.ipv4,
            dir_port: self.dir_port,
            or_port: self.or_port,
            contact: self.contact.clone(),
            signing_key,
            legacy_identity,
            legacy_signing_key,
        })
    }
}

fn parse_public_key(s: &str) -> Result<PublicKey, String> {
    let bytes = hex::decode(s.trim()).map_err(|e| e.to_string())?;
    <[u8; 32]>::try_from(bytes.as_slice())
        .map(PublicKey)
        .map_err(|_| format!("expected 32 bytes, got {}", bytes.len()))
}

/// Configuration for a directory authority.
///
/// Loaded from a TOML file via [`NodeConfig::from_toml_file`] or built
/// programmatically for tests.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Where published consensuses and the metrics file are written.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Inbound documents: `votes/` and `signatures/` subdirectories.
    #[serde(default = "default_spool_dir")]
    pub spool_dir: PathBuf,

    /// Log format: "human" or "json".
    #[serde(default = "default_log_format")]
    pub log_format: String,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default = "default_voting_interval")]
    pub voting_interval_secs: u64,

    #[serde(default = "default_delay")]
    pub vote_delay_secs: u64,

    #[serde(default = "default_delay")]
    pub dist_delay_secs: u64,

    /// Shift of every interval start past its aligned boundary.
    #[serde(default)]
    pub interval_offset_secs: u64,

    /// Allow the short intervals of a testing network.
    #[serde(default)]
    pub testing_network: bool,

    #[serde(default = "default_identity_key_file")]
    pub identity_key_file: PathBuf,

    #[serde(default = "default_signing_key_file")]
    pub signing_key_file: PathBuf,

    #[serde(default)]
    pub legacy_key_file: Option<PathBuf>,

    /// This authority's signed vote for the coming period.
    #[serde(default = "default_own_vote_file")]
    pub own_vote_file: PathBuf,

    #[serde(default)]
    pub enable_metrics: bool,

    #[serde(default = "default_metrics_port")]
    pub metrics_port: u16,

    #[serde(default)]
    pub authorities: Vec<AuthorityConfig>,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_data_dir() -> PathBuf {
    PathBuf::from("./dirauth_data")
}

fn default_spool_dir() -> PathBuf {
    PathBuf::from("./dirauth_data/spool")
}

fn default_log_format() -> String {
    "human".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_voting_interval() -> u64 {
    3600
}

fn default_delay() -> u64 {
    300
}

fn default_identity_key_file() -> PathBuf {
    PathBuf::from("./keys/identity.key")
}

fn default_signing_key_file() -> PathBuf {
    PathBuf::from("./keys/signing.key")
}

fn default_own_vote_file() -> PathBuf {
    PathBuf::from("./dirauth_data/own-vote")
}

fn default_metrics_port() -> u16 {
    9135
}

fn default_dir_port() -> u16 {
    80
}

fn default_or_port() -> u16 {
    443
}

// ── Impl ───────────────────────────────────────────────────────────────

impl NodeConfig {
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, NodeError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| NodeError::Config(e.to_string()))?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(s: &str) -> Result<Self, NodeError> {
        toml::from_str(s).map_err(|e| NodeError::Config(e.to_string()))
    }

    pub fn to_toml_string(&self) -> Result<String, NodeError> {
        toml::to_string_pretty(self).map_err(|e| NodeError::Config(e.to_string()))
    }

    /// The configured authority set. Identities must be unique.
    pub fn roster(&self) -> Result<AuthorityRoster, NodeError> {
        let mut entries: Vec<AuthorityEntry> = Vec::with_capacity(self.authorities.len());
        for auth in &self.authorities {
            let entry = auth.to_entry()?;
            if entries.iter().any(|e| e.identity == entry.identity) {
                return Err(NodeError::Config(format!(
                    "authority {} listed twice",
                    entry.identity
                )));
            }
            entries.push(entry);
        }
        Ok(AuthorityRoster::new(entries))
    }

    pub fn load_keys(&self) -> Result<AuthorityKeys, NodeError> {
        let identity = KeySeed::from_file(&self.identity_key_file)?;
        let signing = KeySeed::from_file(&self.signing_key_file)?;
        let legacy = self
            .legacy_key_file
            .as_deref()
            .map(KeySeed::from_file)
            .transpose()?;
        Ok(AuthorityKeys::from_seeds(&identity, &signing, legacy.as_ref()))
    }

    pub fn timing_rules(&self) -> TimingRules {
        TimingRules::for_network(self.testing_network)
    }

    pub fn schedule_timing(&self) -> ScheduleTiming {
        ScheduleTiming {
            interval_secs: self.voting_interval_secs,
            vote_delay_secs: self.vote_delay_secs,
            dist_delay_secs: self.dist_delay_secs,
            offset_secs: self.interval_offset_secs,
        }
    }

    /// Reject timings a vote could not carry.
    pub fn validate(&self) -> Result<(), NodeError> {
        let rules = self.timing_rules();
        if self.voting_interval_secs < rules.min_interval {
            return Err(NodeError::Config(format!(
                "voting_interval_secs {} is below the minimum {}",
                self.voting_interval_secs, rules.min_interval
            )));
        }
        if self.vote_delay_secs < 2 || self.dist_delay_secs < 2 {
            return Err(NodeError::Config("voting delays must be at least 2 seconds".into()));
        }
        if self.vote_delay_secs + self.dist_delay_secs >= self.voting_interval_secs {
            return Err(NodeError::Config(
                "vote and distribution delays must fit inside the voting interval".into(),
            ));
        }
        if self.interval_offset_secs >= self.voting_interval_secs {
            return Err(NodeError::Config(
                "interval_offset_secs must be smaller than the voting interval".into(),
            ));
        }
        Ok(())
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            spool_dir: default_spool_dir(),
            log_format: default_log_format(),
            log_level: default_log_level(),
            voting_interval_secs: default_voting_interval(),
            vote_delay_secs: default_delay(),
            dist_delay_secs: default_delay(),
            interval_offset_secs: 0,
            testing_network: false,
            identity_key_file: default_identity_key_file(),
            signing_key_file: default_signing_key_file(),
            legacy_key_file: None,
            own_vote_file: default_own_vote_file(),
            enable_metrics: false,
            metrics_port: default_metrics_port(),
            authorities: Vec::new(),
        }
    }
}
