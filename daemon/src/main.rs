//! dirauthd: directory authority voting daemon.

mod files;
mod metrics_server;
mod spool;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use dirauth_ledger::{VoteLedger, VoteSource, VotingWindow};
use dirauth_netdoc::{parse_vote, split_documents};
use dirauth_node::{
    init_logging, AuthorityMetrics, AuthorityTransport, AuthorityVotingState, Clock,
    ConsensusPublisher, LogFormat, NodeConfig, OwnVoteProvider, ShutdownController, SystemClock,
    VotingScheduler,
};
use dirauth_types::Timestamp;
use dirauth_utils::{format_duration, format_relative};
use tokio::time::MissedTickBehavior;

use crate::files::{consensus_file_name, write_atomic, FilePublisher, FileVoteProvider};
use crate::spool::{vote_source, Spool};

#[derive(Parser)]
#[command(name = "dirauthd", about = "Directory authority voting daemon")]
struct Cli {
    /// Path to the TOML configuration file. CLI flags and env vars
    /// override its settings.
    #[arg(long, env = "DIRAUTH_CONFIG")]
    config: PathBuf,

    /// Directory published consensuses are written to.
    #[arg(long, env = "DIRAUTH_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Directory documents are exchanged through.
    #[arg(long, env = "DIRAUTH_SPOOL_DIR")]
    spool_dir: Option<PathBuf>,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[arg(long, env = "DIRAUTH_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log format: "human" or "json".
    #[arg(long, env = "DIRAUTH_LOG_FORMAT")]
    log_format: Option<String>,

    /// Allow testing-network voting intervals.
    #[arg(long, env = "DIRAUTH_TESTING_NETWORK")]
    testing_network: bool,

    /// Enable the Prometheus metrics endpoint.
    #[arg(long, env = "DIRAUTH_ENABLE_METRICS")]
    metrics: bool,

    /// Metrics endpoint port.
    #[arg(long, env = "DIRAUTH_METRICS_PORT")]
    metrics_port: Option<u16>,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Take part in the voting protocol until SIGINT/SIGTERM.
    Run,
    /// Compute and sign consensuses from vote files, without the network.
    Compute {
        /// Where to write the consensuses and detached signatures.
        /// Defaults to the data directory.
        #[arg(long)]
        out_dir: Option<PathBuf>,
        /// Vote files; the first one fixes the voting period.
        #[arg(required = true)]
        votes: Vec<PathBuf>,
    },
    /// Print the effective configuration as TOML.
    ShowConfig,
}

impl Cli {
    /// Overlay command-line settings on the file configuration.
    fn apply(&self, mut config: NodeConfig) -> NodeConfig {
        if let Some(dir) = &self.data_dir {
            config.data_dir = dir.clone();
        }
        if let Some(dir) = &self.spool_dir {
            config.spool_dir = dir.clone();
        }
        if let Some(level) = &self.log_level {
            config.log_level = level.clone();
        }
        if let Some(format) = &self.log_format {
            config.log_format = format.clone();
        }
        if let Some(port) = self.metrics_port {
            config.metrics_port = port;
        }
        config.testing_network |= self.testing_network;
        config.enable_metrics |= self.metrics;
        config
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let file_config = NodeConfig::from_toml_file(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;
    let config = cli.apply(file_config);

    let format: LogFormat = config.log_format.parse()?;
    init_logging(format, &config.log_level);
    config.validate()?;
    tracing::info!(config = %cli.config.display(), "loaded configuration");

    match cli.command {
        Command::Run => run(config).await,
        Command::Compute { out_dir, votes } => {
            let out_dir = out_dir.unwrap_or_else(|| config.data_dir.clone());
            compute(&config, &votes, &out_dir)
        }
        Command::ShowConfig => {
            print!("{}", config.to_toml_string()?);
            Ok(())
        }
    }
}

// ── Run ────────────────────────────────────────────────────────────────

async fn run(config: NodeConfig) -> anyhow::Result<()> {
    let roster = config.roster()?;
    let keys = config.load_keys()?;
    let identity = keys.identity_digest();
    anyhow::ensure!(
        roster.contains(&identity),
        "our identity {identity} is not among the configured authorities"
    );
    std::fs::create_dir_all(&config.data_dir)
        .with_context(|| format!("creating {}", config.data_dir.display()))?;
    let spool = Spool::open(&config.spool_dir)
        .with_context(|| format!("opening spool {}", config.spool_dir.display()))?;

    let clock = SystemClock;
    let metrics = AuthorityMetrics::new()?;
    let authorities = roster.len();
    let state = AuthorityVotingState::new(
        roster,
        keys,
        config.timing_rules(),
        config.schedule_timing(),
        clock.now(),
    );
    let mut scheduler = VotingScheduler::new(
        state,
        FileVoteProvider::new(&config.own_vote_file),
        spool.transport(),
        FilePublisher::new(&config.data_dir),
        metrics.clone(),
    );

    let shutdown = Arc::new(ShutdownController::new());
    let mut stop = shutdown.subscribe();
    {
        let shutdown = Arc::clone(&shutdown);
        tokio::spawn(async move { shutdown.wait_for_signal().await });
    }
    let metrics_task = config.enable_metrics.then(|| {
        tokio::spawn(metrics_server::serve(
            config.metrics_port,
            metrics,
            shutdown.subscribe(),
        ))
    });

    tracing::info!(
        %identity,
        authorities,
        interval = %format_duration(config.voting_interval_secs),
        spool = %config.spool_dir.display(),
        "directory authority started"
    );

    let mut poll = tokio::time::interval(Duration::from_secs(1));
    poll.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut next_wakeup = clock.now();
    let reason = loop {
        tokio::select! {
            reason = stop.stopped() => break reason,
            _ = poll.tick() => {}
        }
        drain_spool(&mut scheduler, &spool, clock.now());

        let now = clock.now();
        if now >= next_wakeup {
            next_wakeup = scheduler.tick(now);
            tracing::debug!(
                next = %next_wakeup,
                when = %format_relative(now.as_secs(), next_wakeup.as_secs()),
                "next scheduled action"
            );
        }
    };

    if let Some(task) = metrics_task {
        match task.await {
            Ok(Err(e)) => tracing::warn!(error = %e, "metrics endpoint failed"),
            Err(e) => tracing::warn!(error = %e, "metrics task panicked"),
            Ok(Ok(())) => {}
        }
    }
    tracing::info!(%reason, "dirauthd exited cleanly");
    Ok(())
}

/// Feed every spooled vote and signature document to the scheduler.
fn drain_spool<V, T, P>(scheduler: &mut VotingScheduler<V, T, P>, spool: &Spool, now: Timestamp)
where
    V: OwnVoteProvider,
    T: AuthorityTransport,
    P: ConsensusPublisher,
{
    match spool.drain_votes() {
        Ok(docs) => {
            for doc in docs {
                let results = scheduler.receive_votes(&doc.text, vote_source(&doc.name, now));
                let accepted = results.iter().filter(|r| r.is_ok()).count();
                tracing::info!(
                    file = %doc.name,
                    accepted,
                    rejected = results.len() - accepted,
                    "processed spooled votes"
                );
            }
        }
        Err(e) => tracing::warn!(error = %e, "couldn't read the vote spool"),
    }

    match spool.drain_signatures() {
        Ok(docs) => {
            for doc in docs {
                match scheduler.receive_signatures(&doc.text, &doc.name) {
                    Ok(added) => tracing::debug!(file = %doc.name, added, "processed spooled signatures"),
                    Err(e) => tracing::warn!(file = %doc.name, error = %e, "couldn't merge signatures"),
                }
            }
        }
        Err(e) => tracing::warn!(error = %e, "couldn't read the signature spool"),
    }
}

// ── Compute ────────────────────────────────────────────────────────────

/// Reduce `votes` to signed consensuses and write them to `out_dir`.
fn compute(config: &NodeConfig, votes: &[PathBuf], out_dir: &Path) -> anyhow::Result<()> {
    let roster = config.roster()?;
    let keys = config.load_keys()?;
    let rules = config.timing_rules();

    let mut texts = Vec::with_capacity(votes.len());
    for path in votes {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        texts.push((path, text));
    }
    let first = texts
        .first()
        .and_then(|(_, text)| split_documents(text).next())
        .context("the first vote file holds no document")?;
    let valid_after = parse_vote(first, &rules)?.valid_after;
    let window = VotingWindow {
        valid_after,
        fetch_missing_votes: valid_after,
    };

    let mut ledger = VoteLedger::new(roster, keys.identity_digest(), rules);
    for (path, text) in &texts {
        for accepted in ledger
            .accept_votes(text, VoteSource::Fetched, &window)
            .into_iter()
            .flatten()
        {
            tracing::info!(
                file = %path.display(),
                voter = %accepted.identity,
                digest = %accepted.digest,
                "loaded vote"
            );
        }
    }

    let detached = ledger.compute_all(&keys)?;
    std::fs::create_dir_all(out_dir).with_context(|| format!("creating {}", out_dir.display()))?;
    for flavor in ledger.pending_flavors() {
        if let Some(pending) = ledger.pending_consensus(flavor) {
            let path = out_dir.join(consensus_file_name(flavor));
            write_atomic(&path, &pending.text)
                .with_context(|| format!("writing {}", path.display()))?;
            println!("{}", path.display());
        }
    }
    let path = out_dir.join("detached-signatures");
    write_atomic(&path, &detached).with_context(|| format!("writing {}", path.display()))?;
    println!("{}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_cli(args: &[&str]) -> Cli {
        let mut full = vec!["dirauthd", "--config", "auth.toml"];
        full.extend_from_slice(args);
        Cli::try_parse_from(full).unwrap()
    }

    #[test]
    fn cli_flags_override_file_settings() {
        let cli = make_cli(&[
            "--data-dir",
            "/srv/dirauth",
            "--log-format",
            "json",
            "--metrics",
            "--metrics-port",
            "9200",
            "run",
        ]);
        let config = cli.apply(NodeConfig::default());
        assert_eq!(config.data_dir, PathBuf::from("/srv/dirauth"));
        assert_eq!(config.log_format, "json");
        assert!(config.enable_metrics);
        assert_eq!(config.metrics_port, 9200);
        assert!(!config.testing_network);
    }

    #[test]
    fn absent_flags_keep_file_settings() {
        let cli = make_cli(&["show-config"]);
        let file = NodeConfig {
            spool_dir: PathBuf::from("/var/spool/dirauth"),
            testing_network: true,
            ..NodeConfig::default()
        };
        let config = cli.apply(file);
        assert_eq!(config.spool_dir, PathBuf::from("/var/spool/dirauth"));
        assert!(config.testing_network);
        assert_eq!(config.voting_interval_secs, 3600);
    }

    #[test]
    fn compute_requires_vote_files() {
        assert!(Cli::try_parse_from(["dirauthd", "--config", "a.toml", "compute"]).is_err());
        let cli = make_cli(&["compute", "--out-dir", "/tmp/out", "v1", "v2"]);
        match cli.command {
            Command::Compute { out_dir, votes } => {
                assert_eq!(out_dir, Some(PathBuf::from("/tmp/out")));
                assert_eq!(votes.len(), 2);
            }
            _ => panic!("expected compute"),
        }
    }
}
