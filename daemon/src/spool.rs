//! Filesystem spool: how the daemon exchanges documents with the other
//! authorities.
//!
//! Layout under the spool root:
//!
//! - `incoming/votes/`: vote documents posted to us or fetched by us
//! - `incoming/signatures/`: detached signature documents
//! - `outgoing/`: our vote, our signatures and fetch requests
//!
//! Whatever carries documents between authorities (an HTTP front end, a
//! sync job) reads `outgoing/` and fills `incoming/`. Incoming files are
//! consumed in name order and removed once read. Names starting with `.`
//! are in-progress writes and are left alone. A vote file whose name starts
//! with `fetched-` is one we asked for; any other vote file was posted to us.

use std::cell::Cell;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use dirauth_ledger::VoteSource;
use dirauth_node::{AuthorityTransport, NodeError};
use dirauth_types::{IdentityDigest, Timestamp};

use crate::files::write_atomic;

/// One document taken from an incoming directory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SpooledDocument {
    /// File name, used as the document's source in log lines.
    pub name: String,
    pub text: String,
}

pub struct Spool {
    root: PathBuf,
}

impl Spool {
    /// Open the spool at `root`, creating its directories.
    pub fn open(root: impl Into<PathBuf>) -> io::Result<Self> {
        let spool = Self { root: root.into() };
        for dir in [spool.votes_dir(), spool.signatures_dir(), spool.outgoing_dir()] {
            fs::create_dir_all(dir)?;
        }
        Ok(spool)
    }

    pub fn votes_dir(&self) -> PathBuf {
        self.root.join("incoming").join("votes")
    }

    pub fn signatures_dir(&self) -> PathBuf {
        self.root.join("incoming").join("signatures")
    }

    pub fn outgoing_dir(&self) -> PathBuf {
        self.root.join("outgoing")
    }

    pub fn drain_votes(&self) -> io::Result<Vec<SpooledDocument>> {
        drain(&self.votes_dir())
    }

    pub fn drain_signatures(&self) -> io::Result<Vec<SpooledDocument>> {
        drain(&self.signatures_dir())
    }

    pub fn transport(&self) -> SpoolTransport {
        SpoolTransport::new(self.outgoing_dir())
    }
}

/// How the vote in spool file `name` reached us, if read at `now`.
pub fn vote_source(name: &str, now: Timestamp) -> VoteSource {
    if name.starts_with("fetched-") {
        VoteSource::Fetched
    } else {
        VoteSource::Posted { received_at: now }
    }
}

fn drain(dir: &Path) -> io::Result<Vec<SpooledDocument>> {
    let mut paths = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() || entry.file_name().to_string_lossy().starts_with('.') {
            continue;
        }
        paths.push(entry.path());
    }
    paths.sort();

    let mut docs = Vec::with_capacity(paths.len());
    for path in paths {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        match fs::read_to_string(&path) {
            Ok(text) => docs.push(SpooledDocument { name, text }),
            Err(e) => tracing::warn!(file = %path.display(), error = %e, "dropping unreadable spool file"),
        }
        fs::remove_file(&path)?;
    }
    Ok(docs)
}

// ── Transport ──────────────────────────────────────────────────────────

/// Writes every outbound document or request as one file in `outgoing/`.
///
/// File names are `<unix time>-<sequence>-<kind>` so a reader sees them in
/// the order they were produced.
pub struct SpoolTransport {
    dir: PathBuf,
    seq: Cell<u64>,
}

impl SpoolTransport {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            seq: Cell::new(0),
        }
    }

    fn write(&self, kind: &str, body: &str) -> Result<(), NodeError> {
        let seq = self.seq.get();
        self.seq.set(seq + 1);
        let name = format!("{}-{seq:04}-{kind}", Timestamp::now().as_secs());
        write_atomic(&self.dir.join(&name), body)
            .map_err(|e| NodeError::Transport(format!("{name}: {e}")))?;
        tracing::debug!(file = %name, "spooled outgoing document");
        Ok(())
    }
}

impl AuthorityTransport for SpoolTransport {
    fn broadcast_vote(&self, text: &str) -> Result<(), NodeError> {
        self.write("vote", text)
    }

    fn broadcast_signatures(&self, text: &str) -> Result<(), NodeError> {
        self.write("signatures", text)
    }

    fn fetch_missing_votes(&self, missing: &[IdentityDigest]) -> Result<(), NodeError> {
        let body: String = missing.iter().map(|id| format!("{}\n", id.to_hex())).collect();
        self.write("fetch-votes", &body)
    }

    fn fetch_missing_signatures(&self) -> Result<(), NodeError> {
        self.write("fetch-signatures", "")
    }
}
