//! File-backed collaborators: our own vote comes from a file written by the
//! measurement side, published consensuses go to the data directory.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use dirauth_node::{ConsensusPublisher, NodeError, OwnVoteProvider};
use dirauth_types::{Flavor, Timestamp};

/// Replace `path` with `contents` so readers never see a partial file.
pub fn write_atomic(path: &Path, contents: &str) -> io::Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut tmp = tempfile::Builder::new().prefix(".tmp").tempfile_in(dir)?;
    tmp.write_all(contents.as_bytes())?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Reads this authority's signed vote from a fixed path each period.
pub struct FileVoteProvider {
    path: PathBuf,
}

impl FileVoteProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl OwnVoteProvider for FileVoteProvider {
    fn own_vote(&self, valid_after: Timestamp) -> Result<String, NodeError> {
        let text = fs::read_to_string(&self.path)
            .map_err(|e| NodeError::NoOwnVote(format!("{}: {e}", self.path.display())))?;
        if text.trim().is_empty() {
            return Err(NodeError::NoOwnVote(format!("{} is empty", self.path.display())));
        }
        tracing::debug!(file = %self.path.display(), %valid_after, "read our vote");
        Ok(text)
    }
}

/// File a published consensus of `flavor` is served from.
pub fn consensus_file_name(flavor: Flavor) -> &'static str {
    match flavor {
        Flavor::Ns => "cached-consensus",
        Flavor::Microdesc => "cached-microdesc-consensus",
    }
}

/// Serves each flavor's latest consensus as a file under `dir`.
pub struct FilePublisher {
    dir: PathBuf,
}

impl FilePublisher {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, flavor: Flavor) -> PathBuf {
        self.dir.join(consensus_file_name(flavor))
    }
}

impl ConsensusPublisher for FilePublisher {
    fn publish(&self, flavor: Flavor, text: &str) -> Result<(), NodeError> {
        let path = self.path_for(flavor);
        write_atomic(&path, text)
            .map_err(|e| NodeError::Publish(format!("{}: {e}", path.display())))?;
        tracing::info!(%flavor, file = %path.display(), "consensus written");
        Ok(())
    }
}
