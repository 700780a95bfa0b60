//! Session artifact output.
//!
//! Runs persist their intermediate and final text artifacts through a sink
//! trait so tests and embedded callers can run without touching the
//! filesystem.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;

/// Destination for named text artifacts produced during a run.
pub trait ArtifactSink: Send + Sync {
    fn write(&self, name: &str, content: &str) -> Result<(), io::Error>;
}

/// Writes artifacts as files under a root directory.
pub struct FsArtifactSink {
    root: PathBuf,
}

impl FsArtifactSink {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl ArtifactSink for FsArtifactSink {
    fn write(&self, name: &str, content: &str) -> Result<(), io::Error> {
        let path = self.root.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        debug!(path = %path.display(), "writing artifact");
        fs::write(&path, content)
    }
}

/// Discards all artifacts.
pub struct NullSink;

impl ArtifactSink for NullSink {
    fn write(&self, _name: &str, _content: &str) -> Result<(), io::Error> {
        Ok(())
    }
}
