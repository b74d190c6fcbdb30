//! Append-only per-iteration progress log.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

const HEADER: &str = "iteration,bestScore";

/// CSV log with one `(iteration, bestScore)` row per iteration.
///
/// The header is written exactly once, iff the file does not yet exist;
/// rows are appended and flushed immediately so an interrupted run still
/// leaves a usable log.
#[derive(Debug)]
pub struct ProgressLog {
    file: File,
    path: PathBuf,
}

impl ProgressLog {
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let fresh = !path.exists();
        let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
        if fresh {
            writeln!(file, "{HEADER}")?;
            file.flush()?;
        }
        debug!(path = %path.display(), fresh, "progress log opened");
        Ok(Self { file, path })
    }

    pub fn record(&mut self, iteration: u64, best_score: f64) -> io::Result<()> {
        writeln!(self.file, "{iteration},{best_score}")?;
        self.file.flush()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
