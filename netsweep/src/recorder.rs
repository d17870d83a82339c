//! Per-host log artifacts.
//!
//! All artifacts of a batch live in `<root>/log-<stamp>/`. Each host gets
//! `<host>-<stamp>.log` (plus `-<n>` when the host repeats), which is
//! renamed to carry the failure category when the run fails.

use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::Local;
use log::debug;

use crate::channel::SessionSink;
use crate::error::{RecorderError, Result};
use crate::outcome::RunOutcome;

/// Timestamp format shared by the batch directory and artifact names.
pub const STAMP_FORMAT: &str = "%Y%m%d-%H%M%S";

/// Local-time stamp for a new batch.
pub fn batch_stamp() -> String {
    Local::now().format(STAMP_FORMAT).to_string()
}

/// Creates and names the artifacts of one batch.
#[derive(Debug)]
pub struct RunRecorder {
    dir: PathBuf,
    stamp: String,
    /// Artifacts opened so far per host name.
    opened: Mutex<HashMap<String, usize>>,
}

impl RunRecorder {
    pub fn new(root: impl AsRef<Path>, stamp: impl Into<String>) -> Self {
        let stamp = stamp.into();
        Self {
            dir: root.as_ref().join(format!("log-{}", stamp)),
            stamp,
            opened: Mutex::new(HashMap::new()),
        }
    }

    /// The batch directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn stamp(&self) -> &str {
        &self.stamp
    }

    /// Create the batch directory if it does not exist yet.
    pub fn prepare(&self) -> Result<()> {
        fs::create_dir_all(&self.dir).map_err(|source| RecorderError::CreateDir {
            path: self.dir.clone(),
            source,
        })?;
        Ok(())
    }

    /// Create a fresh artifact for `host`.
    pub fn open(&self, host: &str) -> Result<ArtifactHandle> {
        self.prepare()?;

        let base = format!("{}-{}", sanitize(host), self.stamp);
        let mut seq = self.next_seq(&base);

        loop {
            let stem = match seq {
                1 => base.clone(),
                n => format!("{}-{}", base, n),
            };
            let path = self.dir.join(format!("{}.log", stem));
            if self.finalized_exists(&stem) {
                seq = self.next_seq(&base);
                continue;
            }

            match OpenOptions::new().append(true).create_new(true).open(&path) {
                Ok(file) => {
                    debug!("opened artifact {}", path.display());
                    return Ok(ArtifactHandle {
                        dir: self.dir.clone(),
                        stem,
                        path,
                        file,
                    });
                }
                // left behind by an earlier run with the same stamp
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                    seq = self.next_seq(&base);
                }
                Err(source) => return Err(RecorderError::CreateFile { path, source }.into()),
            }
        }
    }

    /// Whether an earlier run already left a failure artifact for `stem`.
    fn finalized_exists(&self, stem: &str) -> bool {
        RunOutcome::FAILURES
            .iter()
            .filter_map(RunOutcome::suffix)
            .any(|suffix| self.dir.join(format!("{}-{}.log", stem, suffix)).exists())
    }

    fn next_seq(&self, base: &str) -> usize {
        let mut opened = self
            .opened
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let seq = opened.entry(base.to_string()).or_insert(0);
        *seq += 1;
        *seq
    }
}

/// One host's artifact, open for appending.
#[derive(Debug)]
pub struct ArtifactHandle {
    dir: PathBuf,
    stem: String,
    path: PathBuf,
    file: File,
}

impl ArtifactHandle {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A second handle on the same file for the raw session stream.
    pub fn session_log(&self) -> Result<SessionSink> {
        let file = self.file.try_clone().map_err(|source| RecorderError::Write {
            path: self.path.clone(),
            source,
        })?;
        Ok(Box::new(file))
    }

    pub fn write(&mut self, bytes: &[u8]) -> Result<()> {
        self.file
            .write_all(bytes)
            .map_err(|source| RecorderError::Write {
                path: self.path.clone(),
                source,
            })?;
        Ok(())
    }

    /// Flush, close and rename the artifact to carry `outcome`.
    ///
    /// Returns the final path. Success keeps the original name. An
    /// existing file at the target name is never replaced.
    pub fn finalize(mut self, outcome: RunOutcome) -> Result<PathBuf> {
        self.file.flush().map_err(|source| RecorderError::Write {
            path: self.path.clone(),
            source,
        })?;
        drop(self.file);

        let Some(suffix) = outcome.suffix() else {
            return Ok(self.path);
        };

        let target = self.dir.join(format!("{}-{}.log", self.stem, suffix));
        let rename_err = |source| RecorderError::Rename {
            from: self.path.clone(),
            to: target.clone(),
            source,
        };
        // hard_link fails with AlreadyExists where rename would replace
        fs::hard_link(&self.path, &target).map_err(rename_err)?;
        fs::remove_file(&self.path).map_err(rename_err)?;
        Ok(target)
    }
}

/// Keep host names from escaping the batch directory.
fn sanitize(host: &str) -> String {
    host.chars()
        .map(|c| match c {
            '/' | '\\' | '\0' => '_',
            c => c,
        })
        .collect()
}
