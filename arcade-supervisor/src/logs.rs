//! Per-worker log capture
//!
//! Every worker writes its standard output and standard error to two
//! append-only files, `{name}.out.log` and `{name}.err.log`, under the
//! configured log directory. The files are never rotated or truncated.
//! Tails are read through a separate read-only handle, so reading never
//! interferes with a worker that is still writing.

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use arcade_config::TailLimits;

use crate::error::{SupervisorError, SupervisorResult};

/// Locations of a worker's two log files
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogPaths {
    pub stdout: PathBuf,
    pub stderr: PathBuf,
}

/// Open append handles for a worker's output, handed to the child at spawn
#[derive(Debug)]
pub struct LogFiles {
    pub stdout: File,
    pub stderr: File,
}

/// Log directory layout and tail reading
#[derive(Debug, Clone)]
pub struct LogCapture {
    log_dir: PathBuf,
}

impl LogCapture {
    pub fn new(log_dir: impl Into<PathBuf>) -> Self {
        Self {
            log_dir: log_dir.into(),
        }
    }

    pub fn log_dir(&self) -> &Path {
        &self.log_dir
    }

    pub fn paths(&self, worker: &str) -> LogPaths {
        LogPaths {
            stdout: self.log_dir.join(format!("{}.out.log", worker)),
            stderr: self.log_dir.join(format!("{}.err.log", worker)),
        }
    }

    /// Open both log files in append mode, creating the directory if needed
    pub fn open(&self, worker: &str) -> SupervisorResult<LogFiles> {
        std::fs::create_dir_all(&self.log_dir).map_err(|e| {
            SupervisorError::io(
                format!("Failed to create log directory {}", self.log_dir.display()),
                e,
            )
        })?;

        let paths = self.paths(worker);
        Ok(LogFiles {
            stdout: open_append(&paths.stdout)?,
            stderr: open_append(&paths.stderr)?,
        })
    }

    /// Read the tails of both log files
    pub fn tail_both(&self, worker: &str, limits: TailLimits) -> (Vec<String>, Vec<String>) {
        let paths = self.paths(worker);
        (tail_lossy(&paths.stdout, limits), tail_lossy(&paths.stderr, limits))
    }
}

fn open_append(path: &Path) -> SupervisorResult<File> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| SupervisorError::io(format!("Failed to open log file {}", path.display()), e))
}

/// Read the last lines of a file
///
/// At most `limits.max_bytes` are read from the end of the file and at most
/// `limits.max_lines` lines are returned, newest last. A missing file yields
/// no lines. Invalid UTF-8, including a multi-byte sequence cut at the read
/// boundary, is replaced rather than reported.
pub fn tail(path: &Path, limits: TailLimits) -> io::Result<Vec<String>> {
    let mut file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e),
    };

    let len = file.metadata()?.len();
    let start = len.saturating_sub(limits.max_bytes);
    file.seek(SeekFrom::Start(start))?;

    let mut buf = Vec::with_capacity((len - start) as usize);
    file.take(limits.max_bytes).read_to_end(&mut buf)?;

    let text = String::from_utf8_lossy(&buf);
    let lines: Vec<&str> = text.lines().collect();
    let skip = lines.len().saturating_sub(limits.max_lines);

    Ok(lines[skip..].iter().map(|line| line.to_string()).collect())
}

/// [`tail`] that logs and swallows I/O errors; used on diagnostic paths
pub fn tail_lossy(path: &Path, limits: TailLimits) -> Vec<String> {
    tail(path, limits).unwrap_or_else(|e| {
        tracing::warn!("Failed to read log tail from {}: {}", path.display(), e);
        Vec::new()
    })
}
