use std::{
    fs::{File, OpenOptions},
    io::{self, BufWriter, Write},
    path::{Path, PathBuf},
    sync::Mutex,
};

use log::warn;

use crate::error::{Error, Result};

/// Append-only destination for operator log lines
pub trait LogSink: Send + Sync {
    fn append(&self, line: &str) -> io::Result<()>;
    fn flush(&self) -> io::Result<()>;
}

pub struct LogFile {
    path: PathBuf,
    writer: Mutex<BufWriter<File>>,
}

impl LogFile {
    /// Opens `path` for appending, creating it if needed. Never truncates.
    pub fn open(path: &Path) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|source| Error::LogFile {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(Self {
            path: path.to_path_buf(),
            writer: Mutex::new(BufWriter::new(file)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock(&self) -> io::Result<std::sync::MutexGuard<'_, BufWriter<File>>> {
        self.writer
            .lock()
            .map_err(|e| io::Error::other(format!("log file lock poisoned: {e}")))
    }
}

impl LogSink for LogFile {
    fn append(&self, line: &str) -> io::Result<()> {
        let mut writer = self.lock()?;
        writeln!(writer, "{line}")
    }

    fn flush(&self) -> io::Result<()> {
        self.lock()?.flush()
    }
}

impl Drop for LogFile {
    fn drop(&mut self) {
        if let Err(e) = LogSink::flush(self) {
            warn!("Failed to flush {}: {}", self.path.display(), e);
        }
    }
}
