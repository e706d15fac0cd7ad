use std::{io, path::PathBuf};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("failed to open log file {}: {source}", path.display())]
    LogFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("i/o error: {0}")]
    Io(#[from] io::Error),

    /// Operator closed standard input while a question was pending
    #[error("end of input")]
    EndOfInput,

    #[error("failed to install interrupt handler: {0}")]
    Signal(#[from] ctrlc::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Failures of a single packet send. Never fatal to a run.
#[derive(Error, Debug)]
pub enum SendError {
    #[error("could not resolve {host}: {source}")]
    Resolve {
        host: String,
        #[source]
        source: io::Error,
    },

    #[error("{0} did not resolve to any address")]
    NoAddress(String),

    #[error("{0}")]
    Io(#[from] io::Error),
}
