//! Error types of the conversion.

use std::io;
use std::path::{ Path, PathBuf };
use thiserror::Error;

/// Errors that abort a conversion run.
///
/// Every variant is fatal: a run either produces a complete
/// activity report or one of these.
#[derive(Debug, Error)]
pub enum ToggleError {
    /// An option value is out of range.
    #[error("invalid configuration: {0}")]
    Config(String),
    /// An input or output path cannot be opened.
    #[error("cannot access {}: {source}", path.display())]
    Access {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// A header token, range, or value record is malformed.
    #[error("{}: malformed trace: {message}", file.display())]
    Format { file: PathBuf, message: String },
    /// The trace disagrees with itself or with the signal catalog.
    #[error("{}: inconsistent trace: {message}", file.display())]
    Consistency { file: PathBuf, message: String },
    /// The timestamps do not follow a single periodic clock.
    #[error("{}: irregular clock at time {time}: {message}",
            file.display())]
    Timing { file: PathBuf, time: u64, message: String },
}

impl ToggleError {
    #[inline]
    pub(crate) fn access(path: &Path, source: io::Error) -> ToggleError {
        ToggleError::Access { path: path.to_path_buf(), source }
    }
}

/// A fault found while interpreting one trace, before it is
/// attributed to a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TraceFault {
    Format(String),
    Consistency(String),
    Timing { time: u64, message: String },
}

impl TraceFault {
    /// Attach the offending file.
    pub fn in_file(self, file: &Path) -> ToggleError {
        let file = file.to_path_buf();
        match self {
            TraceFault::Format(message) =>
                ToggleError::Format { file, message },
            TraceFault::Consistency(message) =>
                ToggleError::Consistency { file, message },
            TraceFault::Timing { time, message } =>
                ToggleError::Timing { file, time, message },
        }
    }
}
