//! Terminal outcomes of a single stage run.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::scheduler::pipe_stream::is_pipe_closed;

/// Why a stage stopped before exhausting its input.
#[derive(Debug, Error)]
pub enum StageError {
    /// A regular expression failed to compile.
    #[error("{stage}: invalid pattern {pattern:?}: {source}")]
    InvalidPattern {
        stage: &'static str,
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// The tee side file could not be created or written.
    #[error("tee: {}: {source}", path.display())]
    Tee {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cancelled")]
    Cancelled,

    #[error("deadline exceeded")]
    DeadlineExceeded,

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl StageError {
    /// True when the stage only failed because its consumer stopped reading.
    pub fn is_pipe_closed(&self) -> bool {
        matches!(self, StageError::Io(err) if is_pipe_closed(err))
    }

    /// True for cancellation and deadline expiry.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, StageError::Cancelled | StageError::DeadlineExceeded)
    }
}
