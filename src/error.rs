//! Error taxonomy for the tagging pipeline.
//!
//! Every variant is local to one file or one configuration artifact. The
//! pipeline logs them and moves on; none of them abort a run.

use std::error::Error as _;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

pub type Result<T, E = TaggerError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum TaggerError {
    #[error("no public type found in {path}: {reason}")]
    Analysis { path: PathBuf, reason: String },

    #[error("rule script not found: {path}")]
    ConfigNotFound {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to read rule script {path}")]
    RuleRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to {stage} {path}")]
    RewriteIo {
        path: PathBuf,
        stage: &'static str,
        #[source]
        source: io::Error,
    },

    #[error("cannot compute diff for {path}")]
    DiffUnavailable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid filter `{filter}`")]
    InvalidFilter {
        filter: String,
        #[source]
        source: regex::Error,
    },
}

impl TaggerError {
    /// The message followed by every underlying cause.
    pub fn chain(&self) -> String {
        let mut message = self.to_string();
        let mut source = self.source();
        while let Some(cause) = source {
            message.push_str(": ");
            message.push_str(&cause.to_string());
            source = cause.source();
        }
        message
    }

    pub(crate) fn rewrite_io(path: impl Into<PathBuf>, stage: &'static str, source: io::Error) -> Self {
        Self::RewriteIo {
            path: path.into(),
            stage,
            source,
        }
    }
}
