// Error taxonomy shared by every module of the library crate. The binary
// wraps these in `anyhow` at the top level.

use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by catalog, library and version-control operations.
#[derive(Debug, Error)]
pub enum Error {
    /// The catalog reported zero matches. Recoverable: ask for another query.
    #[error("no books found for \"{query}\"")]
    NotFound { query: String },

    /// A record file is missing its front matter or has malformed metadata.
    #[error("malformed record {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },

    /// Missing or invalid configuration. The message tells the user what to set.
    #[error("{0}")]
    Config(String),

    /// An external program (editor, viewer, git) exited unsuccessfully.
    #[error("`{program}` exited with {status}")]
    Command { program: String, status: String },

    #[error("catalog request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn parse(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        Error::Parse {
            path: path.into(),
            message: message.to_string(),
        }
    }

    /// Whether this is the recoverable "nothing matched" case.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
