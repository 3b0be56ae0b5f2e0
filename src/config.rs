// Startup configuration. Everything the rest of the crate needs from the
// environment is read once here and passed around as a plain struct.

use crate::error::{Error, Result};
use std::path::PathBuf;
use std::time::Duration;

pub const LIBRARY_PATH_VAR: &str = "BOOKSHELF_LIBRARY_PATH";
pub const CATALOG_URL_VAR: &str = "BOOKSHELF_CATALOG_URL";
pub const VIEWER_VAR: &str = "BOOKSHELF_VIEWER";

pub const DEFAULT_CATALOG_URL: &str = "https://www.googleapis.com/books/v1";

#[cfg(target_os = "macos")]
const DEFAULT_VIEWER: &str = "open";
#[cfg(not(target_os = "macos"))]
const DEFAULT_VIEWER: &str = "xdg-open";

#[derive(Debug, Clone)]
pub struct Config {
    /// Directory holding the record files and cover images.
    pub library: PathBuf,
    /// Base URL of the catalog API, without a trailing slash.
    pub catalog_url: String,
    /// Results requested per catalog page.
    pub page_size: usize,
    /// Keystrokes further apart than this start a new type-ahead search.
    pub typeahead_timeout: Duration,
    /// Command used to edit a record file.
    pub editor: String,
    /// Command used to open images and web pages.
    pub viewer: String,
}

impl Config {
    /// Build the configuration from process environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup. A missing
    /// library path is the only fatal condition; everything else defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let library = lookup(LIBRARY_PATH_VAR)
            .filter(|value| !value.trim().is_empty())
            .ok_or_else(|| {
                Error::Config(format!(
                    "Use the {LIBRARY_PATH_VAR} environment variable to specify the location of your library."
                ))
            })?;

        let catalog_url = lookup(CATALOG_URL_VAR)
            .unwrap_or_else(|| DEFAULT_CATALOG_URL.into())
            .trim_end_matches('/')
            .to_string();

        Ok(Config {
            library: expand_home(&library),
            catalog_url,
            page_size: 10,
            typeahead_timeout: Duration::from_secs(1),
            editor: lookup("EDITOR").unwrap_or_else(|| "vi".into()),
            viewer: lookup(VIEWER_VAR).unwrap_or_else(|| DEFAULT_VIEWER.into()),
        })
    }
}

/// Expand a leading `~` to the user's home directory.
fn expand_home(path: &str) -> PathBuf {
    if path == "~" {
        return dirs::home_dir().unwrap_or_else(|| PathBuf::from(path));
    }
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}
