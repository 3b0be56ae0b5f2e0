// Library root
// -----------
// This crate exposes the library surface used by the `bookshelf` binary.
//
// Module responsibilities:
// - `catalog`: blocking client for the remote book catalog and the
//   `CatalogCandidate` search result shape.
// - `record`: one book's Markdown file with YAML front matter, its status
//   and dates.
// - `store`: the library directory (scan, import, delete).
// - `navigator`: the type-ahead list picker used by every list screen.
// - `ui`: the interactive flows built on the navigator and `dialoguer`.
// - `backfill`: bulk refresh of catalog metadata for existing records.
// - `vcs`: git sync and publish for libraries under version control.
// - `config` / `error`: startup configuration and the error taxonomy.
pub mod backfill;
pub mod catalog;
pub mod config;
pub mod error;
pub mod navigator;
pub mod record;
pub mod store;
pub mod ui;
pub mod vcs;

pub use error::{Error, Result};
