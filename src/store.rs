// Library store: the directory of record files and their cover images.

use crate::catalog::{Catalog, CatalogCandidate};
use crate::error::Result;
use crate::record::{LibraryRecord, Metadata};
use std::cmp::Ordering;
use std::io::ErrorKind;
use std::path::PathBuf;
use tracing::{debug, info, warn};

pub const RECORD_EXTENSION: &str = "markdown";
const INDEX_SUFFIX: &str = "index.markdown";

/// A library directory.
#[derive(Debug, Clone)]
pub struct Library {
    root: PathBuf,
}

impl Library {
    pub fn open(root: impl Into<PathBuf>) -> Self {
        Library { root: root.into() }
    }

    /// Paths of every record file, excluding the index page.
    pub fn record_paths(&self) -> Result<Vec<PathBuf>> {
        let mut paths = Vec::new();
        for entry in std::fs::read_dir(&self.root)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().to_lowercase();
            if !name.ends_with(&format!(".{RECORD_EXTENSION}")) || name.ends_with(INDEX_SUFFIX) {
                continue;
            }
            if entry.file_type()?.is_file() {
                paths.push(entry.path());
            }
        }
        Ok(paths)
    }

    /// Load every record sorted by title. Files that fail to parse are
    /// skipped with a warning so one bad record does not hide the rest.
    pub fn scan(&self) -> Result<Vec<LibraryRecord>> {
        let mut records = Vec::new();
        for path in self.record_paths()? {
            match LibraryRecord::load(&path) {
                Ok(record) => records.push(record),
                Err(e) => warn!(path = %path.display(), "skipping record: {e}"),
            }
        }
        sort_by_title(&mut records);
        debug!(count = records.len(), root = %self.root.display(), "scanned library");
        Ok(records)
    }

    /// Load every record sorted by title, failing on the first bad file.
    pub fn load_strict(&self) -> Result<Vec<LibraryRecord>> {
        let mut records = self
            .record_paths()?
            .iter()
            .map(|path| LibraryRecord::load(path))
            .collect::<Result<Vec<_>>>()?;
        sort_by_title(&mut records);
        Ok(records)
    }

    /// Remove a record and its cover. A cover that is already gone is fine.
    pub fn delete(&self, record: &LibraryRecord) -> Result<()> {
        if let Some(cover) = record.cover_path() {
            match std::fs::remove_file(&cover) {
                Ok(()) => debug!(cover = %cover.display(), "removed cover"),
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        std::fs::remove_file(record.path())?;
        info!(path = %record.path().display(), "deleted record");
        Ok(())
    }

    /// Create a to-read record for `candidate`, downloading its cover when
    /// the catalog has one. An existing record with the same basename is
    /// overwritten.
    pub fn import(
        &self,
        candidate: &CatalogCandidate,
        catalog: &dyn Catalog,
    ) -> Result<LibraryRecord> {
        let basename = candidate.basename();
        let mut metadata = Metadata::from_candidate(candidate);

        if let Some(url) = &candidate.thumbnail_url {
            let cover = format!("{basename}.jpg");
            if catalog.download(url, &self.root.join(&cover))? {
                metadata.cover = Some(cover);
            }
        }

        let path = self.root.join(format!("{basename}.{RECORD_EXTENSION}"));
        let record = LibraryRecord::new(path, metadata);
        record.save()?;
        info!(path = %record.path().display(), "imported record");
        Ok(record)
    }
}

/// Case-insensitive title order, falling back to the raw title for ties.
pub fn sort_by_title(records: &mut [LibraryRecord]) {
    records.sort_by(|a, b| compare_titles(a.title(), b.title()));
}

fn compare_titles(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}
