// Bulk fix-up: walk the whole library and refresh each record's catalog
// metadata (title, authors, link and identifiers) from the catalog.

use crate::catalog::{Catalog, CatalogCandidate};
use crate::config::Config;
use crate::error::Result;
use crate::record::{LibraryRecord, Metadata};
use crate::store::Library;
use crate::ui::{self, SearchOptions};
use tracing::info;

/// Refresh every record. With `skip_interactive`, records that cannot be
/// matched by ISBN alone are left untouched.
pub fn run(config: &Config, catalog: &dyn Catalog, skip_interactive: bool) -> Result<()> {
    let library = Library::open(&config.library);
    for mut record in library.load_strict()? {
        println!("{}, {}", record.title(), first_author(&record));

        let candidate = match record.metadata().isbn() {
            Some(isbn) => {
                println!("  ISBN {isbn}...");
                lookup_isbn(config, catalog, &record, &isbn, skip_interactive)?
            }
            None if skip_interactive => {
                println!("  skipping interactive lookup");
                None
            }
            None => lookup_interactive(config, catalog, &record)?,
        };
        let Some(candidate) = candidate else {
            continue;
        };

        refresh(record.metadata_mut(), &candidate);
        record.save()?;
        info!(path = %record.path().display(), "refreshed record");
    }
    Ok(())
}

fn first_author(record: &LibraryRecord) -> &str {
    record.authors().first().map(String::as_str).unwrap_or("")
}

fn options(record: &LibraryRecord) -> SearchOptions {
    SearchOptions {
        details: Some(record.label()),
        accept_single_result: true,
    }
}

fn lookup_isbn(
    config: &Config,
    catalog: &dyn Catalog,
    record: &LibraryRecord,
    isbn: &str,
    skip_interactive: bool,
) -> Result<Option<CatalogCandidate>> {
    let query = format!("isbn:{isbn}");
    match catalog.search(&query, 0) {
        Ok(mut books) if books.len() == 1 => Ok(books.pop()),
        Ok(_) if skip_interactive => {
            println!("  several matches, skipping");
            Ok(None)
        }
        Ok(_) => ui::interactive_search(config, catalog, &query, &options(record)),
        Err(e) if e.is_not_found() => {
            println!("  no match, skipping");
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

fn lookup_interactive(
    config: &Config,
    catalog: &dyn Catalog,
    record: &LibraryRecord,
) -> Result<Option<CatalogCandidate>> {
    let default_query = format!("{} {}", record.title(), first_author(record));
    let default_query = default_query.trim();
    loop {
        let answer = ui::prompt_query(
            &format!("Search ['enter' to accept default ('{default_query}'), 's' to skip]"),
            None,
        )?;
        let query = match answer.as_str() {
            "s" => return Ok(None),
            "" => default_query,
            other => other,
        };
        if let Some(candidate) = ui::interactive_search(config, catalog, query, &options(record))? {
            return Ok(Some(candidate));
        }
    }
}

/// Overwrite catalog-derived fields with `candidate`, keeping everything the
/// user owns: status, dates, cover, category, other identifiers and any
/// extra keys. Existing ISBNs survive when the candidate has none, and
/// top-level legacy ISBN keys end up under `ids`.
pub fn refresh(metadata: &mut Metadata, candidate: &CatalogCandidate) {
    metadata.promote_legacy_isbns();
    let fresh = Metadata::from_candidate(candidate);
    metadata.title = fresh.title;
    metadata.authors = fresh.authors;
    if fresh.link.is_some() {
        metadata.link = fresh.link;
    }
    if metadata.category.is_none() {
        metadata.category = fresh.category;
    }
    metadata.ids.google_books = fresh.ids.google_books;
    if fresh.ids.isbn_10.is_some() {
        metadata.ids.isbn_10 = fresh.ids.isbn_10;
    }
    if fresh.ids.isbn_13.is_some() {
        metadata.ids.isbn_13 = fresh.ids.isbn_13;
    }
}
