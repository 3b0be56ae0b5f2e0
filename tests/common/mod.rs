//! Shared fixtures for the integration tests: a catalog that never touches
//! the network and a few canned search results.
#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use bookshelf::catalog::{Catalog, CatalogCandidate, Identifiers};
use bookshelf::config::{Config, LIBRARY_PATH_VAR};
use bookshelf::{Error, Result};

/// Serves canned pages and writes a fixed payload for every download.
/// Queries registered with `answer` get their own single page; every other
/// query walks the default pages.
pub struct FakeCatalog {
    pages: Vec<Vec<CatalogCandidate>>,
    answers: HashMap<String, Vec<CatalogCandidate>>,
    pub queries: RefCell<Vec<(String, usize)>>,
    pub downloads: RefCell<Vec<String>>,
}

impl FakeCatalog {
    pub fn new(pages: Vec<Vec<CatalogCandidate>>) -> Self {
        FakeCatalog {
            pages,
            answers: HashMap::new(),
            queries: RefCell::new(Vec::new()),
            downloads: RefCell::new(Vec::new()),
        }
    }

    pub fn answer(mut self, query: &str, books: Vec<CatalogCandidate>) -> Self {
        self.answers.insert(query.to_string(), books);
        self
    }

    pub fn queried(&self) -> Vec<(String, usize)> {
        self.queries.borrow().clone()
    }
}

impl Catalog for FakeCatalog {
    fn search(&self, query: &str, page: usize) -> Result<Vec<CatalogCandidate>> {
        self.queries.borrow_mut().push((query.to_string(), page));
        let books = match self.answers.get(query) {
            Some(books) if page == 0 => Some(books.clone()),
            Some(_) => None,
            None => self.pages.get(page).cloned(),
        };
        books
            .filter(|books| !books.is_empty())
            .ok_or_else(|| Error::NotFound {
                query: query.to_string(),
            })
    }

    fn download(&self, url: &str, destination: &Path) -> Result<bool> {
        self.downloads.borrow_mut().push(url.to_string());
        fs::write(destination, b"\xff\xd8\xff fake jpeg")?;
        Ok(true)
    }
}

pub fn candidate(title: &str, author: &str, id: &str, thumbnail: bool) -> CatalogCandidate {
    CatalogCandidate {
        title: title.into(),
        subtitle: None,
        authors: vec![author.into()],
        language: "en".into(),
        canonical_url: format!("https://books.google.com/books?id={id}"),
        thumbnail_url: thumbnail
            .then(|| format!("http://books.google.com/books/content?id={id}&fife=w400-h600")),
        identifiers: Identifiers {
            isbn_10: None,
            isbn_13: Some("9780441013593".into()),
            catalog_id: id.into(),
        },
    }
}

pub fn dune_results() -> Vec<CatalogCandidate> {
    vec![
        candidate("Dune", "Frank Herbert", "B1hSG45JCX4C", true),
        candidate("Dune Messiah", "Frank Herbert", "p3vTOh0ObSEC", false),
    ]
}

/// Configuration for a library living in `dir`, with defaults elsewhere.
pub fn config_for(dir: &Path) -> Config {
    let library = dir.to_string_lossy().into_owned();
    Config::from_lookup(|key| (key == LIBRARY_PATH_VAR).then(|| library.clone())).unwrap()
}
