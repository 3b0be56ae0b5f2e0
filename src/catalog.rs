// Catalog client: a small blocking HTTP client for the Google Books volumes
// API. Each call issues exactly one request; paging is driven by the caller.

use crate::config::Config;
use crate::error::{Error, Result};
use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, warn};

/// Suffix asking the catalog's image service for a larger cover rendition.
const THUMBNAIL_SIZE: &str = "&fife=w400-h600";

/// Identifiers attached to a catalog result. Missing ISBNs are normal.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct Identifiers {
    pub isbn_10: Option<String>,
    pub isbn_13: Option<String>,
    pub catalog_id: String,
}

/// One search result, not yet part of the library.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct CatalogCandidate {
    pub title: String,
    pub subtitle: Option<String>,
    pub authors: Vec<String>,
    pub language: String,
    pub canonical_url: String,
    pub thumbnail_url: Option<String>,
    pub identifiers: Identifiers,
}

impl CatalogCandidate {
    /// Title joined with the subtitle, the form stored in records.
    pub fn full_title(&self) -> String {
        match &self.subtitle {
            Some(subtitle) => format!("{}: {}", self.title, subtitle),
            None => self.title.clone(),
        }
    }

    /// Filename stem for the record and its cover.
    pub fn basename(&self) -> String {
        basename(&format!("{} {}", self.full_title(), self.authors.join(" ")))
    }

    /// The most specific ISBN available, preferring ISBN-13.
    pub fn isbn(&self) -> Option<&str> {
        self.identifiers
            .isbn_13
            .as_deref()
            .or(self.identifiers.isbn_10.as_deref())
    }

    /// Fixed-width row used by the search list.
    pub fn summary(&self) -> String {
        format!(
            "{:34}{:24}{:5}{}",
            truncate(&self.full_title(), 30),
            truncate(&self.authors.join(", "), 20),
            truncate(&self.language, 3),
            self.isbn().unwrap_or("")
        )
    }
}

/// Lowercase `name` and collapse every run of characters other than ASCII
/// letters and digits into a single hyphen, trimming hyphens at both ends.
pub fn basename(name: &str) -> String {
    name.to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect::<String>()
        .split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

fn truncate(text: &str, width: usize) -> String {
    text.chars().take(width).collect()
}

/// Source of candidates and cover images. The application flow only talks
/// to the catalog through this trait.
pub trait Catalog {
    /// Fetch one page of results. Zero matches is `Error::NotFound`.
    fn search(&self, query: &str, page: usize) -> Result<Vec<CatalogCandidate>>;

    /// Download `url` to `destination`. Returns `false` without writing
    /// anything when the server does not answer with 200.
    fn download(&self, url: &str, destination: &Path) -> Result<bool>;
}

/// Google Books volumes API client.
#[derive(Clone)]
pub struct GoogleBooks {
    client: Client,
    base_url: String,
    page_size: usize,
}

impl GoogleBooks {
    pub fn new(base_url: impl Into<String>, page_size: usize) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("bookshelf/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(GoogleBooks {
            client,
            base_url: base_url.into(),
            page_size: page_size.max(1),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(config.catalog_url.clone(), config.page_size)
    }
}

impl Catalog for GoogleBooks {
    fn search(&self, query: &str, page: usize) -> Result<Vec<CatalogCandidate>> {
        let url = format!("{}/volumes", self.base_url);
        let start = page * self.page_size;
        debug!(query, page, start, "searching catalog");
        let response: VolumesResponse = self
            .client
            .get(&url)
            .query(&[
                ("q", query.to_string()),
                ("startIndex", start.to_string()),
                ("maxResults", self.page_size.to_string()),
            ])
            .send()?
            .error_for_status()?
            .json()?;
        candidates(query, response)
    }

    fn download(&self, url: &str, destination: &Path) -> Result<bool> {
        debug!(url, destination = %destination.display(), "downloading image");
        let response = self.client.get(url).send()?;
        if response.status() != StatusCode::OK {
            warn!(url, status = %response.status(), "image download skipped");
            return Ok(false);
        }
        let bytes = response.bytes()?;
        std::fs::write(destination, &bytes)?;
        Ok(true)
    }
}

/// Wire shape of the volumes endpoint, limited to the fields we read.
#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct VolumesResponse {
    #[serde(default)]
    total_items: u64,
    #[serde(default)]
    items: Vec<Volume>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct Volume {
    id: String,
    volume_info: VolumeInfo,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct VolumeInfo {
    #[serde(default)]
    title: String,
    subtitle: Option<String>,
    #[serde(default)]
    authors: Vec<String>,
    #[serde(default)]
    language: String,
    #[serde(default)]
    canonical_volume_link: String,
    image_links: Option<ImageLinks>,
    #[serde(default)]
    industry_identifiers: Vec<IndustryIdentifier>,
}

#[derive(Deserialize, Debug)]
struct ImageLinks {
    thumbnail: Option<String>,
}

#[derive(Deserialize, Debug)]
struct IndustryIdentifier {
    #[serde(rename = "type")]
    kind: String,
    identifier: String,
}

fn first_identifier(identifiers: &[IndustryIdentifier], kind: &str) -> Option<String> {
    identifiers
        .iter()
        .find(|id| id.kind == kind)
        .map(|id| id.identifier.clone())
}

impl From<Volume> for CatalogCandidate {
    fn from(volume: Volume) -> Self {
        let info = volume.volume_info;
        let thumbnail_url = info
            .image_links
            .and_then(|links| links.thumbnail)
            .map(|url| format!("{url}{THUMBNAIL_SIZE}"));
        CatalogCandidate {
            identifiers: Identifiers {
                isbn_10: first_identifier(&info.industry_identifiers, "ISBN_10"),
                isbn_13: first_identifier(&info.industry_identifiers, "ISBN_13"),
                catalog_id: volume.id,
            },
            title: info.title,
            subtitle: info.subtitle,
            authors: info.authors,
            language: info.language,
            canonical_url: info.canonical_volume_link,
            thumbnail_url,
        }
    }
}

fn candidates(query: &str, response: VolumesResponse) -> Result<Vec<CatalogCandidate>> {
    if response.total_items < 1 || response.items.is_empty() {
        return Err(Error::NotFound {
            query: query.to_string(),
        });
    }
    Ok(response.items.into_iter().map(CatalogCandidate::from).collect())
}
