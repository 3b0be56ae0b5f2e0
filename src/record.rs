// Library records: one Markdown file per book, with a YAML front matter
// block carrying the metadata and an (in practice empty) body.

use crate::catalog::CatalogCandidate;
use crate::error::{Error, Result};
use chrono::{DateTime, FixedOffset, Local};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

pub type Timestamp = DateTime<FixedOffset>;

const DELIMITER: &str = "---";

/// Reading status of a record, in cycling order.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum Status {
    ToRead,
    CurrentlyReading,
    Read,
    Abandoned,
}

impl Status {
    pub const ALL: [Status; 4] = [
        Status::ToRead,
        Status::CurrentlyReading,
        Status::Read,
        Status::Abandoned,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Status::ToRead => "to-read",
            Status::CurrentlyReading => "currently-reading",
            Status::Read => "read",
            Status::Abandoned => "abandoned",
        }
    }

    fn position(self) -> usize {
        Status::ALL.iter().position(|s| *s == self).unwrap_or(0)
    }

    /// The following status, or `self` at the end of the list.
    pub fn next(self) -> Status {
        Status::ALL.get(self.position() + 1).copied().unwrap_or(self)
    }

    /// The preceding status, or `self` at the start of the list.
    pub fn previous(self) -> Status {
        match self.position() {
            0 => self,
            n => Status::ALL[n - 1],
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifier map stored under `ids`. Unknown identifier kinds pass through.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct Ids {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub google_books: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub isbn_10: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub isbn_13: Option<String>,
    #[serde(flatten)]
    pub other: BTreeMap<String, serde_yaml::Value>,
}

impl Ids {
    pub fn is_empty(&self) -> bool {
        self.google_books.is_none()
            && self.isbn_10.is_none()
            && self.isbn_13.is_none()
            && self.other.is_empty()
    }
}

/// Front matter of a record file.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Metadata {
    pub title: String,
    #[serde(default)]
    pub authors: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    #[serde(default, skip_serializing_if = "Ids::is_empty")]
    pub ids: Ids,
    pub status: Status,
    #[serde(default, with = "timestamp", skip_serializing_if = "Option::is_none")]
    pub date: Option<Timestamp>,
    #[serde(default, with = "timestamp", skip_serializing_if = "Option::is_none")]
    pub end_date: Option<Timestamp>,
    #[serde(default, alias = "thumbnail", skip_serializing_if = "Option::is_none")]
    pub cover: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

impl Metadata {
    /// Metadata for a freshly imported candidate. New books start as to-read.
    pub fn from_candidate(candidate: &CatalogCandidate) -> Self {
        Metadata {
            title: candidate.full_title(),
            authors: candidate.authors.clone(),
            category: Some("books".into()),
            link: Some(candidate.canonical_url.clone()).filter(|l| !l.is_empty()),
            ids: Ids {
                google_books: Some(candidate.identifiers.catalog_id.clone()),
                isbn_10: candidate.identifiers.isbn_10.clone(),
                isbn_13: candidate.identifiers.isbn_13.clone(),
                other: BTreeMap::new(),
            },
            status: Status::ToRead,
            date: None,
            end_date: None,
            cover: None,
            extra: BTreeMap::new(),
        }
    }

    /// Best known ISBN, ISBN-13 first. Older records keep ISBNs as
    /// top-level `isbn_13` / `isbn` keys rather than under `ids`.
    pub fn isbn(&self) -> Option<String> {
        let legacy = |key: &str| self.extra.get(key).and_then(yaml_to_string);
        self.ids
            .isbn_13
            .clone()
            .or_else(|| legacy("isbn_13"))
            .or_else(|| self.ids.isbn_10.clone())
            .or_else(|| legacy("isbn"))
    }

    /// Move top-level `isbn_13` / `isbn` keys under `ids`. Values already
    /// under `ids` win; the top-level keys are dropped either way.
    pub fn promote_legacy_isbns(&mut self) {
        if let Some(value) = self.extra.remove("isbn_13") {
            if self.ids.isbn_13.is_none() {
                self.ids.isbn_13 = yaml_to_string(&value);
            }
        }
        if let Some(value) = self.extra.remove("isbn") {
            if self.ids.isbn_10.is_none() {
                self.ids.isbn_10 = yaml_to_string(&value);
            }
        }
    }
}

fn yaml_to_string(value: &serde_yaml::Value) -> Option<String> {
    match value {
        serde_yaml::Value::String(s) => Some(s.clone()),
        serde_yaml::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Accept identifiers written either as strings or as bare numbers.
fn lenient_string<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<serde_yaml::Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(yaml_to_string))
}

/// Date fields: written as RFC 3339, read leniently.
mod timestamp {
    use super::Timestamp;
    use chrono::{DateTime, Local, NaiveDate, SecondsFormat, TimeZone};
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &Option<Timestamp>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(date) => {
                serializer.serialize_str(&date.to_rfc3339_opts(SecondsFormat::AutoSi, false))
            }
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Timestamp>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<String>::deserialize(deserializer)?;
        raw.map(|text| {
            parse(&text).ok_or_else(|| D::Error::custom(format!("unrecognised date `{text}`")))
        })
        .transpose()
    }

    pub fn parse(text: &str) -> Option<Timestamp> {
        let text = text.trim();
        if let Ok(date) = DateTime::parse_from_rfc3339(text) {
            return Some(date);
        }
        if let Ok(date) = DateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f%:z") {
            return Some(date);
        }
        let midnight = NaiveDate::parse_from_str(text, "%Y-%m-%d").ok()?.and_hms_opt(0, 0, 0)?;
        let local = Local.from_local_datetime(&midnight).earliest()?;
        Some(local.into())
    }
}

pub use timestamp::parse as parse_timestamp;

/// Current local time with its UTC offset.
pub fn now() -> Timestamp {
    Local::now().into()
}

/// Split `---` delimited front matter from the body.
fn split_front_matter(text: &str) -> Option<(&str, &str)> {
    let rest = text.strip_prefix(DELIMITER)?;
    let rest = rest.strip_prefix("\r\n").or_else(|| rest.strip_prefix('\n'))?;
    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim_end() == DELIMITER {
            return Some((&rest[..offset], &rest[offset + line.len()..]));
        }
        offset += line.len();
    }
    None
}

/// One book in the library, bound to the file it was loaded from.
#[derive(Debug, Clone, PartialEq)]
pub struct LibraryRecord {
    path: PathBuf,
    metadata: Metadata,
    body: String,
}

impl LibraryRecord {
    pub fn new(path: impl Into<PathBuf>, metadata: Metadata) -> Self {
        LibraryRecord {
            path: path.into(),
            metadata,
            body: String::new(),
        }
    }

    /// Read and parse the record at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::parse(path, &text)
    }

    pub fn parse(path: &Path, text: &str) -> Result<Self> {
        let (yaml, body) = split_front_matter(text)
            .ok_or_else(|| Error::parse(path, "missing front matter block"))?;
        let metadata: Metadata = serde_yaml::from_str(yaml).map_err(|e| Error::parse(path, e))?;
        Ok(LibraryRecord {
            path: path.to_path_buf(),
            metadata,
            body: body.trim().to_string(),
        })
    }

    /// Render the record as file contents.
    pub fn to_document(&self) -> Result<String> {
        let yaml = serde_yaml::to_string(&self.metadata).map_err(|e| Error::parse(&self.path, e))?;
        if self.body.is_empty() {
            Ok(format!("{DELIMITER}\n{yaml}{DELIMITER}\n"))
        } else {
            Ok(format!("{DELIMITER}\n{yaml}{DELIMITER}\n\n{}\n", self.body))
        }
    }

    /// Write the record back to its own path.
    pub fn save(&self) -> Result<()> {
        std::fs::write(&self.path, self.to_document()?)?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    pub fn metadata_mut(&mut self) -> &mut Metadata {
        &mut self.metadata
    }

    pub fn title(&self) -> &str {
        &self.metadata.title
    }

    pub fn authors(&self) -> &[String] {
        &self.metadata.authors
    }

    pub fn status(&self) -> Status {
        self.metadata.status
    }

    pub fn start_date(&self) -> Option<Timestamp> {
        self.metadata.date
    }

    pub fn end_date(&self) -> Option<Timestamp> {
        self.metadata.end_date
    }

    /// Cover image location, resolved next to the record file.
    pub fn cover_path(&self) -> Option<PathBuf> {
        let cover = self.metadata.cover.as_ref()?;
        let dir = self.path.parent().unwrap_or_else(|| Path::new("."));
        Some(dir.join(cover))
    }

    /// List label: title and authors followed by the status.
    pub fn label(&self) -> String {
        let mut parts = vec![self.metadata.title.as_str()];
        parts.extend(self.metadata.authors.iter().map(String::as_str));
        format!("{} [{}]", parts.join(", "), self.metadata.status)
    }

    pub fn set_status(&mut self, status: Status) {
        self.set_status_at(status, now());
    }

    /// Switch to `status`, adjusting dates for the target status only.
    pub fn set_status_at(&mut self, status: Status, now: Timestamp) {
        self.metadata.status = status;
        match status {
            Status::ToRead => {
                self.metadata.date = None;
                self.metadata.end_date = None;
            }
            Status::CurrentlyReading => {
                self.metadata.date = Some(now);
                self.metadata.end_date = None;
            }
            Status::Read | Status::Abandoned => {
                self.metadata.end_date = Some(now);
            }
        }
    }

    /// Move to the next status. Returns `false` when already at the end.
    pub fn advance(&mut self) -> bool {
        self.step(self.status().next())
    }

    /// Move to the previous status. Returns `false` when already at the start.
    pub fn retreat(&mut self) -> bool {
        self.step(self.status().previous())
    }

    fn step(&mut self, target: Status) -> bool {
        if target == self.status() {
            return false;
        }
        self.set_status(target);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, TimeZone, Timelike};

    const SAMPLE: &str = "---
title: 'Dune: Deluxe Edition'
authors:
- Frank Herbert
category: books
link: https://books.google.com/books/about/Dune.html?id=B1hSG45JCX4C
ids:
  google_books: B1hSG45JCX4C
  goodreads: '234225'
  isbn_13: 9780441013593
status: currently-reading
date: '2021-03-04T10:11:12.123456+00:00'
cover: dune-deluxe-edition-frank-herbert.jpg
rating: 5
---
";

    fn sample() -> LibraryRecord {
        LibraryRecord::parse(Path::new("/library/dune.markdown"), SAMPLE).unwrap()
    }

    fn fixed(hour: u32) -> Timestamp {
        FixedOffset::east_opt(3600)
            .unwrap()
            .with_ymd_and_hms(2024, 5, 6, hour, 0, 0)
            .unwrap()
    }

    #[test]
    fn parses_front_matter() {
        let record = sample();
        assert_eq!(record.title(), "Dune: Deluxe Edition");
        assert_eq!(record.authors(), ["Frank Herbert"]);
        assert_eq!(record.status(), Status::CurrentlyReading);
        assert_eq!(record.metadata().ids.isbn_13.as_deref(), Some("9780441013593"));
        assert_eq!(record.start_date().unwrap().hour(), 10);
        assert_eq!(record.end_date(), None);
        assert_eq!(
            record.cover_path(),
            Some(PathBuf::from("/library/dune-deluxe-edition-frank-herbert.jpg"))
        );
        assert_eq!(record.label(), "Dune: Deluxe Edition, Frank Herbert [currently-reading]");
    }

    #[test]
    fn unknown_keys_survive_a_round_trip() {
        let record = sample();
        let text = record.to_document().unwrap();
        let again = LibraryRecord::parse(record.path(), &text).unwrap();
        assert_eq!(again, record);
        assert!(text.contains("rating: 5"));
        assert!(text.contains("goodreads:"));
        assert!(text.starts_with("---\n") && text.ends_with("---\n"));
    }

    #[test]
    fn thumbnail_key_is_read_as_cover() {
        let text = "---\ntitle: X\nstatus: read\nthumbnail: x.jpg\n---\n";
        let record = LibraryRecord::parse(Path::new("x.markdown"), text).unwrap();
        assert_eq!(record.metadata().cover.as_deref(), Some("x.jpg"));
    }

    #[test]
    fn missing_front_matter_is_a_parse_error() {
        for text in ["title: X\n", "---\ntitle: X\nstatus: read\n", ""] {
            let err = LibraryRecord::parse(Path::new("x.markdown"), text).unwrap_err();
            assert!(matches!(err, Error::Parse { .. }), "{text:?}");
        }
    }

    #[test]
    fn malformed_metadata_is_a_parse_error() {
        let cases = [
            "---\nauthors: []\nstatus: read\n---\n",
            "---\ntitle: X\n---\n",
            "---\ntitle: X\nstatus: skimmed\n---\n",
            "---\ntitle: X\nstatus: read\ndate: yesterday\n---\n",
            "---\ntitle: [unclosed\n---\n",
        ];
        for text in cases {
            let err = LibraryRecord::parse(Path::new("x.markdown"), text).unwrap_err();
            assert!(matches!(err, Error::Parse { .. }), "{text:?}");
        }
    }

    #[test]
    fn legacy_date_formats_parse() {
        let spaced = parse_timestamp("2019-02-03 04:05:06+01:00").unwrap();
        assert_eq!((spaced.year(), spaced.hour()), (2019, 4));
        let bare = parse_timestamp("2019-02-03").unwrap();
        assert_eq!((bare.month(), bare.day(), bare.hour()), (2, 3, 0));
        assert!(parse_timestamp("03/02/2019").is_none());
    }

    #[test]
    fn body_is_preserved() {
        let text = "---\ntitle: X\nstatus: read\n---\n\nGreat book.\n";
        let record = LibraryRecord::parse(Path::new("x.markdown"), text).unwrap();
        let written = record.to_document().unwrap();
        assert!(written.ends_with("---\n\nGreat book.\n"));
        assert_eq!(LibraryRecord::parse(record.path(), &written).unwrap(), record);
    }

    #[test]
    fn status_invariants_hold_for_every_transition() {
        for from in Status::ALL {
            for to in Status::ALL {
                let mut record = sample();
                record.set_status_at(from, fixed(8));
                record.set_status_at(to, fixed(9));
                assert_eq!(record.status(), to);
                match to {
                    Status::ToRead => {
                        assert_eq!(record.start_date(), None);
                        assert_eq!(record.end_date(), None);
                    }
                    Status::CurrentlyReading => {
                        assert_eq!(record.start_date(), Some(fixed(9)));
                        assert_eq!(record.end_date(), None);
                    }
                    Status::Read | Status::Abandoned => {
                        assert_eq!(record.end_date(), Some(fixed(9)));
                    }
                }
            }
        }
    }

    #[test]
    fn leaving_to_read_always_restamps_start() {
        let mut record = sample();
        let before = record.start_date();
        record.set_status_at(Status::CurrentlyReading, fixed(12));
        assert_ne!(record.start_date(), before);
        assert_eq!(record.start_date(), Some(fixed(12)));
    }

    #[test]
    fn cycling_stops_at_both_ends() {
        assert_eq!(Status::ToRead.previous(), Status::ToRead);
        assert_eq!(Status::Abandoned.next(), Status::Abandoned);
        assert_eq!(Status::ToRead.next(), Status::CurrentlyReading);
        assert_eq!(Status::Read.previous(), Status::CurrentlyReading);

        let mut record = sample();
        record.set_status_at(Status::Abandoned, fixed(1));
        let snapshot = record.clone();
        assert!(!record.advance());
        assert_eq!(record, snapshot);

        record.set_status_at(Status::ToRead, fixed(1));
        let snapshot = record.clone();
        assert!(!record.retreat());
        assert_eq!(record, snapshot);

        assert!(record.advance());
        assert_eq!(record.status(), Status::CurrentlyReading);
        assert!(record.start_date().is_some());
    }

    #[test]
    fn legacy_isbn_keys_are_found() {
        let text = "---\ntitle: X\nstatus: read\nisbn: '0441013597'\n---\n";
        let record = LibraryRecord::parse(Path::new("x.markdown"), text).unwrap();
        assert_eq!(record.metadata().isbn().as_deref(), Some("0441013597"));
        assert_eq!(sample().metadata().isbn().as_deref(), Some("9780441013593"));
    }

    #[test]
    fn top_level_isbn_13_beats_nested_isbn_10() {
        let text = "---
title: X
status: to-read
ids:
  isbn_10: '0441013597'
isbn_13: 9780441013593
---
";
        let record = LibraryRecord::parse(Path::new("x.markdown"), text).unwrap();
        assert_eq!(record.metadata().isbn().as_deref(), Some("9780441013593"));
    }

    #[test]
    fn promoting_legacy_isbns_moves_them_under_ids() {
        let text = "---
title: X
status: to-read
ids:
  isbn_10: '0441013597'
isbn_13: 9780441013593
isbn: '0000000000'
---
";
        let mut record = LibraryRecord::parse(Path::new("x.markdown"), text).unwrap();
        let metadata = record.metadata_mut();
        metadata.promote_legacy_isbns();

        assert_eq!(metadata.ids.isbn_13.as_deref(), Some("9780441013593"));
        assert_eq!(metadata.ids.isbn_10.as_deref(), Some("0441013597"));
        assert!(!metadata.extra.contains_key("isbn_13"));
        assert!(!metadata.extra.contains_key("isbn"));

        let document = record.to_document().unwrap();
        assert_eq!(document.matches("isbn_13").count(), 1);
        assert!(!document.contains("isbn:"));
    }
}
