/// Shared data structures for the application state
///
/// These structs represent the data model that flows between
/// the scanner, the index, the query engine and the UI layer.
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Records are identified by the path of their backing file
pub type RecordId = PathBuf;

/// Star rating, always within 1..=5
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "u8", into = "u8")]
pub struct Rating(u8);

impl Rating {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 5;

    /// Build a rating from any integer, clamping into range
    pub fn clamped(value: i64) -> Self {
        Self(value.clamp(Self::MIN as i64, Self::MAX as i64) as u8)
    }

    pub fn get(self) -> u8 {
        self.0
    }

    /// All valid ratings, lowest first
    pub fn all() -> impl Iterator<Item = Rating> {
        (Self::MIN..=Self::MAX).map(Rating)
    }

    /// Filled and hollow stars, e.g. "★★★☆☆"
    pub fn stars(self) -> String {
        let filled = self.0 as usize;
        let hollow = Self::MAX as usize - filled;
        format!("{}{}", "★".repeat(filled), "☆".repeat(hollow))
    }
}

impl Default for Rating {
    fn default() -> Self {
        Rating(Self::MIN)
    }
}

impl From<u8> for Rating {
    fn from(value: u8) -> Self {
        Rating::clamped(value as i64)
    }
}

impl From<Rating> for u8 {
    fn from(rating: Rating) -> Self {
        rating.0
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Release date as written in the file name, plus the result of parsing it
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReleaseDate {
    raw: String,
    parsed: Option<NaiveDate>,
}

impl ReleaseDate {
    pub const FORMAT: &'static str = "%Y-%m-%d";

    /// Keep the raw text and attempt a `YYYY-MM-DD` parse
    pub fn parse(raw: &str) -> Self {
        Self {
            raw: raw.to_string(),
            parsed: NaiveDate::parse_from_str(raw, Self::FORMAT).ok(),
        }
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// The calendar date, if the raw text was parseable
    pub fn date(&self) -> Option<NaiveDate> {
        self.parsed
    }
}

/// Everything the file name encodes
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Metadata {
    /// Title, the part before any delimiter group
    pub name: String,
    /// Tags in first-seen order, no duplicates
    pub tags: Vec<String>,
    /// Actors in first-seen order, no duplicates
    pub actors: Vec<String>,
    pub series: Option<String>,
    pub release: Option<ReleaseDate>,
    pub rating: Rating,
    /// Free-form feature code
    pub feature: Option<String>,
}

impl Metadata {
    /// Parsed release date, if present and valid
    pub fn release_date(&self) -> Option<NaiveDate> {
        self.release.as_ref().and_then(ReleaseDate::date)
    }

    pub fn series_str(&self) -> &str {
        self.series.as_deref().unwrap_or("")
    }

    pub fn release_str(&self) -> &str {
        self.release.as_ref().map(ReleaseDate::raw).unwrap_or("")
    }

    pub fn feature_str(&self) -> &str {
        self.feature.as_deref().unwrap_or("")
    }
}

/// Represents a single video in the catalog
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    /// Full path to the video file, doubles as the unique id
    pub id: RecordId,
    /// Metadata decoded from the file name
    pub meta: Metadata,
    /// Cover image found next to the video (None if there is none)
    pub thumbnail: Option<PathBuf>,
}

impl Record {
    pub fn new(id: RecordId, meta: Metadata, thumbnail: Option<PathBuf>) -> Self {
        Self { id, meta, thumbnail }
    }

    /// Directory holding the video file
    pub fn directory(&self) -> &Path {
        self.id.parent().unwrap_or_else(|| Path::new(""))
    }

    /// Extension of the video file without the dot ("" if none)
    pub fn extension(&self) -> &str {
        self.id
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or("")
    }
}

/// Drop duplicates while keeping the first occurrence of each entry
pub fn dedup_preserving<I>(items: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut out: Vec<String> = Vec::new();
    for item in items {
        if !out.contains(&item) {
            out.push(item);
        }
    }
    out
}
