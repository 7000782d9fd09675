//! Qualification, subject and season resolution over a [`Locator`]
//!
//! Every lookup goes through the [`MetadataCache`]; a miss lists the remote
//! page and stores the parsed result.

use crate::cache::MetadataCache;
use crate::error::{Error, LocatorError, Result};
use crate::locator::Locator;
use crate::types::{Link, QualificationSummary, Season, Subject};
use futures::StreamExt;
use regex::Regex;
use std::sync::{Arc, LazyLock};

/// Concurrent season page fetches when counting files for a subject
const FILE_COUNT_CONCURRENCY: usize = 8;

/// A qualification offered by the site
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Qualification {
    /// Short ID used in requests (e.g., "IGCSE")
    pub id: &'static str,
    /// Display name
    pub name: &'static str,
    /// Listing page path on the site
    pub path: &'static str,
    /// Substring identifying subject links for this qualification
    pub pattern: &'static str,
}

/// The fixed qualification catalog
pub const QUALIFICATIONS: [Qualification; 3] = [
    Qualification {
        id: "AICE",
        name: "AS and A Level",
        path: "/papers/caie/as-and-a-level",
        pattern: "as-and-a-level",
    },
    Qualification {
        id: "IGCSE",
        name: "IGCSE",
        path: "/papers/caie/igcse",
        pattern: "igcse",
    },
    Qualification {
        id: "O",
        name: "O Level",
        path: "/papers/caie/o-level",
        pattern: "o-level",
    },
];

/// Look up a qualification by ID, ignoring case
pub fn qualification(id: &str) -> Option<&'static Qualification> {
    QUALIFICATIONS
        .iter()
        .find(|q| q.id.eq_ignore_ascii_case(id.trim()))
}

static FOUR_DIGITS: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"\b(\d{4})\b").ok());
static ANY_DIGITS: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"(\d+)").ok());
static FULL_YEAR: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"\b(20\d{2})\b").ok());
static SHORT_YEAR: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"\b(\d{2})\b").ok());

fn first_capture<'a>(re: &LazyLock<Option<Regex>>, text: &'a str) -> Option<&'a str> {
    re.as_ref()?
        .captures(text)?
        .get(1)
        .map(|m| m.as_str())
}

/// Syllabus code from a subject name
///
/// The first standalone four-digit number, else the first run of digits,
/// else an empty string.
pub fn extract_syllabus_code(name: &str) -> String {
    first_capture(&FOUR_DIGITS, name)
        .or_else(|| first_capture(&ANY_DIGITS, name))
        .unwrap_or_default()
        .to_string()
}

/// Year from a season name
///
/// A standalone `20xx` wins; otherwise a standalone two-digit number maps to
/// 20xx below 50 and 19xx from 50 up. Names with neither give 0.
pub fn extract_year_from_season(name: &str) -> i32 {
    if let Some(year) = first_capture(&FULL_YEAR, name).and_then(|y| y.parse().ok()) {
        return year;
    }
    match first_capture(&SHORT_YEAR, name).and_then(|y| y.parse::<i32>().ok()) {
        Some(yy) if yy < 50 => 2000 + yy,
        Some(yy) => 1900 + yy,
        None => 0,
    }
}

/// Catalog browsing service
pub struct Catalog {
    locator: Arc<dyn Locator>,
    cache: Arc<MetadataCache>,
    base_url: String,
}

impl Catalog {
    /// Create a catalog over a locator, resolving qualification pages against `base_url`
    pub fn new(locator: Arc<dyn Locator>, cache: Arc<MetadataCache>, base_url: &str) -> Self {
        Self {
            locator,
            cache,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// The underlying cache
    pub fn cache(&self) -> &MetadataCache {
        &self.cache
    }

    fn require_qualification(&self, id: &str) -> Result<&'static Qualification> {
        qualification(id).ok_or_else(|| Error::NotFound(format!("Qualification {id}")))
    }

    /// Every qualification with its subject count
    ///
    /// A qualification whose subject page cannot be listed reports 0 subjects.
    pub async fn qualifications(&self) -> Vec<QualificationSummary> {
        if let Some(cached) = self.cache.qualifications.get(&()) {
            return cached;
        }

        let counts = futures::future::join_all(QUALIFICATIONS.iter().map(|q| async move {
            match self.subjects(q.id, None).await {
                Ok(subjects) => subjects.len(),
                Err(e) => {
                    tracing::warn!(qualification = q.id, error = %e, "could not count subjects");
                    0
                }
            }
        }))
        .await;

        let summaries: Vec<_> = QUALIFICATIONS
            .iter()
            .zip(counts)
            .map(|(q, subject_count)| QualificationSummary {
                id: q.id.to_string(),
                name: q.name.to_string(),
                subject_count,
            })
            .collect();
        self.cache.qualifications.set((), summaries.clone());
        summaries
    }

    /// Subjects of a qualification, optionally filtered
    ///
    /// `search` matches case-insensitively against the name or the code.
    pub async fn subjects(&self, qualification_id: &str, search: Option<&str>) -> Result<Vec<Subject>> {
        let qualification = self.require_qualification(qualification_id)?;
        let key = qualification.id.to_uppercase();

        let subjects = match self.cache.subjects.get(&key) {
            Some(subjects) => subjects,
            None => {
                let url = format!("{}{}", self.base_url, qualification.path);
                let links = self.locator.list_subjects(&url, qualification.pattern).await?;
                let subjects: Vec<Subject> = links
                    .into_iter()
                    .map(|link| Subject {
                        code: extract_syllabus_code(&link.name),
                        name: link.name,
                        url: link.url,
                    })
                    .collect();
                tracing::info!(qualification = qualification.id, count = subjects.len(), "subjects listed");
                self.cache.subjects.set(key, subjects.clone());
                subjects
            }
        };

        Ok(match search.map(str::trim).filter(|s| !s.is_empty()) {
            Some(term) => {
                let term = term.to_lowercase();
                subjects
                    .into_iter()
                    .filter(|s| {
                        s.name.to_lowercase().contains(&term) || s.code.to_lowercase().contains(&term)
                    })
                    .collect()
            }
            None => subjects,
        })
    }

    /// One subject by code
    pub async fn subject(&self, qualification_id: &str, code: &str) -> Result<Option<Subject>> {
        Ok(self
            .subjects(qualification_id, None)
            .await?
            .into_iter()
            .find(|s| s.code == code))
    }

    /// Seasons of a subject, newest first, with per-season file counts
    pub async fn seasons(&self, qualification_id: &str, subject_code: &str) -> Result<Vec<Season>> {
        let qualification = self.require_qualification(qualification_id)?;
        let key = (qualification.id.to_uppercase(), subject_code.to_string());
        if let Some(cached) = self.cache.seasons.get(&key) {
            return Ok(cached);
        }

        let subject = self
            .subject(qualification.id, subject_code)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Subject {subject_code}")))?;

        let links = self.locator.list_seasons(&subject.url).await?;
        let mut seasons: Vec<Season> = futures::stream::iter(links)
            .map(|link| async move {
                let file_count = self.file_count(&link.url).await;
                Season {
                    id: link.name.clone(),
                    year: extract_year_from_season(&link.name),
                    name: link.name,
                    url: link.url,
                    file_count,
                }
            })
            .buffered(FILE_COUNT_CONCURRENCY)
            .collect()
            .await;
        // Stable: equal years keep page order
        seasons.sort_by(|a, b| b.year.cmp(&a.year));

        tracing::info!(subject = subject_code, count = seasons.len(), "seasons listed");
        self.cache.seasons.set(key, seasons.clone());
        Ok(seasons)
    }

    /// One season by ID
    pub async fn season(
        &self,
        qualification_id: &str,
        subject_code: &str,
        season_id: &str,
    ) -> Result<Option<Season>> {
        Ok(self
            .seasons(qualification_id, subject_code)
            .await?
            .into_iter()
            .find(|s| s.id == season_id))
    }

    /// Number of files on a season page; 0 if the page cannot be listed
    pub async fn file_count(&self, season_url: &str) -> usize {
        if let Some(count) = self.cache.file_counts.get(&season_url.to_string()) {
            return count;
        }
        match self.locator.list_files(season_url).await {
            Ok(files) => {
                self.cache
                    .file_counts
                    .set(season_url.to_string(), files.len());
                files.len()
            }
            Err(e) => {
                tracing::warn!(url = season_url, error = %e, "could not count season files");
                0
            }
        }
    }

    /// File links on a season page (never cached)
    pub async fn files(&self, season_url: &str) -> std::result::Result<Vec<Link>, LocatorError> {
        self.locator.list_files(season_url).await
    }
}
