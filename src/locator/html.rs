//! HTML listing parser for the PapaCambridge page layout
//!
//! Rules, applied to every `<a href>` on the page:
//! - subjects: lowercased href contains the qualification pattern, href starts
//!   with `papers/caie/` or `/papers/caie/`
//! - seasons: same href prefix, and the lowercased text or href mentions a
//!   session keyword (`nov`, `june`, `march`, `may`, `oct`, `202`, `201`);
//!   first occurrence of each resolved URL wins
//! - files: href contains `download_file.php` with a `files=` parameter; the
//!   decoded parameter is the file URL and its last path segment the name

use super::Locator;
use crate::config::{DownloadConfig, RemoteConfig};
use crate::error::{Error, LocatorError, Result};
use crate::types::Link;
use async_trait::async_trait;
use scraper::{Html, Selector};
use std::collections::HashSet;
use url::Url;

const SITE_PREFIXES: [&str; 2] = ["papers/caie/", "/papers/caie/"];
const SEASON_KEYWORDS: [&str; 7] = ["nov", "june", "march", "may", "oct", "202", "201"];
const FILE_ENDPOINT: &str = "download_file.php";
const FILE_PARAM: &str = "files=";

/// [`Locator`] that fetches pages with reqwest and parses them with scraper
pub struct HtmlLocator {
    client: reqwest::Client,
    origin: Url,
}

impl HtmlLocator {
    /// Build a locator for the configured site origin
    pub fn new(remote: &RemoteConfig, download: &DownloadConfig) -> Result<Self> {
        let origin = Url::parse(&remote.base_url).map_err(|e| Error::Config {
            message: format!("invalid base URL {}: {e}", remote.base_url),
            key: Some("PAPACAMBRIDGE_BASE_URL".to_string()),
        })?;
        let client = reqwest::Client::builder()
            .timeout(download.download_timeout)
            .user_agent(download.user_agent.clone())
            .danger_accept_invalid_certs(true)
            .build()
            .map_err(Error::Network)?;
        Ok(Self { client, origin })
    }

    /// Site origin links are resolved against
    pub fn origin(&self) -> &Url {
        &self.origin
    }

    async fn fetch_page(&self, url: &str) -> std::result::Result<(Url, String), LocatorError> {
        let page_url = Url::parse(url).map_err(|e| LocatorError::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        tracing::debug!(url, "fetching listing page");
        let response = self
            .client
            .get(page_url.clone())
            .send()
            .await
            .map_err(|e| LocatorError::Request {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(LocatorError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.text().await.map_err(|e| LocatorError::Request {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        Ok((page_url, body))
    }
}

#[async_trait]
impl Locator for HtmlLocator {
    async fn list_subjects(
        &self,
        url: &str,
        pattern: &str,
    ) -> std::result::Result<Vec<Link>, LocatorError> {
        let (page_url, body) = self.fetch_page(url).await?;
        let links = parse_subjects(&body, &page_url, &self.origin, pattern);
        tracing::debug!(url, count = links.len(), "subjects listed");
        Ok(links)
    }

    async fn list_seasons(&self, url: &str) -> std::result::Result<Vec<Link>, LocatorError> {
        let (page_url, body) = self.fetch_page(url).await?;
        let links = parse_seasons(&body, &page_url, &self.origin);
        tracing::debug!(url, count = links.len(), "seasons listed");
        Ok(links)
    }

    async fn list_files(&self, url: &str) -> std::result::Result<Vec<Link>, LocatorError> {
        let (page_url, body) = self.fetch_page(url).await?;
        let links = parse_files(&body, &page_url);
        tracing::debug!(url, count = links.len(), "files listed");
        Ok(links)
    }
}

/// Every anchor with an href, as (href, collapsed text)
fn anchors(body: &str) -> Vec<(String, String)> {
    let document = Html::parse_document(body);
    let Ok(selector) = Selector::parse("a[href]") else {
        return Vec::new();
    };
    document
        .select(&selector)
        .filter_map(|a| {
            let href = a.value().attr("href")?.trim().to_string();
            let text = a
                .text()
                .flat_map(str::split_whitespace)
                .collect::<Vec<_>>()
                .join(" ");
            Some((href, text))
        })
        .collect()
}

fn is_site_link(href: &str) -> bool {
    SITE_PREFIXES.iter().any(|prefix| href.starts_with(prefix))
}

/// Absolute URL for an href found on `page`
fn resolve(href: &str, page: &Url, origin: &Url) -> Option<Url> {
    if href.starts_with('/') {
        origin.join(href).ok()
    } else if href.starts_with("papers/") {
        origin.join(&format!("/{href}")).ok()
    } else {
        page.join(href).ok()
    }
}

fn parse_subjects(body: &str, page: &Url, origin: &Url, pattern: &str) -> Vec<Link> {
    let pattern = pattern.to_lowercase();
    anchors(body)
        .into_iter()
        .filter(|(href, text)| {
            href.to_lowercase().contains(&pattern)
                && (href.contains('-') || !text.is_empty())
                && is_site_link(href)
        })
        .filter_map(|(href, text)| {
            let url = resolve(&href, page, origin)?;
            Some(Link {
                name: text,
                url: url.to_string(),
            })
        })
        .collect()
}

fn parse_seasons(body: &str, page: &Url, origin: &Url) -> Vec<Link> {
    let mut seen = HashSet::new();
    anchors(body)
        .into_iter()
        .filter(|(href, text)| {
            if !is_site_link(href) {
                return false;
            }
            let href = href.to_lowercase();
            let text = text.to_lowercase();
            SEASON_KEYWORDS
                .iter()
                .any(|keyword| text.contains(keyword) || href.contains(keyword))
        })
        .filter_map(|(href, text)| {
            let url = resolve(&href, page, origin)?.to_string();
            seen.insert(url.clone()).then_some(Link { name: text, url })
        })
        .collect()
}

fn parse_files(body: &str, page: &Url) -> Vec<Link> {
    anchors(body)
        .into_iter()
        .filter(|(href, _)| href.contains(FILE_ENDPOINT))
        .filter_map(|(href, _)| {
            let (_, param) = href.split_once(FILE_PARAM)?;
            let raw = param.split('&').next().unwrap_or_default();
            let decoded = match urlencoding::decode(raw) {
                Ok(decoded) => decoded.into_owned(),
                Err(e) => {
                    tracing::debug!(href, error = %e, "undecodable file parameter, skipping");
                    return None;
                }
            };
            let url = page.join(&decoded).ok()?;
            let name = url
                .path_segments()
                .and_then(|mut segments| segments.next_back())
                .map(|segment| {
                    urlencoding::decode(segment)
                        .map(|s| s.into_owned())
                        .unwrap_or_else(|_| segment.to_string())
                })
                .filter(|name| !name.is_empty())?;
            Some(Link {
                name,
                url: url.to_string(),
            })
        })
        .collect()
}
