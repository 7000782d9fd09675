//! Link discovery on the past-paper site
//!
//! A [`Locator`] turns one listing page into named links. Three page kinds
//! exist: a qualification page listing subjects, a subject page listing
//! seasons, and a season page listing files. [`HtmlLocator`] is the
//! production implementation.

mod html;

pub use html::HtmlLocator;

use crate::error::LocatorError;
use crate::types::Link;
use async_trait::async_trait;

/// Lists the links on one remote page
#[async_trait]
pub trait Locator: Send + Sync {
    /// Subject links on a qualification page whose href contains `pattern`
    async fn list_subjects(&self, url: &str, pattern: &str) -> Result<Vec<Link>, LocatorError>;

    /// Season links on a subject page, de-duplicated by URL
    async fn list_seasons(&self, url: &str) -> Result<Vec<Link>, LocatorError>;

    /// File links on a season page; `url` is the direct file URL
    async fn list_files(&self, url: &str) -> Result<Vec<Link>, LocatorError>;
}
