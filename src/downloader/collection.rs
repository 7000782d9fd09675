//! Resolving a job's subject/season selection into concrete file entries.

use crate::catalog::Catalog;
use crate::error::{Error, Result};
use crate::job::Job;
use crate::types::FileEntry;
use crate::utils::{claim_unique_path, safe_file_name, sanitize_path_component};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use tokio_util::sync::CancellationToken;

/// Split season selectors into `subject code → [season id]`
///
/// Selectors have the form `"subjectCode:seasonId"` and are split on the
/// first `:`, so season IDs may themselves contain colons. Selectors without
/// a colon or with an empty half are skipped. Season order follows the input.
pub fn parse_season_selectors(selectors: &[String]) -> HashMap<String, Vec<String>> {
    let mut map: HashMap<String, Vec<String>> = HashMap::new();
    for selector in selectors {
        if let Some((code, season)) = split_selector(selector) {
            map.entry(code.to_string())
                .or_default()
                .push(season.to_string());
        }
    }
    map
}

/// The `(subject code, season id)` halves of a well-formed selector
pub(crate) fn split_selector(selector: &str) -> Option<(&str, &str)> {
    let (code, season) = selector.split_once(':')?;
    let (code, season) = (code.trim(), season.trim());
    (!code.is_empty() && !season.is_empty()).then_some((code, season))
}

/// Outcome of collection: the files to fetch and the non-fatal errors met on the way
#[derive(Debug, Default)]
pub(crate) struct Collected {
    pub(crate) entries: Vec<FileEntry>,
    pub(crate) errors: Vec<String>,
}

/// Resolve every requested subject and season of `job` into file entries
///
/// Subjects and seasons that do not exist are skipped. Listing failures are
/// recorded in [`Collected::errors`] and collection carries on with the next
/// season. Destinations are `<work_dir>/<subject>/<season>/<file>` with each
/// segment sanitized. Only cancellation aborts.
pub(crate) async fn collect_files(
    catalog: &Catalog,
    job: &Job,
    work_dir: &Path,
    cancel: &CancellationToken,
) -> Result<Collected> {
    let by_subject = parse_season_selectors(&job.seasons);
    let mut collected = Collected::default();
    let mut taken = HashSet::new();

    for code in &job.subjects {
        let Some(season_ids) = by_subject.get(code) else {
            tracing::debug!(job_id = %job.job_id, subject = %code, "no seasons selected for subject");
            continue;
        };
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let subject = match catalog.subject(&job.qualification, code).await {
            Ok(Some(subject)) => subject,
            Ok(None) => {
                tracing::debug!(job_id = %job.job_id, subject = %code, "subject not found, skipping");
                continue;
            }
            Err(e) => {
                tracing::warn!(job_id = %job.job_id, subject = %code, error = %e, "subject lookup failed");
                collected
                    .errors
                    .push(format!("Error getting subject {code}: {e}"));
                continue;
            }
        };
        let subject_dir = work_dir.join(sanitize_path_component(&subject.name));

        for season_id in season_ids {
            if cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }

            let listed = match catalog.season(&job.qualification, code, season_id).await {
                Ok(Some(season)) => catalog
                    .files(&season.url)
                    .await
                    .map(|files| (season, files))
                    .map_err(Error::from),
                Ok(None) => {
                    tracing::debug!(job_id = %job.job_id, subject = %code, season = %season_id, "season not found, skipping");
                    continue;
                }
                Err(e) => Err(e),
            };

            let (season, files) = match listed {
                Ok(listed) => listed,
                Err(e) => {
                    tracing::warn!(job_id = %job.job_id, subject = %code, season = %season_id, error = %e, "file listing failed");
                    collected
                        .errors
                        .push(format!("Error getting files for {code}/{season_id}: {e}"));
                    continue;
                }
            };

            let season_dir = subject_dir.join(sanitize_path_component(&season.name));
            for file in files {
                let Some(filename) = safe_file_name(&file.name) else {
                    tracing::debug!(url = %file.url, "file link without a usable name, skipping");
                    continue;
                };
                let destination = claim_unique_path(season_dir.join(&filename), &mut taken);
                collected.entries.push(FileEntry {
                    url: file.url,
                    destination,
                    filename,
                    subject_code: subject.code.clone(),
                    subject_name: subject.name.clone(),
                    season_id: season.id.clone(),
                    season_name: season.name.clone(),
                });
            }
        }
    }

    tracing::info!(
        job_id = %job.job_id,
        files = collected.entries.len(),
        errors = collected.errors.len(),
        "file collection finished"
    );
    Ok(collected)
}
