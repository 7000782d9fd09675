use super::test_helpers::*;
use super::*;
use crate::error::JobError;
use crate::types::{DownloadMethod, JobRequest, JobStatus};
use std::time::Duration;

mod concurrency;

/// Archive-mode request for one subject and the given seasons
fn zip_request(qualification: &str, code: &str, seasons: &[&str]) -> JobRequest {
    JobRequest {
        qualification: qualification.to_string(),
        subjects: vec![code.to_string()],
        seasons: seasons.iter().map(|s| format!("{code}:{s}")).collect(),
        download_method: DownloadMethod::Zip,
    }
}

fn direct_request(qualification: &str, code: &str, seasons: &[&str]) -> JobRequest {
    JobRequest {
        download_method: DownloadMethod::Direct,
        ..zip_request(qualification, code, seasons)
    }
}

/// Site with one IGCSE subject (0580) and one season holding `files` papers
fn maths_site(files: usize) -> Arc<StubLocator> {
    let locator = Arc::new(StubLocator::new());
    locator.add_subject("IGCSE", "Mathematics (0580)");
    locator.add_season("0580", "2023 Oct Nov", files);
    locator
}

fn zip_entries(path: &std::path::Path) -> Vec<String> {
    let archive = zip::ZipArchive::new(std::fs::File::open(path).unwrap()).unwrap();
    let mut names: Vec<String> = archive.file_names().map(str::to_string).collect();
    names.sort();
    names
}
