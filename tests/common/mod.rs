//! Common test utilities for pastpaper-dl end-to-end tests

use pastpaper_dl::{Config, Job, JobId, PaperDownloader};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// A mock past-paper site laid out like the real one
pub struct MockSite {
    pub server: MockServer,
}

impl MockSite {
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    pub fn uri(&self) -> String {
        self.server.uri()
    }

    async fn page(&self, page_path: &str, body: String) {
        Mock::given(method("GET"))
            .and(path(page_path.to_string()))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(&self.server)
            .await;
    }

    /// Qualification listing page with one anchor per `(slug, name)`
    pub async fn qualification_page(&self, qualification_path: &str, subjects: &[(&str, &str)]) {
        let anchors: String = subjects
            .iter()
            .map(|(slug, name)| format!(r#"<a href="/papers/caie/{slug}">{name}</a>"#))
            .collect();
        self.page(
            qualification_path,
            format!(r#"<html><body><a href="/about">About</a>{anchors}</body></html>"#),
        )
        .await;
    }

    /// Subject page listing `(slug, name)` seasons
    pub async fn subject_page(&self, subject_slug: &str, seasons: &[(&str, &str)]) {
        let anchors: String = seasons
            .iter()
            .map(|(slug, name)| format!(r#"<a href="/papers/caie/{slug}">{name}</a>"#))
            .collect();
        self.page(
            &format!("/papers/caie/{subject_slug}"),
            format!("<html><body>{anchors}</body></html>"),
        )
        .await;
    }

    /// Season page with a download link for each file under `/files/`
    pub async fn season_page(&self, season_slug: &str, files: &[&str]) {
        let anchors: String = files
            .iter()
            .map(|name| {
                let target = format!("{}/files/{name}", self.uri());
                format!(
                    r#"<a href="https://pastpapers.papacambridge.com/main/download_file.php?files={}">Download</a>"#,
                    urlencoding::encode(&target)
                )
            })
            .collect();
        self.page(
            &format!("/papers/caie/{season_slug}"),
            format!("<html><body>{anchors}</body></html>"),
        )
        .await;
    }

    /// Serve a file body under `/files/<name>`
    pub async fn file(&self, name: &str, body: &str) {
        Mock::given(method("GET"))
            .and(path(format!("/files/{name}")))
            .respond_with(ResponseTemplate::new(200).set_body_string(body.to_string()))
            .mount(&self.server)
            .await;
    }

    /// Answer `/files/<name>` with an error status
    pub async fn failing_file(&self, name: &str, status: u16) {
        Mock::given(method("GET"))
            .and(path(format!("/files/{name}")))
            .respond_with(ResponseTemplate::new(status))
            .mount(&self.server)
            .await;
    }
}

/// Configuration pointing at `site`, rooted in a fresh temp directory
pub fn config_for(site: &MockSite, temp: &TempDir) -> Config {
    let mut config = Config::default();
    config.remote.base_url = site.uri();
    config.download.temp_dir = temp.path().join("temp");
    config.download.max_concurrent_downloads = 4;
    config.download.download_timeout = Duration::from_secs(5);
    config
}

/// Real downloader (HTML locator, HTTP fetcher) against `site`
pub async fn downloader_for(site: &MockSite) -> (Arc<PaperDownloader>, TempDir) {
    let temp = tempfile::tempdir().unwrap();
    let downloader = PaperDownloader::new(config_for(site, &temp)).await.unwrap();
    (Arc::new(downloader), temp)
}

/// Poll until the job is terminal or ready, failing after 20 seconds
pub async fn wait_until_settled(downloader: &PaperDownloader, id: JobId) -> Arc<Job> {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(20);
    loop {
        let job = downloader.get_job(id).await.unwrap();
        let status = job.status();
        if status.is_terminal() || status == pastpaper_dl::JobStatus::Ready {
            return job;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "job {id} stuck in {status}"
        );
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}

/// Sorted entry names and contents of a ZIP file
pub fn read_zip(zip_path: &std::path::Path) -> Vec<(String, String)> {
    use std::io::Read;

    let mut archive = zip::ZipArchive::new(std::fs::File::open(zip_path).unwrap()).unwrap();
    let mut entries = Vec::new();
    for i in 0..archive.len() {
        let mut entry = archive.by_index(i).unwrap();
        let mut content = String::new();
        entry.read_to_string(&mut content).unwrap();
        entries.push((entry.name().to_string(), content));
    }
    entries.sort();
    entries
}
