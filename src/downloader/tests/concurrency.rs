use super::*;

#[tokio::test]
async fn fetches_never_exceed_the_gate_limit() {
    let fetcher = Arc::new(StubFetcher::with_delay(Duration::from_millis(20)));
    let (downloader, _temp) = create_test_downloader_with(maths_site(100), fetcher.clone(), 15);

    let created = downloader
        .create_job(zip_request("IGCSE", "0580", &["2023 Oct Nov"]))
        .await
        .unwrap();
    let job = wait_for_rest(&downloader, created.job_id).await;

    assert_eq!(job.status(), JobStatus::Completed);
    assert_eq!(job.downloaded_files.len(), 100);
    assert_eq!(fetcher.calls(), 100);
    assert!(fetcher.peak() <= 15, "peak {} exceeded limit", fetcher.peak());
    assert!(fetcher.peak() > 1, "fetches never overlapped");
}

#[tokio::test]
async fn concurrent_jobs_share_one_gate() {
    let locator = maths_site(20);
    locator.add_subject("IGCSE", "Physics (0625)");
    locator.add_season("0625", "2023 Oct Nov", 20);
    let fetcher = Arc::new(StubFetcher::with_delay(Duration::from_millis(20)));
    let (downloader, _temp) = create_test_downloader_with(locator, fetcher.clone(), 4);

    let first = downloader
        .create_job(zip_request("IGCSE", "0580", &["2023 Oct Nov"]))
        .await
        .unwrap();
    let second = downloader
        .create_job(zip_request("IGCSE", "0625", &["2023 Oct Nov"]))
        .await
        .unwrap();

    let a = wait_for_rest(&downloader, first.job_id).await;
    let b = wait_for_rest(&downloader, second.job_id).await;

    assert_eq!(a.status(), JobStatus::Completed);
    assert_eq!(b.status(), JobStatus::Completed);
    assert_ne!(a.zip_path(), b.zip_path());
    assert!(fetcher.peak() <= 4, "peak {} exceeded limit", fetcher.peak());
}

#[tokio::test]
async fn progress_snapshots_never_move_backwards() {
    let fetcher = Arc::new(StubFetcher::with_delay(Duration::from_millis(5)));
    let (downloader, _temp) = create_test_downloader_with(maths_site(30), fetcher, 5);

    let created = downloader
        .create_job(zip_request("IGCSE", "0580", &["2023 Oct Nov"]))
        .await
        .unwrap();

    let mut last_current = 0;
    let mut last_percentage = 0.0;
    loop {
        let job = downloader.get_job(created.job_id).await.unwrap();
        assert!(job.current_file() >= last_current);
        assert!(job.percentage() >= last_percentage);
        assert!(job.current_file() <= job.total_files() || job.total_files() == 0);
        last_current = job.current_file();
        last_percentage = job.percentage();
        if job.status().is_terminal() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
    assert_eq!(last_current, 30);
}
