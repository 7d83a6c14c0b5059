//! Engine behavior tests over the in-memory transport and store.

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;
use tokio::sync::mpsc;

use super::{DownloadEngine, JobEvent};
use crate::config::FdmConfig;
use crate::job::{JobRecord, JobStatus, NewJob};
use crate::store::db::open_memory;
use crate::testing::FakeTransport;

fn test_config() -> FdmConfig {
    FdmConfig {
        // Small threshold so short test bodies still produce progress events.
        progress_threshold_bytes: 4096,
        event_channel_capacity: 1024,
        ..FdmConfig::default()
    }
}

async fn engine_with(
    transport: FakeTransport,
) -> (DownloadEngine, mpsc::Receiver<JobEvent>, TempDir) {
    let store = open_memory().await.unwrap();
    let dir = tempfile::tempdir().unwrap();
    let (engine, rx) = DownloadEngine::new(store, Arc::new(transport), test_config());
    (engine, rx, dir)
}

fn request(dir: &TempDir, parallelism: u32) -> NewJob {
    NewJob {
        url: "https://example.com/data/file.bin".to_string(),
        save_dir: dir.path().to_path_buf(),
        file_name: "file.bin".to_string(),
        parallelism,
        tags: BTreeSet::new(),
    }
}

fn body(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

/// Drain events until the terminal (Completed/Failed/Cancelled) snapshot.
async fn wait_terminal(rx: &mut mpsc::Receiver<JobEvent>) -> JobRecord {
    loop {
        let event = tokio::time::timeout(Duration::from_secs(30), rx.recv())
            .await
            .expect("timed out waiting for terminal event")
            .expect("event channel closed");
        if let JobEvent::Completed(job) = event {
            return job;
        }
    }
}

/// Drain events until the first progress snapshot with nonzero bytes.
async fn wait_first_progress(rx: &mut mpsc::Receiver<JobEvent>) -> JobRecord {
    loop {
        let event = tokio::time::timeout(Duration::from_secs(30), rx.recv())
            .await
            .expect("timed out waiting for progress")
            .expect("event channel closed");
        if let JobEvent::Progress(job) = event {
            if job.downloaded_bytes > 0 {
                return job;
            }
        }
    }
}

fn read_file(path: &Path) -> Vec<u8> {
    std::fs::read(path).unwrap()
}

#[tokio::test(flavor = "multi_thread")]
async fn single_stream_download_completes() {
    let data = body(200_000);
    let (engine, mut rx, dir) = engine_with(FakeTransport::new(data.clone()).without_ranges()).await;
    let job = engine.create_job(request(&dir, 1)).await.unwrap();
    assert_eq!(job.status, JobStatus::Pending);

    assert!(engine.start(job.id).await.unwrap());
    let done = wait_terminal(&mut rx).await;
    assert_eq!(done.status, JobStatus::Completed);
    assert_eq!(done.total_bytes, Some(200_000));
    assert_eq!(done.downloaded_bytes, 200_000);
    assert!(done.completed_at.is_some());
    assert!((done.progress_fraction() - 1.0).abs() < 1e-9);

    assert_eq!(read_file(&done.dest_path()), data);
    assert!(!engine.is_active(job.id));
}

#[tokio::test(flavor = "multi_thread")]
async fn multi_range_download_writes_exact_bytes() {
    let data = body(150_000);
    let (engine, mut rx, dir) = engine_with(FakeTransport::new(data.clone())).await;
    let job = engine.create_job(request(&dir, 4)).await.unwrap();

    assert!(engine.start(job.id).await.unwrap());
    let done = wait_terminal(&mut rx).await;
    assert_eq!(done.status, JobStatus::Completed);
    assert_eq!(done.range_count, 4);
    assert_eq!(done.downloaded_bytes, 150_000);
    assert_eq!(read_file(&done.dest_path()), data);
}

#[tokio::test(flavor = "multi_thread")]
async fn unknown_length_forces_single_stream() {
    let data = body(90_000);
    let (engine, mut rx, dir) =
        engine_with(FakeTransport::new(data.clone()).without_length()).await;
    let job = engine.create_job(request(&dir, 8)).await.unwrap();

    assert!(engine.start(job.id).await.unwrap());
    let done = wait_terminal(&mut rx).await;
    assert_eq!(done.status, JobStatus::Completed);
    // No split without a known size; the total is learned at stream end.
    assert_eq!(done.range_count, 0);
    assert_eq!(done.total_bytes, Some(90_000));
    assert_eq!(read_file(&done.dest_path()), data);
}

#[tokio::test(flavor = "multi_thread")]
async fn double_start_spawns_no_second_transfer() {
    let data = body(200_000);
    let transport = FakeTransport::new(data.clone())
        .chunked(4096)
        .delayed(Duration::from_millis(5));
    let (engine, mut rx, dir) = engine_with(transport).await;
    let job = engine.create_job(request(&dir, 1)).await.unwrap();

    assert!(engine.start(job.id).await.unwrap());
    assert!(!engine.start(job.id).await.unwrap());
    assert_eq!(engine.active_jobs(), vec![job.id]);

    let done = wait_terminal(&mut rx).await;
    assert_eq!(done.status, JobStatus::Completed);
    assert_eq!(read_file(&done.dest_path()), data);
    assert!(!engine.is_active(job.id));
}

#[tokio::test(flavor = "multi_thread")]
async fn pause_then_resume_single_stream_is_byte_identical() {
    let data = body(400_000);
    let transport = FakeTransport::new(data.clone())
        .chunked(4096)
        .delayed(Duration::from_millis(10));
    let (engine, mut rx, dir) = engine_with(transport).await;
    let job = engine.create_job(request(&dir, 1)).await.unwrap();

    assert!(engine.start(job.id).await.unwrap());
    wait_first_progress(&mut rx).await;
    assert!(engine.pause(job.id).await.unwrap());

    let paused = engine.store().get_job(job.id).await.unwrap().unwrap();
    assert_eq!(paused.status, JobStatus::Paused);
    let k = paused.downloaded_bytes;
    assert!(k > 0 && k < 400_000, "paused mid-transfer, got {k}");
    // Partial content stays on disk under the part name.
    let part = crate::storage::part_path(&paused.dest_path());
    assert!(part.exists());
    assert!(!paused.dest_path().exists());
    assert!(!engine.is_active(job.id));

    assert!(engine.resume(job.id).await.unwrap());
    let done = wait_terminal(&mut rx).await;
    assert_eq!(done.status, JobStatus::Completed);
    assert_eq!(done.downloaded_bytes, 400_000);
    assert!(done.downloaded_bytes >= k);
    assert_eq!(read_file(&done.dest_path()), data);
}

#[tokio::test(flavor = "multi_thread")]
async fn pause_then_resume_multi_range() {
    let data = body(320_000);
    let transport = FakeTransport::new(data.clone())
        .chunked(4096)
        .delayed(Duration::from_millis(10));
    let (engine, mut rx, dir) = engine_with(transport).await;
    let job = engine.create_job(request(&dir, 4)).await.unwrap();

    assert!(engine.start(job.id).await.unwrap());
    wait_first_progress(&mut rx).await;
    assert!(engine.pause(job.id).await.unwrap());

    let paused = engine.store().get_job(job.id).await.unwrap().unwrap();
    assert_eq!(paused.status, JobStatus::Paused);
    assert_eq!(paused.range_count, 4);

    assert!(engine.resume(job.id).await.unwrap());
    let done = wait_terminal(&mut rx).await;
    assert_eq!(done.status, JobStatus::Completed);
    assert_eq!(done.downloaded_bytes, 320_000);
    assert_eq!(read_file(&done.dest_path()), data);
}

#[tokio::test(flavor = "multi_thread")]
async fn stop_cancels_and_freezes_progress() {
    let data = body(400_000);
    let transport = FakeTransport::new(data)
        .chunked(4096)
        .delayed(Duration::from_millis(10));
    let (engine, mut rx, dir) = engine_with(transport).await;
    let job = engine.create_job(request(&dir, 2)).await.unwrap();

    assert!(engine.start(job.id).await.unwrap());
    wait_first_progress(&mut rx).await;
    assert!(engine.stop(job.id).await.unwrap());

    let done = wait_terminal(&mut rx).await;
    assert_eq!(done.status, JobStatus::Cancelled);
    let frozen = done.downloaded_bytes;
    assert!(frozen > 0 && frozen < 400_000);

    // Partial bytes stay on disk, nothing keeps writing.
    let part = crate::storage::part_path(&done.dest_path());
    assert!(part.exists());
    assert!(!done.dest_path().exists());
    tokio::time::sleep(Duration::from_millis(100)).await;
    let later = engine.store().get_job(job.id).await.unwrap().unwrap();
    assert_eq!(later.status, JobStatus::Cancelled);
    assert_eq!(later.downloaded_bytes, frozen);
    assert!(!engine.is_active(job.id));
}

#[tokio::test(flavor = "multi_thread")]
async fn transport_failure_fails_the_job() {
    let data = body(100_000);
    let (engine, mut rx, dir) =
        engine_with(FakeTransport::new(data).without_ranges().failing_after(20_000)).await;
    let job = engine.create_job(request(&dir, 1)).await.unwrap();

    assert!(engine.start(job.id).await.unwrap());
    let done = wait_terminal(&mut rx).await;
    assert_eq!(done.status, JobStatus::Failed);
    let err = done.last_error.expect("error captured");
    assert!(err.contains("connection"), "unexpected error: {err}");
    assert!(!engine.is_active(job.id));
}

#[tokio::test(flavor = "multi_thread")]
async fn worker_failure_aborts_sibling_workers() {
    let data = body(200_000);
    let transport = FakeTransport::new(data)
        .chunked(4096)
        .delayed(Duration::from_millis(2))
        .failing_after(30_000);
    let (engine, mut rx, dir) = engine_with(transport).await;
    let job = engine.create_job(request(&dir, 4)).await.unwrap();

    assert!(engine.start(job.id).await.unwrap());
    let done = wait_terminal(&mut rx).await;
    assert_eq!(done.status, JobStatus::Failed);
    assert!(done.last_error.is_some());
    assert!(!engine.is_active(job.id));
}

#[tokio::test(flavor = "multi_thread")]
async fn probe_failure_fails_the_job() {
    let (engine, mut rx, dir) = engine_with(FakeTransport::new(body(10)).probe_failure(404)).await;
    let job = engine.create_job(request(&dir, 1)).await.unwrap();

    assert!(engine.start(job.id).await.unwrap());
    let done = wait_terminal(&mut rx).await;
    assert_eq!(done.status, JobStatus::Failed);
    assert!(done.last_error.unwrap().contains("404"));
}

#[tokio::test(flavor = "multi_thread")]
async fn progress_is_monotonic_until_terminal() {
    let data = body(250_000);
    let (engine, mut rx, dir) = engine_with(FakeTransport::new(data).chunked(4096)).await;
    let job = engine.create_job(request(&dir, 4)).await.unwrap();

    assert!(engine.start(job.id).await.unwrap());
    let mut last = 0u64;
    loop {
        let event = tokio::time::timeout(Duration::from_secs(30), rx.recv())
            .await
            .expect("timed out")
            .expect("channel closed");
        let job = event.job();
        assert!(
            job.downloaded_bytes >= last,
            "progress went backwards: {} -> {}",
            last,
            job.downloaded_bytes
        );
        last = job.downloaded_bytes;
        if let JobEvent::Completed(done) = event {
            assert_eq!(done.status, JobStatus::Completed);
            assert_eq!(done.downloaded_bytes, 250_000);
            break;
        }
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn explicit_restart_after_completion() {
    let data = body(50_000);
    let (engine, mut rx, dir) = engine_with(FakeTransport::new(data.clone())).await;
    let job = engine.create_job(request(&dir, 2)).await.unwrap();

    assert!(engine.start(job.id).await.unwrap());
    let first = wait_terminal(&mut rx).await;
    assert_eq!(first.status, JobStatus::Completed);

    // Completed does not auto-transition; a new explicit start re-downloads.
    assert!(engine.start(job.id).await.unwrap());
    let second = wait_terminal(&mut rx).await;
    assert_eq!(second.status, JobStatus::Completed);
    assert_eq!(second.downloaded_bytes, 50_000);
    assert_eq!(read_file(&second.dest_path()), data);
}

#[tokio::test(flavor = "multi_thread")]
async fn zero_byte_resource_completes_with_empty_file() {
    let (engine, mut rx, dir) = engine_with(FakeTransport::new(Vec::new())).await;
    let job = engine.create_job(request(&dir, 4)).await.unwrap();

    assert!(engine.start(job.id).await.unwrap());
    let done = wait_terminal(&mut rx).await;
    assert_eq!(done.status, JobStatus::Completed);
    assert_eq!(done.total_bytes, Some(0));
    assert_eq!(read_file(&done.dest_path()), Vec::<u8>::new());
}

#[tokio::test(flavor = "multi_thread")]
async fn control_commands_are_noops_when_inapplicable() {
    let (engine, _rx, dir) = engine_with(FakeTransport::new(body(10))).await;
    let job = engine.create_job(request(&dir, 1)).await.unwrap();

    // Nothing active yet.
    assert!(!engine.pause(job.id).await.unwrap());
    assert!(!engine.stop(job.id).await.unwrap());
    // Resume only applies to Paused jobs.
    assert!(!engine.resume(job.id).await.unwrap());
    let still = engine.store().get_job(job.id).await.unwrap().unwrap();
    assert_eq!(still.status, JobStatus::Pending);

    // Unknown ids are an error, not a silent no-op.
    assert!(engine.start(9999).await.is_err());
}
