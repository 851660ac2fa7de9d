//! Integration tests for the download engine.
//!
//! Happy paths and HTTP errors run against a mock server with the real
//! `HttpClient`; transport faults that a mock server cannot produce
//! (mid-stream resets, absent Content-Length) use in-process fetchers.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use dirgrab_core::download::{FetchError, RemoteBody};
use dirgrab_core::{
    DownloadContext, DownloadEngine, Fetcher, HttpClient, Identity, LogProgress, StripSubstrings,
    TaskId, TerminalProgress,
};
use futures_util::stream::{self, StreamExt};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

mod support;
use support::socket_guard::start_mock_server_or_skip;

macro_rules! require_mock_server {
    () => {{
        let Some(mock_server) = start_mock_server_or_skip().await else {
            return;
        };
        mock_server
    }};
}

fn context(fetcher: Arc<dyn Fetcher>, origin: &str, output_dir: &Path) -> DownloadContext {
    DownloadContext {
        fetcher,
        origin: origin.to_string(),
        output_dir: output_dir.to_path_buf(),
        naming: Arc::new(Identity),
        reporter: Arc::new(LogProgress::new()),
    }
}

fn ids(items: &[&str]) -> Vec<String> {
    items.iter().map(ToString::to_string).collect()
}

// ==================== HTTP ====================

#[tokio::test]
async fn test_engine_downloads_files_into_nested_dirs() {
    let mock_server = require_mock_server!();
    let big: Vec<u8> = (0..10_000u32).map(|i| (i % 251) as u8).collect();

    Mock::given(method("GET"))
        .and(path("/files/a.bin"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(big.clone()))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/files/Season%201/b%20c.bin"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"episode".to_vec()))
        .expect(1)
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let origin = format!("{}/files/", mock_server.uri());
    let ctx = context(Arc::new(HttpClient::new().unwrap()), &origin, dir.path());

    let report = DownloadEngine::new(3)
        .unwrap()
        .run_all(ids(&["a.bin", "Season 1/b c.bin"]), ctx)
        .await;

    assert!(report.is_success(), "failures: {:?}", report.failures());
    assert_eq!(report.downloaded(), 2);
    assert_eq!(report.bytes_downloaded(), 10_007);
    assert_eq!(std::fs::read(dir.path().join("a.bin")).unwrap(), big);
    assert_eq!(
        std::fs::read(dir.path().join("Season 1").join("b c.bin")).unwrap(),
        b"episode"
    );
}

#[tokio::test]
async fn test_engine_http_error_does_not_stop_siblings() {
    let mock_server = require_mock_server!();
    Mock::given(method("GET"))
        .and(path("/f/ok.bin"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"fine".to_vec()))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/f/missing.bin"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let origin = format!("{}/f/", mock_server.uri());
    let ctx = context(Arc::new(HttpClient::new().unwrap()), &origin, dir.path());

    let report = DownloadEngine::new(2)
        .unwrap()
        .run_all(ids(&["missing.bin", "ok.bin"]), ctx)
        .await;

    assert_eq!(report.downloaded(), 1);
    assert_eq!(report.failed(), 1);
    assert_eq!(report.failures()[0].identifier, "missing.bin");
    assert!(report.failures()[0].message.contains("404"));
    assert!(!dir.path().join("missing.bin").exists());
    assert_eq!(std::fs::read(dir.path().join("ok.bin")).unwrap(), b"fine");
}

#[tokio::test]
async fn test_engine_skips_existing_files_without_requests() {
    let mock_server = require_mock_server!();
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"new".to_vec()))
        .expect(0)
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("have.bin"), vec![7u8; 100]).unwrap();
    let origin = format!("{}/", mock_server.uri());
    let ctx = context(Arc::new(HttpClient::new().unwrap()), &origin, dir.path());

    let report = DownloadEngine::default()
        .run_all(ids(&["have.bin"]), ctx)
        .await;

    assert_eq!(report.skipped(), 1);
    assert_eq!(report.downloaded(), 0);
    assert_eq!(report.completed(), 1);
    assert_eq!(std::fs::read(dir.path().join("have.bin")).unwrap(), vec![7u8; 100]);
}

#[tokio::test]
async fn test_engine_applies_output_name_transform() {
    let mock_server = require_mock_server!();
    Mock::given(method("GET"))
        .and(path("/show%20%5B1080p%5D.mkv"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"video".to_vec()))
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let origin = format!("{}/", mock_server.uri());
    let mut ctx = context(Arc::new(HttpClient::new().unwrap()), &origin, dir.path());
    ctx.naming = Arc::new(StripSubstrings::new([" [1080p]"]));

    let report = DownloadEngine::default()
        .run_all(ids(&["show [1080p].mkv"]), ctx)
        .await;

    assert!(report.is_success(), "failures: {:?}", report.failures());
    assert_eq!(std::fs::read(dir.path().join("show.mkv")).unwrap(), b"video");
}

// ==================== In-process fetchers ====================

/// Decrements the in-flight counter when a body stream is dropped.
struct InFlightGuard(Arc<AtomicUsize>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Serves a small body after a delay and records peak concurrency.
#[derive(Default)]
struct SlowFetcher {
    in_flight: Arc<AtomicUsize>,
    peak: AtomicUsize,
    opened: AtomicUsize,
}

#[async_trait]
impl Fetcher for SlowFetcher {
    async fn fetch_text(&self, url: &str) -> Result<String, FetchError> {
        Err(FetchError::http_status(url, 405))
    }

    async fn open(&self, _url: &str) -> Result<RemoteBody, FetchError> {
        self.opened.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        let guard = InFlightGuard(Arc::clone(&self.in_flight));

        tokio::time::sleep(Duration::from_millis(20)).await;

        let body = stream::iter(vec![Ok(Bytes::from_static(b"data"))]).map(move |chunk| {
            let _held = &guard;
            chunk
        });
        Ok(RemoteBody {
            status: 200,
            content_length: Some(4),
            body: body.boxed(),
        })
    }
}

#[tokio::test]
async fn test_engine_never_exceeds_worker_limit() {
    let dir = TempDir::new().unwrap();
    let fetcher = Arc::new(SlowFetcher::default());
    let ctx = context(fetcher.clone(), "https://h/", dir.path());
    let names: Vec<String> = (0..10).map(|i| format!("f{i}.bin")).collect();

    let report = DownloadEngine::new(3).unwrap().run_all(names, ctx).await;

    assert_eq!(report.downloaded(), 10);
    assert_eq!(fetcher.opened.load(Ordering::SeqCst), 10);
    assert!(fetcher.peak.load(Ordering::SeqCst) <= 3);
    assert_eq!(fetcher.in_flight.load(Ordering::SeqCst), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_engine_progress_rows_follow_input_order() {
    let dir = TempDir::new().unwrap();
    let progress = Arc::new(TerminalProgress::hidden());
    let mut ctx = context(Arc::new(SlowFetcher::default()), "https://h/", dir.path());
    ctx.reporter = progress.clone();
    let names: Vec<String> = (0..12).map(|i| format!("f{i}.bin")).collect();

    let report = DownloadEngine::new(4).unwrap().run_all(names, ctx).await;

    assert_eq!(report.downloaded(), 12);
    assert_eq!(
        progress.display_order(),
        (0..12).map(TaskId).collect::<Vec<_>>()
    );
}

#[tokio::test]
async fn test_engine_colliding_output_names_fetch_once() {
    let dir = TempDir::new().unwrap();
    let fetcher = Arc::new(SlowFetcher::default());
    let mut ctx = context(fetcher.clone(), "https://h/", dir.path());
    ctx.naming = Arc::new(StripSubstrings::new([" [a]", " [b]"]));

    let report = DownloadEngine::new(3)
        .unwrap()
        .run_all(ids(&["ep [a].bin", "ep [b].bin", "other.bin"]), ctx)
        .await;

    assert_eq!(report.downloaded(), 2);
    assert_eq!(report.failed(), 1);
    assert_eq!(report.failures()[0].identifier, "ep [b].bin");
    assert!(report.failures()[0].message.contains("ep [a].bin"));
    assert_eq!(fetcher.opened.load(Ordering::SeqCst), 2);
    assert_eq!(std::fs::read(dir.path().join("ep.bin")).unwrap(), b"data");
}

#[tokio::test]
async fn test_engine_stripped_dot_segments_stay_inside_output_dir() {
    let root = TempDir::new().unwrap();
    let out = root.path().join("out");
    let mut ctx = context(Arc::new(SlowFetcher::default()), "https://h/", &out);
    ctx.naming = Arc::new(StripSubstrings::new(["x"]));

    let report = DownloadEngine::default()
        .run_all(ids(&["..x/escape.bin"]), ctx)
        .await;

    assert!(report.is_success(), "failures: {:?}", report.failures());
    assert!(!root.path().join("escape.bin").exists());
    assert_eq!(
        std::fs::read(out.join("..x").join("escape.bin")).unwrap(),
        b"data"
    );
}

/// Fails every transfer after the first chunk.
struct ResettingFetcher;

#[async_trait]
impl Fetcher for ResettingFetcher {
    async fn fetch_text(&self, url: &str) -> Result<String, FetchError> {
        Err(FetchError::http_status(url, 405))
    }

    async fn open(&self, url: &str) -> Result<RemoteBody, FetchError> {
        let chunks = vec![
            Ok(Bytes::from(vec![1u8; 5000])),
            Err(FetchError::network(url, "connection reset by peer")),
        ];
        Ok(RemoteBody {
            status: 200,
            content_length: Some(20_000),
            body: stream::iter(chunks).boxed(),
        })
    }
}

#[tokio::test]
async fn test_engine_removes_partial_file_after_stream_error() {
    let dir = TempDir::new().unwrap();
    let ctx = context(Arc::new(ResettingFetcher), "https://h/", dir.path());

    let report = DownloadEngine::default()
        .run_all(ids(&["deep/part.bin"]), ctx)
        .await;

    assert_eq!(report.failed(), 1);
    assert!(report.failures()[0].message.contains("connection reset"));
    assert!(!dir.path().join("deep").join("part.bin").exists());
}

/// Answers without a declared body size.
struct UnsizedFetcher;

#[async_trait]
impl Fetcher for UnsizedFetcher {
    async fn fetch_text(&self, url: &str) -> Result<String, FetchError> {
        Err(FetchError::http_status(url, 405))
    }

    async fn open(&self, _url: &str) -> Result<RemoteBody, FetchError> {
        Ok(RemoteBody {
            status: 200,
            content_length: None,
            body: stream::iter(vec![Ok(Bytes::from_static(b"abc"))]).boxed(),
        })
    }
}

#[tokio::test]
async fn test_engine_missing_content_length_creates_no_file() {
    let dir = TempDir::new().unwrap();
    let ctx = context(Arc::new(UnsizedFetcher), "https://h/", dir.path());

    let report = DownloadEngine::default()
        .run_all(ids(&["a.bin", "b.bin"]), ctx)
        .await;

    assert_eq!(report.failed(), 2);
    assert_eq!(report.completed(), 0);
    assert!(report.failures()[0].message.contains("no content length"));
    assert!(!dir.path().join("a.bin").exists());
    assert!(!dir.path().join("b.bin").exists());
}
