//! End-to-end tests: submit a job, retrieve the artifact, watch it expire.
#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::{
    net::SocketAddr,
    path::PathBuf,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use {
    async_trait::async_trait,
    serde_json::{Value, json},
    tokio::net::TcpListener,
};

use {
    mediaferry_gateway::{GatewayState, build_gateway_app},
    mediaferry_media::{
        Error, FetchCommand, FetchOutput, MediaFetcher, Result, command::EXT_PLACEHOLDER,
    },
};

/// Writes a fixed-size file where the real fetcher would, with the extension
/// it would pick.
struct FakeFetcher {
    bytes: usize,
    calls: AtomicUsize,
    fail_with: Option<&'static str>,
    /// Extension of a stray partial file written before finishing.
    leftover: Option<&'static str>,
}

impl FakeFetcher {
    fn new(bytes: usize) -> Self {
        Self {
            bytes,
            calls: AtomicUsize::new(0),
            fail_with: None,
            leftover: None,
        }
    }
}

#[async_trait]
impl MediaFetcher for FakeFetcher {
    async fn fetch(&self, command: &FetchCommand) -> Result<FetchOutput> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(ext) = self.leftover {
            let path = command
                .output_template
                .to_string_lossy()
                .replace(EXT_PLACEHOLDER, ext);
            tokio::fs::write(&path, b"partial").await.unwrap();
        }
        if let Some(diagnostic) = self.fail_with {
            return Err(Error::ExecutionFailed {
                status: "exit status: 1".into(),
                diagnostic: diagnostic.into(),
            });
        }
        let ext = if command.args.iter().any(|a| a == "--audio-format") {
            "mp3"
        } else if command.args.iter().any(|a| a == "--write-thumbnail") {
            "jpg"
        } else {
            "mp4"
        };
        let path = command
            .output_template
            .to_string_lossy()
            .replace(EXT_PLACEHOLDER, ext);
        tokio::fs::write(&path, vec![0xAB; self.bytes]).await.unwrap();
        Ok(FetchOutput::default())
    }
}

struct TestServer {
    addr: SocketAddr,
    fetcher: Arc<FakeFetcher>,
    downloads: PathBuf,
    _dir: tempfile::TempDir,
}

async fn start_server(fetcher: FakeFetcher, grace: Duration) -> TestServer {
    start_server_with_ttl(fetcher, grace, None).await
}

async fn start_server_with_ttl(
    fetcher: FakeFetcher,
    grace: Duration,
    unclaimed_ttl: Option<Duration>,
) -> TestServer {
    let dir = tempfile::tempdir().unwrap();
    let downloads = dir.path().join("downloads");
    let fetcher = Arc::new(fetcher);
    let state = GatewayState::new(
        Arc::clone(&fetcher) as Arc<dyn MediaFetcher>,
        "yt-dlp",
        &downloads,
        grace,
        unclaimed_ttl,
    );
    let app = build_gateway_app(state);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .unwrap();
    });

    TestServer {
        addr,
        fetcher,
        downloads,
        _dir: dir,
    }
}

async fn convert(addr: SocketAddr, body: Value) -> (u16, Value) {
    let resp = reqwest::Client::new()
        .post(format!("http://{addr}/api/convert"))
        .json(&body)
        .send()
        .await
        .unwrap();
    let status = resp.status().as_u16();
    (status, resp.json().await.unwrap())
}

#[tokio::test]
async fn audio_round_trip_then_expiry() {
    let server = start_server(FakeFetcher::new(12_345), Duration::from_millis(200)).await;

    let (status, body) = convert(
        server.addr,
        json!({"url": "https://example.com/x", "format": "mp3", "quality": "192"}),
    )
    .await;
    assert_eq!(status, 200, "{body}");
    assert!(body.get("error").is_none());
    let file_path = body["file_path"].as_str().unwrap().to_string();
    assert!(file_path.starts_with("/downloads/audio_"), "{file_path}");
    assert!(file_path.ends_with(".mp3"));

    let url = format!("http://{}{file_path}", server.addr);
    let resp = reqwest::get(&url).await.unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    assert_eq!(resp.headers()["content-type"], "audio/mpeg");
    assert_eq!(resp.headers()["content-length"], "12345");
    let bytes = resp.bytes().await.unwrap();
    assert_eq!(bytes.len(), 12_345);

    // Still available inside the grace window.
    let resp = reqwest::get(&url).await.unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    assert_eq!(resp.bytes().await.unwrap().len(), 12_345);

    tokio::time::sleep(Duration::from_millis(700)).await;
    let resp = reqwest::get(&url).await.unwrap();
    assert_eq!(resp.status().as_u16(), 404);
    assert_eq!(std::fs::read_dir(&server.downloads).unwrap().count(), 0);
}

#[tokio::test]
async fn video_has_fixed_extension() {
    let server = start_server(FakeFetcher::new(64), Duration::from_secs(10)).await;
    let (status, body) = convert(
        server.addr,
        json!({"url": "https://example.com/v", "format": "MP4", "quality": "720p"}),
    )
    .await;
    assert_eq!(status, 200, "{body}");
    let file_path = body["file_path"].as_str().unwrap();
    assert!(file_path.starts_with("/downloads/video_"));
    assert!(file_path.ends_with(".mp4"));
}

#[tokio::test]
async fn empty_url_fails_before_execution() {
    let server = start_server(FakeFetcher::new(1), Duration::from_secs(10)).await;
    let (status, body) = convert(server.addr, json!({"url": "", "format": "mp4"})).await;
    assert_eq!(status, 400);
    assert!(body["error"].as_str().unwrap().contains("url"));
    assert_eq!(server.fetcher.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn unsupported_format_is_bad_request() {
    let server = start_server(FakeFetcher::new(1), Duration::from_secs(10)).await;
    let (status, body) =
        convert(server.addr, json!({"url": "https://example.com/x", "format": "gif"})).await;
    assert_eq!(status, 400);
    assert!(body["error"].as_str().unwrap().contains("gif"));
    assert_eq!(server.fetcher.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn malformed_body_is_invalid_request() {
    let server = start_server(FakeFetcher::new(1), Duration::from_secs(10)).await;
    let resp = reqwest::Client::new()
        .post(format!("http://{}/api/convert", server.addr))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "invalid request");
}

#[tokio::test]
async fn fetcher_failure_is_server_error_with_diagnostic() {
    let fetcher = FakeFetcher {
        fail_with: Some("[generic] x: Requesting header\nERROR: Unsupported URL: nonsense"),
        ..FakeFetcher::new(1)
    };
    let server = start_server(fetcher, Duration::from_secs(10)).await;
    let (status, body) = convert(server.addr, json!({"url": "nonsense", "format": "mp3"})).await;
    assert_eq!(status, 500);
    assert!(
        body["error"]
            .as_str()
            .unwrap()
            .contains("ERROR: Unsupported URL")
    );
}

#[tokio::test]
async fn zero_exit_without_output_is_server_error() {
    let server = start_server(FakeFetcher::new(0), Duration::from_secs(10)).await;
    let (status, body) =
        convert(server.addr, json!({"url": "https://example.com/i", "format": "image"})).await;
    assert_eq!(status, 500);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn unknown_and_unsafe_names_are_not_found() {
    let server = start_server(FakeFetcher::new(1), Duration::from_secs(10)).await;
    std::fs::create_dir_all(&server.downloads).unwrap();
    std::fs::write(server.downloads.parent().unwrap().join("secret.txt"), b"x").unwrap();

    for name in ["missing.mp4", "..%2Fsecret.txt", "..%5Csecret.txt"] {
        let resp = reqwest::get(format!("http://{}/downloads/{name}", server.addr))
            .await
            .unwrap();
        assert_eq!(resp.status().as_u16(), 404, "{name}");
    }
}

#[tokio::test]
async fn health_reports_ok() {
    let server = start_server(FakeFetcher::new(1), Duration::from_secs(10)).await;
    let body: Value = reqwest::get(format!("http://{}/health", server.addr))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["status"], "ok");
    assert!(body["version"].is_string());
}

fn file_count(dir: &std::path::Path) -> usize {
    std::fs::read_dir(dir).map(|d| d.count()).unwrap_or(0)
}

#[tokio::test]
async fn failed_job_leaves_nothing_behind() {
    let fetcher = FakeFetcher {
        leftover: Some("webm.part"),
        ..FakeFetcher::new(0)
    };
    let server = start_server(fetcher, Duration::from_secs(10)).await;
    let (status, body) = convert(
        server.addr,
        json!({"url": "https://example.com/x", "format": "mp3"}),
    )
    .await;
    assert_eq!(status, 500, "{body}");
    assert_eq!(file_count(&server.downloads), 0);
}

#[tokio::test]
async fn unclaimed_artifact_expires() {
    let server = start_server_with_ttl(
        FakeFetcher::new(64),
        Duration::from_secs(10),
        Some(Duration::from_millis(300)),
    )
    .await;
    let (status, body) = convert(
        server.addr,
        json!({"url": "https://example.com/v", "format": "mp4"}),
    )
    .await;
    assert_eq!(status, 200, "{body}");
    assert_eq!(file_count(&server.downloads), 1);

    tokio::time::sleep(Duration::from_millis(800)).await;
    let file_path = body["file_path"].as_str().unwrap();
    let resp = reqwest::get(format!("http://{}{file_path}", server.addr))
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 404);
    assert_eq!(file_count(&server.downloads), 0);
}

#[tokio::test]
async fn head_does_not_consume_artifact() {
    let server = start_server(FakeFetcher::new(256), Duration::from_millis(100)).await;
    let (_, body) = convert(
        server.addr,
        json!({"url": "https://example.com/i", "format": "image"}),
    )
    .await;
    let url = format!("http://{}{}", server.addr, body["file_path"].as_str().unwrap());

    let resp = reqwest::Client::new().head(&url).send().await.unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    assert_eq!(resp.headers()["content-type"], "image/jpeg");

    tokio::time::sleep(Duration::from_millis(400)).await;
    let resp = reqwest::get(&url).await.unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    assert_eq!(resp.bytes().await.unwrap().len(), 256);
}

#[tokio::test]
async fn startup_purges_stale_artifacts() {
    let dir = tempfile::tempdir().unwrap();
    let downloads = dir.path().join("downloads");
    std::fs::create_dir_all(&downloads).unwrap();
    let stale = downloads.join("video_old.mp4");
    std::fs::write(&stale, b"old").unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    let state = GatewayState::new(
        Arc::new(FakeFetcher::new(1)) as Arc<dyn MediaFetcher>,
        "yt-dlp",
        &downloads,
        Duration::from_secs(10),
        Some(Duration::from_millis(10)),
    );
    let server = tokio::spawn(mediaferry_gateway::start_gateway("127.0.0.1", 0, state));

    for _ in 0..100 {
        if !stale.exists() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(!stale.exists());
    server.abort();
}
