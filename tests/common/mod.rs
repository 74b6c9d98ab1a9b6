//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use status_mirror::cache::{CacheKey, DiskCache};
use status_mirror::config::ProxyConfig;
use status_mirror::deploy::{PullOutcome, VcsError, VersionControl};
use status_mirror::http::{build_router, AppState};

/// A request as the mock upstream saw it.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    /// Path and query.
    pub target: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct MockResponse {
    pub status: u16,
    pub headers: Vec<(&'static str, &'static str)>,
    pub body: Vec<u8>,
    /// Held back this long before the response is written.
    pub delay: Duration,
}

impl MockResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.into(),
            delay: Duration::ZERO,
        }
    }

    pub fn header(mut self, name: &'static str, value: &'static str) -> Self {
        self.headers.push((name, value));
        self
    }

    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

/// Programmable HTTP/1.1 origin on an ephemeral port. One request per connection.
pub struct MockUpstream {
    pub addr: SocketAddr,
    hits: Arc<AtomicUsize>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl MockUpstream {
    pub async fn start<F>(responder: F) -> Self
    where
        F: Fn(&RecordedRequest) -> MockResponse + Send + Sync + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let hits = Arc::new(AtomicUsize::new(0));
        let requests = Arc::new(Mutex::new(Vec::new()));
        let responder = Arc::new(responder);

        {
            let (hits, requests) = (hits.clone(), requests.clone());
            tokio::spawn(async move {
                while let Ok((mut socket, _)) = listener.accept().await {
                    let (hits, requests, responder) = (hits.clone(), requests.clone(), responder.clone());
                    tokio::spawn(async move {
                        let Some(request) = read_request(&mut socket).await else {
                            return;
                        };
                        hits.fetch_add(1, Ordering::SeqCst);
                        let response = responder(&request);
                        requests.lock().unwrap().push(request);
                        write_response(socket, response).await;
                    });
                }
            });
        }

        Self {
            addr,
            hits,
            requests,
        }
    }

    /// Always answers 200 with `body` as JSON.
    pub async fn json(body: &'static str) -> Self {
        Self::start(move |_| MockResponse::new(200, body).header("content-type", "application/json")).await
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }
}

/// Polls `condition` every 10ms for up to 2s.
pub async fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    for _ in 0..200 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}

async fn read_request(socket: &mut TcpStream) -> Option<RecordedRequest> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    let head_end = loop {
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos;
        }
        match socket.read(&mut chunk).await {
            Ok(0) | Err(_) => return None,
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
        }
    };

    let head = String::from_utf8_lossy(&buf[..head_end]).into_owned();
    let mut lines = head.split("\r\n");
    let mut request_line = lines.next()?.split_whitespace();
    let method = request_line.next()?.to_string();
    let target = request_line.next()?.to_string();
    let headers: Vec<(String, String)> = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(n, v)| (n.trim().to_ascii_lowercase(), v.trim().to_string()))
        .collect();

    let content_length = headers
        .iter()
        .find(|(n, _)| n == "content-length")
        .and_then(|(_, v)| v.parse::<usize>().ok())
        .unwrap_or(0);
    let mut body = buf[head_end + 4..].to_vec();
    while body.len() < content_length {
        match socket.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => body.extend_from_slice(&chunk[..n]),
        }
    }

    Some(RecordedRequest {
        method,
        target,
        headers,
        body,
    })
}

async fn write_response(mut socket: TcpStream, response: MockResponse) {
    if !response.delay.is_zero() {
        tokio::time::sleep(response.delay).await;
    }
    let reason = StatusCode::from_u16(response.status)
        .ok()
        .and_then(|s| s.canonical_reason())
        .unwrap_or("Unknown");
    let mut out = format!("HTTP/1.1 {} {}\r\n", response.status, reason);
    for (name, value) in &response.headers {
        out.push_str(&format!("{name}: {value}\r\n"));
    }
    out.push_str(&format!(
        "Content-Length: {}\r\nConnection: close\r\n\r\n",
        response.body.len()
    ));

    let mut bytes = out.into_bytes();
    bytes.extend_from_slice(&response.body);
    let _ = socket.write_all(&bytes).await;
    let _ = socket.shutdown().await;
    // Drain until the client closes so it never sees a reset.
    let mut sink = [0u8; 256];
    let _ = tokio::time::timeout(Duration::from_millis(200), socket.read(&mut sink)).await;
}

/// `VersionControl` that records calls instead of running git.
pub struct FakeVcs {
    branch: Option<String>,
    pull_ok: bool,
    pulls: AtomicUsize,
}

impl FakeVcs {
    pub fn new(branch: Option<&str>, pull_ok: bool) -> Arc<Self> {
        Arc::new(Self {
            branch: branch.map(str::to_string),
            pull_ok,
            pulls: AtomicUsize::new(0),
        })
    }

    pub fn pulls(&self) -> usize {
        self.pulls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VersionControl for FakeVcs {
    async fn current_branch(&self) -> Result<String, VcsError> {
        self.branch.clone().ok_or(VcsError::DetachedHead)
    }

    async fn pull(&self) -> PullOutcome {
        self.pulls.fetch_add(1, Ordering::SeqCst);
        PullOutcome {
            success: self.pull_ok,
            log: if self.pull_ok {
                "Already up to date.".into()
            } else {
                "fatal: unable to access remote".into()
            },
        }
    }
}

pub const SECRET: &str = "topsecret";

/// Config rooted in `dir`, with a secret file already written.
pub fn config(dir: &Path, upstream: &str) -> ProxyConfig {
    let env_file = dir.join(".env");
    std::fs::write(&env_file, format!("# deploy secret\nGITHUB_WEBHOOK_SECRET=\"{SECRET}\"\n")).unwrap();

    let mut config = ProxyConfig::default();
    config.upstream.base_url = upstream.to_string();
    config.cache.dir = dir.join("cache");
    config.webhook.env_file = env_file;
    config.deploy.repo_dir = dir.to_path_buf();
    config
}

pub fn app(config: &ProxyConfig, vcs: Arc<FakeVcs>) -> Router {
    let cache = Arc::new(DiskCache::new(&config.cache.dir));
    let state = AppState::new(config, cache, vcs).unwrap();
    build_router(config, state)
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

pub async fn body_text(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

pub fn entry_path(config: &ProxyConfig, url: &str) -> PathBuf {
    DiskCache::new(&config.cache.dir).entry_path(&CacheKey::from_url(url))
}

pub fn age_entry(path: &Path, by: Duration) {
    let file = std::fs::File::options().write(true).open(path).unwrap();
    file.set_modified(SystemTime::now() - by).unwrap();
}

pub fn cache_file_count(config: &ProxyConfig) -> usize {
    match std::fs::read_dir(&config.cache.dir) {
        Ok(dir) => dir.count(),
        Err(_) => 0,
    }
}
