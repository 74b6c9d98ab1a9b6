//! End-to-end proxy and cache behaviour against a mock origin.

use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use tower::ServiceExt;

use status_mirror::cache::CACHE_TTL;

mod common;
use common::{
    age_entry, app, body_text, cache_file_count, config, entry_path, get, wait_until, FakeVcs, MockResponse,
    MockUpstream,
};

#[tokio::test]
async fn widget_is_cached_for_the_freshness_window() {
    let upstream = MockUpstream::json(r#"{"ok":true}"#).await;
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path(), &upstream.base_url());
    let app = app(&config, FakeVcs::new(Some("main"), true));

    let first = app.clone().oneshot(get("/widget.json")).await.unwrap();
    assert_eq!(first.status(), StatusCode::OK);
    assert_eq!(first.headers()[header::CONTENT_TYPE], "application/json");
    assert!(first.headers().contains_key("x-request-id"));
    assert_eq!(body_text(first).await, r#"{"ok":true}"#);
    assert_eq!(upstream.hits(), 1);

    let second = app.clone().oneshot(get("/widget.json")).await.unwrap();
    assert_eq!(second.status(), StatusCode::OK);
    assert_eq!(second.headers()[header::CONTENT_TYPE], "application/json");
    assert_eq!(body_text(second).await, r#"{"ok":true}"#);
    assert_eq!(upstream.hits(), 1, "second request must be served from cache");

    let stored = entry_path(&config, &format!("{}/widget.json", upstream.base_url()));
    age_entry(&stored, CACHE_TTL + Duration::from_secs(1));

    let third = app.clone().oneshot(get("/widget.json")).await.unwrap();
    assert_eq!(third.status(), StatusCode::OK);
    assert_eq!(upstream.hits(), 2, "stale entry must trigger a new fetch");
}

#[tokio::test]
async fn query_is_part_of_the_cache_key() {
    let upstream = MockUpstream::json("{}").await;
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path(), &upstream.base_url());
    let app = app(&config, FakeVcs::new(Some("main"), true));

    for uri in ["/summary.json?a=1", "/summary.json?a=2", "/summary.json?a=1", "/summary.json"] {
        let response = app.clone().oneshot(get(uri)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
    assert_eq!(upstream.hits(), 3);

    let targets: Vec<_> = upstream.requests().into_iter().map(|r| r.target).collect();
    assert_eq!(targets, vec!["/summary.json?a=1", "/summary.json?a=2", "/summary.json"]);
}

#[tokio::test]
async fn status_document_always_goes_upstream() {
    let upstream = MockUpstream::json(r#"{"status":"up"}"#).await;
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path(), &upstream.base_url());
    let app = app(&config, FakeVcs::new(Some("main"), true));

    for _ in 0..3 {
        let response = app.clone().oneshot(get("/api/v2/status.json")).await.unwrap();
        assert_eq!(body_text(response).await, r#"{"status":"up"}"#);
    }
    assert_eq!(upstream.hits(), 3);
    assert_eq!(cache_file_count(&config), 0);
}

#[tokio::test]
async fn status_document_ignores_a_fresh_entry_on_disk() {
    let upstream = MockUpstream::json(r#"{"status":"live"}"#).await;
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path(), &upstream.base_url());
    let app = app(&config, FakeVcs::new(Some("main"), true));

    let url = format!("{}/status.json", upstream.base_url());
    let path = entry_path(&config, &url);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, b"200\r\ncontent-type: application/json\r\n\r\n{\"status\":\"stale\"}").unwrap();

    let response = app.oneshot(get("/status.json")).await.unwrap();
    assert_eq!(body_text(response).await, r#"{"status":"live"}"#);
    assert_eq!(upstream.hits(), 1);
}

#[tokio::test]
async fn upstream_error_status_is_mirrored_and_never_cached() {
    let upstream = MockUpstream::start(|_| MockResponse::new(503, "maintenance window")).await;
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path(), &upstream.base_url());
    let app = app(&config, FakeVcs::new(Some("main"), true));

    let response = app.clone().oneshot(get("/widget.json")).await.unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let text = body_text(response).await;
    assert!(text.starts_with("Upstream fetch failed\n"), "{text}");
    assert!(text.contains("HTTP Status: 503\n"));
    assert!(text.contains(&format!("Target URL: {}/widget.json\n", upstream.base_url())));
    assert!(text.contains("Partial Response: maintenance window...\n"));

    let again = app.clone().oneshot(get("/widget.json")).await.unwrap();
    assert_eq!(again.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(upstream.hits(), 2);
    assert_eq!(cache_file_count(&config), 0);
}

#[tokio::test]
async fn unreachable_upstream_is_bad_gateway() {
    let closed = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let base = format!("http://{}", closed.local_addr().unwrap());
    drop(closed);

    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path(), &base);
    let app = app(&config, FakeVcs::new(Some("main"), true));

    let response = app.oneshot(get("/widget.json")).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let text = body_text(response).await;
    assert!(text.contains("Error: upstream transport error"), "{text}");
    assert!(!text.contains("HTTP Status:"));
    assert!(text.contains(&format!("Target URL: {base}/widget.json")));
}

#[tokio::test]
async fn headers_are_filtered_both_ways() {
    let upstream = MockUpstream::start(|_| {
        MockResponse::new(200, "plain")
            .header("content-type", "text/plain")
            .header("content-encoding", "identity")
            .header("x-upstream", "1")
    })
    .await;
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path(), &upstream.base_url());
    let app = app(&config, FakeVcs::new(Some("main"), true));

    let request = Request::builder()
        .uri("/feed.rss")
        .header(header::HOST, "mirror.example.org")
        .header(header::ACCEPT_ENCODING, "gzip, br")
        .header("x-custom", "kept")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().get(header::CONTENT_ENCODING).is_none());
    assert_eq!(response.headers()["x-upstream"], "1");
    assert_eq!(body_text(response).await, "plain");

    let seen = &upstream.requests()[0];
    assert_eq!(seen.header("x-custom"), Some("kept"));
    assert_eq!(seen.header("accept-encoding"), None);
    assert_eq!(seen.header("host"), Some(upstream.addr.to_string().as_str()));
    assert_eq!(seen.header("user-agent"), Some("StatusProxy/1.0"));
}

#[tokio::test]
async fn client_user_agent_wins() {
    let upstream = MockUpstream::json("{}").await;
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path(), &upstream.base_url());
    let app = app(&config, FakeVcs::new(Some("main"), true));

    let request = Request::builder()
        .uri("/a.json")
        .header(header::USER_AGENT, "curl/8.0")
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap();

    assert_eq!(upstream.requests()[0].header("user-agent"), Some("curl/8.0"));
}

#[tokio::test]
async fn method_and_body_are_forwarded() {
    let upstream = MockUpstream::start(|request| {
        MockResponse::new(200, format!("{} {}", request.method, request.body.len()))
    })
    .await;
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path(), &upstream.base_url());
    let app = app(&config, FakeVcs::new(Some("main"), true));

    let request = Request::builder()
        .method(Method::POST)
        .uri("/subscribe")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from("email=ops%40example.com"))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(body_text(response).await, "POST 23");
    let seen = &upstream.requests()[0];
    assert_eq!(seen.method, "POST");
    assert_eq!(seen.body, b"email=ops%40example.com");
}

#[tokio::test]
async fn empty_success_body_is_cached() {
    let upstream = MockUpstream::start(|_| MockResponse::new(200, "")).await;
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path(), &upstream.base_url());
    let app = app(&config, FakeVcs::new(Some("main"), true));

    for _ in 0..2 {
        let response = app.clone().oneshot(get("/empty")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "");
    }
    assert_eq!(upstream.hits(), 1);
}

#[tokio::test]
async fn static_files_are_served_locally() {
    let upstream = MockUpstream::json("{}").await;
    let dir = tempfile::tempdir().unwrap();
    let public = dir.path().join("public");
    std::fs::create_dir_all(&public).unwrap();
    std::fs::write(public.join("robots.txt"), "User-agent: *\n").unwrap();

    let mut config = config(dir.path(), &upstream.base_url());
    config.static_files.dir = Some(public);
    let app = app(&config, FakeVcs::new(Some("main"), true));

    let local = app.clone().oneshot(get("/robots.txt")).await.unwrap();
    assert_eq!(local.status(), StatusCode::OK);
    assert_eq!(body_text(local).await, "User-agent: *\n");
    assert_eq!(upstream.hits(), 0);

    let proxied = app.clone().oneshot(get("/widget.json")).await.unwrap();
    assert_eq!(proxied.status(), StatusCode::OK);
    let root = app.clone().oneshot(get("/")).await.unwrap();
    assert_eq!(root.status(), StatusCode::OK);
    assert_eq!(upstream.hits(), 2);
}

fn request(method: Method, uri: &str) -> Request<Body> {
    Request::builder().method(method).uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn head_never_fills_the_cache_but_is_answered_from_it() {
    let upstream = MockUpstream::json(r#"{"ok":true}"#).await;
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path(), &upstream.base_url());
    let app = app(&config, FakeVcs::new(Some("main"), true));

    let head = app.clone().oneshot(request(Method::HEAD, "/widget.json")).await.unwrap();
    assert_eq!(head.status(), StatusCode::OK);
    assert_eq!(upstream.hits(), 1);
    assert_eq!(cache_file_count(&config), 0);

    let full = app.clone().oneshot(get("/widget.json")).await.unwrap();
    assert_eq!(full.status(), StatusCode::OK);
    assert_eq!(body_text(full).await, r#"{"ok":true}"#);
    assert_eq!(upstream.hits(), 2);

    let head = app.clone().oneshot(request(Method::HEAD, "/widget.json")).await.unwrap();
    assert_eq!(head.status(), StatusCode::OK);
    assert_eq!(head.headers()[header::CONTENT_TYPE], "application/json");
    assert_eq!(upstream.hits(), 2, "HEAD after GET is a cache hit");

    let methods: Vec<_> = upstream.requests().into_iter().map(|r| r.method).collect();
    assert_eq!(methods, vec!["HEAD", "GET"]);
}

#[tokio::test]
async fn non_get_methods_are_fetched_live() {
    let upstream = MockUpstream::start(|request| MockResponse::new(200, request.method.clone())).await;
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path(), &upstream.base_url());
    let app = app(&config, FakeVcs::new(Some("main"), true));

    for _ in 0..2 {
        let response = app.clone().oneshot(request(Method::POST, "/widget.json")).await.unwrap();
        assert_eq!(body_text(response).await, "POST");
    }
    assert_eq!(upstream.hits(), 2);
    assert_eq!(cache_file_count(&config), 0);

    // A later GET is not answered with the POST result.
    let response = app.clone().oneshot(get("/widget.json")).await.unwrap();
    assert_eq!(body_text(response).await, "GET");
    assert_eq!(upstream.hits(), 3);
}

#[tokio::test]
async fn fetch_survives_a_client_disconnect_and_is_stored() {
    let upstream = MockUpstream::start(|_| {
        MockResponse::new(200, r#"{"slow":true}"#)
            .header("content-type", "application/json")
            .delay(Duration::from_millis(400))
    })
    .await;
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path(), &upstream.base_url());
    let app = app(&config, FakeVcs::new(Some("main"), true));

    // The client gives up long before the origin answers.
    let abandoned = tokio::time::timeout(Duration::from_millis(150), app.clone().oneshot(get("/slow.json"))).await;
    assert!(abandoned.is_err());

    let stored = entry_path(&config, &format!("{}/slow.json", upstream.base_url()));
    assert!(wait_until(|| stored.exists()).await, "abandoned fetch must still be cached");
    assert_eq!(upstream.hits(), 1);

    let response = app.clone().oneshot(get("/slow.json")).await.unwrap();
    assert_eq!(body_text(response).await, r#"{"slow":true}"#);
    assert_eq!(upstream.hits(), 1);
}

#[tokio::test]
async fn oversized_body_is_rejected_before_upstream() {
    let upstream = MockUpstream::json("{}").await;
    let dir = tempfile::tempdir().unwrap();
    let mut config = config(dir.path(), &upstream.base_url());
    config.security.max_body_size = 16;
    let app = app(&config, FakeVcs::new(Some("main"), true));

    let request = Request::builder()
        .method(Method::POST)
        .uri("/subscribe")
        .body(Body::from(vec![b'x'; 64]))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert!(response.headers().contains_key("x-request-id"));
    assert_eq!(upstream.hits(), 0);

    let response = app.oneshot(get("/widget.json")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
