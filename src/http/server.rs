//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router: webhook route, optional static files, proxy fallback
//! - Wire up middleware (request ID, tracing, timeout, body limits)
//! - Serve on a bound listener until shutdown

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::{DefaultBodyLimit, State},
    handler::Handler,
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{services::ServeDir, timeout::TimeoutLayer, trace::TraceLayer};

use crate::cache::CacheStore;
use crate::config::{ProxyConfig, WebhookConfig};
use crate::deploy::{DeploymentTrigger, VersionControl};
use crate::http::request::{propagate_request_id_layer, request_id, set_request_id_layer};
use crate::proxy::Dispatcher;
use crate::routing::CachePolicy;
use crate::upstream::{UpstreamClient, UpstreamError};
use crate::webhook::webhook_handler;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Dispatcher,
    pub trigger: Arc<DeploymentTrigger>,
    pub webhook: Arc<WebhookConfig>,
    pub max_body_size: usize,
}

impl AppState {
    pub fn new(
        config: &ProxyConfig,
        cache: Arc<dyn CacheStore>,
        vcs: Arc<dyn VersionControl>,
    ) -> Result<Self, UpstreamError> {
        let upstream = UpstreamClient::new(&config.upstream)?;
        let dispatcher = Dispatcher::new(
            &config.upstream.base_url,
            cache.clone(),
            upstream,
            CachePolicy::from_config(&config.cache),
        );
        let trigger = DeploymentTrigger::new(&config.webhook, &config.deploy, vcs, cache);

        Ok(Self {
            dispatcher,
            trigger: Arc::new(trigger),
            webhook: Arc::new(config.webhook.clone()),
            max_body_size: config.security.max_body_size,
        })
    }
}

/// HTTP server for the status mirror.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    pub fn new(config: &ProxyConfig, state: AppState) -> Self {
        Self {
            router: build_router(config, state),
        }
    }

    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Serve until `shutdown` fires (or its sender is dropped).
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Build the Axum router with all middleware layers.
#[allow(deprecated)]
pub fn build_router(config: &ProxyConfig, state: AppState) -> Router {
    let max_body_size = config.security.max_body_size;

    // Non-POST requests to the webhook path are ordinary proxy traffic.
    let router = Router::new().route(
        &config.webhook.path,
        post(webhook_handler).fallback(proxy_handler),
    );

    let router = match &config.static_files.dir {
        Some(dir) => {
            let files = ServeDir::new(dir)
                .append_index_html_on_directories(false)
                .call_fallback_on_method_not_allowed(true)
                .fallback(proxy_handler.with_state(state.clone()));
            router.fallback_service(files)
        }
        None => router.fallback(proxy_handler),
    };

    router.with_state(state).layer(
        ServiceBuilder::new()
            .layer(set_request_id_layer())
            .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                tracing::info_span!(
                    "request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = %request_id(request),
                )
            }))
            .layer(propagate_request_id_layer())
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(DefaultBodyLimit::max(max_body_size)),
    )
}

/// Everything that is not the webhook or a local file.
async fn proxy_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let (parts, body) = request.into_parts();
    let body = match axum::body::to_bytes(body, state.max_body_size).await {
        Ok(body) => body,
        Err(e) => {
            tracing::warn!(error = %e, limit = state.max_body_size, "Rejecting request body");
            return (StatusCode::PAYLOAD_TOO_LARGE, "Request body too large").into_response();
        }
    };

    let request = state
        .dispatcher
        .prepare(parts.method, &parts.uri, &parts.headers, body);
    state.dispatcher.dispatch(request).await
}
