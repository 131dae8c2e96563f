//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::ConnectInfo,
    http::{Request, Response, StatusCode},
    Router,
};
use school_site::config::SiteConfig;
use school_site::http::HttpServer;
use school_site::lifecycle::Shutdown;
use school_site::security::rate_limit::ManualClock;
use school_site::submissions::SubmissionSink;
use tempfile::TempDir;
use tower::ServiceExt;

pub const INDEX_HTML: &str = "<!doctype html><title>SARDAM</title><h1>SARDAM School</h1>";

/// Create a site root holding an index page and one stylesheet.
pub fn site_root() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("index.html"), INDEX_HTML).unwrap();
    std::fs::create_dir(dir.path().join("css")).unwrap();
    std::fs::write(dir.path().join("css/site.css"), "body { margin: 0 }").unwrap();
    dir
}

/// Default config pointed at `root`, listening on an ephemeral port.
pub fn test_config(root: &TempDir) -> SiteConfig {
    let mut config = SiteConfig::default();
    config.listener.bind_address = "127.0.0.1:0".to_string();
    config.site.root = root.path().to_path_buf();
    config
}

/// Router-level harness: drives requests through the full pipeline
/// without a socket, with a controllable clock.
pub struct Harness {
    pub router: Router,
    pub clock: Arc<ManualClock>,
    pub server: HttpServer,
    _root: TempDir,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(|_| {})
    }

    pub fn with_config(tweak: impl FnOnce(&mut SiteConfig)) -> Self {
        Self::build(tweak, None)
    }

    pub fn with_sink(sink: Arc<dyn SubmissionSink>) -> Self {
        Self::build(|_| {}, Some(sink))
    }

    pub fn build(
        tweak: impl FnOnce(&mut SiteConfig),
        sink: Option<Arc<dyn SubmissionSink>>,
    ) -> Self {
        let root = site_root();
        let mut config = test_config(&root);
        tweak(&mut config);
        let clock = Arc::new(ManualClock::new());
        let mut builder = HttpServer::builder(config).clock(clock.clone());
        if let Some(sink) = sink {
            builder = builder.sink(sink);
        }
        let server = builder.build();
        Self {
            router: server.router(),
            clock,
            server,
            _root: root,
        }
    }

    /// Send a request as if it came from `ip`.
    pub async fn send_from(&self, ip: [u8; 4], mut request: Request<Body>) -> Response<Body> {
        request
            .extensions_mut()
            .insert(ConnectInfo(SocketAddr::from((ip, 40000))));
        self.router.clone().oneshot(request).await.unwrap()
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.send_from([127, 0, 0, 1], request).await
    }
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

pub fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub async fn json_body(response: Response<Body>) -> (StatusCode, serde_json::Value) {
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

pub async fn text_body(response: Response<Body>) -> (StatusCode, String) {
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
}

/// A running server on a real socket.
pub struct RunningServer {
    pub base_url: String,
    pub shutdown: Shutdown,
    pub handle: tokio::task::JoinHandle<std::io::Result<()>>,
    _root: TempDir,
}

pub async fn start_server(tweak: impl FnOnce(&mut SiteConfig)) -> RunningServer {
    let root = site_root();
    let mut config = test_config(&root);
    tweak(&mut config);

    let listener = tokio::net::TcpListener::bind(&config.listener.bind_address)
        .await
        .unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server = HttpServer::new(config);
    let handle = tokio::spawn(server.run(listener, shutdown.subscribe()));

    RunningServer {
        base_url: format!("http://{}", addr),
        shutdown,
        handle,
        _root: root,
    }
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}
