//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Wire up the middleware pipeline in order
//! - Serve the static site as the fallback
//! - Run the rate-limit sweeper alongside the server
//! - Stop accepting on shutdown and drain in-flight requests
//!
//! # Pipeline (outermost first)
//! ```text
//! request id → trace → metrics → security headers → panic guard → timeout
//!     → CORS guard → CORS headers → general limiter (/api/) → body parser
//!     → route limiter (contact/logo) → handler | static fallback
//! ```
//!
//! Other methods on the POST-only routes also reach the static fallback, so
//! `GET /api/contact` serves the entry document like any unmatched GET.

use std::any::Any;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    middleware,
    response::{IntoResponse, Response},
    routing::{get, get_service, post},
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    catch_panic::CatchPanicLayer,
    services::{ServeDir, ServeFile},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::{PolicyConfig, RunMode, SiteConfig};
use crate::http::body::{body_parser_middleware, BodyLimits};
use crate::http::error::ApiError;
use crate::http::handlers;
use crate::http::request::{make_request_span, propagate_request_id_layer, set_request_id_layer};
use crate::observability::metrics::metrics_middleware;
use crate::security::cors::{cors_middleware, CorsPolicy};
use crate::security::headers::SecurityHeadersLayer;
use crate::security::rate_limit::{
    api_rate_limit_middleware, rate_limit_middleware, Clock, RateLimiter, RatePolicy, SystemClock,
};
use crate::submissions::{LogSink, SubmissionSink};

/// Application state injected into handlers.
#[derive(Clone, Debug)]
pub struct AppState {
    pub config: Arc<SiteConfig>,
    pub started_at: Instant,
    pub sink: Arc<dyn SubmissionSink>,
}

/// The three rate-limit policies, each with its own window store.
#[derive(Clone, Debug)]
pub struct RateLimiters {
    pub general: Arc<RateLimiter>,
    pub contact: Arc<RateLimiter>,
    pub logo: Arc<RateLimiter>,
}

impl RateLimiters {
    pub fn from_config(config: &SiteConfig, clock: Arc<dyn Clock>) -> Self {
        let rl = &config.rate_limit;
        let build = |name: &'static str, policy: &PolicyConfig| {
            Arc::new(
                RateLimiter::with_clock(RatePolicy::from_config(name, policy), clock.clone())
                    .trust_forwarded_for(rl.trust_forwarded_for)
                    .enabled(rl.enabled),
            )
        };

        Self {
            general: build("general", &rl.general),
            contact: build("contact", &rl.contact),
            logo: build("logo", &rl.logo),
        }
    }

    fn all(&self) -> [&Arc<RateLimiter>; 3] {
        [&self.general, &self.contact, &self.logo]
    }

    /// Evict expired windows from every policy.
    pub fn sweep(&self) -> usize {
        self.all().iter().map(|limiter| limiter.sweep()).sum()
    }
}

/// HTTP server for the school site.
pub struct HttpServer {
    router: Router,
    config: Arc<SiteConfig>,
    limiters: RateLimiters,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: SiteConfig) -> Self {
        Self::builder(config).build()
    }

    /// Start building a server with non-default collaborators.
    pub fn builder(config: SiteConfig) -> HttpServerBuilder {
        HttpServerBuilder {
            config,
            clock: Arc::new(SystemClock),
            sink: Arc::new(LogSink),
        }
    }

    /// The fully layered router. Useful for driving requests in tests.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Rate limiters, for inspection.
    pub fn limiters(&self) -> &RateLimiters {
        &self.limiters
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &Arc<SiteConfig>, state: AppState, limiters: &RateLimiters) -> Router {
        let site = &config.site;
        let static_site = ServeDir::new(&site.root).fallback(ServeFile::new(site.index_path()));

        let run_mode = config.observability.run_mode;
        let body_limits = Arc::new(BodyLimits {
            max_bytes: config.security.max_body_size,
            run_mode,
        });
        let cors = Arc::new(CorsPolicy::new(&config.cors));

        let router = Router::new()
            .route("/api/config", get(handlers::get_config))
            .route("/api/whatsapp", get(handlers::get_whatsapp))
            .route("/api/health", get(handlers::get_health))
            .route(
                "/api/contact",
                post(handlers::post_contact)
                    .route_layer(middleware::from_fn_with_state(
                        limiters.contact.clone(),
                        rate_limit_middleware,
                    ))
                    .fallback_service(static_site.clone()),
            )
            .route(
                "/api/logo",
                post(handlers::post_logo)
                    .route_layer(middleware::from_fn_with_state(
                        limiters.logo.clone(),
                        rate_limit_middleware,
                    ))
                    .fallback_service(static_site.clone()),
            )
            .fallback_service(get_service(static_site))
            .with_state(state)
            .layer(middleware::from_fn_with_state(body_limits, body_parser_middleware))
            .layer(middleware::from_fn_with_state(
                limiters.general.clone(),
                api_rate_limit_middleware,
            ))
            .layer(cors.layer())
            .layer(middleware::from_fn_with_state(cors, cors_middleware))
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(CatchPanicLayer::custom(move |panic: Box<dyn Any + Send + 'static>| {
                panic_response(panic, run_mode)
            }));

        let router = if config.security.enable_headers {
            router.layer(SecurityHeadersLayer::new())
        } else {
            router
        };

        router
            .layer(middleware::from_fn(metrics_middleware))
            .layer(propagate_request_id_layer())
            .layer(TraceLayer::new_for_http().make_span_with(make_request_span))
            .layer(set_request_id_layer())
    }

    /// Run the server until `shutdown` fires, then drain in-flight requests.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            site_root = %self.config.site.root.display(),
            "HTTP server starting"
        );

        let sweeper = spawn_sweeper(
            self.limiters.clone(),
            Duration::from_secs(self.config.rate_limit.sweep_interval_secs),
            shutdown.resubscribe(),
        );

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received, draining connections");
            })
            .await?;

        sweeper.abort();
        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &SiteConfig {
        &self.config
    }
}

/// Builder for [`HttpServer`].
pub struct HttpServerBuilder {
    config: SiteConfig,
    clock: Arc<dyn Clock>,
    sink: Arc<dyn SubmissionSink>,
}

impl HttpServerBuilder {
    /// Use a custom clock for rate-limit windows.
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Use a custom destination for accepted submissions.
    pub fn sink(mut self, sink: Arc<dyn SubmissionSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn build(self) -> HttpServer {
        let config = Arc::new(self.config);
        let limiters = RateLimiters::from_config(&config, self.clock);

        let state = AppState {
            config: config.clone(),
            started_at: Instant::now(),
            sink: self.sink,
        };

        let router = HttpServer::build_router(&config, state, &limiters);
        HttpServer {
            router,
            config,
            limiters,
        }
    }
}

fn spawn_sweeper(
    limiters: RateLimiters,
    every: Duration,
    mut shutdown: broadcast::Receiver<()>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        // The first tick completes immediately.
        ticker.tick().await;
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let removed = limiters.sweep();
                    if removed > 0 {
                        tracing::debug!(removed, "Evicted expired rate-limit windows");
                    }
                }
                _ = shutdown.recv() => break,
            }
        }
    })
}

/// Terminal error stage for panics anywhere below the panic guard.
fn panic_response(panic: Box<dyn Any + Send + 'static>, run_mode: RunMode) -> Response {
    let cause = if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    };

    ApiError::internal(cause, run_mode).into_response()
}
