//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router: service endpoints plus the download fallback
//! - Wire up middleware (request id, tracing)
//! - Own the shared state: config cache, dispatcher, performance monitor
//! - Register caches for periodic maintenance
//! - Serve over plain TCP or TLS until shutdown

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::{Request, State},
    response::Response,
    Router,
};
use axum_server::tls_rustls::RustlsConfig;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::admin;
use crate::config::{ConfigCache, ConfigSource, ServerConfig};
use crate::http::request::{propagate_request_id_layer, set_request_id_layer};
use crate::lifecycle::CacheRegistry;
use crate::observability::PerformanceMonitor;
use crate::relay::Dispatcher;

/// How long TLS connections get to finish after shutdown is requested.
const TLS_DRAIN_SECS: u64 = 30;

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<Dispatcher>,
    pub monitor: Arc<PerformanceMonitor>,
}

/// HTTP server for the signed download proxy.
pub struct HttpServer {
    router: Router,
    config: ServerConfig,
    config_cache: Arc<ConfigCache>,
    maintenance: CacheRegistry,
}

impl HttpServer {
    /// Create a new HTTP server. `source` supplies the backend settings that
    /// are re-read through the config cache.
    pub fn new(config: ServerConfig, source: ConfigSource) -> Result<Self, ServerError> {
        let config_cache = Arc::new(ConfigCache::new(
            source,
            Duration::from_secs(config.cache.config_ttl_secs),
        ));
        let monitor = Arc::new(PerformanceMonitor::new(Duration::from_secs(
            config.cache.trace_max_age_secs,
        )));

        // Redirects are followed by the relay, never by the client.
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()?;

        let dispatcher = Arc::new(Dispatcher::new(
            config_cache.clone(),
            client,
            &config.timeouts,
            monitor.clone(),
        ));

        let mut maintenance = CacheRegistry::new();
        maintenance.register(config_cache.clone());
        maintenance.register(monitor.clone());

        let state = AppState {
            dispatcher,
            monitor,
        };

        let router = Self::build_router(state);
        Ok(Self {
            router,
            config,
            config_cache,
            maintenance,
        })
    }

    /// Build the Axum router with all middleware layers.
    ///
    /// The whole-request deadline lives in the dispatcher, so an expired
    /// download still answers with the JSON error body and CORS headers.
    fn build_router(state: AppState) -> Router {
        admin::router()
            .fallback(proxy_handler)
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(set_request_id_layer())
                    .layer(TraceLayer::new_for_http())
                    .layer(propagate_request_id_layer()),
            )
    }

    fn spawn_maintenance(&self, shutdown: broadcast::Receiver<()>) {
        let interval = Duration::from_secs(self.config.cache.maintenance_interval_secs);
        tokio::spawn(self.maintenance.clone().run(interval, shutdown));
    }

    /// Run the server, accepting connections on the given listener until
    /// `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        self.spawn_maintenance(shutdown.resubscribe());

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Run the server over TLS on `addr` until `shutdown` fires.
    pub async fn run_tls(
        self,
        addr: SocketAddr,
        tls: RustlsConfig,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        tracing::info!(address = %addr, "HTTPS server starting");

        self.spawn_maintenance(shutdown.resubscribe());

        let handle = axum_server::Handle::new();
        let drain = handle.clone();
        tokio::spawn(async move {
            let _ = shutdown.recv().await;
            drain.graceful_shutdown(Some(Duration::from_secs(TLS_DRAIN_SECS)));
        });

        axum_server::bind_rustls(addr, tls)
            .handle(handle)
            .serve(self.router.into_make_service())
            .await?;

        tracing::info!("HTTPS server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// The backend-settings cache, for the file watcher and startup checks.
    pub fn config_cache(&self) -> Arc<ConfigCache> {
        self.config_cache.clone()
    }
}

/// Everything that is not a service endpoint is a download.
async fn proxy_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    state.dispatcher.handle(request).await
}
