//! HTTP server booted by the bootstrap.

use std::{
    net::SocketAddr,
    time::{Duration, Instant},
};

use anyhow::Context;
use axum::{
    Json, Router,
    extract::{MatchedPath, Request},
    http::StatusCode,
    middleware::{self, Next},
    response::Response,
    routing::get,
};
use di::{Ref, ServiceCollection, singleton_as_self};
use kindle_bootstrap::{
    BootstrapError, ServerModule,
    config::{Config, ConfigPrefix},
    module::Module,
    serde::{non_blank, positive},
};
use serde::{Deserialize, Serialize};
use tokio::{net::TcpListener, runtime::Runtime};
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

/// The `server` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    #[serde(deserialize_with = "non_blank")]
    bind_address: String,
    #[serde(deserialize_with = "positive")]
    request_timeout_secs: u64,
    shutdown_grace_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:3000".to_string(),
            request_timeout_secs: 30,
            shutdown_grace_secs: 10,
        }
    }
}

impl ConfigPrefix for ServerConfig {
    const PREFIX: &'static str = "server";
}

impl ServerConfig {
    pub fn bind_address(&self) -> &str {
        &self.bind_address
    }
}

#[derive(Debug, Serialize)]
struct Health {
    status: &'static str,
    version: &'static str,
}

/// Serves the application router until Ctrl-C or SIGTERM.
pub struct HttpServer {
    config: ServerConfig,
}

impl HttpServer {
    pub fn new(config: ServerConfig) -> Self {
        Self { config }
    }

    pub fn router(&self) -> Router {
        self.with_layers(
            Router::new()
                .route("/", get(index))
                .route("/health", get(health)),
        )
    }

    /// Wraps `routes` with request metrics, the request timeout and tracing.
    fn with_layers(&self, routes: Router) -> Router {
        let timeout = Duration::from_secs(self.config.request_timeout_secs);
        routes
            .layer(middleware::from_fn(record_request))
            .layer(TimeoutLayer::with_status_code(
                StatusCode::REQUEST_TIMEOUT,
                timeout,
            ))
            .layer(TraceLayer::new_for_http())
    }

    async fn serve(&self) -> anyhow::Result<()> {
        let listener = TcpListener::bind(self.config.bind_address())
            .await
            .with_context(|| format!("unable to bind {}", self.config.bind_address()))?;
        let local_addr: SocketAddr = listener.local_addr()?;
        tracing::info!(address = %local_addr, "listening for connections");

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown_signal())
            .await
            .context("http server failed")?;
        Ok(())
    }
}

impl ServerModule for HttpServer {
    fn boot_server(&self) -> anyhow::Result<()> {
        let runtime = Runtime::new().context("unable to build tokio runtime")?;
        let served = runtime.block_on(self.serve());
        // connections still draining after the grace period are dropped
        runtime.shutdown_timeout(Duration::from_secs(self.config.shutdown_grace_secs));
        served
    }
}

/// Registers the [`HttpServer`] built from the `server` section.
pub struct HttpModule;

impl Module for HttpModule {
    fn configure(
        &self,
        config: &Config,
        binder: &mut ServiceCollection,
    ) -> Result<(), BootstrapError> {
        let server_config: ServerConfig =
            config.get().map_err(BootstrapError::ConfigLoadError)?;
        let server = Ref::new(HttpServer::new(server_config));
        binder.add(singleton_as_self::<HttpServer>().from(move |_| server.clone()));
        Ok(())
    }
}

async fn index() -> &'static str {
    concat!("kindle ", env!("CARGO_PKG_VERSION"))
}

async fn health() -> Json<Health> {
    Json(Health {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn record_request(request: Request, next: Next) -> Response {
    let started = Instant::now();
    let method = request.method().to_string();
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map(|path| path.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());

    let response = next.run(request).await;

    let status = response.status().as_u16().to_string();
    metrics::counter!(
        "kindle_http_requests_total",
        "method" => method.clone(),
        "route" => route.clone(),
        "status" => status
    )
    .increment(1);
    metrics::histogram!(
        "kindle_http_request_duration_seconds",
        "method" => method,
        "route" => route
    )
    .record(started.elapsed().as_secs_f64());
    response
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "unable to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "unable to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("shutdown signal received");
}

#[cfg(test)]
mod tests {
    use axum::{body::Body, http};
    use rstest::rstest;
    use tower::ServiceExt;

    use super::*;

    fn server() -> HttpServer {
        HttpServer::new(ServerConfig::default())
    }

    #[rstest]
    #[case("/", StatusCode::OK)]
    #[case("/health", StatusCode::OK)]
    #[case("/missing", StatusCode::NOT_FOUND)]
    #[tokio::test]
    async fn routes_respond(#[case] uri: &str, #[case] expected: StatusCode) {
        let response = server()
            .router()
            .oneshot(http::Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), expected);
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let response = server()
            .router()
            .oneshot(http::Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let body = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
        let health: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(health["status"], "ok");
    }

    #[tokio::test(start_paused = true)]
    async fn slow_requests_time_out() {
        let server = HttpServer::new(ServerConfig {
            request_timeout_secs: 1,
            ..ServerConfig::default()
        });
        let slow = || async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            "late"
        };
        let response = server
            .with_layers(Router::new().route("/slow", get(slow)))
            .oneshot(http::Request::builder().uri("/slow").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::REQUEST_TIMEOUT);
    }

    #[test]
    fn boot_fails_on_unusable_address() {
        let config = ServerConfig {
            bind_address: "definitely not an address".to_string(),
            ..ServerConfig::default()
        };
        let err = HttpServer::new(config).boot_server().unwrap_err();
        assert!(format!("{err:#}").contains("unable to bind"));
    }
}
