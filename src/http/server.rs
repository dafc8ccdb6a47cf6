//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Build the RPC admission chain once from configuration
//! - Wrap it with hosting concerns (timeout, request ID, tracing, metrics)
//! - Serve with peer address info so gates can resolve the client
//! - Stop gracefully on the shutdown broadcast

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{middleware, Router};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::GatewayConfig;
use crate::http::request::{propagate_request_id_layer, set_request_id_layer};
use crate::observability::{metrics, SharedObserver, TracingObserver};
use crate::rpc::{build_rpc_router, BuildError, RpcDispatcher};

/// HTTP server for the JSON-RPC gateway.
pub struct HttpServer {
    router: Router,
    config: GatewayConfig,
}

impl HttpServer {
    /// Create a server logging admission decisions through `tracing`.
    pub fn new(
        config: GatewayConfig,
        dispatcher: Arc<dyn RpcDispatcher>,
    ) -> Result<Self, BuildError> {
        Self::with_observer(config, dispatcher, Arc::new(TracingObserver))
    }

    /// Create a server reporting admission decisions to `observer`.
    pub fn with_observer(
        config: GatewayConfig,
        dispatcher: Arc<dyn RpcDispatcher>,
        observer: SharedObserver,
    ) -> Result<Self, BuildError> {
        let request_timeout = Duration::from_secs(config.timeouts.request_secs);
        let rpc = build_rpc_router(&config.rpc, dispatcher, observer, request_timeout)?;
        let router = Self::build_router(&config, rpc);
        Ok(Self { router, config })
    }

    /// Wrap the admission chain with the hosting middleware stack.
    #[allow(deprecated)]
    fn build_router(config: &GatewayConfig, rpc: Router) -> Router {
        rpc.layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(middleware::from_fn(metrics::track_requests))
            .layer(propagate_request_id_layer())
            .layer(TraceLayer::new_for_http())
            .layer(set_request_id_layer())
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// The fully layered router, for in-process testing.
    pub fn router(&self) -> Router {
        self.router.clone()
    }
}
