//! JSON-RPC over HTTP admission pipeline.
//!
//! # Data Flow
//! ```text
//! request
//!     → allow_ip gate (omitted when IP filtering is off)
//!     → virtual host gate
//!     → CORS (omitted when no origins are configured)
//!     → handler.rs (liveness, method/size/content-type checks)
//!     → RpcDispatcher (one request, one response)
//! ```
//!
//! The chain is assembled once from an immutable [`RpcHttpConfig`]; every
//! layer only reads its own `Arc`-shared configuration.

pub mod forward;
pub mod handler;
pub mod stream;

use std::sync::Arc;
use std::time::Duration;

use axum::{middleware, routing::any, Router};
use thiserror::Error;

use crate::config::RpcHttpConfig;
use crate::observability::SharedObserver;
use crate::security::allow_ip::{allow_ip_middleware, AllowIpState, InvalidPattern, NetworkAllowList};
use crate::security::cors::{cors_layer, InvalidOrigin};
use crate::security::vhost::{vhost_middleware, VirtualHostSet, VirtualHostState};

pub use forward::ForwardingDispatcher;
pub use handler::{rpc_handler, RpcState, CONTENT_TYPE_JSON, MAX_REQUEST_CONTENT_LENGTH};
pub use stream::{DispatchError, InvocationMode, RpcDispatcher, RpcStream};

/// Error building the admission chain from configuration.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error(transparent)]
    AllowList(#[from] InvalidPattern),
    #[error(transparent)]
    Origin(#[from] InvalidOrigin),
    #[error("invalid upstream URL: {0}")]
    Upstream(#[from] axum::http::uri::InvalidUri),
}

/// Compose the admission chain around the base handler.
///
/// Layers added last run first, so the allow-list gate is added last.
/// `request_timeout` bounds each dispatch, response streaming included.
pub fn build_rpc_router(
    config: &RpcHttpConfig,
    dispatcher: Arc<dyn RpcDispatcher>,
    observer: SharedObserver,
    request_timeout: Duration,
) -> Result<Router, BuildError> {
    let trust = config.behind_reverse_proxy;

    let mut router = Router::new()
        .route("/", any(rpc_handler))
        .route("/{*path}", any(rpc_handler))
        .with_state(RpcState {
            dispatcher,
            behind_reverse_proxy: trust,
            observer: observer.clone(),
            request_timeout,
        });

    if let Some(cors) = cors_layer(config.cors_origins.as_slice())? {
        router = router.layer(cors);
    }

    let vhosts = VirtualHostState {
        vhosts: Arc::new(VirtualHostSet::new(config.vhosts.as_slice())),
        behind_reverse_proxy: trust,
        observer: observer.clone(),
    };
    router = router.layer(middleware::from_fn_with_state(vhosts, vhost_middleware));

    if config.ip_filter {
        let allowed = AllowIpState {
            allowed: Arc::new(NetworkAllowList::parse(config.allow_ips.as_slice())?),
            behind_reverse_proxy: trust,
            observer,
        };
        router = router.layer(middleware::from_fn_with_state(allowed, allow_ip_middleware));
    }

    tracing::info!(
        ip_filter = config.ip_filter,
        allow_ips = ?config.allow_ips,
        vhosts = ?config.vhosts,
        cors_origins = ?config.cors_origins,
        behind_reverse_proxy = trust,
        "RPC admission chain built"
    );

    Ok(router)
}
