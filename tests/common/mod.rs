//! Shared utilities for integration testing.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{body::Bytes, http::header, routing::post, Router};
use rpc_gateway::config::GatewayConfig;
use rpc_gateway::rpc::ForwardingDispatcher;
use rpc_gateway::{HttpServer, Shutdown};
use tokio::net::TcpListener;

/// Start a mock node that wraps every request body in a JSON-RPC result.
pub async fn start_mock_node() -> SocketAddr {
    let app = Router::new().route(
        "/",
        post(|body: Bytes| async move {
            let echoed = String::from_utf8_lossy(&body).into_owned();
            (
                [(header::CONTENT_TYPE, "application/json")],
                format!(r#"{{"jsonrpc":"2.0","id":1,"result":{}}}"#, echoed),
            )
        }),
    );

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

/// Start the gateway forwarding to `upstream` and return its address.
pub async fn start_gateway(mut config: GatewayConfig, upstream: SocketAddr) -> (SocketAddr, Shutdown) {
    config.upstream.url = format!("http://{}", upstream);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let dispatcher = Arc::new(ForwardingDispatcher::new(&config.upstream).unwrap());
    let server = HttpServer::new(config, dispatcher).unwrap();

    let shutdown = Shutdown::new();
    let rx = shutdown.subscribe();
    tokio::spawn(async move {
        server.run(listener, rx).await.unwrap();
    });

    (addr, shutdown)
}
