//! JSON-RPC over HTTP gateway for a blockchain node.
//!
//! Every request passes an admission chain (client IP allow-list, virtual
//! host whitelist, CORS, protocol checks) before a single request/response
//! exchange is handed to an [`rpc::RpcDispatcher`].

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod rpc;
pub mod security;

pub use config::GatewayConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use rpc::{build_rpc_router, RpcDispatcher, RpcStream};
