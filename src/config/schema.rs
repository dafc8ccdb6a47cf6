//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the RPC gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Admission policy for the JSON-RPC endpoint.
    pub rpc: RpcHttpConfig,

    /// Node endpoint that admitted requests are forwarded to.
    pub upstream: UpstreamConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "127.0.0.1:8543").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:8543".to_string(),
        }
    }
}

/// Admission policy for the HTTP JSON-RPC listener.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RpcHttpConfig {
    /// Origins allowed to make cross-origin requests. Empty disables CORS.
    pub cors_origins: Vec<String>,

    /// Host header values accepted by the listener. `"*"` accepts any host.
    pub vhosts: Vec<String>,

    /// Install the client IP allow-list gate. When false `allow_ips` is ignored.
    pub ip_filter: bool,

    /// IP addresses or CIDR ranges allowed to connect. An empty list with
    /// `ip_filter` enabled denies every request.
    pub allow_ips: Vec<String>,

    /// Trust `X-Forwarded-For` / `X-Real-Ip` when resolving the client address.
    pub behind_reverse_proxy: bool,
}

impl Default for RpcHttpConfig {
    fn default() -> Self {
        Self {
            cors_origins: Vec::new(),
            vhosts: vec!["localhost".to_string()],
            ip_filter: true,
            allow_ips: vec!["127.0.0.0/8".to_string(), "::1/128".to_string()],
            behind_reverse_proxy: false,
        }
    }
}

/// Upstream node configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Internal JSON-RPC endpoint of the node.
    pub url: String,

    /// Timeout for a single forwarded call in seconds.
    pub timeout_secs: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:8545".to_string(),
            timeout_secs: 10,
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Upper bound in seconds on one request, including the streamed
    /// response. The response is cut short when it fires.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
