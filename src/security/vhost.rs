//! Virtual host gate.
//!
//! DNS rebinding points an attacker-controlled name at 127.0.0.1 so that a
//! browser treats requests to the node as same-origin. Those requests still
//! carry the attacker's name in `Host`, so only whitelisted names get through.
//! Literal IP hosts cannot be rebound and always pass.

use std::collections::HashSet;
use std::net::IpAddr;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{header, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::observability::{Gate, SharedObserver};
use crate::security::identity::request_client_ip;

/// Accept any host.
pub const WILDCARD: &str = "*";

/// Lower-cased host whitelist.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VirtualHostSet {
    hosts: HashSet<String>,
    any: bool,
}

impl VirtualHostSet {
    pub fn new<S: AsRef<str>>(hosts: &[S]) -> Self {
        let hosts: HashSet<String> = hosts.iter().map(|h| h.as_ref().to_lowercase()).collect();
        let any = hosts.contains(WILDCARD);
        Self { hosts, any }
    }

    /// `host` must already have its port stripped.
    pub fn allows(&self, host: &str) -> bool {
        self.any || self.hosts.contains(&host.to_lowercase())
    }
}

/// Remove a trailing `:port`. Bracketed IPv6 literals lose their brackets.
pub fn strip_port(host: &str) -> &str {
    if let Some(rest) = host.strip_prefix('[') {
        return match rest.find(']') {
            Some(end) => &rest[..end],
            None => host,
        };
    }
    match host.rsplit_once(':') {
        // more than one colon without brackets: a bare IPv6 literal
        Some((name, _)) if !name.contains(':') => name,
        _ => host,
    }
}

/// Host the client addressed, from the `Host` header or the request target.
///
/// `Ok(None)` when neither names a host. A `Host` header that is present but
/// not valid UTF-8 is an error, never a missing host.
fn request_host(request: &Request<Body>) -> Result<Option<String>, InvalidHostHeader> {
    let host = match request.headers().get(header::HOST) {
        Some(value) => value.to_str().map_err(|_| InvalidHostHeader)?.to_string(),
        None => match request.uri().authority() {
            Some(authority) => authority.as_str().to_string(),
            None => return Ok(None),
        },
    };
    Ok(Some(host).filter(|h| !h.is_empty()))
}

#[derive(Debug)]
struct InvalidHostHeader;

/// State for the virtual host middleware.
#[derive(Clone)]
pub struct VirtualHostState {
    pub vhosts: Arc<VirtualHostSet>,
    pub behind_reverse_proxy: bool,
    pub observer: SharedObserver,
}

pub async fn vhost_middleware(
    State(state): State<VirtualHostState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let raw_host = match request_host(&request) {
        Ok(Some(host)) => host,
        Ok(None) => return next.run(request).await,
        Err(InvalidHostHeader) => {
            tracing::debug!("Host header is not valid UTF-8");
            return forbidden(&state, &request, "unreadable Host header");
        }
    };

    let host = strip_port(&raw_host);
    if host.parse::<IpAddr>().is_ok() || state.vhosts.allows(host) {
        return next.run(request).await;
    }

    tracing::debug!(host = %host, "Host not in virtual host whitelist");
    forbidden(&state, &request, "host not in virtual host whitelist")
}

fn forbidden(state: &VirtualHostState, request: &Request<Body>, reason: &str) -> Response {
    let client = request_client_ip(request, state.behind_reverse_proxy);
    state.observer.denied(Gate::VirtualHost, client, reason);
    (StatusCode::FORBIDDEN, "invalid host specified").into_response()
}
