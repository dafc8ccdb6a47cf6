//! Client IP allow-list gate.
//!
//! Only installed when IP filtering is enabled. An installed gate with an
//! empty list rejects everything, and so does an unresolvable client.

use std::net::IpAddr;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use ipnet::IpNet;
use thiserror::Error;

use crate::observability::{Gate, SharedObserver};
use crate::security::identity::request_client_ip;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid IP or CIDR pattern '{0}'")]
pub struct InvalidPattern(pub String);

/// Parse `"10.0.0.0/8"` or a bare address (treated as a host route).
pub fn parse_network_pattern(pattern: &str) -> Result<IpNet, InvalidPattern> {
    let trimmed = pattern.trim();
    trimmed
        .parse::<IpNet>()
        .or_else(|_| trimmed.parse::<IpAddr>().map(IpNet::from))
        .map_err(|_| InvalidPattern(pattern.to_string()))
}

/// Ordered set of networks. Immutable after construction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NetworkAllowList {
    networks: Vec<IpNet>,
}

impl NetworkAllowList {
    pub fn parse<S: AsRef<str>>(patterns: &[S]) -> Result<Self, InvalidPattern> {
        let networks = patterns
            .iter()
            .map(|p| parse_network_pattern(p.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { networks })
    }

    /// Unknown addresses never match.
    pub fn contains(&self, ip: Option<IpAddr>) -> bool {
        match ip {
            Some(ip) => {
                let ip = ip.to_canonical();
                self.networks.iter().any(|net| net.contains(&ip))
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.networks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.networks.is_empty()
    }
}

/// State for the allow-list middleware.
#[derive(Clone)]
pub struct AllowIpState {
    pub allowed: Arc<NetworkAllowList>,
    pub behind_reverse_proxy: bool,
    pub observer: SharedObserver,
}

pub async fn allow_ip_middleware(
    State(state): State<AllowIpState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let client = request_client_ip(&request, state.behind_reverse_proxy);

    if state.allowed.contains(client) {
        state.observer.granted(Gate::AllowIp, client);
        return next.run(request).await;
    }

    state
        .observer
        .denied(Gate::AllowIp, client, "client address not in allow list");
    StatusCode::FORBIDDEN.into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observability::events::testing::{Decision, RecordingObserver};
    use axum::{extract::ConnectInfo, middleware, routing::any, Router};
    use std::net::SocketAddr;
    use tower::ServiceExt;

    fn app(patterns: &[&str], trust: bool, observer: Arc<RecordingObserver>) -> Router {
        let state = AllowIpState {
            allowed: Arc::new(NetworkAllowList::parse(patterns).unwrap()),
            behind_reverse_proxy: trust,
            observer,
        };
        Router::new()
            .route("/", any(|| async { "ok" }))
            .layer(middleware::from_fn_with_state(state, allow_ip_middleware))
    }

    fn request_from(peer: &str) -> Request<Body> {
        let mut req = Request::builder().uri("/").body(Body::empty()).unwrap();
        let addr: SocketAddr = peer.parse().unwrap();
        req.extensions_mut().insert(ConnectInfo(addr));
        req
    }

    #[test]
    fn test_parse_patterns() {
        let list = NetworkAllowList::parse(&["10.0.0.0/8", "192.168.1.7", "::1"]).unwrap();
        assert_eq!(list.len(), 3);
        assert!(list.contains(Some("10.200.3.4".parse().unwrap())));
        assert!(list.contains(Some("192.168.1.7".parse().unwrap())));
        assert!(!list.contains(Some("192.168.1.8".parse().unwrap())));
        assert!(list.contains(Some("::1".parse().unwrap())));
        assert!(!list.contains(None));

        assert_eq!(
            NetworkAllowList::parse(&["10.0.0.0/8", "nope"]),
            Err(InvalidPattern("nope".into()))
        );
    }

    #[test]
    fn test_empty_list_matches_nothing() {
        let list = NetworkAllowList::default();
        assert!(list.is_empty());
        assert!(!list.contains(Some("127.0.0.1".parse().unwrap())));
    }

    #[test]
    fn test_mapped_address_matches_v4_network() {
        let list = NetworkAllowList::parse(&["127.0.0.0/8"]).unwrap();
        assert!(list.contains(Some("::ffff:127.0.0.1".parse().unwrap())));
    }

    #[tokio::test]
    async fn test_allows_listed_peer() {
        let observer = Arc::new(RecordingObserver::default());
        let res = app(&["127.0.0.0/8"], false, observer.clone())
            .oneshot(request_from("127.0.0.1:40000"))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(
            observer.decisions(),
            vec![Decision::Granted(Gate::AllowIp, Some("127.0.0.1".parse().unwrap()))]
        );
    }

    #[tokio::test]
    async fn test_rejects_unlisted_peer() {
        let observer = Arc::new(RecordingObserver::default());
        let res = app(&["127.0.0.0/8"], false, observer.clone())
            .oneshot(request_from("192.0.2.10:40000"))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            observer.decisions(),
            vec![Decision::Denied(Gate::AllowIp, Some("192.0.2.10".parse().unwrap()))]
        );
    }

    #[tokio::test]
    async fn test_empty_list_denies_all() {
        let observer = Arc::new(RecordingObserver::default());
        let res = app(&[], false, observer)
            .oneshot(request_from("127.0.0.1:40000"))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_unknown_identity_denied() {
        let observer = Arc::new(RecordingObserver::default());
        let req = Request::builder().uri("/").body(Body::empty()).unwrap();
        let res = app(&["0.0.0.0/0", "::/0"], false, observer.clone())
            .oneshot(req)
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::FORBIDDEN);
        assert_eq!(observer.decisions(), vec![Decision::Denied(Gate::AllowIp, None)]);
    }

    #[tokio::test]
    async fn test_forwarded_identity_used_behind_proxy() {
        let observer = Arc::new(RecordingObserver::default());
        let mut req = request_from("10.0.0.1:40000");
        req.headers_mut()
            .insert("x-forwarded-for", "93.184.216.34, 10.0.0.2".parse().unwrap());

        let res = app(&["93.184.216.0/24"], true, observer.clone())
            .oneshot(req)
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_identical_requests_identical_outcomes() {
        let observer = Arc::new(RecordingObserver::default());
        let router = app(&["127.0.0.0/8"], false, observer);
        for _ in 0..2 {
            let res = router
                .clone()
                .oneshot(request_from("198.51.100.1:1000"))
                .await
                .unwrap();
            assert_eq!(res.status(), StatusCode::FORBIDDEN);
        }
    }
}
