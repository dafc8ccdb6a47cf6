//! Client identity resolution.
//!
//! Without reverse-proxy trust the identity is the TCP peer. With trust, the
//! forwarding headers are scanned right to left: the right-most entries were
//! appended by the proxies closest to us, while left-most entries are whatever
//! the client claimed. The first public address from the right is the client
//! as seen by our outermost proxy.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::sync::OnceLock;

use axum::extract::ConnectInfo;
use axum::http::{HeaderMap, Request};
use ipnet::IpNet;

pub const X_FORWARDED_FOR: &str = "x-forwarded-for";
pub const X_REAL_IP: &str = "x-real-ip";

/// Headers consulted when behind a reverse proxy, in priority order.
const FORWARDING_HEADERS: [&str; 2] = [X_FORWARDED_FOR, X_REAL_IP];

/// Private ranges. Loopback is checked separately.
const LAN_NETWORKS: &[&str] = &[
    "0.0.0.0/8",
    "10.0.0.0/8",
    "172.16.0.0/12",
    "192.168.0.0/16",
    "fe80::/10",
    "fc00::/7",
];

/// IANA special-purpose assignments, minus the documentation ranges
/// (192.0.2.0/24, 198.51.100.0/24, 203.0.113.0/24, 2001:db8::/32).
const SPECIAL_NETWORKS: &[&str] = &[
    "192.0.0.0/29",
    "192.0.0.9/32",
    "192.0.0.170/32",
    "192.0.0.171/32",
    "192.31.196.0/24",
    "192.52.193.0/24",
    "192.88.99.0/24",
    "192.175.48.0/24",
    "198.18.0.0/15",
    "255.255.255.255/32",
    "100::/64",
    "2001::/32",
    "2001:1::1/128",
    "2001:2::/48",
    "2001:3::/32",
    "2001:4:112::/48",
    "2001:5::/32",
    "2001:10::/28",
    "2001:20::/28",
    "2002::/16",
];

fn networks(cell: &'static OnceLock<Vec<IpNet>>, list: &[&str]) -> &'static [IpNet] {
    cell.get_or_init(|| list.iter().filter_map(|s| s.parse().ok()).collect())
}

/// Loopback or private ranges.
pub fn is_lan(ip: IpAddr) -> bool {
    static CELL: OnceLock<Vec<IpNet>> = OnceLock::new();
    ip.is_loopback() || networks(&CELL, LAN_NETWORKS).iter().any(|net| net.contains(&ip))
}

/// Reserved and protocol-assignment ranges that never identify a client.
pub fn is_special_network(ip: IpAddr) -> bool {
    static CELL: OnceLock<Vec<IpNet>> = OnceLock::new();
    networks(&CELL, SPECIAL_NETWORKS).iter().any(|net| net.contains(&ip))
}

/// Unicast, routable and not scoped to a link or host.
pub fn is_global_unicast(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            !(v4.is_unspecified()
                || v4.is_loopback()
                || v4.is_multicast()
                || v4.is_link_local()
                || v4 == Ipv4Addr::BROADCAST)
        }
        IpAddr::V6(v6) => {
            !(v6.is_unspecified()
                || v6.is_loopback()
                || v6.is_multicast()
                || is_unicast_link_local(&v6))
        }
    }
}

fn is_unicast_link_local(v6: &Ipv6Addr) -> bool {
    (v6.segments()[0] & 0xffc0) == 0xfe80
}

/// True if the address can stand for a real external client.
fn is_public_client(ip: IpAddr) -> bool {
    is_global_unicast(ip) && !is_lan(ip) && !is_special_network(ip)
}

/// Resolve the address a request should be attributed to.
///
/// `None` means the identity is unknown; callers that match on identity must
/// treat it as a mismatch.
pub fn resolve_client_ip(
    headers: &HeaderMap,
    peer: Option<SocketAddr>,
    behind_reverse_proxy: bool,
) -> Option<IpAddr> {
    if behind_reverse_proxy {
        if let Some(ip) = forwarded_client_ip(headers) {
            return Some(ip);
        }
    }
    peer.map(|addr| addr.ip().to_canonical())
}

fn forwarded_client_ip(headers: &HeaderMap) -> Option<IpAddr> {
    FORWARDING_HEADERS.iter().find_map(|name| {
        headers
            .get_all(*name)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .collect::<Vec<_>>()
            .join(",")
            .rsplit(',')
            .filter_map(|entry| entry.trim().parse::<IpAddr>().ok())
            .map(|ip| ip.to_canonical())
            .find(|ip| is_public_client(*ip))
    })
}

/// Convenience wrapper reading the peer from axum's connect info.
pub fn request_client_ip<B>(request: &Request<B>, behind_reverse_proxy: bool) -> Option<IpAddr> {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    resolve_client_ip(request.headers(), peer, behind_reverse_proxy)
}
