//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → allow_ip.rs (resolved client address vs. allow-list)
//!     → vhost.rs (Host header vs. virtual host whitelist)
//!     → cors.rs (cross-origin policy, preflight)
//!     → Pass to RPC handler
//! ```
//!
//! # Design Decisions
//! - Defense in depth: multiple layers of protection
//! - Fail closed: an unknown client address never matches
//! - Forwarding headers are only read when explicitly trusted

pub mod allow_ip;
pub mod cors;
pub mod identity;
pub mod vhost;

pub use allow_ip::{NetworkAllowList, InvalidPattern};
pub use cors::InvalidOrigin;
pub use identity::resolve_client_ip;
pub use vhost::VirtualHostSet;
