//! Admission decisions reported by the gates.
//!
//! Gates never log directly; they hold an [`AdmissionObserver`] handed to them
//! when the chain is built. The default [`TracingObserver`] turns decisions
//! into structured log events and counters.

use std::fmt;
use std::net::IpAddr;
use std::sync::Arc;

use crate::observability::metrics;

/// The layer that made an admission decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Gate {
    AllowIp,
    VirtualHost,
    Protocol,
}

impl Gate {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gate::AllowIp => "allow_ip",
            Gate::VirtualHost => "virtual_host",
            Gate::Protocol => "protocol",
        }
    }
}

impl fmt::Display for Gate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Receives every grant and deny made by the admission chain.
pub trait AdmissionObserver: Send + Sync {
    fn granted(&self, gate: Gate, client: Option<IpAddr>);
    fn denied(&self, gate: Gate, client: Option<IpAddr>, reason: &str);
}

/// Shared handle stored in gate state.
pub type SharedObserver = Arc<dyn AdmissionObserver>;

/// Logs decisions with `tracing` and counts them with `metrics`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl AdmissionObserver for TracingObserver {
    fn granted(&self, gate: Gate, client: Option<IpAddr>) {
        tracing::trace!(gate = %gate, client = ?client, "Request admitted");
        metrics::record_admission(gate, "granted");
    }

    fn denied(&self, gate: Gate, client: Option<IpAddr>, reason: &str) {
        match gate {
            Gate::Protocol => {
                tracing::debug!(gate = %gate, client = ?client, reason, "Invalid request")
            }
            _ => tracing::warn!(gate = %gate, client = ?client, reason, "Request rejected"),
        }
        metrics::record_admission(gate, "denied");
    }
}
