//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Admission gates
//!     → events.rs (AdmissionObserver injected at build time)
//!         → tracing events (logging.rs subscriber)
//!         → admission counters (metrics.rs)
//! HTTP server
//!     → metrics.rs (request counter + latency histogram)
//!     → TraceLayer spans carrying x-request-id
//! ```
//!
//! # Design Decisions
//! - Gates report decisions through a trait object, not ambient globals
//! - The subscriber and exporter are installed only by binaries
//! - Metrics are cheap (atomic increments)

pub mod events;
pub mod logging;
pub mod metrics;

pub use events::{AdmissionObserver, Gate, SharedObserver, TracingObserver};
