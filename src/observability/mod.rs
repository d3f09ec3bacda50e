//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events, connection / request spans)
//!     → metrics.rs (counters, gauges)
//!
//! Consumers:
//!     → stdout (pretty or JSON)
//!     → Metrics endpoint (Prometheus scrape, optional)
//! ```
//!
//! # Design Decisions
//! - Every connection runs in a span carrying its connection id and peer
//! - Every request runs in a span carrying a UUID request id
//! - Metrics are cheap (atomic increments)

pub mod logging;
pub mod metrics;
