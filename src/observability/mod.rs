//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! pipeline components produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → Log aggregation (stdout, file, remote)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Structured logging via tracing; host applications may install their own
//!   subscriber instead of the helper here
//! - Metric updates are cheap (atomic increments), recorded at the cache and
//!   generator seams

pub mod logging;
pub mod metrics;
