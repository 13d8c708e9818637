//! Metrics for pixlive.
//!
//! Crates record through the `metrics` facade macros re-exported here, using
//! the names in the per-component modules below. When the `prometheus`
//! feature is enabled, [`init_metrics`] installs an exporter that serves
//! `/metrics` on the configured address.
//!
//! ```rust,ignore
//! use pixlive_metrics::{counter, poller};
//!
//! counter!(poller::POLLS_TOTAL, "source" => "deviantart:alice").increment(1);
//! ```

mod definitions;
mod recorder;

pub use {
    definitions::*,
    recorder::{MetricsHandle, MetricsRecorderConfig, init_metrics},
};

// Re-export metrics macros for convenience
pub use metrics::{counter, gauge, histogram};
