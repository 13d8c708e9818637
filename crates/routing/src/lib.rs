//! Turn flushed submissions and polled items into destination jobs.
//!
//! Two flows run per submission:
//! 1. Announcement: one representative preview per destination, blurred when
//!    any selecting rule asks for it. Blur failure drops the job.
//! 2. Collection: every image, never blurred, one batch per destination.
//!
//! Every job then passes the [`Dispatcher`], which skips reference urls a
//! destination has already received.

pub mod dispatch;
pub mod engine;
pub mod error;
pub mod rules;

pub use {
    dispatch::{DispatchOutcome, Dispatcher},
    engine::{RoutingEngine, collection_description},
    error::{Error, Result},
    rules::{SENSITIVE_TAGS, announcement_targets, collection_targets},
};
