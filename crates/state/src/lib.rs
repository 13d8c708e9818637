//! Durable key-value state shared by every pipeline stage.
//!
//! The whole key space is one JSON object persisted as one file. Every
//! mutation rewrites the object through a temp file that is renamed over the
//! target, keeping the previous file as `.bak`.

pub mod error;
pub mod keys;
pub mod store;

pub use {
    error::{Error, Result},
    store::StateStore,
};
