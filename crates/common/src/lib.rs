//! Shared types, error definitions, and collaborator traits used across all pixlive crates.

pub mod error;
pub mod events;
pub mod traits;
pub mod types;

pub use error::{Error, Result, ResultExt};
