//! Seams to the outside world. Each one is implemented by a dedicated crate
//! and consumed by the router, so the routing rules can be exercised against
//! in-memory fakes.

use async_trait::async_trait;

use crate::{
    Result,
    types::{DispatchJob, MediaRef},
};

/// Delivers dispatch jobs to real destinations.
///
/// Delivery outcome is not reported back to the caller; failures are the
/// sink's own concern.
#[async_trait]
pub trait Sink: Send + Sync {
    async fn deliver(&self, job: DispatchJob);
}

/// Resolves a reference id to a display title.
#[async_trait]
pub trait TitleLookup: Send + Sync {
    /// `Ok(None)` when the reference exists but has no title.
    async fn title(&self, reference_id: &str) -> Result<Option<String>>;
}

/// Irreversibly blurs an image.
#[async_trait]
pub trait Redactor: Send + Sync {
    async fn redact(&self, image: &[u8], strength: u32) -> Result<Vec<u8>>;
}

/// Downloads the bytes behind a platform media reference.
#[async_trait]
pub trait MediaFetcher: Send + Sync {
    async fn fetch(&self, media: &MediaRef) -> Result<Vec<u8>>;
}
