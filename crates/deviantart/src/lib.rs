//! Gallery poller: OAuth client-credentials token cache, newest-page fetch and
//! watermark-driven discovery of new deviations.

pub mod api;
pub mod credentials;
pub mod error;
pub mod poller;
pub mod watermark;

pub use {
    credentials::CredentialCache,
    error::{Error, Result},
    poller::{Discovered, NewItemFn, PollerConfig, SourcePoller},
    watermark::PollerState,
};
