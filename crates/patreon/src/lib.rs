//! Post-title lookup against the Patreon API.

pub mod client;
pub mod error;

pub use {
    client::{PatreonClient, USER_AGENT},
    error::{Error, Result},
};
