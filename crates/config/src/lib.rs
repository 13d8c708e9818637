//! Configuration loading, env substitution, env overrides and validation.
//!
//! Config files: `pixlive.toml`, `pixlive.yaml`, `pixlive.yml` or `pixlive.json`,
//! searched in `./` then `~/.config/pixlive/`.
//!
//! Supports `${ENV_VAR}` substitution in all string values. The loaded value
//! is immutable; the two live tunables (poll interval, display style) are
//! overridden at runtime through the state store, not here.

pub mod env_subst;
pub mod error;
pub mod loader;
pub mod schema;
pub mod validate;

pub use {
    error::{Error, Result},
    loader::{apply_env_overrides, discover_and_load, load_config},
    schema::{
        AnnouncementDestinations, CollectionDestinations, DestinationConfig, DeviantArtConfig,
        MetricsConfig, PatreonConfig, PixliveConfig, RoutingConfig, StateConfig, TelegramConfig,
    },
    validate::{Diagnostic, Severity, has_errors, validate},
};
