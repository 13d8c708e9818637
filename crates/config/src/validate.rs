//! Semantic validation of a loaded configuration.
//!
//! The binary refuses to start when any diagnostic is an [`Severity::Error`].

use std::fmt;

use secrecy::ExposeSecret;

use crate::schema::PixliveConfig;

/// Severity level for a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warning => write!(f, "warning"),
            Self::Info => write!(f, "info"),
        }
    }
}

/// A single validation diagnostic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    /// Dotted path, e.g. `deviantart.client_id`.
    pub path: String,
    pub message: String,
}

impl Diagnostic {
    fn new(severity: Severity, path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity,
            path: path.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}] {}", self.severity, self.path, self.message)
    }
}

/// Returns `true` if any diagnostic is an error.
#[must_use]
pub fn has_errors(diagnostics: &[Diagnostic]) -> bool {
    diagnostics.iter().any(|d| d.severity == Severity::Error)
}

/// Check a config for values the pipeline cannot run with.
#[must_use]
pub fn validate(cfg: &PixliveConfig) -> Vec<Diagnostic> {
    let mut out = Vec::new();

    let gallery_enabled = !cfg.deviantart.usernames.is_empty();
    let channel_enabled = !cfg.telegram.token.expose_secret().is_empty();

    if !gallery_enabled && !channel_enabled {
        out.push(Diagnostic::new(
            Severity::Error,
            "",
            "no sources configured: set deviantart.usernames or telegram.token",
        ));
    }

    if gallery_enabled {
        if cfg.deviantart.client_id.is_empty() {
            out.push(Diagnostic::new(
                Severity::Error,
                "deviantart.client_id",
                "required when deviantart.usernames is set",
            ));
        }
        if cfg.deviantart.client_secret.expose_secret().is_empty() {
            out.push(Diagnostic::new(
                Severity::Error,
                "deviantart.client_secret",
                "required when deviantart.usernames is set",
            ));
        }
        if cfg.deviantart.poll_interval_secs == 0 {
            out.push(Diagnostic::new(
                Severity::Error,
                "deviantart.poll_interval_secs",
                "must be greater than zero",
            ));
        }
        if cfg.deviantart.page_size == 0 {
            out.push(Diagnostic::new(
                Severity::Error,
                "deviantart.page_size",
                "must be greater than zero",
            ));
        }
        check_destination(cfg, "deviantart.destination", &cfg.deviantart.destination, &mut out);
    }

    if channel_enabled {
        if cfg.telegram.admin_password.expose_secret().is_empty() {
            out.push(Diagnostic::new(
                Severity::Warning,
                "telegram.admin_password",
                "not set, admin commands are disabled",
            ));
        }
        if cfg.telegram.debounce_secs == 0 {
            out.push(Diagnostic::new(
                Severity::Warning,
                "telegram.debounce_secs",
                "zero debounce closes an album as soon as its first part arrives, parts arriving after that may be dropped",
            ));
        }
        if cfg.patreon.access_token.expose_secret().is_empty() {
            out.push(Diagnostic::new(
                Severity::Info,
                "patreon.access_token",
                format!(
                    "not set, announcements use the placeholder title \"{}\"",
                    cfg.routing.placeholder_title
                ),
            ));
        }

        let a = &cfg.routing.announcements;
        let c = &cfg.routing.collections;
        let routed = [
            ("routing.announcements.sfw", &a.sfw),
            ("routing.announcements.nsfw", &a.nsfw),
            ("routing.announcements.futa", &a.futa),
            ("routing.announcements.limited", &a.limited),
            ("routing.announcements.default", &a.default),
            ("routing.collections.sfw", &c.sfw),
            ("routing.collections.nsfw", &c.nsfw),
            ("routing.collections.futa", &c.futa),
            ("routing.collections.limited_sfw", &c.limited_sfw),
            ("routing.collections.limited_nsfw", &c.limited_nsfw),
            ("routing.collections.limited_futa", &c.limited_futa),
        ];
        for (path, name) in routed {
            check_destination(cfg, path, name, &mut out);
        }
    }

    if cfg.state.dedup_capacity == 0 {
        out.push(Diagnostic::new(
            Severity::Error,
            "state.dedup_capacity",
            "must be greater than zero",
        ));
    }

    for (name, dest) in &cfg.destinations {
        let url = dest.webhook_url.expose_secret();
        if !(url.starts_with("https://") || url.starts_with("http://")) {
            out.push(Diagnostic::new(
                Severity::Error,
                format!("destinations.{name}.webhook_url"),
                "must be an http(s) URL",
            ));
        }
    }

    out
}

fn check_destination(cfg: &PixliveConfig, path: &str, name: &str, out: &mut Vec<Diagnostic>) {
    if !name.is_empty() && !cfg.destinations.contains_key(name) {
        out.push(Diagnostic::new(
            Severity::Warning,
            path,
            format!("destination \"{name}\" is not defined under [destinations], jobs will be dropped"),
        ));
    }
}
