/// Config schema types (state, sources, routing table, destinations).
use std::{collections::BTreeMap, net::SocketAddr, path::PathBuf};

use {
    secrecy::{ExposeSecret, Secret},
    serde::Deserialize,
};

/// Root configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PixliveConfig {
    pub state: StateConfig,
    pub deviantart: DeviantArtConfig,
    pub telegram: TelegramConfig,
    pub patreon: PatreonConfig,
    pub routing: RoutingConfig,
    /// Destination name → delivery settings.
    pub destinations: BTreeMap<String, DestinationConfig>,
    pub metrics: MetricsConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StateConfig {
    /// Single JSON file holding every persisted key.
    pub path: PathBuf,
    /// Maximum number of delivered urls remembered per destination.
    pub dedup_capacity: usize,
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data/state.json"),
            dedup_capacity: 1000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DeviantArtConfig {
    pub client_id: String,
    pub client_secret: Secret<String>,
    /// Artists to track; one poller each.
    pub usernames: Vec<String>,
    pub poll_interval_secs: u64,
    pub page_size: u32,
    pub api_base: String,
    pub token_url: String,
    /// Destination receiving polled gallery posts.
    pub destination: String,
}

impl Default for DeviantArtConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: Secret::new(String::new()),
            usernames: Vec::new(),
            poll_interval_secs: 60,
            page_size: 24,
            api_base: "https://www.deviantart.com/api/v1/oauth2".into(),
            token_url: "https://www.deviantart.com/oauth2/token".into(),
            destination: "posts".into(),
        }
    }
}

impl DeviantArtConfig {
    pub fn has_credentials(&self) -> bool {
        !self.client_id.is_empty() && !self.client_secret.expose_secret().is_empty()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TelegramConfig {
    /// Bot token from @BotFather.
    pub token: Secret<String>,
    /// Only channel posts from this chat are ingested when set.
    pub source_channel_id: Option<i64>,
    /// Password for the `/auth` admin command.
    pub admin_password: Secret<String>,
    /// Album debounce window, timed from the first part.
    pub debounce_secs: u64,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            token: Secret::new(String::new()),
            source_channel_id: None,
            admin_password: Secret::new(String::new()),
            debounce_secs: 4,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PatreonConfig {
    pub access_token: Secret<String>,
    pub api_base: String,
}

impl Default for PatreonConfig {
    fn default() -> Self {
        Self {
            access_token: Secret::new(String::new()),
            api_base: "https://www.patreon.com/api/oauth2/v2".into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RoutingConfig {
    pub blur_radius: u32,
    /// Used when the title lookup fails or returns nothing.
    pub placeholder_title: String,
    pub announcements: AnnouncementDestinations,
    pub collections: CollectionDestinations,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            blur_radius: 80,
            placeholder_title: "Patreon Publication".into(),
            announcements: AnnouncementDestinations::default(),
            collections: CollectionDestinations::default(),
        }
    }
}

/// Announcement destination per tag. An empty name disables that rule.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AnnouncementDestinations {
    pub sfw: String,
    pub nsfw: String,
    pub futa: String,
    pub limited: String,
    /// Receives one copy of every announcement.
    pub default: String,
}

/// Collection destination per tag combination. An empty name disables it.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CollectionDestinations {
    pub sfw: String,
    pub nsfw: String,
    pub futa: String,
    pub limited_sfw: String,
    pub limited_nsfw: String,
    pub limited_futa: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DestinationConfig {
    /// Discord-compatible webhook accepting multipart uploads.
    pub webhook_url: Secret<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    pub enabled: bool,
    pub listen: Option<SocketAddr>,
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cfg = PixliveConfig::default();
        assert_eq!(cfg.state.path, PathBuf::from("data/state.json"));
        assert_eq!(cfg.deviantart.poll_interval_secs, 60);
        assert_eq!(cfg.deviantart.page_size, 24);
        assert_eq!(cfg.telegram.debounce_secs, 4);
        assert_eq!(cfg.routing.blur_radius, 80);
        assert_eq!(cfg.routing.placeholder_title, "Patreon Publication");
        assert!(!cfg.deviantart.has_credentials());
    }

    #[test]
    fn deserialize_partial_toml() {
        let raw = r#"
            [deviantart]
            client_id = "id"
            client_secret = "secret"
            usernames = ["alice", "bob"]

            [routing.announcements]
            sfw = "sfw-previews"
            default = "announcements"

            [destinations.announcements]
            webhook_url = "https://discord.example/hook"
        "#;
        let cfg: PixliveConfig = toml::from_str(raw).unwrap();
        assert!(cfg.deviantart.has_credentials());
        assert_eq!(cfg.deviantart.usernames, vec!["alice", "bob"]);
        assert_eq!(cfg.deviantart.poll_interval_secs, 60);
        assert_eq!(cfg.routing.announcements.sfw, "sfw-previews");
        assert!(cfg.routing.announcements.nsfw.is_empty());
        assert_eq!(
            cfg.destinations["announcements"].webhook_url.expose_secret(),
            "https://discord.example/hook"
        );
    }

    #[test]
    fn debug_redacts_secrets() {
        let mut cfg = PixliveConfig::default();
        cfg.telegram.token = Secret::new("123:ABC".into());
        let dbg = format!("{cfg:?}");
        assert!(!dbg.contains("123:ABC"));
    }
}
