use std::path::{Path, PathBuf};

use {secrecy::Secret, tracing::debug};

use crate::{
    env_subst::substitute_env,
    error::{Error, Result},
    schema::PixliveConfig,
};

/// Standard config file names, checked in order.
const CONFIG_FILENAMES: &[&str] = &[
    "pixlive.toml",
    "pixlive.yaml",
    "pixlive.yml",
    "pixlive.json",
];

/// Load config from the given path (any supported format).
pub fn load_config(path: &Path) -> Result<PixliveConfig> {
    let raw = std::fs::read_to_string(path).map_err(|source| Error::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_config(&substitute_env(&raw), path)
}

/// Load the explicit path when given, otherwise the first config file found in
/// `./` then `~/.config/pixlive/`.
///
/// Returns defaults (and `None`) when nothing is found. A file that exists but
/// fails to parse is an error.
pub fn discover_and_load(explicit: Option<&Path>) -> Result<(PixliveConfig, Option<PathBuf>)> {
    let path = match explicit {
        Some(p) => Some(p.to_path_buf()),
        None => find_config_file(),
    };
    match path {
        Some(path) => {
            debug!(path = %path.display(), "loading config");
            let cfg = load_config(&path)?;
            Ok((cfg, Some(path)))
        },
        None => {
            debug!("no config file found, using defaults");
            Ok((PixliveConfig::default(), None))
        },
    }
}

fn find_config_file() -> Option<PathBuf> {
    if let Some(p) = first_existing(Path::new(".")) {
        return Some(p);
    }
    directories::ProjectDirs::from("", "", "pixlive").and_then(|d| first_existing(d.config_dir()))
}

fn first_existing(dir: &Path) -> Option<PathBuf> {
    CONFIG_FILENAMES
        .iter()
        .map(|name| dir.join(name))
        .find(|p| p.exists())
}

fn parse_config(raw: &str, path: &Path) -> Result<PixliveConfig> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");
    match ext {
        "toml" => Ok(toml::from_str(raw)?),
        "yaml" | "yml" => Ok(serde_yaml::from_str(raw)?),
        "json" => Ok(serde_json::from_str(raw)?),
        other => Err(Error::UnsupportedFormat {
            extension: other.to_string(),
        }),
    }
}

/// Apply the deployment environment variables on top of a parsed config.
///
/// Unparseable numeric values are ignored with a debug log.
pub fn apply_env_overrides(cfg: &mut PixliveConfig, lookup: impl Fn(&str) -> Option<String>) {
    let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

    if let Some(v) = get("TG_BOT_TOKEN") {
        cfg.telegram.token = Secret::new(v);
    }
    if let Some(v) = get("TG_ADMIN_PASSWORD") {
        cfg.telegram.admin_password = Secret::new(v);
    }
    if let Some(v) = get("TG_SOURCE_CHANNEL_ID") {
        match v.trim().parse() {
            Ok(id) => cfg.telegram.source_channel_id = Some(id),
            Err(_) => debug!(value = %v, "ignoring non-numeric TG_SOURCE_CHANNEL_ID"),
        }
    }
    if let Some(v) = get("POLL_INTERVAL_SECONDS") {
        match v.trim().parse() {
            Ok(secs) => cfg.deviantart.poll_interval_secs = secs,
            Err(_) => debug!(value = %v, "ignoring non-numeric POLL_INTERVAL_SECONDS"),
        }
    }
    if let Some(v) = get("STATE_FILE") {
        cfg.state.path = PathBuf::from(v);
    }
    if let Some(v) = get("DEVIANTART_CLIENT_ID") {
        cfg.deviantart.client_id = v;
    }
    if let Some(v) = get("DEVIANTART_CLIENT_SECRET") {
        cfg.deviantart.client_secret = Secret::new(v);
    }
    if let Some(v) = get("DEVIANTART_USERNAMES") {
        cfg.deviantart.usernames = v
            .split(',')
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .map(String::from)
            .collect();
    }
    if let Some(v) = get("PATREON_ACCESS_TOKEN") {
        cfg.patreon.access_token = Secret::new(v);
    }
}
