use std::time::Duration;

use {
    anyhow::{Result, bail},
    pixlive_config::PixliveConfig,
    pixlive_deviantart::{Discovered, PollerConfig, PollerState, SourcePoller},
    pixlive_state::StateStore,
};

/// Fetch one gallery page for `username` and print what the next cycle would
/// deliver. Nothing is persisted.
pub async fn poll_once(config: &PixliveConfig, username: &str) -> Result<()> {
    let da = &config.deviantart;
    if !da.has_credentials() {
        bail!("deviantart.client_id and deviantart.client_secret are required");
    }

    let state = StateStore::open(&config.state.path).await?;
    let watermark = state.load_watermark(username).await?;

    let poller = SourcePoller::new(
        PollerConfig {
            username: username.to_string(),
            client_id: da.client_id.clone(),
            client_secret: da.client_secret.clone(),
            api_base: da.api_base.clone(),
            token_url: da.token_url.clone(),
            page_size: da.page_size,
            poll_interval: Duration::from_secs(da.poll_interval_secs),
        },
        reqwest::Client::new(),
    );
    let fresh = poller.poll_once(watermark.as_ref()).await?;

    match &watermark {
        Some(w) => println!("Watermark for {username}: {w}"),
        None => println!("No watermark for {username}; the whole page counts as new."),
    }
    if fresh.is_empty() {
        println!("No new items.");
        return Ok(());
    }
    for Discovered { token, item } in &fresh {
        let token = token.as_ref().map(ToString::to_string).unwrap_or_else(|| "-".into());
        println!("  [{token}] {} <{}>", item.title, item.reference_url);
    }
    println!("{} new item(s)", fresh.len());
    Ok(())
}
