use std::{
    future::Future,
    pin::Pin,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use {
    pixlive_common::types::{Watermark, WorkItem},
    pixlive_services::{ServiceHandle, Stop},
    reqwest::Client,
    secrecy::{ExposeSecret, Secret},
    tokio::sync::Notify,
    tracing::{debug, info, warn},
};

#[cfg(feature = "metrics")]
use pixlive_metrics::{counter, labels, poller as poller_metrics};

use crate::{
    api::GalleryPage,
    credentials::CredentialCache,
    error::{Error, Result},
    watermark::PollerState,
};

/// Callback invoked for every newly discovered item. The returned future must
/// complete before the watermark is advanced past the item.
pub type NewItemFn = Arc<dyn Fn(WorkItem) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

#[derive(Debug, Clone)]
pub struct PollerConfig {
    pub username: String,
    pub client_id: String,
    pub client_secret: Secret<String>,
    pub api_base: String,
    pub token_url: String,
    pub page_size: u32,
    /// Used when the state store carries no live override.
    pub poll_interval: Duration,
}

/// An item newer than the watermark, with the token that orders it.
#[derive(Debug, Clone)]
pub struct Discovered {
    pub token: Option<Watermark>,
    pub item: WorkItem,
}

/// Polls one artist's gallery.
pub struct SourcePoller {
    config: PollerConfig,
    client: Client,
    credentials: CredentialCache,
    stop_requested: AtomicBool,
    running: AtomicBool,
    wake: Notify,
}

impl SourcePoller {
    pub fn new(config: PollerConfig, client: Client) -> Self {
        let credentials = CredentialCache::new(
            config.token_url.clone(),
            config.client_id.clone(),
            config.client_secret.clone(),
        );
        Self {
            config,
            client,
            credentials,
            stop_requested: AtomicBool::new(false),
            running: AtomicBool::new(false),
            wake: Notify::new(),
        }
    }

    pub fn username(&self) -> &str {
        &self.config.username
    }

    /// Registry name of this poller.
    pub fn service_name(&self) -> String {
        format!("deviantart:{}", self.config.username)
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Fetch the newest page and return the items newer than `watermark`, in
    /// increasing token order.
    ///
    /// Scanning is newest-first and stops at the first item whose token is not
    /// newer than the watermark. Without a watermark the whole page is new.
    /// Items carrying no token are always included.
    pub async fn poll_once(&self, watermark: Option<&Watermark>) -> Result<Vec<Discovered>> {
        let page = self.fetch_page().await?;

        let mut fresh = Vec::new();
        for deviation in page.results {
            let token = deviation.token();
            if let (Some(t), Some(w)) = (token.as_ref(), watermark)
                && t <= w
            {
                break;
            }
            fresh.push(Discovered {
                token,
                item: deviation.into_work_item(&self.config.username),
            });
        }
        fresh.reverse();
        Ok(fresh)
    }

    async fn fetch_page(&self) -> Result<GalleryPage> {
        let token = self.credentials.access_token(&self.client).await?;
        let resp = self
            .client
            .get(format!("{}/gallery/all", self.config.api_base))
            .bearer_auth(token.expose_secret())
            .query(&[
                ("username", self.config.username.clone()),
                ("limit", self.config.page_size.to_string()),
            ])
            .send()
            .await?;

        let status = resp.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            self.credentials.invalidate().await;
        }
        if !status.is_success() {
            return Err(Error::Status {
                what: "gallery fetch",
                status: status.as_u16(),
            });
        }
        Ok(resp.json().await?)
    }

    /// Run poll cycles until [`SourcePoller::stop`] is requested.
    ///
    /// Each newly discovered item is handed to `on_new`, then the watermark is
    /// advanced to its token before the next item is handled. A failed cycle
    /// is logged and retried after the normal interval.
    pub async fn start(&self, state: Arc<dyn PollerState>, on_new: NewItemFn) {
        self.stop_requested.store(false, Ordering::SeqCst);
        self.running.store(true, Ordering::SeqCst);
        info!(username = %self.config.username, "gallery poller started");

        while !self.stop_requested.load(Ordering::SeqCst) {
            self.run_cycle(state.as_ref(), &on_new).await;

            let interval = state
                .poll_interval()
                .await
                .unwrap_or(self.config.poll_interval);
            // Registered before the flag check so a stop in between still wakes us.
            let woken = self.wake.notified();
            tokio::pin!(woken);
            woken.as_mut().enable();
            if self.stop_requested.load(Ordering::SeqCst) {
                break;
            }
            tokio::select! {
                () = tokio::time::sleep(interval) => {},
                () = woken => {},
            }
        }

        self.running.store(false, Ordering::SeqCst);
        info!(username = %self.config.username, "gallery poller stopped");
    }

    /// Request the loop to exit. Observed after the current cycle.
    pub fn stop(&self) {
        info!(username = %self.config.username, "stopping gallery poller");
        self.stop_requested.store(true, Ordering::SeqCst);
        self.wake.notify_waiters();
    }

    async fn run_cycle(&self, state: &dyn PollerState, on_new: &NewItemFn) {
        let username = self.config.username.as_str();
        #[cfg(feature = "metrics")]
        counter!(poller_metrics::POLLS_TOTAL, labels::SOURCE => username.to_string())
            .increment(1);

        let outcome = async {
            let watermark = state.load_watermark(username).await?;
            let fresh = self.poll_once(watermark.as_ref()).await?;
            if !fresh.is_empty() {
                info!(username, count = fresh.len(), "new gallery items");
            }
            #[cfg(feature = "metrics")]
            counter!(poller_metrics::ITEMS_DISCOVERED_TOTAL, labels::SOURCE => username.to_string())
                .increment(fresh.len() as u64);

            for Discovered { token, item } in fresh {
                debug!(username, external_id = %item.external_id, "delivering gallery item");
                on_new(item).await;
                if let Some(token) = token {
                    state.advance_watermark(username, &token).await?;
                }
            }
            Ok::<(), Error>(())
        }
        .await;

        if let Err(e) = outcome {
            warn!(username, error = %e, "poll cycle failed");
            #[cfg(feature = "metrics")]
            counter!(poller_metrics::POLL_ERRORS_TOTAL, labels::SOURCE => username.to_string())
                .increment(1);
        }
    }
}

impl Stop for SourcePoller {
    fn request_stop(&self) {
        self.stop();
    }
}

impl ServiceHandle for SourcePoller {
    fn stopper(&self) -> Option<&dyn Stop> {
        Some(self)
    }

    fn can_start(&self) -> bool {
        true
    }
}
