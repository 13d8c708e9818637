//! Wiring for `pixlive run`.

use std::{sync::Arc, time::Duration};

use {
    anyhow::Result,
    async_trait::async_trait,
    pixlive_common::{
        events::{self, EventSender, PipelineEvent},
        traits::MediaFetcher,
        types::MediaRef,
    },
    pixlive_config::PixliveConfig,
    pixlive_deviantart::{NewItemFn, PollerConfig, PollerState, SourcePoller},
    pixlive_media::BlurRedactor,
    pixlive_metrics::{MetricsRecorderConfig, init_metrics},
    pixlive_patreon::PatreonClient,
    pixlive_routing::{Dispatcher, RoutingEngine},
    pixlive_services::{AdminConsole, ServiceManager},
    pixlive_state::StateStore,
    pixlive_telegram::{AdapterConfig, ChannelListener, TelegramMedia, adapter::build_bot},
    secrecy::ExposeSecret,
    tokio::{sync::oneshot, task::JoinSet},
    tokio_util::sync::CancellationToken,
    tracing::{info, warn},
};

use crate::{pipeline::Pipeline, sink::WebhookSink};

/// How long stopped pollers get to finish their current cycle on shutdown.
const POLLER_SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Media fetcher used when no channel bot is configured.
struct NoChannelMedia;

#[async_trait]
impl MediaFetcher for NoChannelMedia {
    async fn fetch(&self, _media: &MediaRef) -> pixlive_common::Result<Vec<u8>> {
        Err(pixlive_common::Error::unavailable("telegram is not configured"))
    }
}

/// Forward polled items to the pipeline and wait until each is routed.
///
/// If the pipeline is gone the future never completes, so the poller cannot
/// advance its watermark past an item nobody delivered.
fn forward_items(events: EventSender) -> NewItemFn {
    Arc::new(move |item| {
        let events = events.clone();
        Box::pin(async move {
            let (ack, acked) = oneshot::channel();
            let sent = events
                .send(PipelineEvent::NewItem {
                    item,
                    ack: Some(ack),
                })
                .is_ok();
            if !sent || acked.await.is_err() {
                std::future::pending::<()>().await;
            }
        })
    })
}

pub async fn run(config: PixliveConfig) -> Result<()> {
    let config = Arc::new(config);

    let metrics = init_metrics(MetricsRecorderConfig {
        enabled: config.metrics.enabled,
        listen: config.metrics.listen,
    })?;

    let state = Arc::new(StateStore::open(&config.state.path).await?);
    info!(path = %state.path().display(), "state store opened");

    let services = Arc::new(ServiceManager::new());
    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(60))
        .build()?;
    let cancel = CancellationToken::new();
    let (events, rx) = events::channel();

    let bot = if config.telegram.token.expose_secret().is_empty() {
        info!("telegram token not set, channel listener disabled");
        None
    } else {
        Some(build_bot(&config.telegram.token)?)
    };

    let media: Arc<dyn MediaFetcher> = match &bot {
        Some(bot) => Arc::new(TelegramMedia::new(bot.clone(), http.clone())),
        None => Arc::new(NoChannelMedia),
    };
    let titles = Arc::new(PatreonClient::new(
        http.clone(),
        config.patreon.api_base.clone(),
        Some(config.patreon.access_token.clone()),
    ));
    let engine = Arc::new(RoutingEngine::new(
        config.routing.clone(),
        titles,
        Arc::new(BlurRedactor::new()),
        media,
    ));
    let sink = Arc::new(WebhookSink::new(http.clone(), &config.destinations));
    let dispatcher = Arc::new(Dispatcher::new(
        Arc::clone(&state),
        sink,
        config.state.dedup_capacity,
    ));

    let listener = ChannelListener::new(
        Duration::from_secs(config.telegram.debounce_secs),
        events.clone(),
    );
    let pipeline = Pipeline::new(
        listener,
        engine,
        dispatcher,
        config.deviantart.destination.clone(),
    );
    let pipeline_task = tokio::spawn(pipeline.run(rx, cancel.clone()));

    let mut pollers = Vec::new();
    let mut poller_tasks = JoinSet::new();
    let da = &config.deviantart;
    if da.has_credentials() {
        for username in &da.usernames {
            let poller = Arc::new(SourcePoller::new(
                PollerConfig {
                    username: username.clone(),
                    client_id: da.client_id.clone(),
                    client_secret: da.client_secret.clone(),
                    api_base: da.api_base.clone(),
                    token_url: da.token_url.clone(),
                    page_size: da.page_size,
                    poll_interval: Duration::from_secs(da.poll_interval_secs),
                },
                http.clone(),
            ));
            services
                .register(poller.service_name(), poller.clone())
                .await;

            let poller_state: Arc<dyn PollerState> = state.clone();
            let on_new = forward_items(events.clone());
            let task_poller = Arc::clone(&poller);
            poller_tasks.spawn(async move { task_poller.start(poller_state, on_new).await });
            pollers.push(poller);
        }
    } else if !da.usernames.is_empty() {
        warn!("deviantart credentials missing, gallery pollers disabled");
    }

    let telegram_task = match bot {
        Some(bot) => {
            let password = config.telegram.admin_password.clone();
            let console = (!password.expose_secret().is_empty())
                .then(|| Arc::new(AdminConsole::new(state.clone(), services.clone(), password)));
            let adapter = AdapterConfig {
                source_channel_id: config.telegram.source_channel_id,
            };
            Some(
                pixlive_telegram::start_polling(bot, adapter, events.clone(), console, cancel.clone())
                    .await?,
            )
        },
        None => None,
    };
    drop(events);

    info!(pollers = pollers.len(), telegram = telegram_task.is_some(), "pixlive running");
    tokio::signal::ctrl_c().await?;
    info!("shutdown requested");

    cancel.cancel();
    for poller in &pollers {
        poller.stop();
    }
    let drained = tokio::time::timeout(POLLER_SHUTDOWN_GRACE, async {
        while poller_tasks.join_next().await.is_some() {}
    })
    .await;
    if drained.is_err() {
        warn!("pollers still busy after grace period, aborting them");
        poller_tasks.shutdown().await;
    }

    pipeline_task.await?;
    if let Some(task) = telegram_task {
        task.await?;
    }
    let snapshot = metrics.render();
    if !snapshot.is_empty() {
        info!(metrics = %snapshot, "final metrics snapshot");
    }
    info!("pixlive stopped");
    Ok(())
}
