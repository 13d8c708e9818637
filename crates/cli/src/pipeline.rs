//! The task that owns the channel listener and turns pipeline events into
//! routed jobs.
//!
//! Buffering and flush decisions happen on this task only. Routing a flushed
//! submission or a polled item (downloads, blur, delivery) runs on a spawned
//! task so a slow destination never delays album timers.

use std::sync::Arc;

use {
    pixlive_common::{
        events::{EventReceiver, PipelineEvent},
        types::{Submission, WorkItem},
    },
    pixlive_routing::{Dispatcher, RoutingEngine},
    pixlive_telegram::ChannelListener,
    tokio::{sync::oneshot, task::JoinSet},
    tokio_util::sync::CancellationToken,
    tracing::{debug, info, warn},
};

pub struct Pipeline {
    listener: ChannelListener,
    engine: Arc<RoutingEngine>,
    dispatcher: Arc<Dispatcher>,
    gallery_destination: String,
    routes: JoinSet<()>,
}

impl Pipeline {
    pub fn new(
        listener: ChannelListener,
        engine: Arc<RoutingEngine>,
        dispatcher: Arc<Dispatcher>,
        gallery_destination: impl Into<String>,
    ) -> Self {
        Self {
            listener,
            engine,
            dispatcher,
            gallery_destination: gallery_destination.into(),
            routes: JoinSet::new(),
        }
    }

    /// Process events until `cancel` fires or every sender is gone. On exit,
    /// pending album timers are cancelled and in-flight routing is aborted.
    pub async fn run(mut self, mut events: EventReceiver, cancel: CancellationToken) {
        info!("pipeline started");
        loop {
            tokio::select! {
                () = cancel.cancelled() => break,
                Some(joined) = self.routes.join_next(), if !self.routes.is_empty() => {
                    if let Err(e) = joined
                        && e.is_panic()
                    {
                        warn!(error = %e, "routing task panicked");
                    }
                },
                event = events.recv() => match event {
                    Some(event) => self.handle(event),
                    None => break,
                },
            }
        }

        let pending = self.listener.pending_groups();
        self.listener.shutdown();
        let in_flight = self.routes.len();
        self.routes.shutdown().await;
        info!(pending_groups = pending, in_flight, "pipeline stopped");
    }

    fn handle(&mut self, event: PipelineEvent) {
        debug!(kind = %event.kind(), "pipeline event");
        match event {
            PipelineEvent::NewItem { item, ack } => self.spawn_item(item, ack),
            PipelineEvent::RawPart(part) => self.listener.on_raw_part(part),
            PipelineEvent::FlushDue { group_id } => {
                if let Some(sub) = self.listener.flush(&group_id) {
                    self.spawn_submission(sub);
                }
            },
        }
    }

    fn spawn_submission(&mut self, sub: Submission) {
        let engine = Arc::clone(&self.engine);
        let dispatcher = Arc::clone(&self.dispatcher);
        self.routes.spawn(async move {
            let jobs = engine.route_submission(&sub).await;
            let total = jobs.len();
            let delivered = dispatcher.dispatch_all(jobs).await;
            info!(
                reference_id = %sub.reference_id,
                jobs = total,
                delivered,
                "submission routed"
            );
        });
    }

    fn spawn_item(&mut self, item: WorkItem, ack: Option<oneshot::Sender<()>>) {
        let dispatcher = Arc::clone(&self.dispatcher);
        let destination = self.gallery_destination.clone();
        self.routes.spawn(async move {
            let style = dispatcher.display_style().await;
            match RoutingEngine::gallery_job(&item, &destination, style) {
                Some(job) => {
                    dispatcher.dispatch_all(vec![job]).await;
                },
                None => debug!(source = %item.source_id, "no gallery destination configured"),
            }
            if let Some(ack) = ack
                && ack.send(()).is_err()
            {
                debug!(source = %item.source_id, "item acknowledged after poller went away");
            }
        });
    }
}
