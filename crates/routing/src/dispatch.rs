use std::sync::Arc;

use {
    pixlive_common::{
        traits::Sink,
        types::{DispatchJob, DisplayStyle},
    },
    pixlive_state::{StateStore, keys},
    serde_json::Value,
    tracing::{debug, warn},
};

#[cfg(feature = "metrics")]
use pixlive_metrics::{counter, labels, routing as routing_metrics};

use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Handed to the sink.
    Delivered,
    /// The destination already received this reference url in this flow.
    Duplicate,
}

/// Dedup guard and analytics in front of the [`Sink`].
pub struct Dispatcher {
    state: Arc<StateStore>,
    sink: Arc<dyn Sink>,
    dedup_capacity: usize,
}

impl Dispatcher {
    pub fn new(state: Arc<StateStore>, sink: Arc<dyn Sink>, dedup_capacity: usize) -> Self {
        Self {
            state,
            sink,
            dedup_capacity: dedup_capacity.max(1),
        }
    }

    /// Live gallery display style.
    pub async fn display_style(&self) -> DisplayStyle {
        self.state
            .get(keys::DISPLAY_STYLE, DisplayStyle::default())
            .await
    }

    /// Record the job's reference url for its destination and deliver it,
    /// unless the url was already recorded there.
    ///
    /// Urls that are not links (the `#` placeholder) are not tracked.
    pub async fn dispatch(&self, job: DispatchJob) -> Result<DispatchOutcome> {
        if is_trackable(&job.reference_url) && !self.mark_sent(&job).await? {
            debug!(
                destination = %job.destination,
                url = %job.reference_url,
                flow = %job.flow,
                "already delivered, skipping"
            );
            #[cfg(feature = "metrics")]
            counter!(routing_metrics::JOBS_DEDUPLICATED_TOTAL, labels::FLOW => job.flow.to_string())
                .increment(1);
            return Ok(DispatchOutcome::Duplicate);
        }

        #[cfg(feature = "metrics")]
        let flow = job.flow.to_string();
        self.sink.deliver(job).await;
        self.state.increment(keys::POSTS_SENT, 1).await?;
        #[cfg(feature = "metrics")]
        counter!(routing_metrics::JOBS_DISPATCHED_TOTAL, labels::FLOW => flow).increment(1);
        Ok(DispatchOutcome::Delivered)
    }

    /// Dispatch every job, logging failures. Returns how many were delivered.
    pub async fn dispatch_all(&self, jobs: Vec<DispatchJob>) -> usize {
        let mut delivered = 0;
        for job in jobs {
            let destination = job.destination.clone();
            match self.dispatch(job).await {
                Ok(DispatchOutcome::Delivered) => delivered += 1,
                Ok(DispatchOutcome::Duplicate) => {},
                Err(e) => warn!(destination = %destination, error = %e, "dispatch failed"),
            }
        }
        delivered
    }

    /// Append the url to the record of the job's flow and destination in one
    /// atomic update. Returns `false` when it was already present.
    async fn mark_sent(&self, job: &DispatchJob) -> Result<bool> {
        let url = job.reference_url.as_str();
        let key = keys::sent_posts(&job.flow.to_string(), &job.destination);
        let capacity = self.dedup_capacity;
        let mut fresh = false;
        self.state
            .update(&key, |current| {
                let mut sent: Vec<Value> = current
                    .and_then(Value::as_array)
                    .cloned()
                    .unwrap_or_default();
                if sent.iter().any(|v| v.as_str() == Some(url)) {
                    return Value::Array(sent);
                }
                fresh = true;
                sent.push(Value::from(url));
                let overflow = sent.len().saturating_sub(capacity);
                sent.drain(..overflow);
                Value::Array(sent)
            })
            .await?;
        Ok(fresh)
    }
}

fn is_trackable(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}
