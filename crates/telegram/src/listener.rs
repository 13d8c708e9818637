//! Album buffering and debounce.
//!
//! Parts sharing a group id accumulate until one flush fires exactly one
//! debounce window after the first part; later parts never re-arm it. A part
//! without a group id is its own group and is flushed with no delay.
//!
//! The listener is owned by a single task. Timers only send
//! [`PipelineEvent::FlushDue`] back to that task, which then calls
//! [`ChannelListener::flush`].

use std::{collections::HashMap, time::Duration};

use {
    pixlive_common::{
        events::{EventSender, PipelineEvent},
        types::{RawPart, Submission},
    },
    tokio::task::JoinHandle,
    tracing::{debug, info},
};

#[cfg(feature = "metrics")]
use pixlive_metrics::{counter, gauge, listener as listener_metrics};

use crate::caption::{extract_tags, find_reference};

/// How long an album stays open after its first part.
pub const DEBOUNCE_WINDOW: Duration = Duration::from_secs(4);

struct AlbumBuffer {
    parts: Vec<RawPart>,
    timer: Option<JoinHandle<()>>,
}

pub struct ChannelListener {
    window: Duration,
    events: EventSender,
    buffers: HashMap<String, AlbumBuffer>,
}

impl ChannelListener {
    pub fn new(window: Duration, events: EventSender) -> Self {
        Self {
            window,
            events,
            buffers: HashMap::new(),
        }
    }

    /// Buffer one inbound part, arming the flush timer if it opens a group.
    pub fn on_raw_part(&mut self, part: RawPart) {
        #[cfg(feature = "metrics")]
        counter!(listener_metrics::PARTS_RECEIVED_TOTAL).increment(1);

        let Some(group_id) = part.group_id.clone() else {
            let group_id = format!("single_{}", part.seq);
            self.buffers.insert(group_id.clone(), AlbumBuffer {
                parts: vec![part],
                timer: None,
            });
            self.report_pending();
            self.send_flush(group_id);
            return;
        };

        if let Some(buffer) = self.buffers.get_mut(&group_id) {
            buffer.parts.push(part);
            debug!(group_id = %group_id, parts = buffer.parts.len(), "album part buffered");
            return;
        }

        let events = self.events.clone();
        let window = self.window;
        let deadline = tokio::time::Instant::now() + window;
        let timer_group = group_id.clone();
        let timer = tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            if events
                .send(PipelineEvent::FlushDue {
                    group_id: timer_group,
                })
                .is_err()
            {
                debug!("pipeline closed before album flush");
            }
        });
        debug!(group_id = %group_id, window_ms = window.as_millis() as u64, "album opened");
        self.buffers.insert(group_id, AlbumBuffer {
            parts: vec![part],
            timer: Some(timer),
        });
        self.report_pending();
    }

    /// Close a group. Returns a submission when a caption carries a reference
    /// link; otherwise the group is dropped. The buffer is removed either way.
    pub fn flush(&mut self, group_id: &str) -> Option<Submission> {
        let mut buffer = self.buffers.remove(group_id)?;
        self.report_pending();
        if let Some(timer) = buffer.timer.take() {
            timer.abort();
        }

        buffer.parts.sort_by_key(|p| p.seq);
        let Some((caption, link)) = buffer
            .parts
            .iter()
            .find_map(|p| find_reference(&p.caption).map(|link| (p.caption.clone(), link)))
        else {
            debug!(group_id, parts = buffer.parts.len(), "album without reference link discarded");
            #[cfg(feature = "metrics")]
            counter!(listener_metrics::GROUPS_DISCARDED_TOTAL).increment(1);
            return None;
        };

        let tags = extract_tags(&caption);
        info!(
            group_id,
            reference_id = %link.id,
            parts = buffer.parts.len(),
            tags = ?tags,
            "album flushed"
        );
        #[cfg(feature = "metrics")]
        counter!(listener_metrics::GROUPS_FLUSHED_TOTAL).increment(1);

        Some(Submission {
            group_id: group_id.to_string(),
            reference_id: link.id,
            reference_url: link.url,
            caption,
            tags,
            media: buffer.parts.into_iter().map(|p| p.media).collect(),
        })
    }

    /// Number of groups still buffered.
    pub fn pending_groups(&self) -> usize {
        self.buffers.len()
    }

    /// Cancel every armed timer and drop all buffered parts.
    pub fn shutdown(&mut self) {
        for (_, buffer) in self.buffers.drain() {
            if let Some(timer) = buffer.timer {
                timer.abort();
            }
        }
        self.report_pending();
    }

    fn send_flush(&self, group_id: String) {
        if self
            .events
            .send(PipelineEvent::FlushDue { group_id })
            .is_err()
        {
            debug!("pipeline closed before flush");
        }
    }

    fn report_pending(&self) {
        #[cfg(feature = "metrics")]
        gauge!(listener_metrics::GROUPS_PENDING).set(self.buffers.len() as f64);
    }
}

impl Drop for ChannelListener {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        pixlive_common::{
            events::{self, EventReceiver},
            types::MediaRef,
        },
        tokio::time::{Instant, advance, timeout},
    };

    fn part(group: Option<&str>, seq: i64, caption: &str) -> RawPart {
        RawPart {
            group_id: group.map(String::from),
            caption: caption.to_string(),
            seq,
            media: MediaRef::new(format!("file-{seq}")),
        }
    }

    async fn next_flush(rx: &mut EventReceiver) -> String {
        match rx.recv().await.unwrap() {
            PipelineEvent::FlushDue { group_id } => group_id,
            other => panic!("unexpected event {other:?}"),
        }
    }

    async fn assert_quiet(rx: &mut EventReceiver) {
        assert!(timeout(Duration::from_secs(60), rx.recv()).await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn burst_flushes_once_timed_from_first_part() {
        let (tx, mut rx) = events::channel();
        let mut listener = ChannelListener::new(DEBOUNCE_WINDOW, tx);
        let start = Instant::now();

        listener.on_raw_part(part(Some("g1"), 10, ""));
        advance(Duration::from_secs(1)).await;
        listener.on_raw_part(part(Some("g1"), 11, ""));
        advance(Duration::from_secs(2)).await;
        listener.on_raw_part(part(Some("g1"), 12, "https://patreon.com/posts/5"));

        assert_eq!(next_flush(&mut rx).await, "g1");
        let elapsed = start.elapsed();
        assert!(elapsed >= DEBOUNCE_WINDOW, "{elapsed:?}");
        assert!(elapsed < DEBOUNCE_WINDOW + Duration::from_millis(100), "{elapsed:?}");
        assert_quiet(&mut rx).await;

        let sub = listener.flush("g1").unwrap();
        assert_eq!(sub.media.len(), 3);
        assert_eq!(listener.pending_groups(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn flush_sorts_parts_and_uses_first_matching_caption() {
        let (tx, _rx) = events::channel();
        let mut listener = ChannelListener::new(DEBOUNCE_WINDOW, tx);

        listener.on_raw_part(part(Some("g"), 3, "third https://www.patreon.com/posts/999 #nsfw"));
        listener.on_raw_part(part(Some("g"), 1, "no link here #sfw"));
        listener.on_raw_part(part(
            Some("g"),
            2,
            "see it here https://www.patreon.com/posts/art-123 #SFW #limited",
        ));

        let sub = listener.flush("g").unwrap();
        assert_eq!(sub.reference_id, "123");
        assert_eq!(sub.reference_url, "https://www.patreon.com/posts/art-123");
        assert!(sub.has_tag("sfw"));
        assert!(sub.has_tag("limited"));
        assert!(!sub.has_tag("nsfw"));
        assert_eq!(sub.media, vec![
            MediaRef::new("file-1"),
            MediaRef::new("file-2"),
            MediaRef::new("file-3"),
        ]);
    }

    #[tokio::test(start_paused = true)]
    async fn group_without_link_is_discarded_and_cleaned_up() {
        let (tx, mut rx) = events::channel();
        let mut listener = ChannelListener::new(DEBOUNCE_WINDOW, tx);
        listener.on_raw_part(part(Some("g"), 1, "nothing #sfw"));
        listener.on_raw_part(part(Some("g"), 2, ""));

        assert_eq!(next_flush(&mut rx).await, "g");
        assert!(listener.flush("g").is_none());
        assert_eq!(listener.pending_groups(), 0);
        assert!(listener.flush("g").is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn singleton_flushes_without_delay() {
        let (tx, mut rx) = events::channel();
        let mut listener = ChannelListener::new(DEBOUNCE_WINDOW, tx);
        let start = Instant::now();

        listener.on_raw_part(part(None, 77, "https://patreon.com/posts/1 #sfw"));
        assert_eq!(next_flush(&mut rx).await, "single_77");
        assert_eq!(start.elapsed(), Duration::ZERO);

        let sub = listener.flush("single_77").unwrap();
        assert_eq!(sub.group_id, "single_77");
        assert_eq!(sub.media, vec![MediaRef::new("file-77")]);
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_groups_flush_independently() {
        let (tx, mut rx) = events::channel();
        let mut listener = ChannelListener::new(DEBOUNCE_WINDOW, tx);

        listener.on_raw_part(part(Some("a"), 1, ""));
        advance(Duration::from_secs(2)).await;
        listener.on_raw_part(part(Some("b"), 2, ""));
        assert_eq!(listener.pending_groups(), 2);

        assert_eq!(next_flush(&mut rx).await, "a");
        assert_eq!(next_flush(&mut rx).await, "b");
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_cancels_pending_timers() {
        let (tx, mut rx) = events::channel();
        let mut listener = ChannelListener::new(DEBOUNCE_WINDOW, tx);
        listener.on_raw_part(part(Some("g"), 1, "https://patreon.com/posts/1"));
        listener.shutdown();

        assert_eq!(listener.pending_groups(), 0);
        assert_quiet(&mut rx).await;
    }
}
