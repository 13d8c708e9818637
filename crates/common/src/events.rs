//! The fixed set of pipeline events exchanged between the ingestion tasks and
//! the task that owns the channel listener.

use std::fmt;

use tokio::sync::{mpsc, oneshot};

use crate::types::{RawPart, WorkItem};

/// Discriminant of a [`PipelineEvent`], used for logging and metrics labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    NewItem,
    RawPart,
    FlushDue,
}

impl EventKind {
    /// All variants, for iteration.
    pub const ALL: &'static [EventKind] = &[Self::NewItem, Self::RawPart, Self::FlushDue];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NewItem => "new_item",
            Self::RawPart => "raw_part",
            Self::FlushDue => "flush_due",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug)]
pub enum PipelineEvent {
    /// A poller discovered an item newer than its watermark. `ack` fires once
    /// the item has been routed, so the poller can persist its watermark after
    /// delivery.
    NewItem {
        item: WorkItem,
        ack: Option<oneshot::Sender<()>>,
    },
    /// One inbound message of a possibly multi-part submission.
    RawPart(RawPart),
    /// The debounce window of an album elapsed.
    FlushDue { group_id: String },
}

impl PipelineEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::NewItem { .. } => EventKind::NewItem,
            Self::RawPart(_) => EventKind::RawPart,
            Self::FlushDue { .. } => EventKind::FlushDue,
        }
    }
}

/// Sender half handed to every producer at startup.
pub type EventSender = mpsc::UnboundedSender<PipelineEvent>;

/// Receiver half owned by the pipeline task.
pub type EventReceiver = mpsc::UnboundedReceiver<PipelineEvent>;

pub fn channel() -> (EventSender, EventReceiver) {
    mpsc::unbounded_channel()
}

#[cfg(test)]
mod tests {
    use {super::*, crate::types::MediaRef};

    #[test]
    fn kinds_are_distinct() {
        let names: std::collections::HashSet<_> =
            EventKind::ALL.iter().map(EventKind::as_str).collect();
        assert_eq!(names.len(), EventKind::ALL.len());
    }

    #[test]
    fn event_reports_its_kind() {
        let part = PipelineEvent::RawPart(RawPart {
            group_id: None,
            caption: String::new(),
            seq: 1,
            media: MediaRef::new("f1"),
        });
        assert_eq!(part.kind(), EventKind::RawPart);
        let flush = PipelineEvent::FlushDue {
            group_id: "g".into(),
        };
        assert_eq!(flush.kind().to_string(), "flush_due");
    }
}
