//! Data model shared by the pollers, the channel listener and the router.

use std::{cmp::Ordering, collections::BTreeSet, fmt};

use {
    chrono::{DateTime, Utc},
    serde::{Deserialize, Serialize},
};

// ── Watermark ───────────────────────────────────────────────────────────────

/// Opaque, totally-ordered cursor token marking the newest item a poller has
/// processed.
///
/// Integer tokens compare numerically (a unix timestamp `"99"` is older than
/// `"100"`) and order before every non-integer token. Non-integer tokens
/// compare as plain strings.
#[derive(Debug, Clone, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Watermark(String);

impl Watermark {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }

    fn numeric(&self) -> Option<i128> {
        self.0.trim().parse().ok()
    }
}

impl PartialEq for Watermark {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Ord for Watermark {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.numeric(), other.numeric()) {
            (Some(a), Some(b)) => a.cmp(&b),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => self.0.cmp(&other.0),
        }
    }
}

impl PartialOrd for Watermark {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Watermark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Watermark {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

// ── Media ───────────────────────────────────────────────────────────────────

/// A downloaded image ready to be attached to a delivery.
#[derive(Clone, PartialEq, Eq)]
pub struct MediaFile {
    pub filename: String,
    pub bytes: Vec<u8>,
}

impl MediaFile {
    pub fn new(filename: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            bytes,
        }
    }
}

impl fmt::Debug for MediaFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediaFile")
            .field("filename", &self.filename)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Platform reference to an image that has not been downloaded yet
/// (a Telegram `file_id`, for instance).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MediaRef(pub String);

impl MediaRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

/// Media carried by a [`WorkItem`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum WorkMedia {
    #[default]
    None,
    /// Remote thumbnail the destination renders itself.
    Thumbnail(String),
    /// Images already downloaded, in display order.
    Files(Vec<MediaFile>),
}

// ── Work items ──────────────────────────────────────────────────────────────

/// A unit of content discovered by a source.
#[derive(Debug, Clone)]
pub struct WorkItem {
    pub source_id: String,
    pub external_id: String,
    pub title: String,
    pub reference_url: String,
    pub media: WorkMedia,
    pub tags: BTreeSet<String>,
    pub captured_at: DateTime<Utc>,
}

/// One inbound message of a (possibly multi-part) submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawPart {
    /// Parts sharing a group id belong to the same album.
    pub group_id: Option<String>,
    pub caption: String,
    /// Platform message sequence number, used to restore album order.
    pub seq: i64,
    pub media: MediaRef,
}

/// A flushed album whose canonical caption carried a reference link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub group_id: String,
    pub reference_id: String,
    pub reference_url: String,
    pub caption: String,
    pub tags: BTreeSet<String>,
    /// Media of every buffered part, in sequence order.
    pub media: Vec<MediaRef>,
}

impl Submission {
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }
}

// ── Dispatch ────────────────────────────────────────────────────────────────

/// A destination selected by a routing rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteTarget {
    pub destination: String,
    pub redact: bool,
}

impl RouteTarget {
    pub fn new(destination: impl Into<String>, redact: bool) -> Self {
        Self {
            destination: destination.into(),
            redact,
        }
    }
}

/// Which flow produced a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowKind {
    /// One representative preview image, possibly redacted.
    Announcement,
    /// Every image of the album, never redacted.
    Collection,
    /// A polled gallery post rendered by the destination.
    Gallery,
}

impl fmt::Display for FlowKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Announcement => "announcement",
            Self::Collection => "collection",
            Self::Gallery => "gallery",
        })
    }
}

/// How gallery posts are rendered. Live-tunable through the state store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayStyle {
    /// Rich embed with title, link and image.
    #[default]
    Embed,
    /// Plain one-line link.
    Compact,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobPayload {
    /// A single preview image.
    Image(MediaFile),
    Batch {
        files: Vec<MediaFile>,
        description: String,
    },
    Embed {
        description: String,
        thumbnail_url: Option<String>,
        style: DisplayStyle,
    },
}

/// A single delivery request handed to a [`crate::traits::Sink`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchJob {
    pub flow: FlowKind,
    pub destination: String,
    pub title: String,
    pub reference_url: String,
    pub payload: JobPayload,
}
