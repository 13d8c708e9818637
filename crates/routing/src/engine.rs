use std::sync::Arc;

use {
    pixlive_common::{
        traits::{MediaFetcher, Redactor, TitleLookup},
        types::{
            DispatchJob, DisplayStyle, FlowKind, JobPayload, MediaFile, RouteTarget, Submission,
            WorkItem, WorkMedia,
        },
    },
    pixlive_config::RoutingConfig,
    tracing::{debug, info, warn},
};

#[cfg(feature = "metrics")]
use pixlive_metrics::{counter, routing as routing_metrics};

use crate::rules::{announcement_targets, collection_targets};

pub fn collection_description(title: &str, url: &str) -> String {
    format!("✨ **New Collection Dropped!** ✨\n\n**{title}**\n\n🔥 **Check it out here:** <{url}>")
}

/// Builds dispatch jobs. Holds no state; delivery and dedup happen in the
/// [`crate::Dispatcher`].
pub struct RoutingEngine {
    config: RoutingConfig,
    titles: Arc<dyn TitleLookup>,
    redactor: Arc<dyn Redactor>,
    media: Arc<dyn MediaFetcher>,
}

impl RoutingEngine {
    pub fn new(
        config: RoutingConfig,
        titles: Arc<dyn TitleLookup>,
        redactor: Arc<dyn Redactor>,
        media: Arc<dyn MediaFetcher>,
    ) -> Self {
        Self {
            config,
            titles,
            redactor,
            media,
        }
    }

    /// Title for `reference_id`, or the placeholder when the lookup fails or
    /// comes back empty.
    pub async fn resolve_title(&self, reference_id: &str) -> String {
        match self.titles.title(reference_id).await {
            Ok(Some(title)) if !title.trim().is_empty() => title,
            Ok(_) => self.config.placeholder_title.clone(),
            Err(e) => {
                warn!(reference_id, error = %e, "title lookup failed, using placeholder");
                self.config.placeholder_title.clone()
            },
        }
    }

    /// Announcement and collection jobs for a flushed submission.
    pub async fn route_submission(&self, sub: &Submission) -> Vec<DispatchJob> {
        let Some(first_ref) = sub.media.first() else {
            debug!(group_id = %sub.group_id, "submission without media");
            return Vec::new();
        };

        let title = self.resolve_title(&sub.reference_id).await;
        let announcements = announcement_targets(&sub.tags, &self.config.announcements);
        let collections = collection_targets(&sub.tags, &self.config.collections);

        let first = match self.media.fetch(first_ref).await {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                warn!(
                    reference_id = %sub.reference_id,
                    error = %e,
                    "representative image download failed, skipping announcements"
                );
                self.count_media_failure();
                None
            },
        };

        let mut jobs = Vec::new();
        if let Some(image) = first.as_deref() {
            jobs.extend(
                self.announcement_jobs(sub, &title, image, &announcements)
                    .await,
            );
        }

        if !collections.is_empty() {
            let files = self.collection_files(sub, first).await;
            if files.is_empty() {
                warn!(reference_id = %sub.reference_id, "no collection image could be downloaded");
            } else {
                let description = collection_description(&title, &sub.reference_url);
                for destination in collections {
                    info!(
                        reference_id = %sub.reference_id,
                        destination = %destination,
                        images = files.len(),
                        "collection routed"
                    );
                    jobs.push(DispatchJob {
                        flow: FlowKind::Collection,
                        destination,
                        title: title.clone(),
                        reference_url: sub.reference_url.clone(),
                        payload: JobPayload::Batch {
                            files: files.clone(),
                            description: description.clone(),
                        },
                    });
                }
            }
        }
        jobs
    }

    /// One preview job per target. The blur runs at most once; if it fails,
    /// every target that needed it is dropped.
    async fn announcement_jobs(
        &self,
        sub: &Submission,
        title: &str,
        image: &[u8],
        targets: &[RouteTarget],
    ) -> Vec<DispatchJob> {
        let redacted = if targets.iter().any(|t| t.redact) {
            match self.redactor.redact(image, self.config.blur_radius).await {
                Ok(bytes) => Some(bytes),
                Err(e) => {
                    warn!(
                        reference_id = %sub.reference_id,
                        error = %e,
                        "redaction failed, dropping blurred announcements"
                    );
                    #[cfg(feature = "metrics")]
                    counter!(routing_metrics::REDACTION_FAILURES_TOTAL).increment(1);
                    None
                },
            }
        } else {
            None
        };

        let filename = format!("preview_{}.jpg", sub.reference_id);
        targets
            .iter()
            .filter_map(|target| {
                let bytes = if target.redact {
                    redacted.clone()?
                } else {
                    image.to_vec()
                };
                info!(
                    reference_id = %sub.reference_id,
                    destination = %target.destination,
                    redact = target.redact,
                    "announcement routed"
                );
                Some(DispatchJob {
                    flow: FlowKind::Announcement,
                    destination: target.destination.clone(),
                    title: title.to_string(),
                    reference_url: sub.reference_url.clone(),
                    payload: JobPayload::Image(MediaFile::new(filename.clone(), bytes)),
                })
            })
            .collect()
    }

    /// Every image of the submission in order, reusing the already fetched
    /// first image. Images that fail to download are skipped; the index in
    /// the file name stays the position in the album.
    async fn collection_files(&self, sub: &Submission, first: Option<Vec<u8>>) -> Vec<MediaFile> {
        let mut files = Vec::with_capacity(sub.media.len());
        let mut first = first;
        for (i, media) in sub.media.iter().enumerate() {
            let fetched = match (i, first.take()) {
                (0, Some(bytes)) => Ok(bytes),
                _ => self.media.fetch(media).await,
            };
            match fetched {
                Ok(bytes) => files.push(MediaFile::new(format!("img_{i}.jpg"), bytes)),
                Err(e) => {
                    warn!(
                        reference_id = %sub.reference_id,
                        index = i,
                        error = %e,
                        "collection image download failed, skipping it"
                    );
                    self.count_media_failure();
                },
            }
        }
        files
    }

    /// The gallery job for a polled item, or `None` when no gallery
    /// destination is configured.
    pub fn gallery_job(item: &WorkItem, destination: &str, style: DisplayStyle) -> Option<DispatchJob> {
        if destination.is_empty() {
            return None;
        }
        let thumbnail_url = match &item.media {
            WorkMedia::Thumbnail(url) => Some(url.clone()),
            WorkMedia::None | WorkMedia::Files(_) => None,
        };
        Some(DispatchJob {
            flow: FlowKind::Gallery,
            destination: destination.to_string(),
            title: item.title.clone(),
            reference_url: item.reference_url.clone(),
            payload: JobPayload::Embed {
                description: format!("New post from {}", item.source_id),
                thumbnail_url,
                style,
            },
        })
    }

    fn count_media_failure(&self) {
        #[cfg(feature = "metrics")]
        counter!(routing_metrics::MEDIA_FAILURES_TOTAL).increment(1);
    }
}
