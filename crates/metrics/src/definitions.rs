//! Metric name and label definitions.

/// Gallery poller metrics
pub mod poller {
    /// Total number of poll cycles started
    pub const POLLS_TOTAL: &str = "pixlive_polls_total";
    /// Poll cycles abandoned because of a fetch or auth failure
    pub const POLL_ERRORS_TOTAL: &str = "pixlive_poll_errors_total";
    /// Items newer than the stored watermark
    pub const ITEMS_DISCOVERED_TOTAL: &str = "pixlive_items_discovered_total";
    /// Access credentials fetched from the provider
    pub const TOKEN_REFRESHES_TOTAL: &str = "pixlive_token_refreshes_total";
}

/// Channel listener metrics
pub mod listener {
    /// Inbound parts received
    pub const PARTS_RECEIVED_TOTAL: &str = "pixlive_parts_received_total";
    /// Albums flushed with a reference link
    pub const GROUPS_FLUSHED_TOTAL: &str = "pixlive_groups_flushed_total";
    /// Albums discarded because no caption carried a reference link
    pub const GROUPS_DISCARDED_TOTAL: &str = "pixlive_groups_discarded_total";
    /// Albums currently buffered
    pub const GROUPS_PENDING: &str = "pixlive_groups_pending";
}

/// Routing and dispatch metrics
pub mod routing {
    /// Jobs handed to the sink
    pub const JOBS_DISPATCHED_TOTAL: &str = "pixlive_jobs_dispatched_total";
    /// Jobs skipped because the destination already received the url
    pub const JOBS_DEDUPLICATED_TOTAL: &str = "pixlive_jobs_deduplicated_total";
    /// Announcement jobs dropped because redaction failed
    pub const REDACTION_FAILURES_TOTAL: &str = "pixlive_redaction_failures_total";
    /// Album images that could not be downloaded
    pub const MEDIA_FAILURES_TOTAL: &str = "pixlive_media_failures_total";
}

/// Common label keys
pub mod labels {
    pub const SOURCE: &str = "source";
    pub const DESTINATION: &str = "destination";
    pub const FLOW: &str = "flow";
}
