//! Well-known state keys.

/// Counter of jobs handed to the sink.
pub const POSTS_SENT: &str = "analytics:posts_sent";

/// Live override of the gallery poll interval, in seconds.
pub const POLL_INTERVAL_SECS: &str = "settings:poll_interval_secs";

/// Live gallery display style (`embed` or `compact`).
pub const DISPLAY_STYLE: &str = "settings:display_style";

/// Telegram user ids allowed to run admin commands.
pub const AUTH_USERS: &str = "tg:auth_users";

/// Watermark key for one gallery source.
pub fn watermark(source: &str) -> String {
    format!("{source}:last_timestamp")
}

/// Delivered reference urls for one flow into one destination.
///
/// The flows of one submission share a reference url, so the record is kept
/// per flow.
pub fn sent_posts(flow: &str, destination: &str) -> String {
    format!("sent_posts:{flow}:{destination}")
}
