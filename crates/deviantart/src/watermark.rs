use std::time::Duration;

use {
    async_trait::async_trait,
    pixlive_common::types::Watermark,
    pixlive_state::{StateStore, keys},
    serde_json::Value,
};

use crate::error::Result;

/// Persistent state a poller reads and advances each cycle.
#[async_trait]
pub trait PollerState: Send + Sync {
    async fn load_watermark(&self, source: &str) -> Result<Option<Watermark>>;

    /// Move the watermark forward to `token`. A token not newer than the
    /// stored one leaves it unchanged. Returns the stored watermark.
    async fn advance_watermark(&self, source: &str, token: &Watermark) -> Result<Watermark>;

    /// Live override of the poll interval.
    async fn poll_interval(&self) -> Option<Duration> {
        None
    }
}

fn as_watermark(value: &Value) -> Option<Watermark> {
    match value {
        Value::String(s) if !s.is_empty() => Some(Watermark::new(s.clone())),
        Value::Number(n) => Some(Watermark::new(n.to_string())),
        _ => None,
    }
}

#[async_trait]
impl PollerState for StateStore {
    async fn load_watermark(&self, source: &str) -> Result<Option<Watermark>> {
        Ok(self
            .get_value(&keys::watermark(source))
            .await
            .as_ref()
            .and_then(as_watermark))
    }

    async fn advance_watermark(&self, source: &str, token: &Watermark) -> Result<Watermark> {
        let stored = self
            .update(&keys::watermark(source), |cur| {
                match cur.and_then(as_watermark) {
                    Some(existing) if existing >= *token => Value::String(existing.into_inner()),
                    _ => Value::String(token.as_str().to_string()),
                }
            })
            .await?;
        Ok(as_watermark(&stored).unwrap_or_else(|| token.clone()))
    }

    async fn poll_interval(&self) -> Option<Duration> {
        let secs = self
            .get_value(keys::POLL_INTERVAL_SECS)
            .await?
            .as_u64()
            .filter(|s| *s > 0)?;
        Some(Duration::from_secs(secs))
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn watermark_never_moves_backward() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::open(dir.path().join("state.json")).await.unwrap();
        assert!(store.load_watermark("alice").await.unwrap().is_none());

        store.advance_watermark("alice", &"100".into()).await.unwrap();
        let kept = store.advance_watermark("alice", &"99".into()).await.unwrap();
        assert_eq!(kept, Watermark::from("100"));
        store.advance_watermark("alice", &"105".into()).await.unwrap();

        assert_eq!(
            store.load_watermark("alice").await.unwrap(),
            Some(Watermark::from("105"))
        );
        assert_eq!(
            store.get::<String>("alice:last_timestamp", String::new()).await,
            "105"
        );
    }

    #[tokio::test]
    async fn numeric_watermark_values_are_read() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::open(dir.path().join("state.json")).await.unwrap();
        store.set("bob:last_timestamp", 1_700_000_000_u64).await.unwrap();
        assert_eq!(
            store.load_watermark("bob").await.unwrap(),
            Some(Watermark::from("1700000000"))
        );
    }

    #[tokio::test]
    async fn live_poll_interval() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::open(dir.path().join("state.json")).await.unwrap();
        assert_eq!(store.poll_interval().await, None);
        store.set(keys::POLL_INTERVAL_SECS, 0).await.unwrap();
        assert_eq!(store.poll_interval().await, None);
        store.set(keys::POLL_INTERVAL_SECS, 15).await.unwrap();
        assert_eq!(store.poll_interval().await, Some(Duration::from_secs(15)));
    }
}
