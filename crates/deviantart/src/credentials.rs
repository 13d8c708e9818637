use std::time::Duration;

use {
    reqwest::Client,
    secrecy::{ExposeSecret, Secret},
    tokio::{sync::Mutex, time::Instant},
    tracing::debug,
};

#[cfg(feature = "metrics")]
use pixlive_metrics::{counter, poller as poller_metrics};

use crate::{
    api::TokenResponse,
    error::{Error, Result},
};

/// Tokens are treated as expired this long before the provider says so.
pub const EXPIRY_MARGIN: Duration = Duration::from_secs(300);

struct CachedToken {
    token: Secret<String>,
    expires_at: Instant,
}

/// In-memory client-credentials token with a safety margin before expiry.
pub struct CredentialCache {
    token_url: String,
    client_id: String,
    client_secret: Secret<String>,
    cached: Mutex<Option<CachedToken>>,
}

impl CredentialCache {
    pub fn new(
        token_url: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: Secret<String>,
    ) -> Self {
        Self {
            token_url: token_url.into(),
            client_id: client_id.into(),
            client_secret,
            cached: Mutex::new(None),
        }
    }

    /// Return the cached token, fetching a new one when none is cached or the
    /// margin has been crossed.
    pub async fn access_token(&self, client: &Client) -> Result<Secret<String>> {
        let mut cached = self.cached.lock().await;
        if let Some(c) = cached.as_ref()
            && Instant::now() < c.expires_at
        {
            return Ok(c.token.clone());
        }

        let resp = client
            .post(&self.token_url)
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.expose_secret().as_str()),
            ])
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(Error::Status {
                what: "token request",
                status: resp.status().as_u16(),
            });
        }
        let body: TokenResponse = resp.json().await?;

        let lifetime = Duration::from_secs(u64::try_from(body.expires_in).unwrap_or(0));
        let token = Secret::new(body.access_token);
        *cached = Some(CachedToken {
            token: token.clone(),
            expires_at: Instant::now() + lifetime.saturating_sub(EXPIRY_MARGIN),
        });
        debug!(expires_in = body.expires_in, "access token refreshed");
        #[cfg(feature = "metrics")]
        counter!(poller_metrics::TOKEN_REFRESHES_TOTAL).increment(1);
        Ok(token)
    }

    /// Drop the cached token so the next call fetches a fresh one.
    pub async fn invalidate(&self) {
        *self.cached.lock().await = None;
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    fn token_body(token: &str, expires_in: i64) -> String {
        serde_json::json!({"access_token": token, "expires_in": expires_in, "status": "success"})
            .to_string()
    }

    #[tokio::test]
    async fn token_is_cached_until_margin() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/oauth2/token")
            .match_body(mockito::Matcher::AllOf(vec![
                mockito::Matcher::UrlEncoded("grant_type".into(), "client_credentials".into()),
                mockito::Matcher::UrlEncoded("client_id".into(), "cid".into()),
                mockito::Matcher::UrlEncoded("client_secret".into(), "csecret".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(token_body("tok-1", 3600))
            .expect(1)
            .create_async()
            .await;

        let cache = CredentialCache::new(
            format!("{}/oauth2/token", server.url()),
            "cid",
            Secret::new("csecret".into()),
        );
        let client = Client::new();
        let a = cache.access_token(&client).await.unwrap();
        let b = cache.access_token(&client).await.unwrap();
        assert_eq!(a.expose_secret(), "tok-1");
        assert_eq!(b.expose_secret(), "tok-1");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn short_lived_token_is_refetched() {
        let mut server = mockito::Server::new_async().await;
        // Lifetime inside the margin: expired as soon as it is cached.
        let mock = server
            .mock("POST", "/oauth2/token")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(token_body("tok-short", 120))
            .expect(2)
            .create_async()
            .await;

        let cache = CredentialCache::new(
            format!("{}/oauth2/token", server.url()),
            "cid",
            Secret::new("csecret".into()),
        );
        let client = Client::new();
        cache.access_token(&client).await.unwrap();
        cache.access_token(&client).await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn invalidate_forces_refresh() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/oauth2/token")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(token_body("tok", 3600))
            .expect(2)
            .create_async()
            .await;

        let cache = CredentialCache::new(
            format!("{}/oauth2/token", server.url()),
            "cid",
            Secret::new("csecret".into()),
        );
        let client = Client::new();
        cache.access_token(&client).await.unwrap();
        cache.invalidate().await;
        cache.access_token(&client).await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn rejected_credentials() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/oauth2/token")
            .with_status(401)
            .with_body(r#"{"error":"invalid_client"}"#)
            .create_async()
            .await;

        let cache = CredentialCache::new(
            format!("{}/oauth2/token", server.url()),
            "cid",
            Secret::new("wrong".into()),
        );
        let err = cache.access_token(&Client::new()).await.unwrap_err();
        assert!(matches!(err, Error::Status { status: 401, .. }));
    }
}
