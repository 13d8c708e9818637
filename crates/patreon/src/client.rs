use {
    async_trait::async_trait,
    pixlive_common::traits::TitleLookup,
    reqwest::Client,
    secrecy::{ExposeSecret, Secret},
    serde::Deserialize,
    tracing::{debug, warn},
};

use crate::error::{Error, Result};

pub const USER_AGENT: &str = "PixLiveBot/1.0";

#[derive(Debug, Default, Deserialize)]
struct PostResponse {
    #[serde(default)]
    data: Option<PostData>,
}

#[derive(Debug, Default, Deserialize)]
struct PostData {
    #[serde(default)]
    attributes: Option<PostAttributes>,
}

#[derive(Debug, Default, Deserialize)]
struct PostAttributes {
    #[serde(default)]
    title: Option<String>,
}

/// Resolves post ids to titles. Without an access token every lookup fails
/// fast and the router falls back to its placeholder.
pub struct PatreonClient {
    http: Client,
    api_base: String,
    access_token: Option<Secret<String>>,
}

impl PatreonClient {
    pub fn new(http: Client, api_base: impl Into<String>, access_token: Option<Secret<String>>) -> Self {
        let access_token = access_token.filter(|t| !t.expose_secret().trim().is_empty());
        Self {
            http,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            access_token,
        }
    }

    pub fn has_token(&self) -> bool {
        self.access_token.is_some()
    }

    /// `GET {api_base}/posts/{id}?fields[post]=title`.
    pub async fn post_title(&self, post_id: &str) -> Result<Option<String>> {
        let token = self.access_token.as_ref().ok_or(Error::MissingToken)?;

        let resp = self
            .http
            .get(format!("{}/posts/{post_id}", self.api_base))
            .query(&[("fields[post]", "title")])
            .bearer_auth(token.expose_secret())
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            warn!(post_id, status = status.as_u16(), body = %body, "patreon title lookup failed");
            return Err(Error::Status {
                post_id: post_id.to_string(),
                status: status.as_u16(),
            });
        }

        let body: PostResponse = resp.json().await?;
        let title = body
            .data
            .and_then(|d| d.attributes)
            .and_then(|a| a.title)
            .filter(|t| !t.trim().is_empty());
        debug!(post_id, title = ?title, "patreon title resolved");
        Ok(title)
    }
}

#[async_trait]
impl TitleLookup for PatreonClient {
    async fn title(&self, reference_id: &str) -> pixlive_common::Result<Option<String>> {
        match self.post_title(reference_id).await {
            Ok(title) => Ok(title),
            Err(Error::MissingToken) => Err(pixlive_common::Error::unavailable(
                "patreon access token not set",
            )),
            Err(e) => Err(pixlive_common::Error::external("patreon title lookup", e)),
        }
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, mockito::Matcher};

    fn client(server: &mockito::ServerGuard, token: Option<&str>) -> PatreonClient {
        PatreonClient::new(
            Client::new(),
            format!("{}/api/oauth2/v2/", server.url()),
            token.map(|t| Secret::new(t.to_string())),
        )
    }

    #[tokio::test]
    async fn resolves_title_with_bearer_auth() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/oauth2/v2/posts/123")
            .match_query(Matcher::UrlEncoded("fields[post]".into(), "title".into()))
            .match_header("authorization", "Bearer pat-token")
            .match_header("user-agent", USER_AGENT)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"data":{"id":"123","type":"post","attributes":{"title":"Summer Set"}}}"#)
            .create_async()
            .await;

        let title = client(&server, Some("pat-token")).title("123").await.unwrap();
        assert_eq!(title.as_deref(), Some("Summer Set"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn missing_or_blank_title_is_none() {
        let mut server = mockito::Server::new_async().await;
        let _m1 = server
            .mock("GET", "/api/oauth2/v2/posts/1")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"data":{"attributes":{}}}"#)
            .create_async()
            .await;
        let _m2 = server
            .mock("GET", "/api/oauth2/v2/posts/2")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"data":{"attributes":{"title":"   "}}}"#)
            .create_async()
            .await;

        let patreon = client(&server, Some("t"));
        assert!(patreon.title("1").await.unwrap().is_none());
        assert!(patreon.title("2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn error_status_is_an_error() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/api/oauth2/v2/posts/404")
            .match_query(Matcher::Any)
            .with_status(404)
            .with_body("not found")
            .create_async()
            .await;

        let err = client(&server, Some("t")).post_title("404").await.unwrap_err();
        assert!(matches!(err, Error::Status { status: 404, .. }));
    }

    #[tokio::test]
    async fn no_token_makes_no_request() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let patreon = client(&server, Some("  "));
        assert!(!patreon.has_token());
        let err = patreon.title("123").await.unwrap_err();
        assert!(matches!(err, pixlive_common::Error::Unavailable(_)));
        mock.assert_async().await;
    }
}
