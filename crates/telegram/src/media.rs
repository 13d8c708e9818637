use {
    async_trait::async_trait,
    pixlive_common::{ResultExt, traits::MediaFetcher, types::MediaRef},
    teloxide::{Bot, prelude::Requester},
    tracing::debug,
};

use crate::error::{Error, Result};

/// Downloads photos by Telegram `file_id`.
#[derive(Clone)]
pub struct TelegramMedia {
    bot: Bot,
    http: reqwest::Client,
}

impl TelegramMedia {
    pub fn new(bot: Bot, http: reqwest::Client) -> Self {
        Self { bot, http }
    }

    async fn download(&self, file_id: &str) -> Result<Vec<u8>> {
        let file = self.bot.get_file(file_id).await?;
        let url = file_url(&self.bot.api_url(), self.bot.token(), &file.path)?;

        let resp = self.http.get(url).send().await?;
        if !resp.status().is_success() {
            return Err(Error::Download {
                status: resp.status().as_u16(),
            });
        }
        let bytes = resp.bytes().await?.to_vec();
        debug!(file_id, len = bytes.len(), "downloaded telegram photo");
        Ok(bytes)
    }
}

/// `<api>/file/bot<token>/<path>`
fn file_url(api: &reqwest::Url, token: &str, path: &str) -> Result<reqwest::Url> {
    api.join(&format!("file/bot{token}/{path}"))
        .map_err(|e| Error::Url(e.to_string()))
}

#[async_trait]
impl MediaFetcher for TelegramMedia {
    async fn fetch(&self, media: &MediaRef) -> pixlive_common::Result<Vec<u8>> {
        self.download(&media.0).await.context("telegram download")
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_file_url_from_api_base() {
        let api = reqwest::Url::parse("https://api.telegram.org/").unwrap();
        let url = file_url(&api, "123:ABC", "photos/file_7.jpg").unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.telegram.org/file/bot123:ABC/photos/file_7.jpg"
        );
    }
}
