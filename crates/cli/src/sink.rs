//! Webhook delivery of dispatch jobs.
//!
//! Each destination name maps to a Discord-compatible webhook. Jobs are sent
//! as `multipart/form-data` with a `payload_json` part and one `files[n]`
//! part per attached image.

use std::collections::BTreeMap;

use {
    async_trait::async_trait,
    pixlive_common::{
        traits::Sink,
        types::{DispatchJob, DisplayStyle, JobPayload, MediaFile},
    },
    pixlive_config::DestinationConfig,
    reqwest::multipart::{Form, Part},
    secrecy::{ExposeSecret, Secret},
    serde_json::{Value, json},
    tracing::{debug, info, warn},
};

const EMBED_COLOR: u32 = 0x3498DB;

pub struct WebhookSink {
    http: reqwest::Client,
    webhooks: BTreeMap<String, Secret<String>>,
}

impl WebhookSink {
    pub fn new(http: reqwest::Client, destinations: &BTreeMap<String, DestinationConfig>) -> Self {
        let webhooks = destinations
            .iter()
            .map(|(name, d)| (name.clone(), d.webhook_url.clone()))
            .collect();
        Self { http, webhooks }
    }

    async fn send(&self, url: &str, job: &DispatchJob) -> anyhow::Result<()> {
        let (payload, files) = webhook_message(job);
        let mut form = Form::new().text("payload_json", payload.to_string());
        for (i, file) in files.iter().enumerate() {
            let part = Part::bytes(file.bytes.clone())
                .file_name(file.filename.clone())
                .mime_str("image/jpeg")?;
            form = form.part(format!("files[{i}]"), part);
        }

        let resp = self.http.post(url).multipart(form).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("webhook returned {status}: {body}");
        }
        Ok(())
    }
}

/// The `payload_json` body and the attachments for `job`.
pub fn webhook_message(job: &DispatchJob) -> (Value, &[MediaFile]) {
    match &job.payload {
        JobPayload::Image(file) => (
            json!({
                "embeds": [{
                    "title": job.title,
                    "url": job.reference_url,
                    "color": EMBED_COLOR,
                    "image": { "url": format!("attachment://{}", file.filename) },
                }],
            }),
            std::slice::from_ref(file),
        ),
        JobPayload::Batch { files, description } => (json!({ "content": description }), files.as_slice()),
        JobPayload::Embed {
            description,
            thumbnail_url,
            style: DisplayStyle::Embed,
        } => {
            let mut embed = json!({
                "title": job.title,
                "url": job.reference_url,
                "description": description,
                "color": EMBED_COLOR,
            });
            if let Some(thumb) = thumbnail_url {
                embed["image"] = json!({ "url": thumb });
            }
            (json!({ "embeds": [embed] }), &[][..])
        },
        JobPayload::Embed {
            description,
            style: DisplayStyle::Compact,
            ..
        } => (
            json!({ "content": format!("{description}: **{}** <{}>", job.title, job.reference_url) }),
            &[][..],
        ),
    }
}

#[async_trait]
impl Sink for WebhookSink {
    async fn deliver(&self, job: DispatchJob) {
        let Some(url) = self.webhooks.get(&job.destination) else {
            warn!(destination = %job.destination, flow = %job.flow, "unknown destination, job dropped");
            return;
        };
        debug!(destination = %job.destination, flow = %job.flow, "delivering job");
        match self.send(url.expose_secret(), &job).await {
            Ok(()) => info!(
                destination = %job.destination,
                flow = %job.flow,
                url = %job.reference_url,
                "job delivered"
            ),
            Err(e) => warn!(destination = %job.destination, flow = %job.flow, error = %e, "delivery failed"),
        }
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, mockito::Matcher, pixlive_common::types::FlowKind};

    fn job(destination: &str, payload: JobPayload) -> DispatchJob {
        DispatchJob {
            flow: FlowKind::Collection,
            destination: destination.into(),
            title: "Summer Set".into(),
            reference_url: "https://www.patreon.com/posts/123".into(),
            payload,
        }
    }

    fn sink(server: &mockito::ServerGuard) -> WebhookSink {
        let mut destinations = BTreeMap::new();
        destinations.insert("col-sfw".to_string(), DestinationConfig {
            webhook_url: Secret::new(format!("{}/api/webhooks/1/abc", server.url())),
        });
        WebhookSink::new(reqwest::Client::new(), &destinations)
    }

    #[test]
    fn announcement_embeds_its_attachment() {
        let job = job(
            "ann",
            JobPayload::Image(MediaFile::new("preview_123.jpg", vec![1])),
        );
        let (payload, files) = webhook_message(&job);
        assert_eq!(files.len(), 1);
        assert_eq!(payload["embeds"][0]["image"]["url"], "attachment://preview_123.jpg");
        assert_eq!(payload["embeds"][0]["title"], "Summer Set");
    }

    #[test]
    fn gallery_styles() {
        let embed = job("posts", JobPayload::Embed {
            description: "New post from alice".into(),
            thumbnail_url: Some("https://img.test/t.jpg".into()),
            style: DisplayStyle::Embed,
        });
        let (payload, files) = webhook_message(&embed);
        assert!(files.is_empty());
        assert_eq!(payload["embeds"][0]["description"], "New post from alice");
        assert_eq!(payload["embeds"][0]["image"]["url"], "https://img.test/t.jpg");

        let compact = job("posts", JobPayload::Embed {
            description: "New post from alice".into(),
            thumbnail_url: None,
            style: DisplayStyle::Compact,
        });
        let (payload, _) = webhook_message(&compact);
        assert_eq!(
            payload["content"],
            "New post from alice: **Summer Set** <https://www.patreon.com/posts/123>"
        );
    }

    #[tokio::test]
    async fn batch_is_posted_as_multipart() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/webhooks/1/abc")
            .match_header("content-type", Matcher::Regex("^multipart/form-data".into()))
            .match_body(Matcher::AllOf(vec![
                Matcher::Regex(r#"name="payload_json""#.into()),
                Matcher::Regex("New Collection".into()),
                Matcher::Regex(r#"name="files\[0\]"; filename="img_0.jpg""#.into()),
                Matcher::Regex(r#"name="files\[1\]"; filename="img_1.jpg""#.into()),
            ]))
            .with_status(204)
            .expect(1)
            .create_async()
            .await;

        sink(&server)
            .deliver(job("col-sfw", JobPayload::Batch {
                files: vec![
                    MediaFile::new("img_0.jpg", b"aaa".to_vec()),
                    MediaFile::new("img_1.jpg", b"bbb".to_vec()),
                ],
                description: "New Collection".into(),
            }))
            .await;
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn unknown_destination_is_dropped() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        sink(&server)
            .deliver(job("nowhere", JobPayload::Batch {
                files: Vec::new(),
                description: "x".into(),
            }))
            .await;
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn webhook_error_does_not_panic() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/webhooks/1/abc")
            .with_status(500)
            .with_body("boom")
            .create_async()
            .await;

        sink(&server)
            .deliver(job("col-sfw", JobPayload::Batch {
                files: Vec::new(),
                description: "x".into(),
            }))
            .await;
        mock.assert_async().await;
    }
}
