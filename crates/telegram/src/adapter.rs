use std::{sync::Arc, time::Duration};

use {
    pixlive_common::{
        events::{EventSender, PipelineEvent},
        types::{MediaRef, RawPart},
    },
    pixlive_services::AdminConsole,
    secrecy::{ExposeSecret, Secret},
    teloxide::{
        ApiError, RequestError,
        prelude::*,
        types::{AllowedUpdate, BotCommand, UpdateKind},
    },
    tokio::task::JoinHandle,
    tokio_util::sync::CancellationToken,
    tracing::{debug, error, info, warn},
};

use crate::error::Result;

#[derive(Debug, Clone, Default)]
pub struct AdapterConfig {
    /// Only channel posts from this chat are ingested when set.
    pub source_channel_id: Option<i64>,
}

/// Build a bot whose HTTP client outlives the 30 s long-poll.
pub fn build_bot(token: &Secret<String>) -> Result<Bot> {
    let client = teloxide::net::default_reqwest_settings()
        .timeout(Duration::from_secs(45))
        .build()?;
    Ok(Bot::with_client(token.expose_secret(), client))
}

/// The buffered part carried by a channel post, if it is a photo post from
/// the configured channel. The largest photo size is used.
pub fn raw_part_from_post(msg: &Message, source_channel_id: Option<i64>) -> Option<RawPart> {
    if let Some(id) = source_channel_id
        && msg.chat.id.0 != id
    {
        return None;
    }
    let photo = msg
        .photo()?
        .iter()
        .max_by_key(|p| u64::from(p.width) * u64::from(p.height))?;
    Some(RawPart {
        group_id: msg.media_group_id().map(ToString::to_string),
        caption: msg.caption().unwrap_or_default().to_string(),
        seq: i64::from(msg.id.0),
        media: MediaRef::new(photo.file.id.clone()),
    })
}

/// Start long polling. Channel photo posts become [`PipelineEvent::RawPart`]
/// events; private text messages go to the admin console when one is given.
///
/// The returned task runs until `cancel` fires.
pub async fn start_polling(
    bot: Bot,
    config: AdapterConfig,
    events: EventSender,
    console: Option<Arc<AdminConsole>>,
    cancel: CancellationToken,
) -> Result<JoinHandle<()>> {
    let me = bot.get_me().await?;
    bot.delete_webhook().send().await?;

    if console.is_some() {
        let commands = vec![
            BotCommand::new("auth", "Authenticate as admin"),
            BotCommand::new("status", "Show analytics and services"),
            BotCommand::new("pause", "Pause a service"),
            BotCommand::new("resume", "Resume a service"),
            BotCommand::new("help", "Show available commands"),
        ];
        if let Err(e) = bot.set_my_commands(commands).await {
            warn!(error = %e, "failed to register bot commands");
        }
    }
    info!(username = ?me.username, source_channel_id = ?config.source_channel_id, "telegram bot connected");

    Ok(tokio::spawn(async move {
        let mut offset: i32 = 0;
        loop {
            let result = tokio::select! {
                () = cancel.cancelled() => break,
                r = bot
                    .get_updates()
                    .offset(offset)
                    .timeout(30)
                    .allowed_updates(vec![AllowedUpdate::ChannelPost, AllowedUpdate::Message])
                    .send() => r,
            };

            let updates = match result {
                Ok(updates) => updates,
                Err(RequestError::Api(ApiError::TerminatedByOtherGetUpdates)) => {
                    error!("telegram polling stopped: another instance is using this token");
                    break;
                },
                Err(e) => {
                    warn!(error = %e, "telegram getUpdates failed");
                    tokio::select! {
                        () = cancel.cancelled() => break,
                        () = tokio::time::sleep(Duration::from_secs(5)) => continue,
                    }
                },
            };

            for update in updates {
                offset = update.id.as_offset();
                match update.kind {
                    UpdateKind::ChannelPost(msg) => {
                        let Some(part) = raw_part_from_post(&msg, config.source_channel_id) else {
                            debug!(chat_id = msg.chat.id.0, "ignoring channel post");
                            continue;
                        };
                        if events.send(PipelineEvent::RawPart(part)).is_err() {
                            info!("pipeline closed, telegram polling stopped");
                            return;
                        }
                    },
                    UpdateKind::Message(msg) if msg.chat.is_private() => {
                        if let Some(console) = console.as_deref() {
                            handle_admin_message(&bot, &msg, console).await;
                        }
                    },
                    other => debug!("ignoring update: {other:?}"),
                }
            }
        }
        info!("telegram polling stopped");
    }))
}

async fn handle_admin_message(bot: &Bot, msg: &Message, console: &AdminConsole) {
    let (Some(text), Some(user)) = (msg.text(), msg.from.as_ref()) else {
        return;
    };
    let Ok(user_id) = i64::try_from(user.id.0) else {
        return;
    };
    let Some(reply) = console.handle(user_id, text).await else {
        return;
    };
    if let Err(e) = bot.send_message(msg.chat.id, reply).await {
        warn!(user_id, error = %e, "failed to send admin reply");
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, serde_json::json};

    fn channel_post(chat_id: i64, extra: serde_json::Value) -> Message {
        let mut value = json!({
            "message_id": 42,
            "date": 1_700_000_000,
            "chat": { "id": chat_id, "type": "channel", "title": "Drops" },
        });
        value
            .as_object_mut()
            .unwrap()
            .extend(extra.as_object().unwrap().clone());
        serde_json::from_value(value).expect("deserialize channel post")
    }

    fn photos() -> serde_json::Value {
        json!([
            { "file_id": "small", "file_unique_id": "s", "width": 90, "height": 60, "file_size": 1000 },
            { "file_id": "large", "file_unique_id": "l", "width": 1280, "height": 853, "file_size": 90000 },
            { "file_id": "medium", "file_unique_id": "m", "width": 320, "height": 213, "file_size": 9000 },
        ])
    }

    #[test]
    fn photo_post_becomes_raw_part() {
        let msg = channel_post(-100_123, json!({
            "media_group_id": "13579",
            "caption": "https://www.patreon.com/posts/55 #sfw",
            "photo": photos(),
        }));
        let part = raw_part_from_post(&msg, None).unwrap();
        assert_eq!(part.group_id.as_deref(), Some("13579"));
        assert_eq!(part.seq, 42);
        assert_eq!(part.media, MediaRef::new("large"));
        assert_eq!(part.caption, "https://www.patreon.com/posts/55 #sfw");
    }

    #[test]
    fn post_without_caption_or_group() {
        let msg = channel_post(-100_123, json!({ "photo": photos() }));
        let part = raw_part_from_post(&msg, Some(-100_123)).unwrap();
        assert!(part.group_id.is_none());
        assert!(part.caption.is_empty());
    }

    #[test]
    fn other_channels_and_text_posts_are_ignored() {
        let msg = channel_post(-100_999, json!({ "photo": photos() }));
        assert!(raw_part_from_post(&msg, Some(-100_123)).is_none());

        let text = channel_post(-100_123, json!({ "text": "hello" }));
        assert!(raw_part_from_post(&text, None).is_none());
    }
}
