//! Telegram ingestion: album buffering and debounce, caption parsing, the
//! teloxide long-polling adapter and the photo downloader.

pub mod adapter;
pub mod caption;
pub mod error;
pub mod listener;
pub mod media;

pub use {
    adapter::{AdapterConfig, start_polling},
    error::{Error, Result},
    listener::ChannelListener,
    media::TelegramMedia,
};
