use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Telegram(#[from] teloxide::RequestError),

    #[error(transparent)]
    Reqwest(#[from] reqwest::Error),

    #[error("file download failed with HTTP {status}")]
    Download { status: u16 },

    #[error("invalid file url: {0}")]
    Url(String),
}

pub type Result<T> = std::result::Result<T, Error>;
