#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error("patreon returned {status} for post {post_id}")]
    Status { post_id: String, status: u16 },

    #[error("patreon access token not set")]
    MissingToken,
}

pub type Result<T> = std::result::Result<T, Error>;
