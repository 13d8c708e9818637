use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error("{what} failed with HTTP {status}")]
    Status { what: &'static str, status: u16 },

    #[error(transparent)]
    State(#[from] pixlive_state::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
