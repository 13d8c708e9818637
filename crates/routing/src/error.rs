#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    State(#[from] pixlive_state::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
