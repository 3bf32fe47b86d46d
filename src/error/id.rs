use thiserror::Error;

#[derive(Error, Debug)]
pub enum IdError {
    #[error("System clock is before the Unix epoch")]
    SystemClock,
    /// The remote ID generator could not be reached or answered with an error status.
    #[error(transparent)]
    Remote(#[from] reqwest::Error),
    #[error("Remote ID generator returned an invalid ID: {0:?}")]
    InvalidResponse(String),
}
