use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("not found")]
    NotFound,

    #[error("server returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("could not decode response: {0}")]
    Decode(String),

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
}
