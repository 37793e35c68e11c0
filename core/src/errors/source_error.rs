use thiserror::Error;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("tool-call source io error")]
    Io(#[source] std::io::Error),

    #[error("tool-call source unavailable: {0}")]
    Unavailable(String),
}
