use thiserror::Error;

#[derive(Debug, Error)]
pub enum BaselineError {
    #[error("baseline persistence io error")]
    Io(#[source] std::io::Error),

    #[error("baseline decode error")]
    Decode(#[source] serde_json::Error),

    #[error("baseline encode error")]
    Encode(#[source] serde_json::Error),
}
