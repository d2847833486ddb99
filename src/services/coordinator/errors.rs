/// Errors that can occur while coordinating partial populations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("InvalidQuorum: quorum must be > 0")]
    InvalidQuorum,
    #[error("SerializationError: {0}")]
    SerializationError(#[from] serde_json::Error),
    #[error("MergeAborted: the quorum was dropped before a result was sent")]
    MergeAborted,
}
