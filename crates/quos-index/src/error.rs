/// Errors from the analytics index client.
///
/// All variants are treated as transient by the indexer worker: the event is
/// not acked and is retried on a later poll once the index recovers.
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    /// An HTTP request to the index failed outright.
    #[error("index: HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The index returned a non-success response.
    #[error("index: API error: status={status}, body={body}")]
    Api { status: u16, body: String },

    /// A stored document did not decode into [`crate::MetricDocument`].
    #[error("index: decode error: {0}")]
    Decode(String),
}

/// Convenience `Result` alias for index operations.
pub type Result<T> = std::result::Result<T, IndexError>;
