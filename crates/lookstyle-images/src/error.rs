use thiserror::Error;

/// Errors returned by the image store client.
#[derive(Debug, Error)]
pub enum ImageStoreError {
    /// Network or TLS failure from the underlying HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The store answered with a non-2xx status.
    #[error("image store {operation} returned HTTP {status}: {body}")]
    UnexpectedStatus {
        operation: &'static str,
        status: u16,
        body: String,
    },

    /// The response body could not be deserialized into the expected type.
    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    /// The store accepted the request but reported a result we do not handle.
    #[error("image store rejected {operation}: {detail}")]
    Rejected {
        operation: &'static str,
        detail: String,
    },

    #[error("invalid image store configuration: {0}")]
    InvalidConfig(String),
}
