//! Error types for extraction and the tracking service client.

use std::str::Utf8Error;

use thiserror::Error;

/// A product link that could not be turned into an ASIN.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("redirect target is not valid UTF-8 after decoding: {0}")]
    Decode(#[from] Utf8Error),
}

/// Failure talking to the tracking service.
///
/// A 404 on the status lookup is not an error; see [`crate::classify::Lookup::NotFound`].
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("request {request_id} to {url} failed: {message}")]
    Network {
        request_id: String,
        url: String,
        message: String,
    },

    #[error("request {request_id} to {url} returned HTTP {status}")]
    Status {
        request_id: String,
        url: String,
        status: u16,
    },

    #[error("request {request_id} to {url} returned an unreadable body: {source}")]
    Decode {
        request_id: String,
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("request {request_id} to {url} returned an unrecognized response")]
    UnrecognizedResponse { request_id: String, url: String },
}

impl RemoteError {
    /// Correlation id of the request that failed.
    pub fn request_id(&self) -> &str {
        match self {
            RemoteError::Network { request_id, .. }
            | RemoteError::Status { request_id, .. }
            | RemoteError::Decode { request_id, .. }
            | RemoteError::UnrecognizedResponse { request_id, .. } => request_id,
        }
    }
}
