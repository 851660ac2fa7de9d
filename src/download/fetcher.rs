//! Transport contract used by discovery and downloads.

use std::fmt;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream::BoxStream;

use super::error::FetchError;

/// Body stream of an opened response.
pub type BodyStream = BoxStream<'static, Result<Bytes, FetchError>>;

/// An opened streaming response with a success status.
pub struct RemoteBody {
    /// HTTP status code of the response.
    pub status: u16,
    /// Declared Content-Length, if the server sent one.
    pub content_length: Option<u64>,
    /// Remaining body bytes.
    pub body: BodyStream,
}

impl fmt::Debug for RemoteBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteBody")
            .field("status", &self.status)
            .field("content_length", &self.content_length)
            .finish_non_exhaustive()
    }
}

/// Fetches resources by URL.
///
/// Implemented by [`HttpClient`](super::HttpClient) for real traffic; tests
/// supply in-process doubles to inject failures.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetches a whole response body as text.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] on transport failure or a non-success status.
    async fn fetch_text(&self, url: &str) -> Result<String, FetchError>;

    /// Opens a streaming GET request.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] on transport failure or a non-success status.
    async fn open(&self, url: &str) -> Result<RemoteBody, FetchError>;
}
