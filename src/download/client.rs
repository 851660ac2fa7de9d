//! HTTP client wrapper implementing [`Fetcher`].
//!
//! This module provides the `HttpClient` struct which handles whole-body
//! listing fetches and streaming file downloads with proper timeout
//! configuration and error handling.

use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::Client;
use reqwest::header::CONTENT_LENGTH;
use tracing::{debug, instrument};
use url::Url;

use super::constants::{CONNECT_TIMEOUT_SECS, READ_TIMEOUT_SECS};
use super::error::FetchError;
use super::fetcher::{Fetcher, RemoteBody};
use crate::user_agent;

/// HTTP client for listing pages and streamed downloads.
///
/// Created once and shared across workers so connections are pooled.
///
/// # Example
///
/// ```no_run
/// use dirgrab_core::download::{Fetcher, HttpClient};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = HttpClient::new()?;
/// let html = client.fetch_text("https://example.com/files/").await?;
/// println!("{} bytes of listing", html.len());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    /// Creates a new HTTP client with default timeouts.
    ///
    /// Default configuration:
    /// - Connect timeout: 30 seconds
    /// - Read timeout: 5 minutes (for large files)
    ///
    /// # Errors
    ///
    /// Returns the reqwest builder error if the TLS backend cannot initialize.
    pub fn new() -> Result<Self, reqwest::Error> {
        Self::new_with_timeouts(CONNECT_TIMEOUT_SECS, READ_TIMEOUT_SECS)
    }

    /// Creates a new HTTP client with explicit timeout values.
    ///
    /// # Errors
    ///
    /// Returns the reqwest builder error if the TLS backend cannot initialize.
    #[instrument(level = "debug")]
    pub fn new_with_timeouts(
        connect_timeout_secs: u64,
        read_timeout_secs: u64,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(connect_timeout_secs))
            .read_timeout(Duration::from_secs(read_timeout_secs))
            .user_agent(user_agent::default_user_agent())
            .build()?;
        Ok(Self { client })
    }

    async fn send(&self, url: &str) -> Result<reqwest::Response, FetchError> {
        Url::parse(url).map_err(|_| FetchError::invalid_url(url))?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(url, &e))?;

        let status = response.status();
        if !status.is_success() {
            debug!(url = %url, status = status.as_u16(), "non-success response");
            return Err(FetchError::http_status(url, status.as_u16()));
        }

        Ok(response)
    }
}

#[async_trait]
impl Fetcher for HttpClient {
    #[instrument(level = "debug", skip(self))]
    async fn fetch_text(&self, url: &str) -> Result<String, FetchError> {
        let response = self.send(url).await?;
        response
            .text()
            .await
            .map_err(|e| FetchError::from_reqwest(url, &e))
    }

    #[instrument(level = "debug", skip(self))]
    async fn open(&self, url: &str) -> Result<RemoteBody, FetchError> {
        let response = self.send(url).await?;
        let status = response.status().as_u16();
        let content_length = declared_content_length(response.headers());
        let owned_url = url.to_string();
        let body = response
            .bytes_stream()
            .map(move |chunk| chunk.map_err(|e| FetchError::from_reqwest(&owned_url, &e)))
            .boxed();

        Ok(RemoteBody {
            status,
            content_length,
            body,
        })
    }
}

/// Reads Content-Length from the raw headers; `None` if absent or unparsable.
fn declared_content_length(headers: &reqwest::header::HeaderMap) -> Option<u64> {
    headers
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
}
