//! Error types for the download module.
//!
//! [`FetchError`] covers a single HTTP exchange (whole-body or streamed).
//! [`DownloadError`] covers one download task from open to terminal state and
//! always names the URL or path it failed on.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by a [`Fetcher`](super::Fetcher) for one request.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network-level error (DNS resolution, connection refused, reset mid-body, etc.)
    #[error("network error fetching {url}: {message}")]
    Network {
        /// The URL that failed.
        url: String,
        /// Rendered transport error.
        message: String,
    },

    /// Request timed out before completion.
    #[error("timeout fetching {url}")]
    Timeout {
        /// The URL that timed out.
        url: String,
    },

    /// Non-success HTTP response.
    #[error("HTTP {status} fetching {url}")]
    HttpStatus {
        /// The URL that returned an error status.
        url: String,
        /// The HTTP status code.
        status: u16,
    },

    /// The URL could not be parsed.
    #[error("invalid URL: {url}")]
    InvalidUrl {
        /// The invalid URL string.
        url: String,
    },
}

impl FetchError {
    /// Creates a network error from any displayable transport error.
    pub fn network(url: impl Into<String>, source: impl std::fmt::Display) -> Self {
        Self::Network {
            url: url.into(),
            message: source.to_string(),
        }
    }

    /// Creates a timeout error.
    pub fn timeout(url: impl Into<String>) -> Self {
        Self::Timeout { url: url.into() }
    }

    /// Creates an HTTP status error.
    pub fn http_status(url: impl Into<String>, status: u16) -> Self {
        Self::HttpStatus {
            url: url.into(),
            status,
        }
    }

    /// Creates an invalid URL error.
    pub fn invalid_url(url: impl Into<String>) -> Self {
        Self::InvalidUrl { url: url.into() }
    }

    /// Maps a reqwest error, keeping timeouts distinct.
    pub(crate) fn from_reqwest(url: &str, error: &reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::timeout(url)
        } else {
            Self::network(url, error)
        }
    }
}

/// When a download failed relative to the first body byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePhase {
    /// Failed before any byte was written (bad status, missing length).
    Start,
    /// Failed while streaming the body to disk.
    Stream,
}

/// Errors that end a single download task.
#[derive(Debug, Error)]
pub enum DownloadError {
    /// The streamed request could not be opened or returned a failure status.
    #[error("failed to start download of {url}: {source}")]
    Start {
        /// The resource URL.
        url: String,
        /// The underlying fetch error.
        #[source]
        source: FetchError,
    },

    /// The server answered without a Content-Length header.
    #[error("no content length reported for {url} (HTTP {status})")]
    MissingContentLength {
        /// The resource URL.
        url: String,
        /// The response status.
        status: u16,
    },

    /// The body stream broke off mid-transfer.
    #[error("transfer of {url} interrupted: {source}")]
    Stream {
        /// The resource URL.
        url: String,
        /// The underlying fetch error.
        #[source]
        source: FetchError,
    },

    /// File system error while writing the output artifact.
    #[error("IO error writing to {path}: {source}")]
    Io {
        /// The file path where the error occurred.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The output name would land outside the output directory.
    #[error("output name {name:?} for {identifier} is not a plain relative path")]
    UnsafeOutputName {
        /// The resource identifier.
        identifier: String,
        /// The name produced by the naming transform.
        name: String,
    },

    /// An earlier task already writes to the same output name.
    #[error("output name {name:?} for {identifier} is already used by {first}")]
    DuplicateOutputName {
        /// The resource identifier.
        identifier: String,
        /// The shared output name.
        name: String,
        /// Identifier of the task that keeps the name.
        first: String,
    },

    /// The stream ended before the declared length was reached (or overran it).
    #[error("truncated transfer of {url}: expected {expected_bytes} bytes, got {actual_bytes}")]
    Truncated {
        /// The resource URL.
        url: String,
        /// Declared Content-Length.
        expected_bytes: u64,
        /// Bytes actually written.
        actual_bytes: u64,
    },
}

impl DownloadError {
    /// Creates a start-phase error.
    pub fn start(url: impl Into<String>, source: FetchError) -> Self {
        Self::Start {
            url: url.into(),
            source,
        }
    }

    /// Creates a missing Content-Length error.
    pub fn missing_content_length(url: impl Into<String>, status: u16) -> Self {
        Self::MissingContentLength {
            url: url.into(),
            status,
        }
    }

    /// Creates a stream-phase error.
    pub fn stream(url: impl Into<String>, source: FetchError) -> Self {
        Self::Stream {
            url: url.into(),
            source,
        }
    }

    /// Creates an IO error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Creates a length mismatch error.
    pub fn truncated(url: impl Into<String>, expected_bytes: u64, actual_bytes: u64) -> Self {
        Self::Truncated {
            url: url.into(),
            expected_bytes,
            actual_bytes,
        }
    }

    /// Classifies the failure by how far the task got.
    #[must_use]
    pub fn phase(&self) -> FailurePhase {
        match self {
            Self::Start { .. }
            | Self::MissingContentLength { .. }
            | Self::UnsafeOutputName { .. }
            | Self::DuplicateOutputName { .. } => FailurePhase::Start,
            Self::Stream { .. } | Self::Io { .. } | Self::Truncated { .. } => FailurePhase::Stream,
        }
    }

    /// Short message suitable for a progress row: status code or transport message.
    #[must_use]
    pub fn short_reason(&self) -> String {
        match self {
            Self::Start {
                source: FetchError::HttpStatus { status, .. },
                ..
            }
            | Self::MissingContentLength { status, .. } => status.to_string(),
            Self::Start { source, .. } | Self::Stream { source, .. } => source.to_string(),
            Self::Io { source, .. } => source.to_string(),
            Self::UnsafeOutputName { .. } => "unsafe output name".to_string(),
            Self::DuplicateOutputName { first, .. } => format!("same output name as {first}"),
            Self::Truncated {
                expected_bytes,
                actual_bytes,
                ..
            } => format!("got {actual_bytes} of {expected_bytes} bytes"),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_error_http_status_display() {
        let error = FetchError::http_status("https://example.com/files/", 404);
        let msg = error.to_string();
        assert!(msg.contains("404"), "Expected '404' in: {msg}");
        assert!(
            msg.contains("https://example.com/files/"),
            "Expected URL in: {msg}"
        );
    }

    #[test]
    fn test_fetch_error_timeout_display() {
        let error = FetchError::timeout("https://example.com/a.mp4");
        assert!(error.to_string().contains("timeout"));
    }

    #[test]
    fn test_download_error_phase_start_variants() {
        let start = DownloadError::start(
            "https://example.com/a.mp4",
            FetchError::http_status("https://example.com/a.mp4", 500),
        );
        assert_eq!(start.phase(), FailurePhase::Start);

        let missing = DownloadError::missing_content_length("https://example.com/a.mp4", 200);
        assert_eq!(missing.phase(), FailurePhase::Start);
    }

    #[test]
    fn test_download_error_phase_stream_variants() {
        let stream = DownloadError::stream(
            "https://example.com/a.mp4",
            FetchError::network("https://example.com/a.mp4", "connection reset"),
        );
        assert_eq!(stream.phase(), FailurePhase::Stream);

        let io = DownloadError::io(
            "/tmp/a.mp4",
            std::io::Error::new(std::io::ErrorKind::Other, "disk full"),
        );
        assert_eq!(io.phase(), FailurePhase::Stream);

        let truncated = DownloadError::truncated("https://example.com/a.mp4", 10, 4);
        assert_eq!(truncated.phase(), FailurePhase::Stream);
    }

    #[test]
    fn test_short_reason_uses_status_code_for_http_failures() {
        let error = DownloadError::start(
            "https://example.com/a.mp4",
            FetchError::http_status("https://example.com/a.mp4", 403),
        );
        assert_eq!(error.short_reason(), "403");

        let missing = DownloadError::missing_content_length("https://example.com/a.mp4", 200);
        assert_eq!(missing.short_reason(), "200");
    }

    #[test]
    fn test_short_reason_embeds_transport_message() {
        let error = DownloadError::stream(
            "https://example.com/a.mp4",
            FetchError::network("https://example.com/a.mp4", "connection reset"),
        );
        assert!(error.short_reason().contains("connection reset"));
    }

    #[test]
    fn test_output_name_errors_fail_before_any_request() {
        let unsafe_name = DownloadError::UnsafeOutputName {
            identifier: "..x/a.bin".into(),
            name: "../a.bin".into(),
        };
        assert_eq!(unsafe_name.phase(), FailurePhase::Start);
        assert!(unsafe_name.to_string().contains("\"../a.bin\""));

        let duplicate = DownloadError::DuplicateOutputName {
            identifier: "a [1].mp4".into(),
            name: "a.mp4".into(),
            first: "a [2].mp4".into(),
        };
        assert_eq!(duplicate.phase(), FailurePhase::Start);
        assert_eq!(duplicate.short_reason(), "same output name as a [2].mp4");
    }
}
