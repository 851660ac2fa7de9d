//! Persistent response cache for listing pages.
//!
//! Maps an exact request URL to the response body. A hit never touches the
//! network; a miss fetches once and, on success, rewrites the whole backing
//! file before returning. The cache is owned by the discovery phase and is
//! not shared between tasks, so it carries no lock.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info, instrument};

use crate::download::{FetchError, Fetcher};

/// Errors from cache lookups and persistence.
#[derive(Debug, Error)]
pub enum CacheError {
    /// The page was not cached and fetching it failed.
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// Reading or writing the cache file failed.
    #[error("cache file {path}: {source}")]
    Io {
        /// Cache file path.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The cache file is not a JSON object of strings.
    #[error("cache file {path} is not valid JSON: {source}")]
    Json {
        /// Cache file path.
        path: PathBuf,
        /// The underlying parse error.
        #[source]
        source: serde_json::Error,
    },
}

impl CacheError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// URL → body store backed by a pretty-printed JSON file.
#[derive(Debug, Default)]
pub struct ResponseCache {
    path: Option<PathBuf>,
    entries: BTreeMap<String, String>,
}

impl ResponseCache {
    /// Loads the cache at `path`, creating it as `{}` if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Io`] if the file cannot be created or read and
    /// [`CacheError::Json`] if its content is not a string map.
    #[instrument(level = "debug", skip_all, fields(path = %path.as_ref().display()))]
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, CacheError> {
        let path = path.as_ref();

        if !tokio::fs::try_exists(path)
            .await
            .map_err(|e| CacheError::io(path, e))?
        {
            info!(path = %path.display(), "creating cache file");
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| CacheError::io(parent, e))?;
            }
            tokio::fs::write(path, b"{}")
                .await
                .map_err(|e| CacheError::io(path, e))?;
        }

        let raw = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| CacheError::io(path, e))?;
        let entries = serde_json::from_str(&raw).map_err(|source| CacheError::Json {
            path: path.to_path_buf(),
            source,
        })?;

        Ok(Self {
            path: Some(path.to_path_buf()),
            entries,
        })
    }

    /// Creates a cache that is never written to disk.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Backing file, if any.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Number of cached pages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Cached body for `url`.
    #[must_use]
    pub fn get(&self, url: &str) -> Option<&str> {
        self.entries.get(url).map(String::as_str)
    }

    /// Returns the cached body for `url`, fetching and persisting it on a miss.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Fetch`] if the page is not cached and the fetch
    /// fails (nothing is stored), or a persistence error if the new entry
    /// cannot be flushed.
    #[instrument(level = "debug", skip(self, fetcher))]
    pub async fn get_or_fetch(
        &mut self,
        fetcher: &dyn Fetcher,
        url: &str,
    ) -> Result<String, CacheError> {
        if let Some(body) = self.entries.get(url) {
            info!(url = %url, "loading from cache");
            return Ok(body.clone());
        }

        info!(url = %url, "fetching listing");
        let body = fetcher.fetch_text(url).await?;

        debug!(url = %url, bytes = body.len(), "caching listing");
        self.entries.insert(url.to_string(), body.clone());
        self.flush().await?;

        Ok(body)
    }

    /// Rewrites the backing file with the full mapping.
    ///
    /// In-memory caches return immediately.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Io`] if the file cannot be written.
    pub async fn flush(&self) -> Result<(), CacheError> {
        let Some(path) = self.path.as_deref() else {
            return Ok(());
        };
        let rendered =
            serde_json::to_string_pretty(&self.entries).map_err(|source| CacheError::Json {
                path: path.to_path_buf(),
                source,
            })?;
        tokio::fs::write(path, rendered)
            .await
            .map_err(|e| CacheError::io(path, e))
    }
}
