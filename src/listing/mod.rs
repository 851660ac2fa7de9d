//! Discovery of downloadable resources in auto-generated directory listings.
//!
//! A listing is an HTML page whose anchors name its children with a leading
//! `./`; children ending in `/` are nested listings, everything else is a
//! leaf. [`ListingWalker`] expands the tree from an origin and returns leaf
//! identifiers relative to it.

mod parser;
mod walker;

use thiserror::Error;
use url::Url;

use crate::cache::CacheError;

pub use parser::parse_links;
pub use walker::{DEFAULT_MAX_DEPTH, ListingWalker};

/// Errors that abort discovery.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// The origin is not an absolute http(s) URL.
    #[error("invalid origin {origin}: {reason}")]
    InvalidOrigin {
        /// The origin as given.
        origin: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A listing page could not be retrieved.
    #[error("failed to load listing {url}")]
    ListingFetch {
        /// Listing URL.
        url: String,
        /// Underlying cache or fetch error.
        #[source]
        source: CacheError,
    },
}

/// Whether a link names a nested listing or a leaf.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkKind {
    /// Ends with `/`.
    Directory,
    /// Anything else.
    File,
}

/// A same-tree link with its `./` marker removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    /// Path relative to the listing it appeared in.
    pub path: String,
    /// Directory or leaf.
    pub kind: LinkKind,
}

/// Keeps `href` only if it points inside the current listing.
///
/// Links must start with `./`; parent references (`..`), absolute paths and
/// the listing's self link are dropped.
#[must_use]
pub fn classify_link(href: &str) -> Option<Link> {
    if href.contains("../") || href.ends_with("..") {
        return None;
    }
    let path = href.strip_prefix("./")?;
    if path.is_empty() || path.starts_with('/') {
        return None;
    }

    let kind = if path.ends_with('/') {
        LinkKind::Directory
    } else {
        LinkKind::File
    };
    Some(Link {
        path: path.to_string(),
        kind,
    })
}

/// Validates `origin` and makes sure its path ends with `/`.
///
/// # Errors
///
/// Returns [`DiscoveryError::InvalidOrigin`] if `origin` does not parse or
/// its scheme is not http or https.
pub fn normalize_origin(origin: &str) -> Result<String, DiscoveryError> {
    let invalid = |reason: String| DiscoveryError::InvalidOrigin {
        origin: origin.to_string(),
        reason,
    };

    let mut url = Url::parse(origin.trim()).map_err(|e| invalid(e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme '{}'", url.scheme())));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url.to_string())
}

/// Appends `relative` to `base`, percent-encoding each path segment.
///
/// `base` must end with `/`. Separators in `relative` are kept, including a
/// trailing one.
#[must_use]
pub fn join_relative(base: &str, relative: &str) -> String {
    let encoded: Vec<_> = relative.split('/').map(urlencoding::encode).collect();
    format!("{base}{}", encoded.join("/"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_link_file_and_directory() {
        assert_eq!(
            classify_link("./a.mp4"),
            Some(Link {
                path: "a.mp4".into(),
                kind: LinkKind::File
            })
        );
        assert_eq!(
            classify_link("./Season 1/"),
            Some(Link {
                path: "Season 1/".into(),
                kind: LinkKind::Directory
            })
        );
    }

    #[test]
    fn test_classify_link_drops_parent_references() {
        assert_eq!(classify_link("../"), None);
        assert_eq!(classify_link(".."), None);
        assert_eq!(classify_link("./x/../y"), None);
        assert_eq!(classify_link("./.."), None);
    }

    #[test]
    fn test_classify_link_drops_foreign_links() {
        assert_eq!(classify_link("a.mp4"), None);
        assert_eq!(classify_link("/abs/a.mp4"), None);
        assert_eq!(classify_link("http://other/a.mp4"), None);
        assert_eq!(classify_link("?C=N;O=D"), None);
        assert_eq!(classify_link("./"), None);
        assert_eq!(classify_link(".//etc/passwd"), None);
    }

    #[test]
    fn test_normalize_origin_appends_slash() {
        assert_eq!(
            normalize_origin("https://example.com/files").unwrap(),
            "https://example.com/files/"
        );
        assert_eq!(
            normalize_origin("http://example.com/files/").unwrap(),
            "http://example.com/files/"
        );
        assert_eq!(
            normalize_origin("https://example.com").unwrap(),
            "https://example.com/"
        );
    }

    #[test]
    fn test_normalize_origin_rejects_bad_input() {
        assert!(matches!(
            normalize_origin("not a url"),
            Err(DiscoveryError::InvalidOrigin { .. })
        ));
        let err = normalize_origin("ftp://example.com/").unwrap_err();
        assert!(err.to_string().contains("unsupported scheme 'ftp'"));
    }

    #[test]
    fn test_join_relative_encodes_segments() {
        assert_eq!(
            join_relative("https://example.com/files/", "s 1/ep #1.mp4"),
            "https://example.com/files/s%201/ep%20%231.mp4"
        );
        assert_eq!(
            join_relative("https://example.com/", "Season 1/"),
            "https://example.com/Season%201/"
        );
        assert_eq!(join_relative("https://h/", "a.mp4"), "https://h/a.mp4");
    }
}
