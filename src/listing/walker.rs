//! Depth-first expansion of a listing tree into leaf identifiers.

use std::collections::{HashSet, VecDeque};

use tracing::{debug, info, instrument, warn};

use super::parser::parse_links;
use super::{DiscoveryError, Link, LinkKind, classify_link, join_relative, normalize_origin};
use crate::cache::ResponseCache;
use crate::download::Fetcher;

/// Default limit on listing nesting below the origin.
pub const DEFAULT_MAX_DEPTH: usize = 32;

/// One listing being consumed: the links still to visit and where they live.
struct Frame {
    /// Path of this listing relative to the origin (empty or ending in `/`).
    prefix: String,
    depth: usize,
    pending: VecDeque<Link>,
}

/// Walks a directory-listing tree through a [`ResponseCache`].
///
/// The walk is iterative: each expanded listing pushes a frame, so output
/// order is depth-first and follows document order at every level. A
/// listing URL is expanded at most once and listings nested deeper than
/// `max_depth` are skipped.
pub struct ListingWalker<'a> {
    cache: &'a mut ResponseCache,
    fetcher: &'a dyn Fetcher,
    max_depth: usize,
}

impl<'a> ListingWalker<'a> {
    /// Creates a walker with [`DEFAULT_MAX_DEPTH`].
    pub fn new(cache: &'a mut ResponseCache, fetcher: &'a dyn Fetcher) -> Self {
        Self {
            cache,
            fetcher,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// Sets how many directory levels below the origin are expanded.
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Returns every leaf identifier under `origin`, relative to `origin`.
    ///
    /// # Errors
    ///
    /// Returns [`DiscoveryError::InvalidOrigin`] for a non-HTTP origin and
    /// [`DiscoveryError::ListingFetch`] if any listing cannot be retrieved;
    /// no partial result is returned in that case.
    #[instrument(skip(self), fields(max_depth = self.max_depth))]
    pub async fn discover(&mut self, origin: &str) -> Result<Vec<String>, DiscoveryError> {
        let origin = normalize_origin(origin)?;
        let mut visited = HashSet::from([origin.clone()]);
        let mut emitted = HashSet::new();
        let mut resources = Vec::new();

        let root = self.expand(&origin).await?;
        let mut stack = vec![Frame {
            prefix: String::new(),
            depth: 0,
            pending: root,
        }];

        while let Some(frame) = stack.last_mut() {
            let Some(link) = frame.pending.pop_front() else {
                stack.pop();
                continue;
            };
            let relative = format!("{}{}", frame.prefix, link.path);
            let depth = frame.depth + 1;

            match link.kind {
                LinkKind::File => {
                    if emitted.insert(relative.clone()) {
                        debug!(resource = %relative, "found resource");
                        resources.push(relative);
                    }
                }
                LinkKind::Directory => {
                    if depth > self.max_depth {
                        warn!(listing = %relative, max_depth = self.max_depth, "listing too deep, skipping");
                        continue;
                    }
                    let url = join_relative(&origin, &relative);
                    if !visited.insert(url.clone()) {
                        warn!(url = %url, "listing already visited, skipping");
                        continue;
                    }
                    let pending = self.expand(&url).await?;
                    stack.push(Frame {
                        prefix: relative,
                        depth,
                        pending,
                    });
                }
            }
        }

        info!(resources = resources.len(), listings = visited.len(), "discovery finished");
        Ok(resources)
    }

    /// Fetches one listing and keeps its same-tree links.
    async fn expand(&mut self, url: &str) -> Result<VecDeque<Link>, DiscoveryError> {
        let body = self
            .cache
            .get_or_fetch(self.fetcher, url)
            .await
            .map_err(|source| DiscoveryError::ListingFetch {
                url: url.to_string(),
                source,
            })?;

        let hrefs = parse_links(&body);
        let total = hrefs.len();
        let links: VecDeque<Link> = hrefs.iter().filter_map(|h| classify_link(h)).collect();
        debug!(url = %url, anchors = total, kept = links.len(), "parsed listing");
        Ok(links)
    }
}
