//! Output-name rewriting for downloaded resources.
//!
//! Different source sites tag their files differently (release group tags,
//! resolution markers, ...). The engine asks an [`OutputNameTransform`] for
//! the local name of each identifier so those rules stay out of the core.

use std::fmt::Debug;

/// Maps a relative resource identifier to its local file name.
///
/// Implementations must be pure: the same identifier always yields the same
/// name, since the name is what the skip-existing check looks for.
pub trait OutputNameTransform: Send + Sync + Debug {
    /// Returns the local relative path for `identifier`.
    fn output_name(&self, identifier: &str) -> String;
}

/// Keeps the identifier unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct Identity;

impl OutputNameTransform for Identity {
    fn output_name(&self, identifier: &str) -> String {
        identifier.to_string()
    }
}

/// Removes every occurrence of each configured substring.
///
/// Removal is applied per path segment so a pattern can never erase a
/// separator and merge two directories. A segment that would become empty,
/// `.` or `..` keeps its original text.
#[derive(Debug, Clone, Default)]
pub struct StripSubstrings {
    patterns: Vec<String>,
}

impl StripSubstrings {
    /// Creates a transform removing `patterns`; empty patterns are ignored.
    #[must_use]
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            patterns: patterns
                .into_iter()
                .map(Into::into)
                .filter(|p| !p.is_empty())
                .collect(),
        }
    }

    /// Returns true when no pattern is configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

impl OutputNameTransform for StripSubstrings {
    fn output_name(&self, identifier: &str) -> String {
        identifier
            .split('/')
            .map(|segment| {
                let stripped = self
                    .patterns
                    .iter()
                    .fold(segment.to_string(), |acc, p| acc.replace(p.as_str(), ""));
                if stripped.trim().is_empty() || stripped == "." || stripped == ".." {
                    segment.to_string()
                } else {
                    stripped
                }
            })
            .collect::<Vec<_>>()
            .join("/")
    }
}
