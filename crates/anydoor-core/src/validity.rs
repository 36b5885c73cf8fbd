//! Path denylist and extension checks shared by the gateway classifier and the
//! validity check run before generation or trend recording.

use std::borrow::Cow;
use std::collections::HashSet;

use percent_encoding::percent_decode_str;

use crate::rules::ClassifierRules;

/// Upper bound on the decoded path length, in characters.
pub const MAX_PATH_CHARS: usize = 200;

/// Why a path was refused by [`PathRules::validate_search_path`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathRejection {
    Empty,
    TooLong,
    Blacklisted,
    BlockedExtension,
}

impl std::fmt::Display for PathRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PathRejection::Empty => write!(f, "path is empty"),
            PathRejection::TooLong => {
                write!(f, "decoded path exceeds {MAX_PATH_CHARS} characters")
            }
            PathRejection::Blacklisted => write!(f, "path is on the denylist"),
            PathRejection::BlockedExtension => write!(f, "path has a blocked file extension"),
        }
    }
}

/// Lower-cased denylist and extension sets.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathRules {
    blocked_paths: HashSet<String>,
    blocked_extensions: HashSet<String>,
}

impl PathRules {
    #[must_use]
    pub fn new<P, E>(blocked_paths: P, blocked_extensions: E) -> Self
    where
        P: IntoIterator,
        P::Item: AsRef<str>,
        E: IntoIterator,
        E::Item: AsRef<str>,
    {
        let blocked_paths = blocked_paths
            .into_iter()
            .map(|p| p.as_ref().trim_matches('/').to_lowercase())
            .filter(|p| !p.is_empty())
            .collect();
        let blocked_extensions = blocked_extensions
            .into_iter()
            .map(|e| {
                let e = e.as_ref().trim().to_lowercase();
                if e.starts_with('.') {
                    e
                } else {
                    format!(".{e}")
                }
            })
            .filter(|e| e.len() > 1)
            .collect();
        Self {
            blocked_paths,
            blocked_extensions,
        }
    }

    #[must_use]
    pub fn from_rules(rules: &ClassifierRules) -> Self {
        Self::new(&rules.blocked_paths, &rules.blocked_extensions)
    }

    /// True when the whole path, or its first segment, is on the denylist.
    ///
    /// Leading and trailing slashes are stripped and the comparison is
    /// case-insensitive. An empty path is never blacklisted.
    #[must_use]
    pub fn is_blacklisted(&self, path: &str) -> bool {
        let normalized = path.trim_matches('/').to_lowercase();
        if normalized.is_empty() {
            return false;
        }
        if self.blocked_paths.contains(&normalized) {
            return true;
        }
        let first_segment = normalized.split('/').next().unwrap_or_default();
        self.blocked_paths.contains(first_segment)
    }

    /// True when the last path segment ends in a blocked extension.
    ///
    /// The extension is everything from the final `.` of the last segment, so
    /// `archive.tar.gz` is judged by `.gz`. A trailing slash leaves an empty
    /// last segment, which has no extension.
    #[must_use]
    pub fn has_blocked_extension(&self, path: &str) -> bool {
        let lowered = path.to_lowercase();
        let last_segment = lowered.rsplit('/').next().unwrap_or_default();
        match last_segment.rfind('.') {
            Some(idx) => self.blocked_extensions.contains(&last_segment[idx..]),
            None => false,
        }
    }

    /// Validity check for paths that are about to be generated or recorded.
    ///
    /// # Errors
    ///
    /// Returns the first [`PathRejection`] that applies, checked in order:
    /// empty, too long after decoding, blacklisted, blocked extension.
    pub fn validate_search_path(&self, path: &str) -> Result<(), PathRejection> {
        if path.trim().is_empty() {
            return Err(PathRejection::Empty);
        }
        if decode_path(path).chars().count() > MAX_PATH_CHARS {
            return Err(PathRejection::TooLong);
        }
        if self.is_blacklisted(path) {
            return Err(PathRejection::Blacklisted);
        }
        if self.has_blocked_extension(path) {
            return Err(PathRejection::BlockedExtension);
        }
        Ok(())
    }

    #[must_use]
    pub fn is_valid_search_path(&self, path: &str) -> bool {
        self.validate_search_path(path).is_ok()
    }
}

/// Percent-decode a request path, falling back to the raw text when the
/// decoded bytes are not valid UTF-8.
#[must_use]
pub fn decode_path(raw: &str) -> Cow<'_, str> {
    percent_decode_str(raw)
        .decode_utf8()
        .unwrap_or(Cow::Borrowed(raw))
}
