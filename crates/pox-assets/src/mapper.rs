//! Path mapping applied to archive entries.

use regex::Regex;
use std::fmt;
use std::sync::Arc;

type MapFn = dyn Fn(&str) -> String + Send + Sync;

/// Translates an archive-internal path to the path used in the file set.
///
/// The wrapped function returns an empty string to drop an entry. The
/// default mapper keeps every path unchanged.
#[derive(Clone)]
pub struct PathMapper {
    inner: Option<Arc<MapFn>>,
}

impl PathMapper {
    /// Keep every path unchanged
    pub fn identity() -> Self {
        Self { inner: None }
    }

    /// Wrap an arbitrary mapping function
    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        Self {
            inner: Some(Arc::new(f)),
        }
    }

    /// Drop paths not matching `pattern`, rewrite the rest with `replacement`.
    ///
    /// The replacement uses the `regex` crate syntax (`$1`, `${name}`). Every
    /// match in the path is replaced.
    pub fn regex(pattern: &str, replacement: &str) -> Result<Self, regex::Error> {
        let re = Regex::new(pattern)?;
        let replacement = replacement.to_string();

        Ok(Self::custom(move |path| {
            if !re.is_match(path) {
                return String::new();
            }
            re.replace_all(path, replacement.as_str()).into_owned()
        }))
    }

    /// Map a path, returning `None` if the entry should be dropped
    pub fn map(&self, path: &str) -> Option<String> {
        let mapped = match &self.inner {
            Some(f) => f(path),
            None => path.to_string(),
        };

        if mapped.is_empty() {
            None
        } else {
            Some(mapped)
        }
    }

    pub fn is_identity(&self) -> bool {
        self.inner.is_none()
    }
}

impl Default for PathMapper {
    fn default() -> Self {
        Self::identity()
    }
}

impl fmt::Debug for PathMapper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_identity() {
            f.write_str("PathMapper(identity)")
        } else {
            f.write_str("PathMapper(custom)")
        }
    }
}
