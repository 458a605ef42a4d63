//! Logical path <-> storage key translation
//!
//! Logical paths are adapter-relative and never carry the configured root.
//! Storage keys are what the backend sees: root prefix + path, leading
//! delimiters dropped.
//! Directory keys differ from file keys only by the trailing delimiter.

use crate::core::client::DELIMITER;

/// Maps logical paths onto storage keys under a fixed root prefix
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPrefixer {
    /// Normalized root, either empty or ending with exactly one delimiter
    prefix: String,
}

impl PathPrefixer {
    /// Create a prefixer for the given root
    ///
    /// Leading and trailing delimiters are dropped and runs of delimiters
    /// collapse, so `"/uploads//2024/"` becomes `"uploads/2024/"`. An empty root
    /// (or `"/"`) maps logical paths to keys unchanged.
    pub fn new(root: &str) -> Self {
        let trimmed = collapse_delimiters(root.trim_matches('/'));
        let prefix = if trimmed.is_empty() {
            String::new()
        } else {
            format!("{}{}", trimmed, DELIMITER)
        };
        PathPrefixer { prefix }
    }

    /// The normalized root prefix
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// File-style key for a logical path
    ///
    /// Only leading delimiters are dropped; the rest of `path` is kept byte for
    /// byte, so keys such as `a//b.txt` stay addressable. A trailing delimiter
    /// is preserved; pass a directory path only when a directory key is
    /// intended.
    pub fn prefix_path(&self, path: &str) -> String {
        let relative = path.trim_start_matches('/');
        let mut key = String::with_capacity(self.prefix.len() + relative.len());
        key.push_str(&self.prefix);
        key.push_str(relative);
        key
    }

    /// Directory key for a logical path, ending with exactly one delimiter
    ///
    /// The bucket root itself (empty root, empty path) is the empty key.
    pub fn prefix_directory_path(&self, path: &str) -> String {
        let mut key = self.prefix_path(path.trim_end_matches('/'));
        if !key.is_empty() && !key.ends_with(DELIMITER) {
            key.push_str(DELIMITER);
        }
        key
    }

    /// Logical path for a storage key
    ///
    /// Keys outside the root are returned unchanged; every key this adapter
    /// handles was produced by [`prefix_path`](Self::prefix_path) first.
    pub fn strip_prefix<'k>(&self, key: &'k str) -> &'k str {
        key.strip_prefix(self.prefix.as_str()).unwrap_or(key)
    }

    /// Logical directory path for a storage key, without its trailing delimiter
    ///
    /// Exactly one delimiter is removed, so `a//` names `a/` and never
    /// collides with the directory `a`.
    pub fn strip_directory_prefix<'k>(&self, key: &'k str) -> &'k str {
        let relative = self.strip_prefix(key);
        relative.strip_suffix('/').unwrap_or(relative)
    }
}

impl Default for PathPrefixer {
    fn default() -> Self {
        PathPrefixer::new("")
    }
}

fn collapse_delimiters(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    let mut previous_was_delimiter = false;
    for c in path.chars() {
        if c == '/' {
            if !previous_was_delimiter {
                out.push(c);
            }
            previous_was_delimiter = true;
        } else {
            out.push(c);
            previous_was_delimiter = false;
        }
    }
    out
}
