//! File extension allow-list

use serde::Serialize;

use crate::error::{Error, Result};

/// Extensions used when the caller does not supply any
pub const DEFAULT_EXTENSIONS: [&str; 2] = [".js", ".ts"];

/// Ordered, non-empty set of case-insensitive file name suffixes
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AllowedExtensions {
    suffixes: Vec<String>,
}

impl AllowedExtensions {
    /// Build the set from caller input
    ///
    /// Blank entries are ignored and duplicates collapsed. An empty result is
    /// rejected: the traversal requires at least one suffix.
    pub fn new<I, S>(suffixes: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut normalized: Vec<String> = Vec::new();
        for suffix in suffixes {
            let suffix = suffix.as_ref().trim().to_lowercase();
            if !suffix.is_empty() && !normalized.contains(&suffix) {
                normalized.push(suffix);
            }
        }

        if normalized.is_empty() {
            return Err(Error::Config(
                "at least one file extension is required".to_string(),
            ));
        }

        Ok(Self {
            suffixes: normalized,
        })
    }

    /// Caller-facing normalization: empty input falls back to `.js` and `.ts`
    pub fn or_default<I, S>(suffixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::new(suffixes).unwrap_or_default()
    }

    /// Case-insensitive suffix match on a file name
    pub fn matches(&self, file_name: &str) -> bool {
        let name = file_name.to_lowercase();
        self.suffixes.iter().any(|s| name.ends_with(s.as_str()))
    }

    pub fn as_slice(&self) -> &[String] {
        &self.suffixes
    }
}

impl Default for AllowedExtensions {
    fn default() -> Self {
        Self {
            suffixes: DEFAULT_EXTENSIONS.iter().map(|s| s.to_string()).collect(),
        }
    }
}
