//! Newtype wrappers for string identifiers.

use crate::SchemaError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Deref;

/// Stable identifier of one provisioned environment; also its directory name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Slug(String);

impl Slug {
    /// Validate and wrap a slug. Slugs become directory and compose project
    /// names, so they are restricted to lowercase alphanumerics and `-`.
    pub fn parse(s: impl Into<String>) -> Result<Self, SchemaError> {
        let s = s.into();
        let valid = !s.is_empty()
            && s.len() <= 64
            && s
                .bytes()
                .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-');
        if valid {
            Ok(Self(s))
        } else {
            Err(SchemaError::InvalidSlug(s))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }

    /// Compose project name: `wpdev` followed by the slug without dashes.
    pub fn project_name(&self) -> String {
        format!("wpdev{}", self.0.replace('-', ""))
    }
}

impl Deref for Slug {
    type Target = str;
    fn deref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Slug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Slug {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl AsRef<std::path::Path> for Slug {
    fn as_ref(&self) -> &std::path::Path {
        std::path::Path::new(&self.0)
    }
}
