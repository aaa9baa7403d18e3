//! WordPress version choices offered by the create/update prompts.

use crate::SchemaError;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// Offered when the published version list is empty or unreachable.
pub const FALLBACK_TAGS: [&str; 5] = ["5.9", "5.8", "5.7", "5.6", "5.5"];

const PRERELEASE_MARKER: &str = "(Pre-Release)";

/// One entry of the published WordPress image version list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionRecord {
    pub tag: String,
    #[serde(rename = "ref")]
    pub git_ref: String,
    #[serde(default)]
    pub prerelease: bool,
    #[serde(default)]
    pub locked: bool,
    #[serde(default)]
    pub cacheable: bool,
}

/// Render a record as a select-list line, e.g. `5.7   →  5.7.5`.
pub fn format_version(version: &VersionRecord) -> String {
    let width = 8usize.saturating_sub(version.tag.len());
    let tag = format!("{:<width$}", version.tag);
    let prerelease = if version.prerelease {
        PRERELEASE_MARKER
    } else {
        ""
    };
    let mapping = if version.tag == version.git_ref {
        String::new()
    } else {
        format!("→ {prerelease} {}", version.git_ref)
    };
    format!("{tag} {mapping}")
}

/// Formatted choices, newest first.
pub fn tag_choices_from(versions: &[VersionRecord]) -> Vec<String> {
    if versions.is_empty() {
        return FALLBACK_TAGS.iter().map(|t| (*t).to_owned()).collect();
    }

    let mut choices: Vec<String> = versions.iter().map(format_version).collect();
    choices.sort();
    choices.reverse();
    choices
}

/// Index of the preselected choice: a matching prior tag, else the first stable release.
pub fn default_tag_index(choices: &[String], default_tag: Option<&str>) -> usize {
    if let Some(tag) = default_tag {
        if let Some(idx) = choices.iter().position(|c| c == tag) {
            return idx;
        }
    }
    choices
        .iter()
        .position(|c| !c.contains("Pre-Release"))
        .unwrap_or(0)
}

fn tag_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\d+\.\d+(?:\.\d+)?)").expect("valid tag regex"))
}

/// Pull the first version-looking token out of a selected choice.
pub fn extract_tag(option: &str) -> Result<String, SchemaError> {
    tag_regex()
        .captures(option)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_owned())
        .ok_or_else(|| SchemaError::InvalidVersionSelection(option.to_owned()))
}
