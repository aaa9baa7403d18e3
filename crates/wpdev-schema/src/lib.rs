//! Configuration records and pure helpers for wpdev instances.
//!
//! This crate defines the data model shared by every other crate: the
//! preselected/default option set (`InstanceOptions`), the resolved record
//! handed to the orchestration layer (`InstanceData`), per-component source
//! descriptors (`ComponentConfig`), environment naming, component option
//! parsing, and WordPress version-choice formatting.

pub mod component;
pub mod defaults;
pub mod instance;
pub mod naming;
pub mod types;
pub mod version;

pub use component::{process_component_option_input, resolve_path, Component};
pub use instance::{
    options_from_app_info, AppEnvironment, AppInfo, ComponentConfig, InstanceData,
    InstanceOptions,
};
pub use naming::{environment_name, environment_start_command, EnvironmentNameOptions};
pub use types::Slug;
pub use version::{
    default_tag_index, extract_tag, format_version, tag_choices_from, VersionRecord,
    FALLBACK_TAGS,
};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("Invalid WordPress selection: {0}")]
    InvalidVersionSelection(String),
    #[error(
        "invalid environment slug '{0}': use 1-64 lowercase letters, digits or '-' (e.g. --slug my-site)"
    )]
    InvalidSlug(String),
    #[error("failed to parse instance data: {0}")]
    Parse(#[from] serde_json::Error),
}
