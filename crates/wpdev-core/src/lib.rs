//! Core flows for wpdev environments.
//!
//! This crate ties the data model, the remote services, and the container
//! runtime together: the interactive prompt flow that resolves an
//! `InstanceData`, the per-slug instance store with its advisory lock, the
//! compose and app definition generator, the `Environments` facade driving
//! the lifecycle, and the line-by-line SQL dump validators.

pub mod compose;
pub mod concurrency;
pub mod environment;
pub mod prompt;
pub mod store;
pub mod validation;

pub use compose::{app_definition, compose_file, write_instance_files, COMPOSE_FILE};
pub use concurrency::InstanceLock;
pub use environment::{EnvironmentSummary, Environments};
pub use prompt::{
    process_component, prompt_for_arguments, prompt_for_component, tag_choices, Prompter,
};
pub use store::{InstanceRecord, InstanceStore, INSTANCE_FILE};
pub use validation::site_type::SiteTypeValidation;
pub use validation::{validate_lines, LineValidation, ValidationError, ValidationParams};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("compose file error: {0}")]
    Compose(#[from] serde_yaml::Error),
    #[error(transparent)]
    Schema(#[from] wpdev_schema::SchemaError),
    #[error(transparent)]
    Runtime(#[from] wpdev_runtime::RuntimeError),
    #[error(transparent)]
    Remote(#[from] wpdev_remote::RemoteError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// Renders as the sentinel the CLI turns into a "run create" hint.
    #[error("Environment not found.")]
    EnvironmentNotFound(String),
    #[error("environment '{0}' already exists")]
    EnvironmentExists(String),
    #[error("environment '{0}' is in use by another wpdev process")]
    Locked(String),
    #[error("prompt failed: {0}")]
    Prompt(String),
}

#[cfg(test)]
pub(crate) fn sample_instance(slug: &str) -> wpdev_schema::InstanceData {
    use wpdev_schema::ComponentConfig;
    wpdev_schema::InstanceData {
        site_slug: slug.to_owned(),
        wp_title: "Test Site".to_owned(),
        multisite: false,
        wordpress: ComponentConfig::Image {
            tag: Some("6.4".to_owned()),
        },
        mu_plugins: ComponentConfig::image(),
        client_code: ComponentConfig::image(),
        statsd: false,
        phpmyadmin: false,
        xdebug: false,
        elasticsearch: "7.10.1".to_owned(),
        mariadb: "10.3".to_owned(),
        media_redirect_domain: String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_renders_sentinel() {
        let err = CoreError::EnvironmentNotFound("site".to_owned());
        assert_eq!(err.to_string(), wpdev_schema::defaults::ENVIRONMENT_NOT_FOUND);
    }
}
