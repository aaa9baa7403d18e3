//! Fallback values used when neither a flag nor a prompt default is present.

pub const DEFAULT_SLUG: &str = "vip-local";
pub const DEFAULT_TITLE: &str = "WordPress Dev";
pub const DEFAULT_MULTISITE: bool = false;
pub const DEFAULT_ELASTICSEARCH_VERSION: &str = "7.10.1";
pub const DEFAULT_MARIADB_VERSION: &str = "10.3";

/// Sentinel message the CLI maps to a "run create" hint.
pub const ENVIRONMENT_NOT_FOUND: &str = "Environment not found.";

pub const CLI_NAME: &str = "wpdev";

pub const PROMPT_INTRO: &str = "This is a wizard to help you set up your local dev environment.\n\n\
Sensible default values were pre-selected for convenience. You may also choose to create multiple \
environments with different settings using the --slug option.\n";
