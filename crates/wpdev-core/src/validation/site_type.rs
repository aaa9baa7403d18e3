use super::{LineValidation, ValidationError, ValidationParams};
use crate::CoreError;
use regex::Regex;
use serde_json::json;
use std::sync::OnceLock;
use tracing::{debug, warn};
use wpdev_remote::{SiteMeta, Tracker};

pub const IMPORT_ERROR_EVENT: &str = "import_sql_command_error";

fn multisite_table_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^\s*CREATE TABLE\s+(?:IF NOT EXISTS\s+)?`?wp_\d+_[a-z0-9_]+")
            .expect("valid multisite table regex")
    })
}

/// Whether a dump line creates a per-subsite table such as `wp_2_posts`.
pub fn sql_dump_line_is_multisite(line: &str) -> bool {
    multisite_table_regex().is_match(line)
}

/// Cross-checks the dump's site type against the destination site.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SiteTypeValidation {
    is_multisite_dump: bool,
}

impl SiteTypeValidation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_multisite_dump(&self) -> bool {
        self.is_multisite_dump
    }

    fn fail(
        params: &ValidationParams,
        tracker: &dyn Tracker,
        error: ValidationError,
        error_type: &str,
    ) -> CoreError {
        let payload = json!({ "error_type": error_type });
        if let Err(e) = tracker.track_event_with_env(
            &params.app_id,
            params.env_id.as_deref(),
            IMPORT_ERROR_EVENT,
            &payload,
        ) {
            warn!("failed to track {IMPORT_ERROR_EVENT}: {e}");
        }
        error.into()
    }
}

impl LineValidation for SiteTypeValidation {
    fn execute(&mut self, line: &str) {
        if !self.is_multisite_dump && sql_dump_line_is_multisite(line) {
            self.is_multisite_dump = true;
        }
    }

    fn post_line_execution_processing(
        &self,
        params: &ValidationParams,
        site_meta: &dyn SiteMeta,
        tracker: &dyn Tracker,
    ) -> Result<(), CoreError> {
        let is_multisite =
            site_meta.is_multisite_in_site_meta(&params.app_id, params.env_id.as_deref())?;

        debug!(
            "app {} is {}",
            params.app_id,
            if is_multisite { "a multisite" } else { "not a multisite" }
        );
        debug!(
            "the SQL dump is {}",
            if self.is_multisite_dump {
                "from a multisite"
            } else {
                "not from a multisite"
            }
        );

        match (is_multisite, self.is_multisite_dump) {
            (false, true) => Err(Self::fail(
                params,
                tracker,
                ValidationError::MultisiteDumpForSingleSite,
                "not-multisite-with-multisite-sql-dump",
            )),
            (true, false) => Err(Self::fail(
                params,
                tracker,
                ValidationError::SingleSiteDumpForMultisite,
                "subsite-import-without-subsite-sql-dump",
            )),
            _ => Ok(()),
        }
    }
}
