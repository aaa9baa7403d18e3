//! Streaming checks over SQL dump files.
//!
//! Each validation sees every line of the dump once, then gets a single
//! chance to act on what it accumulated.

pub mod site_type;

use crate::CoreError;
use std::io::BufRead;
use thiserror::Error;
use wpdev_remote::{SiteMeta, Tracker};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error(
        "You have provided a multisite SQL dump file for import into a single site (non-multisite)."
    )]
    MultisiteDumpForSingleSite,
    #[error(
        "You have requested a subsite SQL import but have not provided a subsite compatible SQL dump."
    )]
    SingleSiteDumpForMultisite,
}

/// The application and environment a dump is destined for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationParams {
    pub app_id: String,
    pub env_id: Option<String>,
}

pub trait LineValidation {
    fn execute(&mut self, line: &str);

    fn post_line_execution_processing(
        &self,
        params: &ValidationParams,
        site_meta: &dyn SiteMeta,
        tracker: &dyn Tracker,
    ) -> Result<(), CoreError>;
}

/// Feed every line of `reader` to each validation, then run their post-scan checks.
///
/// Lines are decoded lossily so binary blobs inside a dump do not abort the
/// scan. Returns the number of lines read.
pub fn validate_lines<R: BufRead>(
    mut reader: R,
    validations: &mut [&mut dyn LineValidation],
    params: &ValidationParams,
    site_meta: &dyn SiteMeta,
    tracker: &dyn Tracker,
) -> Result<u64, CoreError> {
    let mut buf = Vec::new();
    let mut lines = 0u64;
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            break;
        }
        lines += 1;
        let line = String::from_utf8_lossy(&buf);
        let line = line.trim_end_matches(['\n', '\r']);
        for validation in validations.iter_mut() {
            validation.execute(line);
        }
    }
    tracing::debug!("scanned {lines} lines");

    for validation in validations.iter() {
        validation.post_line_execution_processing(params, site_meta, tracker)?;
    }
    Ok(lines)
}
