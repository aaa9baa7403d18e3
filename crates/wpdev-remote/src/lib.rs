//! Remote services consulted by wpdev.
//!
//! The hosting API answers application and environment metadata and accepts
//! analytics events; a static JSON document lists the published WordPress
//! image versions. Each concern sits behind a small trait so the prompt flow
//! and the SQL validators can run against in-memory doubles.

pub mod config;
pub mod http;

pub use config::ApiConfig;
pub use http::ApiClient;

use serde_json::Value;
use thiserror::Error;
use wpdev_schema::{AppInfo, VersionRecord};

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("remote I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("HTTP error: {0}")]
    Http(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("serialization error: {0}")]
    Serialization(String),
    #[error("api config error: {0}")]
    Config(String),
}

/// Source of the WordPress image versions offered at the prompt.
pub trait VersionSource {
    fn version_list(&self) -> Result<Vec<VersionRecord>, RemoteError>;
}

/// Application metadata kept by the hosting platform.
pub trait SiteMeta {
    /// Fetch an application, scoped to one environment when `env` is given.
    fn app_info(&self, app: &str, env: Option<&str>) -> Result<AppInfo, RemoteError>;

    fn is_multisite_in_site_meta(&self, app: &str, env: Option<&str>) -> Result<bool, RemoteError> {
        let info = self.app_info(app, env)?;
        Ok(info.environment.is_some_and(|e| e.is_multisite))
    }
}

pub trait Tracker {
    fn track_event_with_env(
        &self,
        app: &str,
        env: Option<&str>,
        event: &str,
        payload: &Value,
    ) -> Result<(), RemoteError>;
}

/// Tracker that drops every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopTracker;

impl Tracker for NoopTracker {
    fn track_event_with_env(
        &self,
        app: &str,
        _env: Option<&str>,
        event: &str,
        _payload: &Value,
    ) -> Result<(), RemoteError> {
        tracing::debug!("tracking disabled, dropping {event} for {app}");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wpdev_schema::AppEnvironment;

    struct FixedMeta(AppInfo);

    impl SiteMeta for FixedMeta {
        fn app_info(&self, _app: &str, _env: Option<&str>) -> Result<AppInfo, RemoteError> {
            Ok(self.0.clone())
        }
    }

    #[test]
    fn multisite_follows_environment_flag() {
        let meta = FixedMeta(AppInfo {
            id: Some(1),
            name: Some("blog".to_owned()),
            environment: Some(AppEnvironment {
                is_multisite: true,
                ..AppEnvironment::default()
            }),
        });
        assert!(meta.is_multisite_in_site_meta("blog", Some("production")).unwrap());
    }

    #[test]
    fn missing_environment_is_single_site() {
        let meta = FixedMeta(AppInfo::default());
        assert!(!meta.is_multisite_in_site_meta("blog", None).unwrap());
    }

    #[test]
    fn noop_tracker_accepts_everything() {
        NoopTracker
            .track_event_with_env("blog", None, "anything", &Value::Null)
            .unwrap();
    }
}
