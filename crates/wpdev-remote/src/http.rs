use crate::{ApiConfig, RemoteError, SiteMeta, Tracker, VersionSource};
use serde_json::{json, Value};
use std::io::Read;
use std::time::Duration;
use wpdev_schema::{AppInfo, VersionRecord};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP client for the hosting API and the version list.
///
/// Routes used:
/// - `GET  <versions_url>`                       version list (JSON array)
/// - `GET  /apps/<app>`                          application record
/// - `GET  /apps/<app>/environments/<env>`       application scoped to one environment
/// - `POST /events`                              analytics event
pub struct ApiClient {
    config: ApiConfig,
    agent: ureq::Agent,
}

impl ApiClient {
    pub fn new(config: ApiConfig) -> Self {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(REQUEST_TIMEOUT))
            .build()
            .into();
        Self { config, agent }
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    fn app_url(&self, app: &str, env: Option<&str>) -> String {
        match env.filter(|e| !e.is_empty()) {
            Some(env) => format!("{}/apps/{app}/environments/{env}", self.config.api_url),
            None => format!("{}/apps/{app}", self.config.api_url),
        }
    }

    fn do_get(&self, url: &str, authenticated: bool) -> Result<Vec<u8>, RemoteError> {
        let mut req = self.agent.get(url).header("Accept", "application/json");
        if authenticated {
            if let Some(ref token) = self.config.auth_token {
                req = req.header("Authorization", &format!("Bearer {token}"));
            }
        }
        let resp = match req.call() {
            Ok(r) => r,
            Err(ureq::Error::StatusCode(404)) => {
                return Err(RemoteError::NotFound(url.to_owned()));
            }
            Err(ureq::Error::StatusCode(code)) => {
                return Err(RemoteError::Http(format!("HTTP {code} for {url}")));
            }
            Err(e) => {
                return Err(RemoteError::Http(e.to_string()));
            }
        };

        let mut reader = resp.into_body().into_reader();
        let mut body = Vec::new();
        reader
            .read_to_end(&mut body)
            .map_err(|e| RemoteError::Http(e.to_string()))?;
        Ok(body)
    }

    fn do_post_json(&self, url: &str, body: &Value) -> Result<(), RemoteError> {
        let data =
            serde_json::to_vec(body).map_err(|e| RemoteError::Serialization(e.to_string()))?;
        let mut req = self
            .agent
            .post(url)
            .header("Content-Type", "application/json");
        if let Some(ref token) = self.config.auth_token {
            req = req.header("Authorization", &format!("Bearer {token}"));
        }
        match req.send(data.as_slice()) {
            Ok(_) => Ok(()),
            Err(ureq::Error::StatusCode(code)) => {
                Err(RemoteError::Http(format!("HTTP {code} for POST {url}")))
            }
            Err(e) => Err(RemoteError::Http(e.to_string())),
        }
    }
}

impl VersionSource for ApiClient {
    fn version_list(&self) -> Result<Vec<VersionRecord>, RemoteError> {
        let url = &self.config.versions_url;
        tracing::debug!("GET {url}");
        let body = self.do_get(url, false)?;
        serde_json::from_slice(&body).map_err(|e| RemoteError::Serialization(e.to_string()))
    }
}

impl SiteMeta for ApiClient {
    fn app_info(&self, app: &str, env: Option<&str>) -> Result<AppInfo, RemoteError> {
        let url = self.app_url(app, env);
        tracing::debug!("GET {url}");
        let body = self.do_get(&url, true)?;
        serde_json::from_slice(&body).map_err(|e| RemoteError::Serialization(e.to_string()))
    }
}

impl Tracker for ApiClient {
    fn track_event_with_env(
        &self,
        app: &str,
        env: Option<&str>,
        event: &str,
        payload: &Value,
    ) -> Result<(), RemoteError> {
        if !self.config.tracking {
            tracing::debug!("tracking disabled, dropping {event}");
            return Ok(());
        }
        let url = format!("{}/events", self.config.api_url);
        tracing::debug!("POST {url} ({event})");
        let body = json!({
            "event": event,
            "app_id": app,
            "env_id": env,
            "properties": payload,
        });
        self.do_post_json(&url, &body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn app_url_scopes_environment() {
        let client = ApiClient::new(ApiConfig::new("https://api.example.com/"));
        assert_eq!(
            client.app_url("blog", Some("develop")),
            "https://api.example.com/apps/blog/environments/develop"
        );
        assert_eq!(
            client.app_url("blog", Some("")),
            "https://api.example.com/apps/blog"
        );
        assert_eq!(client.app_url("blog", None), "https://api.example.com/apps/blog");
    }

    #[test]
    fn connection_refused_returns_error() {
        let client = ApiClient::new(
            ApiConfig::new("http://127.0.0.1:1").with_versions_url("http://127.0.0.1:1/v.json"),
        );
        assert!(matches!(
            client.version_list().unwrap_err(),
            RemoteError::Http(_)
        ));
    }

    #[test]
    fn disabled_tracking_sends_nothing() {
        let client = ApiClient::new(ApiConfig::new("http://127.0.0.1:1").with_tracking(false));
        client
            .track_event_with_env("blog", None, "noop", &Value::Null)
            .unwrap();
    }
}
