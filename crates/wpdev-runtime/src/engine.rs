use crate::app::{App, Tool};
use crate::RuntimeError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Console verbosity handed to the delegated engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Warn,
}

impl LogLevel {
    /// `debug` when the debug flag variable is set to anything non-empty.
    pub fn from_debug_flag(value: Option<&str>) -> Self {
        match value {
            Some(v) if !v.is_empty() => LogLevel::Debug,
            _ => LogLevel::Warn,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    pub log_level_console: LogLevel,
    /// Name of the shared reverse-proxy container fronting every environment.
    pub proxy_container: String,
    pub proxy_network: String,
    pub proxy_image: String,
    /// Scratch directory for engine-owned state.
    pub user_conf_root: PathBuf,
}

impl EngineConfig {
    pub const DEBUG_VAR: &'static str = "WPDEV_DEBUG";

    pub fn from_env() -> Self {
        let debug = std::env::var(Self::DEBUG_VAR).ok();
        Self {
            log_level_console: LogLevel::from_debug_flag(debug.as_deref()),
            ..Self::default()
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            log_level_console: LogLevel::Warn,
            proxy_container: "wpdev-proxy".to_owned(),
            proxy_network: "wpdev-proxy".to_owned(),
            proxy_image: "traefik:v2.11".to_owned(),
            user_conf_root: std::env::temp_dir().join("wpdev"),
        }
    }
}

/// One row of the engine's container listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerSummary {
    pub id: String,
    pub names: Vec<String>,
    /// Compose service name, empty for containers outside a project.
    pub service: String,
    /// Human-readable status, e.g. `Up 3 minutes (healthy)`.
    pub status: String,
    pub running: bool,
}

impl ContainerSummary {
    pub fn has_name(&self, name: &str) -> bool {
        self.names
            .iter()
            .any(|n| n.trim_start_matches('/') == name)
    }

    /// Whether the container reports a health status at all.
    pub fn has_healthcheck(&self) -> bool {
        self.status.contains("health")
    }

    pub fn is_healthy(&self) -> bool {
        self.status.contains("(healthy)")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortBinding {
    pub host_ip: String,
    pub host_port: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerDetails {
    pub running: bool,
    /// Internal port (`9200/tcp`) to published host bindings.
    pub ports: BTreeMap<String, Vec<PortBinding>>,
}

impl ContainerDetails {
    /// First published binding across all internal ports.
    pub fn first_published(&self) -> Option<&PortBinding> {
        self.ports.values().find_map(|bindings| bindings.first())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlScan {
    pub url: String,
    pub status: bool,
}

/// The operations wpdev needs from a container engine.
pub trait ContainerEngine: Send + Sync {
    fn name(&self) -> &str;

    fn config(&self) -> &EngineConfig;

    fn available(&self) -> bool;

    /// Prepare the engine for use (daemon reachable, scratch dirs present).
    fn bootstrap(&self) -> Result<(), RuntimeError>;

    /// Containers belonging to one compose project, stopped ones included.
    fn list(&self, project: &str) -> Result<Vec<ContainerSummary>, RuntimeError>;

    fn list_all_containers(&self) -> Result<Vec<ContainerSummary>, RuntimeError>;

    fn inspect_container(&self, id: &str) -> Result<ContainerDetails, RuntimeError>;

    fn remove_container(&self, id: &str) -> Result<(), RuntimeError>;

    /// Request each URL up to `max_attempts` times.
    fn scan_urls(&self, urls: &[String], max_attempts: u32) -> Vec<UrlScan>;

    fn start(&self, app: &App) -> Result<(), RuntimeError>;

    fn rebuild(&self, app: &App) -> Result<(), RuntimeError>;

    fn stop(&self, app: &App) -> Result<(), RuntimeError>;

    fn destroy(&self, app: &App) -> Result<(), RuntimeError>;

    fn run_tool(&self, app: &App, tool: &Tool, args: &[String]) -> Result<(), RuntimeError>;
}

pub fn select_engine(
    name: &str,
    config: EngineConfig,
) -> Result<Box<dyn ContainerEngine>, RuntimeError> {
    match name {
        "docker" => Ok(Box::new(crate::compose::DockerComposeEngine::new(config))),
        "mock" => Ok(Box::new(crate::mock::MockEngine::with_config(config))),
        other => Err(RuntimeError::EngineUnavailable(other.to_owned())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn container(status: &str) -> ContainerSummary {
        ContainerSummary {
            id: "abc".to_owned(),
            names: vec!["/wpdevx_database_1".to_owned()],
            service: "database".to_owned(),
            status: status.to_owned(),
            running: true,
        }
    }

    #[test]
    fn select_valid_engines() {
        assert!(select_engine("docker", EngineConfig::default()).is_ok());
        assert!(select_engine("mock", EngineConfig::default()).is_ok());
    }

    #[test]
    fn select_invalid_engine_fails() {
        assert!(select_engine("podman-remote", EngineConfig::default()).is_err());
    }

    #[test]
    fn health_status_parsing() {
        let starting = container("Up 3 seconds (health: starting)");
        assert!(starting.has_healthcheck());
        assert!(!starting.is_healthy());

        let unhealthy = container("Up 2 minutes (unhealthy)");
        assert!(unhealthy.has_healthcheck());
        assert!(!unhealthy.is_healthy());

        let healthy = container("Up 2 minutes (healthy)");
        assert!(healthy.is_healthy());

        assert!(!container("Up 2 minutes").has_healthcheck());
    }

    #[test]
    fn names_match_with_or_without_slash() {
        assert!(container("Up").has_name("wpdevx_database_1"));
    }

    #[test]
    fn debug_flag_controls_log_level() {
        assert_eq!(LogLevel::from_debug_flag(None), LogLevel::Warn);
        assert_eq!(LogLevel::from_debug_flag(Some("")), LogLevel::Warn);
        assert_eq!(LogLevel::from_debug_flag(Some("1")), LogLevel::Debug);
    }

    #[test]
    fn first_published_skips_unbound_ports() {
        let mut details = ContainerDetails::default();
        details.ports.insert("9100/tcp".to_owned(), Vec::new());
        details.ports.insert(
            "9200/tcp".to_owned(),
            vec![PortBinding {
                host_ip: "127.0.0.1".to_owned(),
                host_port: "49153".to_owned(),
            }],
        );
        assert_eq!(details.first_published().unwrap().host_port, "49153");
    }
}
