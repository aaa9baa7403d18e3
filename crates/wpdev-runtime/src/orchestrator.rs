use crate::app::App;
use crate::engine::{ContainerEngine, ContainerSummary};
use crate::events::POST_START;
use crate::RuntimeError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, warn};

/// How long to wait for containers with a healthcheck to report healthy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HealthcheckPolicy {
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl Default for HealthcheckPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 20,
            backoff: Duration::from_secs(1),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EnvStatus {
    Up,
    Down,
}

impl fmt::Display for EnvStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnvStatus::Up => f.write_str("UP"),
            EnvStatus::Down => f.write_str("DOWN"),
        }
    }
}

/// Display-ready summary of one environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceInfo {
    pub name: String,
    pub location: String,
    pub services: Vec<String>,
    /// Reachable URLs keyed by service.
    pub urls: BTreeMap<String, Vec<String>>,
    /// Connection strings for services published on host ports.
    pub extra_services: BTreeMap<String, String>,
    pub status: EnvStatus,
}

const PROJECT_PREFIX: &str = "wpdev";

struct ExtraServiceDisplay {
    name: &'static str,
    label: Option<&'static str>,
    protocol: Option<&'static str>,
    skip: bool,
}

const EXTRA_SERVICE_DISPLAY: [ExtraServiceDisplay; 2] = [
    ExtraServiceDisplay {
        name: "elasticsearch",
        label: Some("enterprise search"),
        protocol: Some("http"),
        skip: false,
    },
    // Already listed with its URL among the regular services.
    ExtraServiceDisplay {
        name: "phpmyadmin",
        label: None,
        protocol: None,
        skip: true,
    },
];

/// Translates environment requests into calls on a [`ContainerEngine`].
pub struct Orchestrator<'a> {
    engine: &'a dyn ContainerEngine,
    healthcheck: HealthcheckPolicy,
}

impl<'a> Orchestrator<'a> {
    pub fn new(engine: &'a dyn ContainerEngine) -> Self {
        Self {
            engine,
            healthcheck: HealthcheckPolicy::default(),
        }
    }

    #[must_use]
    pub fn with_healthcheck(mut self, policy: HealthcheckPolicy) -> Self {
        self.healthcheck = policy;
        self
    }

    fn load(&self, instance_path: &Path) -> Result<App, RuntimeError> {
        self.engine.bootstrap()?;
        let app = App::load(instance_path)?;
        app.init()?;
        Ok(app)
    }

    fn add_hooks(&self, app: &mut App) {
        let policy = self.healthcheck;
        app.events.on(POST_START, 1, move |app, engine| {
            healthcheck(app, engine, policy);
            Ok(())
        });
    }

    pub fn start(&self, instance_path: &Path) -> Result<(), RuntimeError> {
        debug!("will start app on path: {}", instance_path.display());
        let mut app = self.load(instance_path)?;
        self.add_hooks(&mut app);
        self.engine.start(&app)?;
        app.emit(POST_START, self.engine)
    }

    pub fn rebuild(&self, instance_path: &Path) -> Result<(), RuntimeError> {
        debug!("will rebuild app on path: {}", instance_path.display());
        let mut app = self.load(instance_path)?;
        ensure_no_orphan_proxy_container(self.engine)?;
        self.add_hooks(&mut app);
        self.engine.rebuild(&app)?;
        app.emit(POST_START, self.engine)
    }

    pub fn stop(&self, instance_path: &Path) -> Result<(), RuntimeError> {
        debug!("will stop app on path: {}", instance_path.display());
        let app = self.load(instance_path)?;
        self.engine.stop(&app)
    }

    pub fn destroy(&self, instance_path: &Path) -> Result<(), RuntimeError> {
        debug!("will destroy app on path: {}", instance_path.display());
        let app = self.load(instance_path)?;
        self.engine.destroy(&app)
    }

    pub fn is_up(&self, instance_path: &Path) -> Result<bool, RuntimeError> {
        let app = self.load(instance_path)?;
        Ok(is_env_up(&app, self.engine))
    }

    pub fn info(&self, instance_path: &Path) -> Result<InstanceInfo, RuntimeError> {
        let app = self.load(instance_path)?;

        let urls = app
            .services()
            .iter()
            .filter(|s| !s.urls.is_empty())
            .map(|s| (s.service.clone(), s.urls.clone()))
            .collect();
        let status = if is_env_up(&app, self.engine) {
            EnvStatus::Up
        } else {
            EnvStatus::Down
        };

        Ok(InstanceInfo {
            name: app
                .project()
                .strip_prefix(PROJECT_PREFIX)
                .unwrap_or(app.project())
                .to_owned(),
            location: app.root().display().to_string(),
            services: app.services().iter().map(|s| s.service.clone()).collect(),
            urls,
            extra_services: extra_services_connections(&app, self.engine)?,
            status,
        })
    }

    /// Replay `args` through a named tool; the environment must be up.
    pub fn exec(
        &self,
        instance_path: &Path,
        tool_name: &str,
        args: &[String],
    ) -> Result<(), RuntimeError> {
        let app = self.load(instance_path)?;

        if !is_env_up(&app, self.engine) {
            return Err(RuntimeError::EnvironmentDown(tool_name.to_owned()));
        }

        let tool = app
            .tool(tool_name)
            .ok_or_else(|| RuntimeError::UnknownTool(tool_name.to_owned()))?;

        debug!("running tool {tool_name} in service {}", tool.service);
        self.engine.run_tool(&app, tool, args)
    }
}

fn pending_health(containers: Vec<ContainerSummary>) -> Vec<ContainerSummary> {
    containers
        .into_iter()
        .filter(|c| c.has_healthcheck() && !c.is_healthy())
        .collect()
}

/// Poll until every container with a healthcheck is healthy.
///
/// Returns the containers still unhealthy after the last attempt; each one is
/// logged as a warning but never fails the caller.
pub fn healthcheck(
    app: &App,
    engine: &dyn ContainerEngine,
    policy: HealthcheckPolicy,
) -> Vec<ContainerSummary> {
    let mut pending = Vec::new();
    for attempt in 1..=policy.max_attempts {
        match engine.list(app.project()) {
            Ok(list) => {
                pending = pending_health(list);
                if pending.is_empty() {
                    return pending;
                }
                for container in &pending {
                    info!(service = %container.service, attempt, "waiting for healthcheck");
                }
            }
            Err(e) => debug!("healthcheck attempt {attempt} could not list containers: {e}"),
        }
        if attempt < policy.max_attempts {
            std::thread::sleep(policy.backoff);
        }
    }

    for container in &pending {
        warn!("Service {} failed healthcheck", container.service);
    }
    pending
}

/// All app URLs must respond; an app without URLs is never up.
pub fn is_env_up(app: &App, engine: &dyn ContainerEngine) -> bool {
    let urls = app.urls();
    let scans = engine.scan_urls(&urls, 1);
    !scans.is_empty() && scans.iter().all(|s| s.status)
}

pub fn extra_services_connections(
    app: &App,
    engine: &dyn ContainerEngine,
) -> Result<BTreeMap<String, String>, RuntimeError> {
    let mut extra = BTreeMap::new();

    for container in engine.list(app.project())? {
        let display = EXTRA_SERVICE_DISPLAY
            .iter()
            .find(|d| d.name == container.service);
        if display.is_some_and(|d| d.skip) || container.id.is_empty() {
            continue;
        }

        let details = match engine.inspect_container(&container.id) {
            Ok(d) => d,
            Err(e) => {
                debug!("skipping {}: {e}", container.service);
                continue;
            }
        };
        let Some(binding) = details.first_published() else {
            continue;
        };

        let label = display
            .and_then(|d| d.label)
            .unwrap_or(&container.service)
            .to_owned();
        let prefix = display
            .and_then(|d| d.protocol)
            .map(|p| format!("{p}://"))
            .unwrap_or_default();
        extra.insert(
            label,
            format!("{prefix}{}:{}", binding.host_ip, binding.host_port),
        );
    }

    Ok(extra)
}

/// Remove the shared proxy container when it exists but is stopped.
///
/// After a reboot the proxy network can vanish while the stopped proxy
/// container survives; starting it then fails on the missing network.
pub fn ensure_no_orphan_proxy_container(
    engine: &dyn ContainerEngine,
) -> Result<bool, RuntimeError> {
    let proxy = engine.config().proxy_container.as_str();

    let exists = engine
        .list_all_containers()?
        .iter()
        .any(|c| c.has_name(proxy));
    if !exists {
        return Ok(false);
    }

    if engine.inspect_container(proxy)?.running {
        return Ok(false);
    }

    info!("removing orphaned proxy container {proxy}");
    engine.remove_container(proxy)?;
    Ok(true)
}
