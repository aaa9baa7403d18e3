//! Docker CLI + Compose v2 binding of [`ContainerEngine`].

use crate::app::{App, Tool};
use crate::engine::{
    ContainerDetails, ContainerEngine, ContainerSummary, EngineConfig, LogLevel, PortBinding,
    UrlScan,
};
use crate::RuntimeError;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::process::{Command, Output, Stdio};
use std::time::Duration;
use tracing::debug;

const PROJECT_LABEL: &str = "com.docker.compose.project";
const SERVICE_LABEL: &str = "com.docker.compose.service";

/// Codes that mean the proxy answered but the site behind it is not serving.
const DOWN_STATUS_CODES: [u16; 3] = [400, 404, 502];

pub struct DockerComposeEngine {
    config: EngineConfig,
    agent: ureq::Agent,
}

#[derive(Debug, Deserialize)]
struct PsLine {
    #[serde(rename = "ID")]
    id: String,
    #[serde(rename = "Names")]
    names: String,
    #[serde(rename = "Status", default)]
    status: String,
    #[serde(rename = "State", default)]
    state: String,
    #[serde(rename = "Labels", default)]
    labels: String,
}

#[derive(Debug, Deserialize)]
struct InspectState {
    #[serde(rename = "Running", default)]
    running: bool,
}

#[derive(Debug, Deserialize)]
struct InspectBinding {
    #[serde(rename = "HostIp", default)]
    host_ip: String,
    #[serde(rename = "HostPort", default)]
    host_port: String,
}

#[derive(Debug, Deserialize)]
struct InspectNetwork {
    #[serde(rename = "Ports", default)]
    ports: Option<BTreeMap<String, Option<Vec<InspectBinding>>>>,
}

#[derive(Debug, Deserialize)]
struct InspectOutput {
    #[serde(rename = "State")]
    state: InspectState,
    #[serde(rename = "NetworkSettings")]
    network: InspectNetwork,
}

fn label_value<'a>(labels: &'a str, key: &str) -> Option<&'a str> {
    labels.split(',').find_map(|pair| {
        let (k, v) = pair.split_once('=')?;
        (k == key).then_some(v)
    })
}

fn parse_ps_output(stdout: &str) -> Result<Vec<ContainerSummary>, RuntimeError> {
    let mut containers = Vec::new();
    for line in stdout.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let row: PsLine = serde_json::from_str(line)?;
        containers.push(ContainerSummary {
            service: label_value(&row.labels, SERVICE_LABEL)
                .unwrap_or_default()
                .to_owned(),
            running: row.state == "running",
            names: row.names.split(',').map(str::to_owned).collect(),
            id: row.id,
            status: row.status,
        });
    }
    Ok(containers)
}

fn parse_inspect_output(stdout: &str) -> Result<ContainerDetails, RuntimeError> {
    let mut entries: Vec<InspectOutput> = serde_json::from_str(stdout)?;
    let Some(entry) = entries.pop() else {
        return Err(RuntimeError::EngineCommand {
            command: "docker inspect".to_owned(),
            stderr: "empty inspect output".to_owned(),
        });
    };
    let ports = entry
        .network
        .ports
        .unwrap_or_default()
        .into_iter()
        .map(|(port, bindings)| {
            let bindings = bindings
                .unwrap_or_default()
                .into_iter()
                .map(|b| PortBinding {
                    host_ip: b.host_ip,
                    host_port: b.host_port,
                })
                .collect();
            (port, bindings)
        })
        .collect();
    Ok(ContainerDetails {
        running: entry.state.running,
        ports,
    })
}

impl DockerComposeEngine {
    pub fn new(config: EngineConfig) -> Self {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(5)))
            .build()
            .into();
        Self { config, agent }
    }

    fn docker(&self, args: &[&str]) -> Result<Output, RuntimeError> {
        debug!("docker {}", args.join(" "));
        let output = Command::new("docker").args(args).output()?;
        if output.status.success() {
            Ok(output)
        } else {
            Err(RuntimeError::EngineCommand {
                command: format!("docker {}", args.join(" ")),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_owned(),
            })
        }
    }

    fn compose_args(&self, app: &App) -> Vec<String> {
        let progress = match self.config.log_level_console {
            LogLevel::Debug => "plain",
            LogLevel::Warn => "quiet",
        };
        vec![
            "compose".to_owned(),
            "--progress".to_owned(),
            progress.to_owned(),
            "-p".to_owned(),
            app.project().to_owned(),
            "-f".to_owned(),
            app.compose_file().display().to_string(),
            "--project-directory".to_owned(),
            app.root().display().to_string(),
        ]
    }

    fn compose(&self, app: &App, args: &[&str]) -> Result<(), RuntimeError> {
        let mut full = self.compose_args(app);
        full.extend(args.iter().map(|a| (*a).to_owned()));
        debug!("docker {}", full.join(" "));

        let mut cmd = Command::new("docker");
        cmd.args(&full).stdin(Stdio::null());
        if self.config.log_level_console == LogLevel::Debug {
            cmd.stdout(Stdio::inherit()).stderr(Stdio::inherit());
        } else {
            cmd.stdout(Stdio::null()).stderr(Stdio::piped());
        }
        let output = cmd.output()?;
        if output.status.success() {
            return Ok(());
        }
        Err(RuntimeError::EngineCommand {
            command: format!("docker compose {}", args.join(" ")),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_owned(),
        })
    }

    /// Make sure the shared proxy network and container exist and run.
    fn ensure_proxy(&self) -> Result<(), RuntimeError> {
        let network = self.config.proxy_network.as_str();
        if self.docker(&["network", "inspect", network]).is_err() {
            debug!("creating proxy network {network}");
            self.docker(&["network", "create", network])?;
        }

        let proxy = self.config.proxy_container.as_str();
        let existing = self
            .list_all_containers()?
            .into_iter()
            .find(|c| c.has_name(proxy));
        match existing {
            Some(c) if c.running => Ok(()),
            Some(_) => {
                debug!("starting stopped proxy container {proxy}");
                self.docker(&["start", proxy]).map(|_| ())
            }
            None => {
                debug!("creating proxy container {proxy}");
                self.docker(&[
                    "run",
                    "-d",
                    "--name",
                    proxy,
                    "--restart",
                    "unless-stopped",
                    "--network",
                    network,
                    "-p",
                    "80:80",
                    "-v",
                    "/var/run/docker.sock:/var/run/docker.sock:ro",
                    &self.config.proxy_image,
                    "--providers.docker=true",
                    "--providers.docker.exposedbydefault=false",
                    "--entrypoints.web.address=:80",
                ])
                .map(|_| ())
            }
        }
    }

    fn url_responds(&self, url: &str) -> bool {
        match self.agent.get(url).call() {
            Ok(resp) => !DOWN_STATUS_CODES.contains(&resp.status().as_u16()),
            Err(ureq::Error::StatusCode(code)) => !DOWN_STATUS_CODES.contains(&code),
            Err(e) => {
                debug!("request to {url} failed: {e}");
                false
            }
        }
    }
}

impl ContainerEngine for DockerComposeEngine {
    fn name(&self) -> &'static str {
        "docker"
    }

    fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn available(&self) -> bool {
        self.docker(&["version", "--format", "{{.Server.Version}}"])
            .is_ok()
    }

    fn bootstrap(&self) -> Result<(), RuntimeError> {
        if !self.available() {
            return Err(RuntimeError::EngineUnavailable(
                "docker (is the daemon running?)".to_owned(),
            ));
        }
        std::fs::create_dir_all(&self.config.user_conf_root)?;
        Ok(())
    }

    fn list(&self, project: &str) -> Result<Vec<ContainerSummary>, RuntimeError> {
        let filter = format!("label={PROJECT_LABEL}={project}");
        let output = self.docker(&["ps", "-a", "--filter", &filter, "--format", "{{json .}}"])?;
        parse_ps_output(&String::from_utf8_lossy(&output.stdout))
    }

    fn list_all_containers(&self) -> Result<Vec<ContainerSummary>, RuntimeError> {
        let output = self.docker(&["ps", "-a", "--format", "{{json .}}"])?;
        parse_ps_output(&String::from_utf8_lossy(&output.stdout))
    }

    fn inspect_container(&self, id: &str) -> Result<ContainerDetails, RuntimeError> {
        let output = self.docker(&["inspect", id])?;
        parse_inspect_output(&String::from_utf8_lossy(&output.stdout))
    }

    fn remove_container(&self, id: &str) -> Result<(), RuntimeError> {
        self.docker(&["rm", id]).map(|_| ())
    }

    fn scan_urls(&self, urls: &[String], max_attempts: u32) -> Vec<UrlScan> {
        urls.iter()
            .map(|url| {
                let status = (0..max_attempts.max(1)).any(|_| self.url_responds(url));
                UrlScan {
                    url: url.clone(),
                    status,
                }
            })
            .collect()
    }

    fn start(&self, app: &App) -> Result<(), RuntimeError> {
        self.ensure_proxy()?;
        self.compose(app, &["up", "-d", "--remove-orphans"])
    }

    fn rebuild(&self, app: &App) -> Result<(), RuntimeError> {
        self.ensure_proxy()?;
        self.compose(app, &["pull", "--ignore-pull-failures"])?;
        self.compose(app, &["up", "-d", "--force-recreate", "--remove-orphans"])
    }

    fn stop(&self, app: &App) -> Result<(), RuntimeError> {
        self.compose(app, &["stop"])
    }

    fn destroy(&self, app: &App) -> Result<(), RuntimeError> {
        self.compose(app, &["down", "--volumes", "--remove-orphans"])
    }

    fn run_tool(&self, app: &App, tool: &Tool, args: &[String]) -> Result<(), RuntimeError> {
        let mut full = self.compose_args(app);
        full.push("exec".to_owned());
        if let Some(ref user) = tool.user {
            full.push("-u".to_owned());
            full.push(user.clone());
        }
        full.push(tool.service.clone());
        full.extend(tool.command.iter().cloned());
        full.extend(args.iter().cloned());
        debug!("docker {}", full.join(" "));

        let status = Command::new("docker").args(&full).status()?;
        if status.success() {
            Ok(())
        } else {
            Err(RuntimeError::ExecFailed(format!(
                "{} exited with {status}",
                tool.command.join(" ")
            )))
        }
    }
}
