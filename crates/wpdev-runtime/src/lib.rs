//! Container engine integration for wpdev environments.
//!
//! This crate owns the boundary to the external container engine: the narrow
//! `ContainerEngine` trait with a Docker Compose binding and an in-memory mock,
//! the on-disk app definition loaded from an instance directory, post-start
//! event hooks, prerequisite checks, and the `Orchestrator` that turns
//! start/stop/rebuild/destroy/info/exec requests into engine calls.

pub mod app;
pub mod compose;
pub mod engine;
pub mod events;
pub mod mock;
pub mod orchestrator;
pub mod prereq;

pub use app::{App, AppDefinition, ServiceInfo, Tool, APP_FILE};
pub use engine::{
    select_engine, ContainerDetails, ContainerEngine, ContainerSummary, EngineConfig, LogLevel,
    PortBinding, UrlScan,
};
pub use events::{AppEvents, POST_START};
pub use orchestrator::{EnvStatus, HealthcheckPolicy, InstanceInfo, Orchestrator};
pub use prereq::{check_docker_prereqs, format_missing, MissingPrereq};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("runtime I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse engine output: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("engine '{0}' is not available on this system")]
    EngineUnavailable(String),
    #[error("`{command}` failed: {stderr}")]
    EngineCommand { command: String, stderr: String },
    #[error("no app definition found at {0}")]
    AppNotFound(String),
    #[error("invalid app definition: {0}")]
    AppInvalid(String),
    #[error("environment needs to be started before running the '{0}' command")]
    EnvironmentDown(String),
    #[error("'{0}' is not a known tool")]
    UnknownTool(String),
    #[error("tool execution failed: {0}")]
    ExecFailed(String),
}
