use crate::engine::ContainerEngine;
use crate::events::AppEvents;
use crate::RuntimeError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// File name of the app definition inside an instance directory.
pub const APP_FILE: &str = "app.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceInfo {
    pub service: String,
    #[serde(default)]
    pub urls: Vec<String>,
}

/// A named command replayed inside one service, e.g. `wp` in the cli container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tool {
    pub service: String,
    pub command: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Serialized description of an environment as the engine sees it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppDefinition {
    pub name: String,
    pub project: String,
    pub compose_file: String,
    #[serde(default)]
    pub services: Vec<ServiceInfo>,
    #[serde(default)]
    pub tooling: BTreeMap<String, Tool>,
}

impl AppDefinition {
    pub fn write(&self, dir: &Path) -> Result<(), RuntimeError> {
        std::fs::create_dir_all(dir)?;
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(dir.join(APP_FILE), content)?;
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn sample(name: &str) -> Self {
        let mut tooling = BTreeMap::new();
        tooling.insert(
            "wp".to_owned(),
            Tool {
                service: "cli".to_owned(),
                command: vec!["wp".to_owned()],
                user: Some("www-data".to_owned()),
                description: None,
            },
        );
        Self {
            name: name.to_owned(),
            project: format!("wpdev{name}"),
            compose_file: "docker-compose.yml".to_owned(),
            services: vec![
                ServiceInfo {
                    service: "nginx".to_owned(),
                    urls: vec![format!("http://{name}.wpdev.localhost")],
                },
                ServiceInfo {
                    service: "database".to_owned(),
                    urls: Vec::new(),
                },
            ],
            tooling,
        }
    }
}

/// An environment loaded from its instance directory.
#[derive(Debug)]
pub struct App {
    root: PathBuf,
    definition: AppDefinition,
    pub events: AppEvents,
}

impl App {
    pub fn load(root: &Path) -> Result<Self, RuntimeError> {
        let path = root.join(APP_FILE);
        if !path.exists() {
            return Err(RuntimeError::AppNotFound(root.display().to_string()));
        }
        let content = std::fs::read_to_string(&path)?;
        let definition: AppDefinition = serde_json::from_str(&content)?;
        Ok(Self {
            root: root.to_path_buf(),
            definition,
            events: AppEvents::new(),
        })
    }

    /// Validate that the definition is usable by an engine.
    pub fn init(&self) -> Result<(), RuntimeError> {
        if self.definition.project.is_empty() {
            return Err(RuntimeError::AppInvalid("project name is empty".to_owned()));
        }
        if !self.compose_file().is_file() {
            return Err(RuntimeError::AppInvalid(format!(
                "compose file {} is missing",
                self.compose_file().display()
            )));
        }
        Ok(())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn name(&self) -> &str {
        &self.definition.name
    }

    pub fn project(&self) -> &str {
        &self.definition.project
    }

    pub fn compose_file(&self) -> PathBuf {
        self.root.join(&self.definition.compose_file)
    }

    pub fn services(&self) -> &[ServiceInfo] {
        &self.definition.services
    }

    pub fn tool(&self, name: &str) -> Option<&Tool> {
        self.definition.tooling.get(name)
    }

    pub fn tooling(&self) -> &BTreeMap<String, Tool> {
        &self.definition.tooling
    }

    /// Every URL published by any service.
    pub fn urls(&self) -> Vec<String> {
        self.definition
            .services
            .iter()
            .flat_map(|s| s.urls.iter().cloned())
            .collect()
    }

    pub fn emit(&self, event: &str, engine: &dyn ContainerEngine) -> Result<(), RuntimeError> {
        self.events.emit(event, self, engine)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_missing_definition_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = App::load(dir.path()).unwrap_err();
        assert!(matches!(err, RuntimeError::AppNotFound(_)));
    }

    #[test]
    fn init_requires_compose_file() {
        let dir = tempfile::tempdir().unwrap();
        AppDefinition::sample("site").write(dir.path()).unwrap();
        let app = App::load(dir.path()).unwrap();
        assert!(app.init().is_err());

        std::fs::write(dir.path().join("docker-compose.yml"), "services: {}\n").unwrap();
        app.init().unwrap();
    }

    #[test]
    fn urls_flatten_across_services() {
        let dir = tempfile::tempdir().unwrap();
        AppDefinition::sample("site").write(dir.path()).unwrap();
        let app = App::load(dir.path()).unwrap();
        assert_eq!(app.urls(), vec!["http://site.wpdev.localhost".to_owned()]);
        assert_eq!(app.project(), "wpdevsite");
        assert!(app.tool("wp").is_some());
        assert!(app.tool("composer").is_none());
    }
}
