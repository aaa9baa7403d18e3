use crate::app::{App, Tool};
use crate::engine::{
    ContainerDetails, ContainerEngine, ContainerSummary, EngineConfig, UrlScan,
};
use crate::RuntimeError;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Default)]
struct MockState {
    started: HashSet<String>,
    /// Scripted `list(project)` answers; the last one repeats.
    listings: HashMap<String, VecDeque<Vec<ContainerSummary>>>,
    others: Vec<ContainerSummary>,
    details: HashMap<String, ContainerDetails>,
    reachable: Option<bool>,
    calls: Vec<String>,
}

/// In-memory engine used by tests and by `WPDEV_ENGINE=mock`.
///
/// Started projects report healthy `nginx`/`php`/`database` containers and
/// reachable URLs unless a scripted answer overrides it.
pub struct MockEngine {
    config: EngineConfig,
    state: Mutex<MockState>,
}

impl Default for MockEngine {
    fn default() -> Self {
        Self::with_config(EngineConfig::default())
    }
}

impl MockEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: EngineConfig) -> Self {
        Self {
            config,
            state: Mutex::new(MockState::default()),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, MockState>, RuntimeError> {
        self.state
            .lock()
            .map_err(|e| RuntimeError::ExecFailed(format!("mutex poisoned: {e}")))
    }

    fn record(&self, call: String) -> Result<(), RuntimeError> {
        self.lock()?.calls.push(call);
        Ok(())
    }

    /// Script consecutive `list(project)` answers.
    #[must_use]
    pub fn with_listings(self, project: &str, listings: Vec<Vec<ContainerSummary>>) -> Self {
        if let Ok(mut state) = self.state.lock() {
            state
                .listings
                .insert(project.to_owned(), listings.into_iter().collect());
        }
        self
    }

    /// Containers outside any project, e.g. the shared proxy.
    #[must_use]
    pub fn with_container(self, container: ContainerSummary, details: ContainerDetails) -> Self {
        if let Ok(mut state) = self.state.lock() {
            state.details.insert(container.id.clone(), details);
            state.others.push(container);
        }
        self
    }

    #[must_use]
    pub fn with_details(self, id: &str, details: ContainerDetails) -> Self {
        if let Ok(mut state) = self.state.lock() {
            state.details.insert(id.to_owned(), details);
        }
        self
    }

    #[must_use]
    pub fn with_reachable(self, reachable: bool) -> Self {
        if let Ok(mut state) = self.state.lock() {
            state.reachable = Some(reachable);
        }
        self
    }

    /// Every engine call made so far, e.g. `start wpdevsite`.
    pub fn calls(&self) -> Vec<String> {
        self.state
            .lock()
            .map(|s| s.calls.clone())
            .unwrap_or_default()
    }

    fn default_listing(project: &str) -> Vec<ContainerSummary> {
        ["nginx", "php", "database"]
            .iter()
            .map(|service| ContainerSummary {
                id: format!("{project}-{service}"),
                names: vec![format!("/{project}-{service}-1")],
                service: (*service).to_owned(),
                status: if *service == "database" {
                    "Up 1 second (healthy)".to_owned()
                } else {
                    "Up 1 second".to_owned()
                },
                running: true,
            })
            .collect()
    }
}

impl ContainerEngine for MockEngine {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn available(&self) -> bool {
        true
    }

    fn bootstrap(&self) -> Result<(), RuntimeError> {
        self.record("bootstrap".to_owned())
    }

    fn list(&self, project: &str) -> Result<Vec<ContainerSummary>, RuntimeError> {
        let mut state = self.lock()?;
        state.calls.push(format!("list {project}"));
        if let Some(queue) = state.listings.get_mut(project) {
            let next = if queue.len() > 1 {
                queue.pop_front()
            } else {
                queue.front().cloned()
            };
            return Ok(next.unwrap_or_default());
        }
        if state.started.contains(project) {
            Ok(Self::default_listing(project))
        } else {
            Ok(Vec::new())
        }
    }

    fn list_all_containers(&self) -> Result<Vec<ContainerSummary>, RuntimeError> {
        let state = self.lock()?;
        let mut all = state.others.clone();
        for project in &state.started {
            all.extend(Self::default_listing(project));
        }
        Ok(all)
    }

    fn inspect_container(&self, id: &str) -> Result<ContainerDetails, RuntimeError> {
        let state = self.lock()?;
        state
            .details
            .get(id)
            .cloned()
            .or_else(|| {
                state
                    .others
                    .iter()
                    .find(|c| c.has_name(id))
                    .and_then(|c| state.details.get(&c.id).cloned())
            })
            .ok_or_else(|| RuntimeError::EngineCommand {
                command: format!("inspect {id}"),
                stderr: "No such container".to_owned(),
            })
    }

    fn remove_container(&self, id: &str) -> Result<(), RuntimeError> {
        let mut state = self.lock()?;
        state.calls.push(format!("remove {id}"));
        state.others.retain(|c| c.id != id && !c.has_name(id));
        Ok(())
    }

    fn scan_urls(&self, urls: &[String], _max_attempts: u32) -> Vec<UrlScan> {
        let status = match self.state.lock() {
            Ok(state) => state.reachable.unwrap_or(!state.started.is_empty()),
            Err(_) => false,
        };
        urls.iter()
            .map(|url| UrlScan {
                url: url.clone(),
                status,
            })
            .collect()
    }

    fn start(&self, app: &App) -> Result<(), RuntimeError> {
        let mut state = self.lock()?;
        state.calls.push(format!("start {}", app.project()));
        state.started.insert(app.project().to_owned());
        Ok(())
    }

    fn rebuild(&self, app: &App) -> Result<(), RuntimeError> {
        let mut state = self.lock()?;
        state.calls.push(format!("rebuild {}", app.project()));
        state.started.insert(app.project().to_owned());
        Ok(())
    }

    fn stop(&self, app: &App) -> Result<(), RuntimeError> {
        let mut state = self.lock()?;
        state.calls.push(format!("stop {}", app.project()));
        state.started.remove(app.project());
        Ok(())
    }

    fn destroy(&self, app: &App) -> Result<(), RuntimeError> {
        let mut state = self.lock()?;
        state.calls.push(format!("destroy {}", app.project()));
        state.started.remove(app.project());
        Ok(())
    }

    fn run_tool(&self, app: &App, tool: &Tool, args: &[String]) -> Result<(), RuntimeError> {
        let mut line = tool.command.clone();
        line.extend(args.iter().cloned());
        self.record(format!(
            "exec {} {} {}",
            app.project(),
            tool.service,
            line.join(" ")
        ))
    }
}
