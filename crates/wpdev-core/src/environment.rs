use crate::compose::write_instance_files;
use crate::concurrency::InstanceLock;
use crate::store::{InstanceRecord, InstanceStore};
use crate::CoreError;
use serde::Serialize;
use std::path::PathBuf;
use tracing::{debug, info, warn};
use wpdev_runtime::{ContainerEngine, EnvStatus, HealthcheckPolicy, InstanceInfo, Orchestrator};
use wpdev_schema::{ComponentConfig, InstanceData, Slug};

/// One row of `wpdev list`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvironmentSummary {
    pub slug: String,
    pub title: String,
    pub multisite: bool,
    pub wordpress: String,
    pub status: EnvStatus,
    pub location: String,
}

fn component_label(config: &ComponentConfig) -> String {
    match config {
        ComponentConfig::Local { dir } => dir.clone(),
        ComponentConfig::Image { tag } => tag.clone().unwrap_or_else(|| "image".to_owned()),
    }
}

/// Lifecycle of stored instances on top of a container engine.
///
/// Mutating operations hold the instance's advisory lock for their duration.
pub struct Environments<'a> {
    store: InstanceStore,
    engine: &'a dyn ContainerEngine,
    healthcheck: HealthcheckPolicy,
}

impl<'a> Environments<'a> {
    pub fn new(root: impl Into<PathBuf>, engine: &'a dyn ContainerEngine) -> Self {
        Self {
            store: InstanceStore::new(root),
            engine,
            healthcheck: HealthcheckPolicy::default(),
        }
    }

    #[must_use]
    pub fn with_healthcheck(mut self, policy: HealthcheckPolicy) -> Self {
        self.healthcheck = policy;
        self
    }

    pub fn store(&self) -> &InstanceStore {
        &self.store
    }

    fn orchestrator(&self) -> Orchestrator<'a> {
        Orchestrator::new(self.engine).with_healthcheck(self.healthcheck)
    }

    fn lock(&self, slug: &Slug) -> Result<InstanceLock, CoreError> {
        InstanceLock::try_acquire(&self.store.lock_path(slug))?
            .ok_or_else(|| CoreError::Locked(slug.to_string()))
    }

    fn existing_dir(&self, slug: &Slug) -> Result<PathBuf, CoreError> {
        if !self.store.exists(slug) {
            return Err(CoreError::EnvironmentNotFound(slug.to_string()));
        }
        Ok(self.store.instance_dir(slug))
    }

    pub fn exists(&self, slug: &Slug) -> bool {
        self.store.exists(slug)
    }

    pub fn read(&self, slug: &Slug) -> Result<InstanceRecord, CoreError> {
        self.store.read(slug)
    }

    /// The record is persisted last, so a failed create leaves nothing that counts as an instance.
    pub fn create(&self, data: &InstanceData) -> Result<InstanceRecord, CoreError> {
        let slug = Slug::parse(data.site_slug.as_str())?;
        let _lock = self.lock(&slug)?;
        if self.store.exists(&slug) {
            return Err(CoreError::EnvironmentExists(slug.into_inner()));
        }

        let dir = self.store.instance_dir(&slug);
        let fresh = !dir.exists();
        let created = write_instance_files(&dir, data, self.engine.config())
            .and_then(|()| self.store.create(data));
        match created {
            Ok(record) => {
                info!("created environment {slug}");
                Ok(record)
            }
            Err(e) => {
                if fresh {
                    if let Err(cleanup) = std::fs::remove_dir_all(&dir) {
                        warn!("failed to clean up {}: {cleanup}", dir.display());
                    }
                }
                Err(e)
            }
        }
    }

    /// Store new configuration and regenerate the compose project.
    ///
    /// Running containers keep the old configuration until the next rebuild.
    pub fn update(&self, data: &InstanceData) -> Result<InstanceRecord, CoreError> {
        let slug = Slug::parse(data.site_slug.as_str())?;
        let _lock = self.lock(&slug)?;
        let record = self.store.update(data)?;
        write_instance_files(
            &self.store.instance_dir(&slug),
            data,
            self.engine.config(),
        )?;
        info!("updated environment {slug}");
        Ok(record)
    }

    pub fn start(&self, slug: &Slug) -> Result<(), CoreError> {
        let dir = self.existing_dir(slug)?;
        let _lock = self.lock(slug)?;
        self.orchestrator().start(&dir)?;
        info!("started environment {slug}");
        Ok(())
    }

    pub fn stop(&self, slug: &Slug) -> Result<(), CoreError> {
        let dir = self.existing_dir(slug)?;
        let _lock = self.lock(slug)?;
        self.orchestrator().stop(&dir)?;
        info!("stopped environment {slug}");
        Ok(())
    }

    pub fn rebuild(&self, slug: &Slug) -> Result<(), CoreError> {
        let dir = self.existing_dir(slug)?;
        let _lock = self.lock(slug)?;
        self.orchestrator().rebuild(&dir)?;
        info!("rebuilt environment {slug}");
        Ok(())
    }

    /// Tear down containers and volumes; with `remove_files` also drop the instance directory.
    pub fn destroy(&self, slug: &Slug, remove_files: bool) -> Result<(), CoreError> {
        let dir = self.existing_dir(slug)?;
        let _lock = self.lock(slug)?;
        self.orchestrator().destroy(&dir)?;
        if remove_files {
            self.store.remove(slug)?;
        }
        info!("destroyed environment {slug}");
        Ok(())
    }

    pub fn info(&self, slug: &Slug) -> Result<InstanceInfo, CoreError> {
        let dir = self.existing_dir(slug)?;
        Ok(self.orchestrator().info(&dir)?)
    }

    pub fn exec(&self, slug: &Slug, tool: &str, args: &[String]) -> Result<(), CoreError> {
        let dir = self.existing_dir(slug)?;
        Ok(self.orchestrator().exec(&dir, tool, args)?)
    }

    pub fn list(&self) -> Result<Vec<EnvironmentSummary>, CoreError> {
        let orchestrator = self.orchestrator();
        let mut summaries = Vec::new();
        for record in self.store.list()? {
            let slug = Slug::parse(record.data.site_slug.as_str())?;
            let dir = self.store.instance_dir(&slug);
            let status = match orchestrator.is_up(&dir) {
                Ok(true) => EnvStatus::Up,
                Ok(false) => EnvStatus::Down,
                Err(e) => {
                    debug!("could not determine status of {slug}: {e}");
                    EnvStatus::Down
                }
            };
            summaries.push(EnvironmentSummary {
                slug: slug.to_string(),
                title: record.data.wp_title.clone(),
                multisite: record.data.multisite,
                wordpress: component_label(&record.data.wordpress),
                status,
                location: dir.display().to_string(),
            });
        }
        Ok(summaries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compose::COMPOSE_FILE;
    use crate::sample_instance;
    use std::time::Duration;
    use wpdev_runtime::mock::MockEngine;

    const FAST: HealthcheckPolicy = HealthcheckPolicy {
        max_attempts: 2,
        backoff: Duration::ZERO,
    };

    fn slug(s: &str) -> Slug {
        Slug::parse(s).unwrap()
    }

    #[test]
    fn create_writes_project_files() {
        let dir = tempfile::tempdir().unwrap();
        let engine = MockEngine::new();
        let envs = Environments::new(dir.path(), &engine);
        envs.create(&sample_instance("site")).unwrap();

        let instance = dir.path().join("site");
        assert!(instance.join(crate::INSTANCE_FILE).is_file());
        assert!(instance.join(COMPOSE_FILE).is_file());
        assert!(instance.join(wpdev_runtime::APP_FILE).is_file());
    }

    #[test]
    fn failed_create_can_be_retried() {
        let dir = tempfile::tempdir().unwrap();
        let engine = MockEngine::new();
        let envs = Environments::new(dir.path(), &engine);
        let blocker = dir.path().join("site").join(COMPOSE_FILE);
        std::fs::create_dir_all(&blocker).unwrap();

        assert!(envs.create(&sample_instance("site")).is_err());
        assert!(!envs.exists(&slug("site")));

        std::fs::remove_dir(&blocker).unwrap();
        envs.create(&sample_instance("site")).unwrap();
        assert!(envs.exists(&slug("site")));
    }

    #[test]
    fn create_existing_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let engine = MockEngine::new();
        let envs = Environments::new(dir.path(), &engine);
        let first = envs.create(&sample_instance("site")).unwrap();

        let err = envs.create(&sample_instance("site")).unwrap_err();
        assert!(matches!(err, CoreError::EnvironmentExists(ref s) if s == "site"));
        assert_eq!(envs.read(&slug("site")).unwrap().created_at, first.created_at);
    }

    #[test]
    fn lifecycle_through_mock_engine() {
        let dir = tempfile::tempdir().unwrap();
        let engine = MockEngine::new();
        let envs = Environments::new(dir.path(), &engine).with_healthcheck(FAST);
        envs.create(&sample_instance("site")).unwrap();
        let site = slug("site");

        assert_eq!(envs.info(&site).unwrap().status, EnvStatus::Down);
        envs.start(&site).unwrap();
        assert_eq!(envs.info(&site).unwrap().status, EnvStatus::Up);

        envs.exec(&site, "wp", &["plugin".to_owned(), "list".to_owned()])
            .unwrap();
        envs.stop(&site).unwrap();
        assert_eq!(envs.info(&site).unwrap().status, EnvStatus::Down);

        envs.destroy(&site, true).unwrap();
        assert!(!envs.exists(&site));

        let calls = engine.calls();
        assert!(calls.contains(&"start wpdevsite".to_owned()));
        assert!(calls.contains(&"exec wpdevsite cli wp plugin list".to_owned()));
        assert!(calls.contains(&"destroy wpdevsite".to_owned()));
    }

    #[test]
    fn destroy_can_keep_files() {
        let dir = tempfile::tempdir().unwrap();
        let engine = MockEngine::new();
        let envs = Environments::new(dir.path(), &engine);
        envs.create(&sample_instance("site")).unwrap();
        envs.destroy(&slug("site"), false).unwrap();
        assert!(envs.exists(&slug("site")));
    }

    #[test]
    fn unknown_environment_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let engine = MockEngine::new();
        let envs = Environments::new(dir.path(), &engine);
        for result in [
            envs.start(&slug("ghost")),
            envs.stop(&slug("ghost")),
            envs.rebuild(&slug("ghost")),
            envs.destroy(&slug("ghost"), true),
        ] {
            assert!(matches!(result, Err(CoreError::EnvironmentNotFound(_))));
        }
        assert!(engine.calls().is_empty());
    }

    #[test]
    fn held_lock_blocks_mutation() {
        let dir = tempfile::tempdir().unwrap();
        let engine = MockEngine::new();
        let envs = Environments::new(dir.path(), &engine);
        envs.create(&sample_instance("site")).unwrap();

        let _held = InstanceLock::acquire(&envs.store().lock_path(&slug("site"))).unwrap();
        assert!(matches!(
            envs.start(&slug("site")),
            Err(CoreError::Locked(_))
        ));
    }

    #[test]
    fn update_regenerates_compose() {
        let dir = tempfile::tempdir().unwrap();
        let engine = MockEngine::new();
        let envs = Environments::new(dir.path(), &engine);
        envs.create(&sample_instance("site")).unwrap();

        let mut data = sample_instance("site");
        data.phpmyadmin = true;
        envs.update(&data).unwrap();

        let yaml = std::fs::read_to_string(dir.path().join("site").join(COMPOSE_FILE)).unwrap();
        assert!(yaml.contains("phpmyadmin"));
        assert!(envs.read(&slug("site")).unwrap().data.phpmyadmin);
    }

    #[test]
    fn list_reports_status() {
        let dir = tempfile::tempdir().unwrap();
        let engine = MockEngine::new();
        let envs = Environments::new(dir.path(), &engine).with_healthcheck(FAST);
        envs.create(&sample_instance("beta")).unwrap();
        envs.create(&sample_instance("alpha")).unwrap();
        envs.start(&slug("alpha")).unwrap();

        let list = envs.list().unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].slug, "alpha");
        assert_eq!(list[0].wordpress, "6.4");
        // The mock reports every URL reachable once any project runs.
        assert_eq!(list[0].status, EnvStatus::Up);
    }
}
