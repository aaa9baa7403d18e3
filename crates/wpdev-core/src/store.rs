use crate::CoreError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use wpdev_schema::{InstanceData, Slug};

/// Instance record file inside each instance directory.
pub const INSTANCE_FILE: &str = "instance.json";
const LOCKS_DIR: &str = ".locks";

/// An `InstanceData` as persisted, with bookkeeping timestamps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceRecord {
    #[serde(flatten)]
    pub data: InstanceData,
    pub created_at: String,
    pub updated_at: String,
}

/// One directory per slug under a common root.
///
/// ```text
/// <root>/
///   .locks/<slug>.lock
///   <slug>/instance.json
///   <slug>/app.json
///   <slug>/docker-compose.yml
/// ```
#[derive(Debug, Clone)]
pub struct InstanceStore {
    root: PathBuf,
}

impl InstanceStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn instance_dir(&self, slug: &Slug) -> PathBuf {
        self.root.join(slug.as_str())
    }

    pub fn lock_path(&self, slug: &Slug) -> PathBuf {
        self.root.join(LOCKS_DIR).join(format!("{slug}.lock"))
    }

    pub fn exists(&self, slug: &Slug) -> bool {
        self.instance_dir(slug).join(INSTANCE_FILE).is_file()
    }

    pub fn create(&self, data: &InstanceData) -> Result<InstanceRecord, CoreError> {
        let slug = Slug::parse(data.site_slug.as_str())?;
        if self.exists(&slug) {
            return Err(CoreError::EnvironmentExists(slug.into_inner()));
        }
        let now = chrono::Utc::now().to_rfc3339();
        let record = InstanceRecord {
            data: data.clone(),
            created_at: now.clone(),
            updated_at: now,
        };
        self.write(&slug, &record)?;
        Ok(record)
    }

    /// Replace the configuration of an existing instance, keeping `created_at`.
    pub fn update(&self, data: &InstanceData) -> Result<InstanceRecord, CoreError> {
        let slug = Slug::parse(data.site_slug.as_str())?;
        let previous = self.read(&slug)?;
        let record = InstanceRecord {
            data: data.clone(),
            created_at: previous.created_at,
            updated_at: chrono::Utc::now().to_rfc3339(),
        };
        self.write(&slug, &record)?;
        Ok(record)
    }

    pub fn read(&self, slug: &Slug) -> Result<InstanceRecord, CoreError> {
        let path = self.instance_dir(slug).join(INSTANCE_FILE);
        if !path.exists() {
            return Err(CoreError::EnvironmentNotFound(slug.to_string()));
        }
        let content = fs::read_to_string(&path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn remove(&self, slug: &Slug) -> Result<(), CoreError> {
        let dir = self.instance_dir(slug);
        if !dir.exists() {
            return Err(CoreError::EnvironmentNotFound(slug.to_string()));
        }
        fs::remove_dir_all(&dir)?;
        tracing::debug!("removed instance directory {}", dir.display());
        Ok(())
    }

    /// Every readable instance, ordered by slug.
    pub fn list(&self) -> Result<Vec<InstanceRecord>, CoreError> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }
        let mut records = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            let Ok(slug) = Slug::parse(name) else { continue };
            if !self.exists(&slug) {
                continue;
            }
            match self.read(&slug) {
                Ok(record) => records.push(record),
                Err(e) => tracing::warn!("skipping unreadable instance {slug}: {e}"),
            }
        }
        records.sort_by(|a, b| a.data.site_slug.cmp(&b.data.site_slug));
        Ok(records)
    }

    fn write(&self, slug: &Slug, record: &InstanceRecord) -> Result<(), CoreError> {
        let dir = self.instance_dir(slug);
        fs::create_dir_all(&dir)?;
        let content = serde_json::to_string_pretty(record)?;

        let mut tmp = NamedTempFile::new_in(&dir)?;
        tmp.write_all(content.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(dir.join(INSTANCE_FILE))
            .map_err(|e| CoreError::Io(e.error))?;
        Ok(())
    }
}
