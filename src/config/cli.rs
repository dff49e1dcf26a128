use crate::domain::allocation::AllocationRecord;
use crate::domain::model::ProjectId;
use crate::domain::ports::AllocationStore;
use crate::utils::error::{BudgetError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const ALLOCATION_DIR: &str = "allocations";

/// On-disk shape of one project's allocation set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredAllocations {
    pub project_id: ProjectId,
    pub computed_at: DateTime<Utc>,
    pub records: Vec<AllocationRecord>,
}

/// File-backed allocation store: one JSON document per project under `<base>/allocations`.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    base_path: PathBuf,
}

impl LocalStorage {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    pub fn allocation_file(&self, project: ProjectId) -> PathBuf {
        self.base_path
            .join(ALLOCATION_DIR)
            .join(format!("project-{}.json", project))
    }

    pub fn read_stored(&self, project: ProjectId) -> Result<Option<StoredAllocations>> {
        let path = self.allocation_file(project);
        if !path.exists() {
            return Ok(None);
        }
        let data = fs::read(&path)?;
        let stored: StoredAllocations = serde_json::from_slice(&data)?;
        Ok(Some(stored))
    }
}

#[async_trait]
impl AllocationStore for LocalStorage {
    async fn replace_allocations(
        &self,
        project: ProjectId,
        records: Vec<AllocationRecord>,
    ) -> Result<()> {
        let full_path = self.allocation_file(project);

        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let stored = StoredAllocations {
            project_id: project,
            computed_at: Utc::now(),
            records,
        };
        let data = serde_json::to_vec_pretty(&stored)?;

        // 先寫入暫存檔再改名，讀取端只會看到舊檔或新檔
        let temp_path = full_path.with_extension("json.tmp");
        fs::write(&temp_path, &data)?;
        fs::rename(&temp_path, &full_path).map_err(|e| {
            let _ = fs::remove_file(&temp_path);
            BudgetError::StorageError {
                message: format!("could not replace {}: {}", full_path.display(), e),
            }
        })?;

        tracing::debug!(
            "Replaced {} ({} bytes)",
            full_path.display(),
            data.len()
        );
        Ok(())
    }

    async fn load_allocations(&self, project: ProjectId) -> Result<Vec<AllocationRecord>> {
        Ok(self
            .read_stored(project)?
            .map(|stored| stored.records)
            .unwrap_or_default())
    }
}
