use crate::domain::allocation::AllocationRecord;
use crate::domain::model::{Project, ProjectId, ProjectSummary};
use crate::domain::ports::{AllocationStore, ProjectCatalog};
use crate::utils::error::{BudgetError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Allocation store kept in memory. Clones share the same rows.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    rows: Arc<Mutex<HashMap<ProjectId, Vec<AllocationRecord>>>>,
    fail_writes: Arc<AtomicBool>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every following write fail, leaving stored rows untouched.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub async fn project_count(&self) -> usize {
        self.rows.lock().await.len()
    }
}

#[async_trait]
impl AllocationStore for InMemoryStore {
    async fn replace_allocations(
        &self,
        project: ProjectId,
        records: Vec<AllocationRecord>,
    ) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(BudgetError::StorageError {
                message: format!("write rejected for project {}", project),
            });
        }
        let mut rows = self.rows.lock().await;
        rows.insert(project, records);
        Ok(())
    }

    async fn load_allocations(&self, project: ProjectId) -> Result<Vec<AllocationRecord>> {
        let rows = self.rows.lock().await;
        Ok(rows.get(&project).cloned().unwrap_or_default())
    }
}

/// Project catalog over a fixed list of projects.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalog {
    projects: Vec<Project>,
}

impl InMemoryCatalog {
    pub fn new(projects: Vec<Project>) -> Self {
        Self { projects }
    }
}

impl ProjectCatalog for InMemoryCatalog {
    fn projects(&self) -> Vec<ProjectSummary> {
        self.projects.iter().map(Project::summary).collect()
    }

    fn project(&self, id: ProjectId) -> Result<Project> {
        self.projects
            .iter()
            .find(|project| project.id == id)
            .cloned()
            .ok_or(BudgetError::ProjectNotFound { id: id.0 })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{PhaseId, StakeholderId};

    fn record(percent: f64) -> AllocationRecord {
        AllocationRecord {
            project_id: ProjectId(1),
            phase_id: PhaseId(1),
            phase_name: "DET".to_string(),
            stakeholder_id: StakeholderId(1),
            stakeholder_name: "Architecte".to_string(),
            percent,
            amount: percent * 100.0,
        }
    }

    #[test]
    fn test_failed_write_keeps_previous_rows() {
        tokio_test::block_on(async {
            let store = InMemoryStore::new();
            store
                .replace_allocations(ProjectId(1), vec![record(100.0)])
                .await
                .unwrap();

            store.set_fail_writes(true);
            let result = store.replace_allocations(ProjectId(1), Vec::new()).await;
            assert!(matches!(result, Err(BudgetError::StorageError { .. })));

            let rows = store.load_allocations(ProjectId(1)).await.unwrap();
            assert_eq!(rows, vec![record(100.0)]);
        });
    }

    #[test]
    fn test_catalog_lookup() {
        let catalog = InMemoryCatalog::new(vec![Project::new(ProjectId(4), "A", 10.0)]);
        assert_eq!(catalog.projects()[0].id, ProjectId(4));
        assert!(catalog.project(ProjectId(5)).is_err());
    }
}
