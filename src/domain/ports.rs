use crate::domain::allocation::AllocationRecord;
use crate::domain::model::{Project, ProjectId, ProjectSummary};
use crate::utils::error::Result;
use async_trait::async_trait;

/// Read side of the persistence collaborator: projects with their phases,
/// stakeholders and phase-target overrides.
pub trait ProjectCatalog: Send + Sync {
    fn projects(&self) -> Vec<ProjectSummary>;
    fn project(&self, id: ProjectId) -> Result<Project>;
}

/// Write side of the persistence collaborator.
///
/// `replace_allocations` must drop every previous row of the project and store the
/// new ones as a single unit: readers see either the old set or the new one.
#[async_trait]
pub trait AllocationStore: Send + Sync {
    async fn replace_allocations(
        &self,
        project: ProjectId,
        records: Vec<AllocationRecord>,
    ) -> Result<()>;

    async fn load_allocations(&self, project: ProjectId) -> Result<Vec<AllocationRecord>>;
}
