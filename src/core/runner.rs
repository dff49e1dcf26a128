use crate::core::engine::AllocationEngine;
use crate::core::writer::persist_allocation;
use crate::domain::allocation::AllocationOutcome;
use crate::domain::model::{Project, ProjectId, ProjectSummary};
use crate::domain::ports::{AllocationStore, ProjectCatalog};
use crate::utils::error::{BudgetError, Result};
use crate::utils::validation::{validate_non_empty_string, validate_positive_number, Validate};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

pub const DEFAULT_WEIGHT_SUM_TOLERANCE: f64 = 0.01;

/// What the caller must guarantee before the engine runs.
pub struct ProjectPreconditions<'a> {
    pub project: &'a Project,
    pub weight_sum_tolerance: f64,
}

impl Validate for ProjectPreconditions<'_> {
    fn validate(&self) -> Result<()> {
        let project = self.project;
        validate_non_empty_string("project.name", &project.name)?;
        validate_positive_number("project.phases", project.phases.len(), 1).map_err(|_| {
            BudgetError::PreconditionFailed {
                message: format!("project '{}' has no phase", project.name),
            }
        })?;
        validate_positive_number("project.stakeholders", project.stakeholders.len(), 1)
            .map_err(|_| BudgetError::PreconditionFailed {
                message: format!("project '{}' has no stakeholder", project.name),
            })?;

        let weight_sum = project.weight_sum();
        if (weight_sum - 100.0).abs() > self.weight_sum_tolerance {
            return Err(BudgetError::PreconditionFailed {
                message: format!(
                    "phase weights of '{}' sum to {:.4}%, expected 100%",
                    project.name, weight_sum
                ),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct RunReport {
    pub project: ProjectSummary,
    pub outcome: AllocationOutcome,
    pub persisted_rows: usize,
    pub dry_run: bool,
}

/// Drives one project through load → check → compute → replace.
///
/// Runs for the same project are serialized; different projects do not wait on each other.
pub struct AllocationRunner<C: ProjectCatalog, S: AllocationStore> {
    catalog: C,
    store: S,
    engine: AllocationEngine,
    weight_sum_tolerance: f64,
    locks: Mutex<HashMap<ProjectId, Arc<Mutex<()>>>>,
}

impl<C: ProjectCatalog, S: AllocationStore> AllocationRunner<C, S> {
    pub fn new(catalog: C, store: S, engine: AllocationEngine) -> Self {
        Self {
            catalog,
            store,
            engine,
            weight_sum_tolerance: DEFAULT_WEIGHT_SUM_TOLERANCE,
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_weight_sum_tolerance(mut self, tolerance: f64) -> Self {
        self.weight_sum_tolerance = tolerance;
        self
    }

    pub fn catalog(&self) -> &C {
        &self.catalog
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    async fn project_lock(&self, id: ProjectId) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        locks.entry(id).or_default().clone()
    }

    pub async fn run(&self, id: ProjectId) -> Result<RunReport> {
        self.execute(id, false).await
    }

    /// Computes without touching the store.
    pub async fn preview(&self, id: ProjectId) -> Result<RunReport> {
        self.execute(id, true).await
    }

    /// Runs every project of the catalog. A failing project does not stop the others.
    pub async fn run_all(&self) -> Vec<(ProjectSummary, Result<RunReport>)> {
        let mut results = Vec::new();
        for summary in self.catalog.projects() {
            let result = self.run(summary.id).await;
            if let Err(e) = &result {
                tracing::error!("❌ Project '{}' failed: {}", summary.name, e);
            }
            results.push((summary, result));
        }
        results
    }

    #[cfg(test)]
    async fn lock_count(&self) -> usize {
        self.locks.lock().await.len()
    }

    async fn execute(&self, id: ProjectId, dry_run: bool) -> Result<RunReport> {
        // 先確認專案存在，避免為不存在的 id 建立鎖
        let project = self.catalog.project(id)?;
        let lock = self.project_lock(id).await;
        let _guard = lock.lock().await;

        tracing::info!(
            "📐 Computing allocation for '{}' ({} phases, {} stakeholders)",
            project.name,
            project.phases.len(),
            project.stakeholders.len()
        );
        tracing::debug!(
            "Tolerance ±{}%, buffer marker '{}'",
            self.engine.settings().tolerance_percent,
            self.engine.settings().buffer_marker
        );

        ProjectPreconditions {
            project: &project,
            weight_sum_tolerance: self.weight_sum_tolerance,
        }
        .validate()?;

        let outcome = self.engine.compute(&project)?;
        for advisory in &outcome.advisories {
            tracing::warn!("⚠️ {}: {}", project.name, advisory);
        }

        let persisted_rows = if dry_run {
            tracing::info!("🔍 Dry run, store left untouched");
            0
        } else {
            let rows = persist_allocation(&self.store, &project, &outcome.allocations).await?;
            tracing::info!("💾 Stored {} allocation rows for '{}'", rows, project.name);
            rows
        };

        Ok(RunReport {
            project: project.summary(),
            outcome,
            persisted_rows,
            dry_run,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::{InMemoryCatalog, InMemoryStore};

    fn project() -> Project {
        Project::new(ProjectId(1), "A", 1_000.0)
            .with_phase(1, "Études", 40.0)
            .with_phase(2, "DET", 60.0)
            .with_stakeholder(1, "MB", None)
    }

    #[test]
    fn test_preconditions_accept_valid_project() {
        let project = project();
        let check = ProjectPreconditions {
            project: &project,
            weight_sum_tolerance: 0.01,
        };
        assert!(check.validate().is_ok());
    }

    #[test]
    fn test_preconditions_reject_bad_weight_sum() {
        let project = project().with_phase(3, "AOR", 0.5);
        let check = ProjectPreconditions {
            project: &project,
            weight_sum_tolerance: 0.01,
        };
        assert!(matches!(
            check.validate(),
            Err(BudgetError::PreconditionFailed { .. })
        ));
    }

    #[test]
    fn test_preconditions_require_stakeholder() {
        let project = Project::new(ProjectId(2), "B", 1_000.0).with_phase(1, "DET", 100.0);
        let check = ProjectPreconditions {
            project: &project,
            weight_sum_tolerance: 0.01,
        };
        assert!(check.validate().is_err());
    }

    #[tokio::test]
    async fn test_unknown_project_leaves_no_lock_behind() {
        let runner = AllocationRunner::new(
            InMemoryCatalog::new(vec![project()]),
            InMemoryStore::new(),
            AllocationEngine::default(),
        );

        assert!(matches!(
            runner.run(ProjectId(42)).await,
            Err(BudgetError::ProjectNotFound { id: 42 })
        ));
        assert_eq!(runner.lock_count().await, 0);

        runner.run(ProjectId(1)).await.unwrap();
        assert_eq!(runner.lock_count().await, 1);
    }

    #[tokio::test]
    async fn test_run_all_keeps_going_after_a_failure() {
        let unbalanced = Project::new(ProjectId(2), "B", 1_000.0)
            .with_phase(1, "DET", 90.0)
            .with_stakeholder(1, "MB", None);
        let last = Project::new(ProjectId(3), "C", 1_000.0)
            .with_phase(1, "DET", 100.0)
            .with_stakeholder(1, "MB", None);
        let store = InMemoryStore::new();
        let runner = AllocationRunner::new(
            InMemoryCatalog::new(vec![project(), unbalanced, last]),
            store.clone(),
            AllocationEngine::default(),
        );

        let results = runner.run_all().await;

        assert_eq!(results.len(), 3);
        assert!(results[0].1.is_ok());
        assert!(matches!(
            results[1].1,
            Err(BudgetError::PreconditionFailed { .. })
        ));
        assert_eq!(results[2].0.id, ProjectId(3));
        assert!(results[2].1.is_ok());
        assert_eq!(store.project_count().await, 2);
    }
}
