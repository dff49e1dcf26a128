use async_trait::async_trait;
use phase_budget::domain::model::StakeholderId;
use phase_budget::domain::ports::{AllocationStore, ProjectCatalog};
use phase_budget::{
    app, AllocationEngine, AllocationRecord, AllocationRunner, BudgetError, DatasetFile,
    InMemoryCatalog, InMemoryStore, LocalStorage, PhaseTarget, Project, ProjectId,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

fn seeded_catalog(temp_dir: &TempDir) -> anyhow::Result<DatasetFile> {
    let path = temp_dir.path().join("projects.toml");
    assert_eq!(app::seed(&path, false)?, 2);
    Ok(DatasetFile::load(&path)?)
}

fn small_project() -> Project {
    Project::new(ProjectId(5), "Maison", 100_000.0)
        .with_phase(1, "Études", 20.0)
        .with_phase(2, "DET", 80.0)
        .with_stakeholder(1, "Architecte", Some(60_000.0))
        .with_stakeholder(2, "MB", Some(40_000.0))
}

#[tokio::test]
async fn test_seed_then_compute_all_with_local_storage() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;
    let catalog = seeded_catalog(&temp_dir)?;
    let storage = LocalStorage::new(temp_dir.path().join("output"));
    let runner = AllocationRunner::new(catalog, storage, AllocationEngine::default());

    let reports = runner
        .run_all()
        .await
        .into_iter()
        .map(|(_, result)| result)
        .collect::<Result<Vec<_>, _>>()?;
    assert_eq!(reports.len(), 2);
    assert_eq!(reports[0].persisted_rows, 20);
    assert_eq!(reports[1].persisted_rows, 16);

    let records = runner.store().load_allocations(ProjectId(1)).await?;
    assert_eq!(records.len(), 20);
    let mb_total: f64 = records
        .iter()
        .filter(|r| r.stakeholder_id == StakeholderId(4))
        .map(|r| r.amount)
        .sum();
    assert!((mb_total - 240_000.0).abs() < 1e-6);
    assert!(records.iter().all(|r| r.percent > 0.0));

    let shown = app::show(runner.store(), ProjectId(1))?;
    assert!(shown.contains("BET Structure"));
    Ok(())
}

#[tokio::test]
async fn test_rerun_replaces_rows_instead_of_appending() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;
    let storage = LocalStorage::new(temp_dir.path());

    let first = AllocationRunner::new(
        InMemoryCatalog::new(vec![small_project()]),
        storage.clone(),
        AllocationEngine::default(),
    );
    first.run(ProjectId(5)).await?;
    first.run(ProjectId(5)).await?;
    assert_eq!(storage.load_allocations(ProjectId(5)).await?.len(), 4);

    // 第二次計算時 MB 被排除在 DET 之外，舊列必須消失
    let changed = small_project().with_target(2, 2, PhaseTarget::Excluded);
    let second = AllocationRunner::new(
        InMemoryCatalog::new(vec![changed]),
        storage.clone(),
        AllocationEngine::default(),
    );
    second.run(ProjectId(5)).await?;

    let records = storage.load_allocations(ProjectId(5)).await?;
    assert!(!records
        .iter()
        .any(|r| r.phase_name == "DET" && r.stakeholder_name == "MB"));
    Ok(())
}

#[tokio::test]
async fn test_failed_write_keeps_previous_allocation() -> anyhow::Result<()> {
    let store = InMemoryStore::new();
    let runner = AllocationRunner::new(
        InMemoryCatalog::new(vec![small_project()]),
        store.clone(),
        AllocationEngine::default(),
    );

    runner.run(ProjectId(5)).await?;
    let before = store.load_allocations(ProjectId(5)).await?;

    store.set_fail_writes(true);
    let result = runner.run(ProjectId(5)).await;
    assert!(matches!(result, Err(BudgetError::StorageError { .. })));
    assert_eq!(store.load_allocations(ProjectId(5)).await?, before);
    Ok(())
}

#[tokio::test]
async fn test_dry_run_and_precondition_leave_store_untouched() -> anyhow::Result<()> {
    let unbalanced = Project::new(ProjectId(6), "Bancal", 50_000.0)
        .with_phase(1, "DET", 90.0)
        .with_stakeholder(1, "MB", None);
    let store = InMemoryStore::new();
    let runner = AllocationRunner::new(
        InMemoryCatalog::new(vec![small_project(), unbalanced]),
        store.clone(),
        AllocationEngine::default(),
    );

    let preview = runner.preview(ProjectId(5)).await?;
    assert!(preview.dry_run);
    assert_eq!(preview.persisted_rows, 0);
    assert_eq!(preview.outcome.allocations.len(), 4);

    assert!(matches!(
        runner.run(ProjectId(6)).await,
        Err(BudgetError::PreconditionFailed { .. })
    ));
    assert!(matches!(
        runner.run(ProjectId(42)).await,
        Err(BudgetError::ProjectNotFound { id: 42 })
    ));
    assert_eq!(store.project_count().await, 0);
    Ok(())
}

/// Store that yields inside every write and remembers how many writes overlapped.
#[derive(Clone, Default)]
struct OverlapStore {
    inner: InMemoryStore,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
}

#[async_trait]
impl AllocationStore for OverlapStore {
    async fn replace_allocations(
        &self,
        project: ProjectId,
        records: Vec<AllocationRecord>,
    ) -> phase_budget::Result<()> {
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(20)).await;
        let result = self.inner.replace_allocations(project, records).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }

    async fn load_allocations(
        &self,
        project: ProjectId,
    ) -> phase_budget::Result<Vec<AllocationRecord>> {
        self.inner.load_allocations(project).await
    }
}

#[tokio::test]
async fn test_runs_of_one_project_are_serialized() -> anyhow::Result<()> {
    let store = OverlapStore::default();
    let runner = AllocationRunner::new(
        InMemoryCatalog::new(vec![small_project()]),
        store.clone(),
        AllocationEngine::default(),
    );

    let (a, b, c) = tokio::join!(
        runner.run(ProjectId(5)),
        runner.run(ProjectId(5)),
        runner.run(ProjectId(5))
    );
    let (a, b, _) = (a?, b?, c?);

    assert_eq!(store.max_in_flight.load(Ordering::SeqCst), 1);
    assert_eq!(a.outcome, b.outcome);
    assert_eq!(store.load_allocations(ProjectId(5)).await?.len(), 4);
    Ok(())
}

#[tokio::test]
async fn test_runs_of_different_projects_may_overlap() -> anyhow::Result<()> {
    let mut other = small_project();
    other.id = ProjectId(6);
    let store = OverlapStore::default();
    let runner = AllocationRunner::new(
        InMemoryCatalog::new(vec![small_project(), other]),
        store.clone(),
        AllocationEngine::default(),
    );

    let (a, b) = tokio::join!(runner.run(ProjectId(5)), runner.run(ProjectId(6)));
    a?;
    b?;

    assert_eq!(store.max_in_flight.load(Ordering::SeqCst), 2);
    Ok(())
}

#[tokio::test]
async fn test_export_stored_allocation() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;
    let catalog = seeded_catalog(&temp_dir)?;
    assert_eq!(catalog.projects().len(), 2);

    let storage = LocalStorage::new(temp_dir.path().join("output"));
    let runner = AllocationRunner::new(catalog, storage, AllocationEngine::default());
    runner.run(ProjectId(2)).await?;

    let export_dir = temp_dir.path().join("exports");
    let files = app::export(
        runner.store(),
        ProjectId(2),
        &export_dir,
        &["csv".to_string(), "json".to_string()],
    )
    .await?;
    assert_eq!(files.len(), 2);

    let csv = std::fs::read_to_string(&files[0])?;
    assert_eq!(csv.lines().count(), 17);
    assert!(csv.starts_with("project_id,phase_id,phase_name"));
    Ok(())
}
