use crate::adapters::dataset::DatasetFile;
use crate::adapters::export::export_records;
use crate::config::cli::LocalStorage;
use crate::core::runner::{AllocationRunner, RunReport};
use crate::core::writer::to_records;
use crate::domain::allocation::{AllocationRecord, StakeholderBalance};
use crate::domain::model::{Project, ProjectId};
use crate::domain::ports::{AllocationStore, ProjectCatalog};
use crate::utils::error::{BudgetError, Result};
use std::path::{Path, PathBuf};

pub fn list_projects<C: ProjectCatalog + ?Sized>(catalog: &C) -> String {
    let projects = catalog.projects();
    if projects.is_empty() {
        return "No project in the catalog, run `seed` first".to_string();
    }

    let mut lines = vec![format!(
        "{:>4}  {:<28} {:>16} {:>7} {:>13}",
        "ID", "Name", "Total value", "Phases", "Stakeholders"
    )];
    for project in projects {
        lines.push(format!(
            "{:>4}  {:<28} {:>16.2} {:>7} {:>13}",
            project.id,
            project.name,
            project.total_value,
            project.phase_count,
            project.stakeholder_count
        ));
    }
    lines.join("\n")
}

pub fn render_records(records: &[AllocationRecord]) -> String {
    let mut lines = vec![format!(
        "{:<12} {:<20} {:>9} {:>14}",
        "Phase", "Stakeholder", "Percent", "Amount"
    )];
    for record in records {
        lines.push(format!(
            "{:<12} {:<20} {:>8.2}% {:>14.2}",
            record.phase_name, record.stakeholder_name, record.percent, record.amount
        ));
    }
    lines.join("\n")
}

fn render_balance(balance: &StakeholderBalance) -> String {
    let target = balance
        .global_target
        .map(|t| format!("{:.2}", t))
        .unwrap_or_else(|| "-".to_string());
    let deviation_percent = balance
        .deviation_percent
        .map(|d| format!("{:+.2}%", d))
        .unwrap_or_else(|| "-".to_string());
    let status = match (balance.is_buffer, balance.within_tolerance) {
        (true, _) => "buffer",
        (false, true) => "ok",
        (false, false) => "out of band",
    };
    format!(
        "{:<20} {:>14} {:>14.2} {:>14.2} {:>9} {}",
        balance.name, target, balance.allocated, balance.deviation, deviation_percent, status
    )
}

pub fn render_report(project: &Project, report: &RunReport) -> Result<String> {
    let records = to_records(project, &report.outcome.allocations)?;
    let mut sections = vec![
        format!(
            "📐 {} (total {:.2}){}",
            project.name,
            project.total_value,
            if report.dry_run { " [dry run]" } else { "" }
        ),
        render_records(&records),
        String::new(),
        format!(
            "{:<20} {:>14} {:>14} {:>14} {:>9} {}",
            "Stakeholder", "Target", "Allocated", "Deviation", "Dev %", "Status"
        ),
    ];
    sections.extend(report.outcome.balances.iter().map(render_balance));

    if !report.outcome.advisories.is_empty() {
        sections.push(String::new());
        sections.extend(
            report
                .outcome
                .advisories
                .iter()
                .map(|advisory| format!("⚠️  {}", advisory)),
        );
    }
    if !report.dry_run {
        sections.push(format!("💾 {} rows stored", report.persisted_rows));
    }
    Ok(sections.join("\n"))
}

pub async fn compute<C: ProjectCatalog, S: AllocationStore>(
    runner: &AllocationRunner<C, S>,
    id: ProjectId,
    dry_run: bool,
) -> Result<String> {
    let report = if dry_run {
        runner.preview(id).await?
    } else {
        runner.run(id).await?
    };
    let project = runner.catalog().project(id)?;
    render_report(&project, &report)
}

pub async fn compute_all<C: ProjectCatalog, S: AllocationStore>(
    runner: &AllocationRunner<C, S>,
) -> Result<String> {
    let results = runner.run_all().await;
    if results.is_empty() {
        return Ok("No project in the catalog, run `seed` first".to_string());
    }

    let mut lines = Vec::new();
    for (summary, result) in &results {
        match result {
            Ok(report) => {
                let out_of_band = report
                    .outcome
                    .balances
                    .iter()
                    .filter(|b| !b.is_buffer && !b.within_tolerance)
                    .count();
                lines.push(format!(
                    "✅ {:<28} {:>4} rows  {:>2} advisories  {:>2} out of band",
                    summary.name,
                    report.persisted_rows,
                    report.outcome.advisories.len(),
                    out_of_band
                ));
            }
            Err(e) => lines.push(format!(
                "❌ {:<28} {}",
                summary.name,
                e.user_friendly_message()
            )),
        }
    }
    Ok(lines.join("\n"))
}

pub fn show(storage: &LocalStorage, id: ProjectId) -> Result<String> {
    match storage.read_stored(id)? {
        Some(stored) => Ok(format!(
            "Project {} computed at {}\n{}",
            stored.project_id,
            stored.computed_at.format("%Y-%m-%d %H:%M:%S UTC"),
            render_records(&stored.records)
        )),
        None => Err(BudgetError::StorageError {
            message: format!("no stored allocation for project {}", id),
        }),
    }
}

pub async fn export<S: AllocationStore + ?Sized>(
    store: &S,
    id: ProjectId,
    dir: &Path,
    formats: &[String],
) -> Result<Vec<PathBuf>> {
    let records = store.load_allocations(id).await?;
    if records.is_empty() {
        return Err(BudgetError::StorageError {
            message: format!("no stored allocation for project {}", id),
        });
    }
    let files = export_records(dir, id, &records, formats)?;
    tracing::info!("📤 Exported project {} to {} file(s)", id, files.len());
    Ok(files)
}

pub fn seed<P: AsRef<Path>>(data_file: P, force: bool) -> Result<usize> {
    let mut catalog = DatasetFile::load(data_file)?;
    let written = catalog.seed_demo(force)?;
    if written > 0 {
        tracing::info!(
            "🌱 Seeded {} projects into {}",
            written,
            catalog.path().display()
        );
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::{InMemoryCatalog, InMemoryStore};
    use crate::core::engine::AllocationEngine;

    fn runner() -> AllocationRunner<InMemoryCatalog, InMemoryStore> {
        let project = Project::new(ProjectId(1), "Maison", 100_000.0)
            .with_phase(1, "Études", 20.0)
            .with_phase(2, "DET", 80.0)
            .with_stakeholder(1, "Architecte", Some(60_000.0))
            .with_stakeholder(2, "MB", Some(40_000.0));
        AllocationRunner::new(
            InMemoryCatalog::new(vec![project]),
            InMemoryStore::new(),
            AllocationEngine::default(),
        )
    }

    #[tokio::test]
    async fn test_compute_renders_rows_and_balances() {
        let runner = runner();
        let output = compute(&runner, ProjectId(1), false).await.unwrap();

        assert!(output.contains("Maison"));
        assert!(output.contains("Architecte"));
        assert!(output.contains("buffer"));
        assert!(output.contains("💾 4 rows stored"));
    }

    #[tokio::test]
    async fn test_dry_run_leaves_store_empty() {
        let runner = runner();
        let output = compute(&runner, ProjectId(1), true).await.unwrap();

        assert!(output.contains("[dry run]"));
        assert_eq!(runner.store().project_count().await, 0);
    }

    #[tokio::test]
    async fn test_export_requires_stored_rows() {
        let runner = runner();
        let temp_dir = tempfile::TempDir::new().unwrap();
        let formats = vec!["csv".to_string()];

        assert!(export(runner.store(), ProjectId(1), temp_dir.path(), &formats)
            .await
            .is_err());

        runner.run(ProjectId(1)).await.unwrap();
        let files = export(runner.store(), ProjectId(1), temp_dir.path(), &formats)
            .await
            .unwrap();
        assert_eq!(files.len(), 1);
    }

    #[tokio::test]
    async fn test_compute_all_reports_each_project() {
        let broken = Project::new(ProjectId(2), "Bancal", 10_000.0)
            .with_phase(1, "DET", 50.0)
            .with_stakeholder(1, "MB", None);
        let maison = runner().catalog().project(ProjectId(1)).unwrap();
        let runner = AllocationRunner::new(
            InMemoryCatalog::new(vec![broken, maison]),
            InMemoryStore::new(),
            AllocationEngine::default(),
        );

        let output = compute_all(&runner).await.unwrap();

        assert!(output.contains("❌ Bancal"));
        assert!(output.contains("✅ Maison"));
        assert_eq!(runner.store().project_count().await, 1);
    }

    #[test]
    fn test_list_empty_catalog() {
        let catalog = InMemoryCatalog::new(Vec::new());
        assert!(list_projects(&catalog).contains("seed"));
    }
}
