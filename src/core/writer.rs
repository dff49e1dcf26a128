use crate::domain::allocation::{AllocationRecord, AllocationSet};
use crate::domain::model::Project;
use crate::domain::ports::AllocationStore;
use crate::utils::error::{BudgetError, Result};

/// Rows to persist for a computed set: every pair that ends above zero percent.
pub fn to_records(project: &Project, set: &AllocationSet) -> Result<Vec<AllocationRecord>> {
    if set.project != project.id {
        return Err(BudgetError::StorageError {
            message: format!(
                "allocation set belongs to project {}, not {}",
                set.project, project.id
            ),
        });
    }

    set.iter()
        .filter(|allocation| allocation.percent > 0.0)
        .map(|allocation| {
            let phase = project.phase(allocation.phase).ok_or_else(|| {
                BudgetError::StorageError {
                    message: format!("unknown phase {} in allocation set", allocation.phase),
                }
            })?;
            let stakeholder = project.stakeholder(allocation.stakeholder).ok_or_else(|| {
                BudgetError::StorageError {
                    message: format!(
                        "unknown stakeholder {} in allocation set",
                        allocation.stakeholder
                    ),
                }
            })?;
            Ok(AllocationRecord {
                project_id: project.id,
                phase_id: phase.id,
                phase_name: phase.name.clone(),
                stakeholder_id: stakeholder.id,
                stakeholder_name: stakeholder.name.clone(),
                percent: allocation.percent,
                amount: allocation.amount,
            })
        })
        .collect()
}

/// Replaces everything stored for the project with `set`. Returns the number of rows written.
pub async fn persist_allocation<S>(
    store: &S,
    project: &Project,
    set: &AllocationSet,
) -> Result<usize>
where
    S: AllocationStore + ?Sized,
{
    let records = to_records(project, set)?;
    let count = records.len();
    store.replace_allocations(project.id, records).await?;
    tracing::debug!(project = %project.name, rows = count, "allocations replaced");
    Ok(count)
}
