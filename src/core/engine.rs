use crate::core::buffer::{BufferSelectionPolicy, MarkerPolicy, DEFAULT_BUFFER_MARKER};
use crate::core::correction::{apply_corrections, CorrectionSplit};
use crate::core::distributor::distribute;
use crate::core::reconciler::{balances, reconcile};
use crate::core::table::AllocationTable;
use crate::core::targets::resolve_targets;
use crate::domain::allocation::{Advisory, AllocationOutcome, AllocationSet};
use crate::domain::model::Project;
use crate::utils::error::{BudgetError, Result};
use crate::utils::validation::validate_finite;
use serde::{Deserialize, Serialize};

pub const DEFAULT_TOLERANCE_PERCENT: f64 = 5.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    /// Half-width of the band around a global target, in percent of the target.
    pub tolerance_percent: f64,
    pub buffer_marker: String,
    pub correction_split: CorrectionSplit,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            tolerance_percent: DEFAULT_TOLERANCE_PERCENT,
            buffer_marker: DEFAULT_BUFFER_MARKER.to_string(),
            correction_split: CorrectionSplit::default(),
        }
    }
}

/// Computes the phase × stakeholder split of a project.
///
/// The engine is pure: it reads the project, never stores anything and never logs
/// advisories, it returns them.
pub struct AllocationEngine<P: BufferSelectionPolicy = MarkerPolicy> {
    settings: EngineSettings,
    policy: P,
}

impl AllocationEngine<MarkerPolicy> {
    pub fn new(settings: EngineSettings) -> Self {
        let policy = MarkerPolicy::new(settings.buffer_marker.clone());
        Self { settings, policy }
    }
}

impl Default for AllocationEngine<MarkerPolicy> {
    fn default() -> Self {
        Self::new(EngineSettings::default())
    }
}

impl<P: BufferSelectionPolicy> AllocationEngine<P> {
    pub fn with_policy<Q: BufferSelectionPolicy>(self, policy: Q) -> AllocationEngine<Q> {
        AllocationEngine {
            settings: self.settings,
            policy,
        }
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn compute(&self, project: &Project) -> Result<AllocationOutcome> {
        validate_inputs(project)?;
        let resolution = resolve_targets(project)?;

        if project.stakeholders.is_empty() {
            return Ok(AllocationOutcome {
                allocations: AllocationSet::empty(project.id),
                advisories: vec![Advisory::NoBufferAvailable],
                balances: Vec::new(),
                buffer: None,
            });
        }

        let mut advisories = Vec::new();
        let selection = self.policy.select(&project.stakeholders);
        let buffer = match selection {
            Some(selection) => {
                let stakeholder = project.stakeholders.get(selection.index).ok_or_else(|| {
                    BudgetError::invalid_input(
                        "buffer_selection",
                        selection.index,
                        &format!(
                            "Buffer policy picked a position outside the {} stakeholders",
                            project.stakeholders.len()
                        ),
                    )
                })?;
                if !selection.designated {
                    advisories.push(Advisory::BufferFallback {
                        stakeholder: stakeholder.id,
                        name: stakeholder.name.clone(),
                    });
                }
                Some((selection.index, stakeholder.id))
            }
            None => None,
        };
        let buffer_id = buffer.map(|(_, id)| id);
        let buffer = buffer.map(|(index, _)| index);

        let mut table = AllocationTable::for_project(project);
        advisories.extend(distribute(project, &resolution, buffer, &mut table));

        let deviations = reconcile(project, &table);
        advisories.extend(apply_corrections(
            project,
            &resolution,
            &mut table,
            &deviations,
            buffer,
            self.settings.tolerance_percent,
            self.settings.correction_split,
        ));

        let final_deviations = reconcile(project, &table);
        tracing::debug!(
            project = %project.name,
            cells = table.phase_count() * table.stakeholder_count(),
            advisories = advisories.len(),
            "allocation computed"
        );

        Ok(AllocationOutcome {
            allocations: table.to_set(project),
            advisories,
            balances: balances(
                project,
                &final_deviations,
                buffer,
                self.settings.tolerance_percent,
            ),
            buffer: buffer_id,
        })
    }
}

/// Runs the engine with default settings and the "MB" buffer convention.
pub fn compute_allocation(project: &Project) -> Result<AllocationOutcome> {
    AllocationEngine::default().compute(project)
}

fn validate_inputs(project: &Project) -> Result<()> {
    validate_finite("project.total_value", project.total_value)?;
    if project.total_value <= 0.0 {
        return Err(BudgetError::invalid_input(
            "project.total_value",
            project.total_value,
            "Total value must be positive",
        ));
    }

    for phase in &project.phases {
        validate_finite("phase.weight_percent", phase.weight_percent)?;
        if phase.weight_percent < 0.0 {
            return Err(BudgetError::invalid_input(
                "phase.weight_percent",
                phase.weight_percent,
                &format!("Phase '{}' has a negative weight", phase.name),
            ));
        }
    }

    for stakeholder in &project.stakeholders {
        if let Some(target) = stakeholder.global_target {
            validate_finite("stakeholder.global_target", target)?;
            if target < 0.0 {
                return Err(BudgetError::invalid_input(
                    "stakeholder.global_target",
                    target,
                    &format!("Stakeholder '{}' has a negative target", stakeholder.name),
                ));
            }
        }
    }

    Ok(())
}
