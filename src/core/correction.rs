use crate::core::reconciler::{Deviation, MONEY_EPSILON};
use crate::core::table::AllocationTable;
use crate::core::targets::TargetResolution;
use crate::domain::allocation::Advisory;
use crate::domain::model::Project;
use serde::{Deserialize, Serialize};

/// How one stakeholder's correction is spread over its adjustable phases.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CorrectionSplit {
    /// Each phase carries a share proportional to its amount, i.e. the same
    /// percentage-point shift in every phase.
    #[default]
    PhaseWeighted,
    /// Each phase carries the same amount of money.
    Even,
}

/// Single correction pass: moves money between out-of-band stakeholders and the buffer.
///
/// Corrections are applied largest absolute deviation first. For every phase only the
/// corrected stakeholder and the buffer change, so phase totals are preserved. Fixed
/// allocations are never touched, and neither side ever goes below zero.
pub fn apply_corrections(
    project: &Project,
    resolution: &TargetResolution,
    table: &mut AllocationTable,
    deviations: &[Deviation],
    buffer: Option<usize>,
    tolerance_percent: f64,
    split: CorrectionSplit,
) -> Vec<Advisory> {
    let mut advisories = Vec::new();

    let mut queue: Vec<&Deviation> = deviations
        .iter()
        .filter(|d| Some(d.stakeholder) != buffer && d.exceeds(tolerance_percent))
        .collect();
    // sort_by 為穩定排序，同幅度時保留專案順序
    queue.sort_by(|a, b| b.deviation.abs().total_cmp(&a.deviation.abs()));

    for entry in queue {
        let s = entry.stakeholder;
        let stakeholder_id = project.stakeholders[s].id;

        let Some(b) = buffer else {
            advisories.push(Advisory::UnresolvableCorrection {
                stakeholder: stakeholder_id,
                deviation: entry.deviation,
            });
            continue;
        };

        let phases: Vec<usize> = (0..table.phase_count())
            .filter(|&p| {
                resolution.is_adjustable(p, s)
                    && resolution.is_adjustable(p, b)
                    && table.phase_amount(p) > 0.0
            })
            .collect();

        if phases.is_empty() {
            advisories.push(Advisory::UnresolvableCorrection {
                stakeholder: stakeholder_id,
                deviation: entry.deviation,
            });
            continue;
        }

        let weights: Vec<f64> = match split {
            CorrectionSplit::PhaseWeighted => {
                phases.iter().map(|&p| table.phase_amount(p)).collect()
            }
            CorrectionSplit::Even => vec![1.0; phases.len()],
        };
        let weight_total: f64 = weights.iter().sum();

        let mut applied = 0.0;
        for (&p, weight) in phases.iter().zip(&weights) {
            let share = entry.deviation * weight / weight_total;
            applied += table.transfer(p, s, b, share);
        }

        tracing::debug!(
            stakeholder = %project.stakeholders[s].name,
            requested = entry.deviation,
            applied,
            phases = phases.len(),
            "correction applied"
        );

        if (entry.deviation - applied).abs() > MONEY_EPSILON {
            advisories.push(Advisory::CorrectionShortfall {
                stakeholder: stakeholder_id,
                requested: entry.deviation,
                applied,
            });
        }
    }

    advisories
}
