use crate::core::basis::{amount_for, percent_of};
use crate::core::table::AllocationTable;
use crate::core::targets::TargetResolution;
use crate::domain::allocation::Advisory;
use crate::domain::model::Project;

/// Below this a percentage is treated as nothing.
pub const PERCENT_EPSILON: f64 = 1e-9;

/// Splits 100% of every phase among the project's stakeholders.
///
/// Per phase: fixed targets are served first in project order and clipped to what is
/// left, the remainder is shared equally by the adjustable stakeholders other than the
/// buffer, and whatever is still left goes to the buffer when it is adjustable in the
/// phase. A fixed buffer keeps its fixed amount; a leftover it cannot take is reported.
/// Phases are independent of each other.
pub fn distribute(
    project: &Project,
    resolution: &TargetResolution,
    buffer: Option<usize>,
    table: &mut AllocationTable,
) -> Vec<Advisory> {
    let mut advisories = Vec::new();

    for (p, phase) in project.phases.iter().enumerate() {
        let phase_amount = table.phase_amount(p);
        let mut remaining = 100.0_f64;
        let mut clipped = false;

        for (s, target) in resolution.fixed_in(p) {
            let requested = percent_of(target, phase_amount);
            let (percent, amount) = if requested > remaining + PERCENT_EPSILON {
                clipped = true;
                let percent = remaining.max(0.0);
                let amount = amount_for(percent, phase_amount);
                advisories.push(Advisory::FixedTargetClipped {
                    phase: phase.id,
                    stakeholder: project.stakeholders[s].id,
                    requested_amount: target,
                    allocated_amount: amount,
                });
                (percent, amount)
            } else {
                (requested.min(remaining), target)
            };
            table.record(p, s, percent, amount);
            remaining -= percent;
        }

        let sharers: Vec<usize> = resolution
            .adjustable_in(p)
            .filter(|&s| Some(s) != buffer)
            .collect();
        if !sharers.is_empty() {
            let share = remaining.max(0.0) / sharers.len() as f64;
            for s in sharers {
                table.record_percent(p, s, share);
                remaining -= share;
            }
        }

        let leftover = remaining.max(0.0);
        match buffer {
            Some(b) if resolution.is_adjustable(p, b) => {
                table.add_percent(p, b, leftover);
                let buffer_percent = table.get(p, b).map_or(0.0, |cell| cell.percent);
                if clipped && buffer_percent <= PERCENT_EPSILON {
                    advisories.push(Advisory::BufferStarved {
                        phase: phase.id,
                        stakeholder: project.stakeholders[b].id,
                    });
                }
            }
            _ => {
                if leftover > PERCENT_EPSILON {
                    advisories.push(Advisory::UnallocatedRemainder {
                        phase: phase.id,
                        percent: leftover,
                    });
                }
            }
        }

        tracing::debug!(
            phase = %phase.name,
            phase_amount,
            allocated_percent = table.phase_percent_total(p),
            "phase distributed"
        );
    }

    advisories
}
