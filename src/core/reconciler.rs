use crate::core::table::AllocationTable;
use crate::domain::allocation::StakeholderBalance;
use crate::domain::model::Project;

/// Below this a monetary difference is treated as nothing.
pub const MONEY_EPSILON: f64 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Deviation {
    pub stakeholder: usize,
    pub target: Option<f64>,
    pub allocated: f64,
    pub deviation: f64,
    pub deviation_percent: Option<f64>,
}

impl Deviation {
    /// Whether the stakeholder sits outside the ±`tolerance_percent` band.
    ///
    /// Without a target nothing is ever out of band. A zero target has no percentage
    /// band; any allocation beyond rounding is out of band.
    pub fn exceeds(&self, tolerance_percent: f64) -> bool {
        match (self.target, self.deviation_percent) {
            (None, _) => false,
            (Some(_), Some(percent)) => percent.abs() > tolerance_percent,
            (Some(_), None) => self.deviation.abs() > MONEY_EPSILON,
        }
    }
}

/// Totals every stakeholder across phases and measures it against its global target.
pub fn reconcile(project: &Project, table: &AllocationTable) -> Vec<Deviation> {
    project
        .stakeholders
        .iter()
        .enumerate()
        .map(|(s, stakeholder)| {
            let allocated = table.stakeholder_total(s);
            match stakeholder.global_target {
                Some(target) => {
                    let deviation = allocated - target;
                    let deviation_percent = (target > 0.0).then(|| deviation / target * 100.0);
                    Deviation {
                        stakeholder: s,
                        target: Some(target),
                        allocated,
                        deviation,
                        deviation_percent,
                    }
                }
                None => Deviation {
                    stakeholder: s,
                    target: None,
                    allocated,
                    deviation: 0.0,
                    deviation_percent: None,
                },
            }
        })
        .collect()
}

pub fn balances(
    project: &Project,
    deviations: &[Deviation],
    buffer: Option<usize>,
    tolerance_percent: f64,
) -> Vec<StakeholderBalance> {
    deviations
        .iter()
        .map(|d| {
            let stakeholder = &project.stakeholders[d.stakeholder];
            StakeholderBalance {
                stakeholder: stakeholder.id,
                name: stakeholder.name.clone(),
                global_target: d.target,
                allocated: d.allocated,
                deviation: d.deviation,
                deviation_percent: d.deviation_percent,
                within_tolerance: !d.exceeds(tolerance_percent),
                is_buffer: buffer == Some(d.stakeholder),
            }
        })
        .collect()
}
