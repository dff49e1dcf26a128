use crate::domain::model::{PhaseTarget, Project};
use crate::utils::error::{BudgetError, Result};

/// How a stakeholder takes part in one phase.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TargetClass {
    Fixed(f64),
    Excluded,
    Adjustable,
}

/// Classification of every (phase, stakeholder) pair, indexed by declaration order.
#[derive(Debug, Clone)]
pub struct TargetResolution {
    stakeholder_count: usize,
    classes: Vec<TargetClass>,
}

impl TargetResolution {
    pub fn class(&self, phase: usize, stakeholder: usize) -> TargetClass {
        self.classes[phase * self.stakeholder_count + stakeholder]
    }

    pub fn is_adjustable(&self, phase: usize, stakeholder: usize) -> bool {
        self.class(phase, stakeholder) == TargetClass::Adjustable
    }

    pub fn phase_count(&self) -> usize {
        if self.stakeholder_count == 0 {
            0
        } else {
            self.classes.len() / self.stakeholder_count
        }
    }

    /// Fixed stakeholders of a phase with their amounts, in project order.
    pub fn fixed_in(&self, phase: usize) -> impl Iterator<Item = (usize, f64)> + '_ {
        (0..self.stakeholder_count).filter_map(move |s| match self.class(phase, s) {
            TargetClass::Fixed(amount) => Some((s, amount)),
            _ => None,
        })
    }

    pub fn adjustable_in(&self, phase: usize) -> impl Iterator<Item = usize> + '_ {
        (0..self.stakeholder_count).filter(move |&s| self.is_adjustable(phase, s))
    }
}

/// Resolves the override table of a project into per-phase classes.
///
/// Overrides that point at a phase or stakeholder outside the project, or that carry
/// a non-positive fixed amount, are malformed input.
pub fn resolve_targets(project: &Project) -> Result<TargetResolution> {
    for (phase, stakeholder, target) in project.targets.iter() {
        if project.phase(phase).is_none() || project.stakeholder(stakeholder).is_none() {
            return Err(BudgetError::invalid_input(
                "phase_targets",
                format!("{}/{}", phase, stakeholder),
                "Override refers to a phase or stakeholder outside the project",
            ));
        }
        if let PhaseTarget::Fixed(amount) = target {
            if !amount.is_finite() || amount <= 0.0 {
                return Err(BudgetError::invalid_input(
                    "phase_targets.target_amount",
                    amount,
                    "Fixed phase target must be a positive finite amount",
                ));
            }
        }
    }

    let stakeholder_count = project.stakeholders.len();
    let mut classes = Vec::with_capacity(project.phases.len() * stakeholder_count);
    for phase in &project.phases {
        for stakeholder in &project.stakeholders {
            let class = match project.targets.get(phase.id, stakeholder.id) {
                PhaseTarget::Fixed(amount) => TargetClass::Fixed(amount),
                PhaseTarget::Excluded => TargetClass::Excluded,
                PhaseTarget::Unset => TargetClass::Adjustable,
            };
            classes.push(class);
        }
    }

    Ok(TargetResolution {
        stakeholder_count,
        classes,
    })
}
