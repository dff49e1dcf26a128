use crate::domain::model::{Phase, Project};

/// Money the phase is worth against the project total.
pub fn phase_amount(project: &Project, phase: &Phase) -> f64 {
    project.total_value * phase.weight_percent / 100.0
}

/// Share of `phase_amount` that `amount` represents, in percent.
///
/// A phase worth nothing cannot hold any amount, so any positive amount maps to
/// an unbounded percentage and is clipped by the caller.
pub fn percent_of(amount: f64, phase_amount: f64) -> f64 {
    if phase_amount > 0.0 {
        amount / phase_amount * 100.0
    } else if amount > 0.0 {
        f64::INFINITY
    } else {
        0.0
    }
}

pub fn amount_for(percent: f64, phase_amount: f64) -> f64 {
    phase_amount * percent / 100.0
}
