use crate::utils::error::{BudgetError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

macro_rules! id_type {
    ($name:ident) => {
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub u32);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_type!(ProjectId);
id_type!(PhaseId);
id_type!(StakeholderId);

/// A construction contract whose total value is spread over phases and stakeholders.
///
/// Phases and stakeholders keep the order they were declared in; that order drives
/// every deterministic choice the allocation engine makes.
#[derive(Debug, Clone, PartialEq)]
pub struct Project {
    pub id: ProjectId,
    pub name: String,
    pub total_value: f64,
    pub phases: Vec<Phase>,
    pub stakeholders: Vec<Stakeholder>,
    pub targets: PhaseTargets,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Phase {
    pub id: PhaseId,
    pub name: String,
    pub weight_percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stakeholder {
    pub id: StakeholderId,
    pub name: String,
    /// `None` means no target: the stakeholder is never corrected.
    pub global_target: Option<f64>,
}

/// Per-(phase, stakeholder) override.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "amount", rename_all = "snake_case")]
pub enum PhaseTarget {
    /// The phase must allocate this amount to the stakeholder.
    Fixed(f64),
    /// The stakeholder takes no part in the phase.
    Excluded,
    /// No override recorded.
    Unset,
}

impl PhaseTarget {
    /// Interprets a stored verified amount: a missing value is `Unset`, zero excludes,
    /// a positive amount is fixed. Negative or non-finite amounts are rejected.
    pub fn from_amount(field: &str, amount: Option<f64>) -> Result<Self> {
        match amount {
            None => Ok(PhaseTarget::Unset),
            Some(value) if !value.is_finite() || value < 0.0 => Err(BudgetError::invalid_input(
                field,
                value,
                "Phase target must be a finite, non-negative amount",
            )),
            Some(value) if value == 0.0 => Ok(PhaseTarget::Excluded),
            Some(value) => Ok(PhaseTarget::Fixed(value)),
        }
    }

    pub fn amount(&self) -> Option<f64> {
        match self {
            PhaseTarget::Fixed(amount) => Some(*amount),
            PhaseTarget::Excluded => Some(0.0),
            PhaseTarget::Unset => None,
        }
    }
}

/// Sparse override table. Pairs that were never set read back as [`PhaseTarget::Unset`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PhaseTargets {
    entries: BTreeMap<(PhaseId, StakeholderId), PhaseTarget>,
}

impl PhaseTargets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, phase: PhaseId, stakeholder: StakeholderId, target: PhaseTarget) {
        match target {
            PhaseTarget::Unset => {
                self.entries.remove(&(phase, stakeholder));
            }
            other => {
                self.entries.insert((phase, stakeholder), other);
            }
        }
    }

    pub fn get(&self, phase: PhaseId, stakeholder: StakeholderId) -> PhaseTarget {
        self.entries
            .get(&(phase, stakeholder))
            .copied()
            .unwrap_or(PhaseTarget::Unset)
    }

    pub fn iter(&self) -> impl Iterator<Item = (PhaseId, StakeholderId, PhaseTarget)> + '_ {
        self.entries
            .iter()
            .map(|(&(phase, stakeholder), &target)| (phase, stakeholder, target))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Project {
    pub fn new(id: ProjectId, name: impl Into<String>, total_value: f64) -> Self {
        Self {
            id,
            name: name.into(),
            total_value,
            phases: Vec::new(),
            stakeholders: Vec::new(),
            targets: PhaseTargets::new(),
        }
    }

    pub fn with_phase(mut self, id: u32, name: impl Into<String>, weight_percent: f64) -> Self {
        self.phases.push(Phase {
            id: PhaseId(id),
            name: name.into(),
            weight_percent,
        });
        self
    }

    pub fn with_stakeholder(
        mut self,
        id: u32,
        name: impl Into<String>,
        global_target: Option<f64>,
    ) -> Self {
        self.stakeholders.push(Stakeholder {
            id: StakeholderId(id),
            name: name.into(),
            global_target,
        });
        self
    }

    pub fn with_target(mut self, phase: u32, stakeholder: u32, target: PhaseTarget) -> Self {
        self.targets
            .set(PhaseId(phase), StakeholderId(stakeholder), target);
        self
    }

    pub fn phase(&self, id: PhaseId) -> Option<&Phase> {
        self.phases.iter().find(|phase| phase.id == id)
    }

    pub fn stakeholder(&self, id: StakeholderId) -> Option<&Stakeholder> {
        self.stakeholders.iter().find(|s| s.id == id)
    }

    pub fn weight_sum(&self) -> f64 {
        self.phases.iter().map(|phase| phase.weight_percent).sum()
    }

    pub fn summary(&self) -> ProjectSummary {
        ProjectSummary {
            id: self.id,
            name: self.name.clone(),
            total_value: self.total_value,
            phase_count: self.phases.len(),
            stakeholder_count: self.stakeholders.len(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectSummary {
    pub id: ProjectId,
    pub name: String,
    pub total_value: f64,
    pub phase_count: usize,
    pub stakeholder_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_target_from_amount() {
        assert_eq!(PhaseTarget::from_amount("t", None).unwrap(), PhaseTarget::Unset);
        assert_eq!(
            PhaseTarget::from_amount("t", Some(0.0)).unwrap(),
            PhaseTarget::Excluded
        );
        assert_eq!(
            PhaseTarget::from_amount("t", Some(12_000.0)).unwrap(),
            PhaseTarget::Fixed(12_000.0)
        );
        assert!(PhaseTarget::from_amount("t", Some(-1.0)).is_err());
        assert!(PhaseTarget::from_amount("t", Some(f64::NAN)).is_err());
    }

    #[test]
    fn test_absent_override_is_distinct_from_zero() {
        let mut targets = PhaseTargets::new();
        targets.set(PhaseId(1), StakeholderId(1), PhaseTarget::Excluded);

        assert_eq!(targets.get(PhaseId(1), StakeholderId(1)), PhaseTarget::Excluded);
        assert_eq!(targets.get(PhaseId(1), StakeholderId(2)), PhaseTarget::Unset);
        assert_eq!(targets.get(PhaseId(1), StakeholderId(1)).amount(), Some(0.0));
        assert_eq!(targets.get(PhaseId(1), StakeholderId(2)).amount(), None);
        assert_eq!(targets.len(), 1);

        targets.set(PhaseId(1), StakeholderId(1), PhaseTarget::Unset);
        assert!(targets.is_empty());
    }
}
