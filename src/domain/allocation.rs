use crate::domain::model::{PhaseId, ProjectId, StakeholderId};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Allocation {
    pub phase: PhaseId,
    pub stakeholder: StakeholderId,
    pub percent: f64,
    pub amount: f64,
}

/// Full result of one engine run for a project, in phase order then stakeholder order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationSet {
    pub project: ProjectId,
    pub allocations: Vec<Allocation>,
}

impl AllocationSet {
    pub fn empty(project: ProjectId) -> Self {
        Self {
            project,
            allocations: Vec::new(),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Allocation> {
        self.allocations.iter()
    }

    pub fn len(&self) -> usize {
        self.allocations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.allocations.is_empty()
    }

    pub fn get(&self, phase: PhaseId, stakeholder: StakeholderId) -> Option<&Allocation> {
        self.allocations
            .iter()
            .find(|a| a.phase == phase && a.stakeholder == stakeholder)
    }

    pub fn for_phase(&self, phase: PhaseId) -> impl Iterator<Item = &Allocation> {
        self.allocations.iter().filter(move |a| a.phase == phase)
    }

    pub fn phase_percent_total(&self, phase: PhaseId) -> f64 {
        self.for_phase(phase).map(|a| a.percent).sum()
    }

    pub fn stakeholder_total(&self, stakeholder: StakeholderId) -> f64 {
        self.allocations
            .iter()
            .filter(|a| a.stakeholder == stakeholder)
            .map(|a| a.amount)
            .sum()
    }
}

/// Non-fatal findings reported back to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Advisory {
    BufferFallback {
        stakeholder: StakeholderId,
        name: String,
    },
    NoBufferAvailable,
    FixedTargetClipped {
        phase: PhaseId,
        stakeholder: StakeholderId,
        requested_amount: f64,
        allocated_amount: f64,
    },
    BufferStarved {
        phase: PhaseId,
        stakeholder: StakeholderId,
    },
    UnallocatedRemainder {
        phase: PhaseId,
        percent: f64,
    },
    UnresolvableCorrection {
        stakeholder: StakeholderId,
        deviation: f64,
    },
    CorrectionShortfall {
        stakeholder: StakeholderId,
        requested: f64,
        applied: f64,
    },
}

impl fmt::Display for Advisory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Advisory::BufferFallback { name, .. } => {
                write!(f, "no designated buffer found, defaulting to {}", name)
            }
            Advisory::NoBufferAvailable => {
                write!(f, "project has no stakeholders, nothing was allocated")
            }
            Advisory::FixedTargetClipped {
                phase,
                stakeholder,
                requested_amount,
                allocated_amount,
            } => write!(
                f,
                "fixed target {:.2} for stakeholder {} exceeds what is left in phase {}, clipped to {:.2}",
                requested_amount, stakeholder, phase, allocated_amount
            ),
            Advisory::BufferStarved { phase, stakeholder } => write!(
                f,
                "buffer stakeholder {} receives nothing in phase {}",
                stakeholder, phase
            ),
            Advisory::UnallocatedRemainder { phase, percent } => write!(
                f,
                "{:.4}% of phase {} has no eligible recipient",
                percent, phase
            ),
            Advisory::UnresolvableCorrection {
                stakeholder,
                deviation,
            } => write!(
                f,
                "stakeholder {} deviates by {:.2} but has no adjustable phase to correct it",
                stakeholder, deviation
            ),
            Advisory::CorrectionShortfall {
                stakeholder,
                requested,
                applied,
            } => write!(
                f,
                "correction for stakeholder {} limited to {:.2} of {:.2}",
                stakeholder, applied, requested
            ),
        }
    }
}

/// Where a stakeholder ends up relative to its global target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StakeholderBalance {
    pub stakeholder: StakeholderId,
    pub name: String,
    pub global_target: Option<f64>,
    pub allocated: f64,
    pub deviation: f64,
    pub deviation_percent: Option<f64>,
    pub within_tolerance: bool,
    pub is_buffer: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationOutcome {
    pub allocations: AllocationSet,
    pub advisories: Vec<Advisory>,
    pub balances: Vec<StakeholderBalance>,
    pub buffer: Option<StakeholderId>,
}

/// One persisted allocation row, denormalized with names for export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationRecord {
    pub project_id: ProjectId,
    pub phase_id: PhaseId,
    pub phase_name: String,
    pub stakeholder_id: StakeholderId,
    pub stakeholder_name: String,
    pub percent: f64,
    pub amount: f64,
}
