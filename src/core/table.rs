use crate::core::basis::{amount_for, percent_of, phase_amount};
use crate::domain::allocation::{Allocation, AllocationSet};
use crate::domain::model::Project;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cell {
    pub percent: f64,
    pub amount: f64,
}

/// Working allocation state for one run: one optional cell per (phase, stakeholder),
/// stored row-major by phase. A missing cell means the pair has no allocation at all,
/// which is different from a zero-percent allocation.
#[derive(Debug, Clone)]
pub struct AllocationTable {
    stakeholder_count: usize,
    phase_amounts: Vec<f64>,
    cells: Vec<Option<Cell>>,
}

impl AllocationTable {
    pub fn new(phase_amounts: Vec<f64>, stakeholder_count: usize) -> Self {
        let cells = vec![None; phase_amounts.len() * stakeholder_count];
        Self {
            stakeholder_count,
            phase_amounts,
            cells,
        }
    }

    pub fn for_project(project: &Project) -> Self {
        let amounts = project
            .phases
            .iter()
            .map(|phase| phase_amount(project, phase))
            .collect();
        Self::new(amounts, project.stakeholders.len())
    }

    pub fn phase_count(&self) -> usize {
        self.phase_amounts.len()
    }

    pub fn stakeholder_count(&self) -> usize {
        self.stakeholder_count
    }

    pub fn phase_amount(&self, phase: usize) -> f64 {
        self.phase_amounts[phase]
    }

    fn slot(&self, phase: usize, stakeholder: usize) -> usize {
        phase * self.stakeholder_count + stakeholder
    }

    pub fn get(&self, phase: usize, stakeholder: usize) -> Option<Cell> {
        self.cells[self.slot(phase, stakeholder)]
    }

    pub fn amount(&self, phase: usize, stakeholder: usize) -> f64 {
        self.get(phase, stakeholder).map_or(0.0, |cell| cell.amount)
    }

    pub fn record(&mut self, phase: usize, stakeholder: usize, percent: f64, amount: f64) {
        let slot = self.slot(phase, stakeholder);
        self.cells[slot] = Some(Cell { percent, amount });
    }

    pub fn record_percent(&mut self, phase: usize, stakeholder: usize, percent: f64) {
        let amount = amount_for(percent, self.phase_amounts[phase]);
        self.record(phase, stakeholder, percent, amount);
    }

    /// Adds to an existing cell, creating it when absent.
    pub fn add_percent(&mut self, phase: usize, stakeholder: usize, percent: f64) {
        let current = self.get(phase, stakeholder).unwrap_or(Cell {
            percent: 0.0,
            amount: 0.0,
        });
        let amount = current.amount + amount_for(percent, self.phase_amounts[phase]);
        self.record(phase, stakeholder, current.percent + percent, amount);
    }

    fn set_amount(&mut self, phase: usize, stakeholder: usize, amount: f64) {
        let percent = percent_of(amount, self.phase_amounts[phase]);
        self.record(phase, stakeholder, percent, amount);
    }

    /// Moves up to `amount` of money from `from` to `to` inside one phase and returns what
    /// actually moved. A negative amount moves money the other way. Neither side is ever
    /// taken below zero.
    pub fn transfer(&mut self, phase: usize, from: usize, to: usize, amount: f64) -> f64 {
        let from_amount = self.amount(phase, from);
        let to_amount = self.amount(phase, to);

        let moved = if amount >= 0.0 {
            amount.min(from_amount)
        } else {
            -(-amount).min(to_amount)
        };
        if moved == 0.0 {
            return 0.0;
        }

        self.set_amount(phase, from, from_amount - moved);
        self.set_amount(phase, to, to_amount + moved);
        moved
    }

    pub fn phase_percent_total(&self, phase: usize) -> f64 {
        (0..self.stakeholder_count)
            .filter_map(|s| self.get(phase, s))
            .map(|cell| cell.percent)
            .sum()
    }

    pub fn stakeholder_total(&self, stakeholder: usize) -> f64 {
        (0..self.phase_count())
            .map(|p| self.amount(p, stakeholder))
            .sum()
    }

    pub fn to_set(&self, project: &Project) -> AllocationSet {
        let mut allocations = Vec::new();
        for (p, phase) in project.phases.iter().enumerate() {
            for (s, stakeholder) in project.stakeholders.iter().enumerate() {
                if let Some(cell) = self.get(p, s) {
                    allocations.push(Allocation {
                        phase: phase.id,
                        stakeholder: stakeholder.id,
                        percent: cell.percent,
                        amount: cell.amount,
                    });
                }
            }
        }
        AllocationSet {
            project: project.id,
            allocations,
        }
    }
}
