pub mod basis;
pub mod buffer;
pub mod correction;
pub mod distributor;
pub mod engine;
pub mod reconciler;
pub mod runner;
pub mod table;
pub mod targets;
pub mod writer;

pub use crate::domain::allocation::{
    Advisory, Allocation, AllocationOutcome, AllocationRecord, AllocationSet, StakeholderBalance,
};
pub use crate::domain::ports::{AllocationStore, ProjectCatalog};
pub use crate::utils::error::Result;
