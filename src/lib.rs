pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use crate::config::CliConfig;
pub use crate::config::{cli::LocalStorage, toml_config::AppConfig};

pub use crate::adapters::{dataset::DatasetFile, memory::InMemoryCatalog, memory::InMemoryStore};
pub use crate::core::{
    engine::{compute_allocation, AllocationEngine, EngineSettings},
    runner::{AllocationRunner, RunReport},
};
pub use crate::domain::allocation::{Advisory, AllocationOutcome, AllocationRecord, AllocationSet};
pub use crate::domain::model::{PhaseTarget, Project, ProjectId};
pub use crate::utils::error::{BudgetError, Result};
