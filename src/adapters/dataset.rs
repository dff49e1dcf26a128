use crate::domain::model::{
    PhaseId, PhaseTarget, Project, ProjectId, ProjectSummary, StakeholderId,
};
use crate::domain::ports::ProjectCatalog;
use crate::utils::error::{BudgetError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    #[serde(default)]
    pub projects: Vec<ProjectRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectRecord {
    pub id: u32,
    pub name: String,
    pub total_value: f64,
    #[serde(default)]
    pub phases: Vec<PhaseRecord>,
    #[serde(default)]
    pub stakeholders: Vec<StakeholderRecord>,
    #[serde(default)]
    pub phase_targets: Vec<PhaseTargetRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseRecord {
    pub id: u32,
    pub name: String,
    pub weight_percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StakeholderRecord {
    pub id: u32,
    pub name: String,
    pub global_target: Option<f64>,
}

/// One override row. A row without `target_amount` carries no override at all.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseTargetRecord {
    pub phase: u32,
    pub stakeholder: u32,
    pub target_amount: Option<f64>,
}

impl ProjectRecord {
    pub fn to_project(&self) -> Result<Project> {
        let mut project = Project::new(ProjectId(self.id), self.name.clone(), self.total_value);

        let mut phase_ids = HashSet::new();
        for phase in &self.phases {
            if !phase_ids.insert(phase.id) {
                return Err(duplicate("phases.id", phase.id, &self.name));
            }
            project = project.with_phase(phase.id, phase.name.clone(), phase.weight_percent);
        }

        let mut stakeholder_ids = HashSet::new();
        for stakeholder in &self.stakeholders {
            if !stakeholder_ids.insert(stakeholder.id) {
                return Err(duplicate("stakeholders.id", stakeholder.id, &self.name));
            }
            project = project.with_stakeholder(
                stakeholder.id,
                stakeholder.name.clone(),
                stakeholder.global_target,
            );
        }

        let mut pairs = HashSet::new();
        for row in &self.phase_targets {
            if !pairs.insert((row.phase, row.stakeholder)) {
                return Err(BudgetError::invalid_input(
                    "phase_targets",
                    format!("{}/{}", row.phase, row.stakeholder),
                    "Duplicate override for the same phase and stakeholder",
                ));
            }
            let target =
                PhaseTarget::from_amount("phase_targets.target_amount", row.target_amount)?;
            project
                .targets
                .set(PhaseId(row.phase), StakeholderId(row.stakeholder), target);
        }

        Ok(project)
    }
}

fn duplicate(field: &str, id: u32, project: &str) -> BudgetError {
    BudgetError::invalid_input(field, id, &format!("Duplicate id in project '{}'", project))
}

/// Project catalog kept in a TOML file.
#[derive(Debug, Clone)]
pub struct DatasetFile {
    path: PathBuf,
    dataset: Dataset,
}

impl DatasetFile {
    /// 讀取專案資料檔，檔案不存在時視為空資料集
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let dataset = if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            Self::parse(&content)?
        } else {
            Dataset::default()
        };
        Ok(Self { path, dataset })
    }

    pub fn from_toml_str<P: AsRef<Path>>(path: P, content: &str) -> Result<Self> {
        Ok(Self {
            path: path.as_ref().to_path_buf(),
            dataset: Self::parse(content)?,
        })
    }

    fn parse(content: &str) -> Result<Dataset> {
        let dataset: Dataset =
            toml::from_str(content).map_err(|e| BudgetError::ConfigValidationError {
                field: "data_file".to_string(),
                message: format!("TOML parsing error: {}", e),
            })?;

        let mut ids = HashSet::new();
        for project in &dataset.projects {
            if !ids.insert(project.id) {
                return Err(BudgetError::ConfigValidationError {
                    field: "projects.id".to_string(),
                    message: format!("project id {} is used more than once", project.id),
                });
            }
        }
        Ok(dataset)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let content =
            toml::to_string_pretty(&self.dataset).map_err(|e| BudgetError::ConfigError {
                message: format!("could not serialize project catalog: {}", e),
            })?;
        std::fs::write(&self.path, content)?;
        Ok(())
    }

    /// Fills the catalog with the demo projects. An existing catalog is kept unless `force`.
    /// Returns how many projects were written.
    pub fn seed_demo(&mut self, force: bool) -> Result<usize> {
        if !self.dataset.projects.is_empty() && !force {
            tracing::warn!("📦 Data already exists in {}", self.path.display());
            return Ok(0);
        }
        self.dataset = Dataset {
            projects: demo_projects(),
        };
        self.save()?;
        Ok(self.dataset.projects.len())
    }
}

impl ProjectCatalog for DatasetFile {
    fn projects(&self) -> Vec<ProjectSummary> {
        self.dataset
            .projects
            .iter()
            .map(|record| ProjectSummary {
                id: ProjectId(record.id),
                name: record.name.clone(),
                total_value: record.total_value,
                phase_count: record.phases.len(),
                stakeholder_count: record.stakeholders.len(),
            })
            .collect()
    }

    fn project(&self, id: ProjectId) -> Result<Project> {
        self.dataset
            .projects
            .iter()
            .find(|record| record.id == id.0)
            .ok_or(BudgetError::ProjectNotFound { id: id.0 })?
            .to_project()
    }
}

fn phases(entries: &[(u32, &str, f64)]) -> Vec<PhaseRecord> {
    entries
        .iter()
        .map(|&(id, name, weight_percent)| PhaseRecord {
            id,
            name: name.to_string(),
            weight_percent,
        })
        .collect()
}

fn stakeholders(entries: &[(u32, &str, f64)]) -> Vec<StakeholderRecord> {
    entries
        .iter()
        .map(|&(id, name, target)| StakeholderRecord {
            id,
            name: name.to_string(),
            global_target: Some(target),
        })
        .collect()
}

pub fn demo_projects() -> Vec<ProjectRecord> {
    vec![
        ProjectRecord {
            id: 1,
            name: "Projet Résidentiel A".to_string(),
            total_value: 1_200_000.0,
            phases: phases(&[
                (1, "Études", 10.0),
                (2, "DCE", 5.0),
                (3, "ACT", 5.0),
                (4, "DET", 65.0),
                (5, "AOR", 15.0),
            ]),
            stakeholders: stakeholders(&[
                (1, "Architecte", 450_000.0),
                (2, "BET Structure", 230_000.0),
                (3, "BET Fluides", 280_000.0),
                (4, "MB", 240_000.0),
            ]),
            phase_targets: Vec::new(),
        },
        ProjectRecord {
            id: 2,
            name: "Projet Commercial B".to_string(),
            total_value: 800_000.0,
            phases: phases(&[
                (6, "Études", 12.0),
                (7, "DCE", 8.0),
                (8, "DET", 60.0),
                (9, "AOR", 20.0),
            ]),
            stakeholders: stakeholders(&[
                (5, "Architecte", 320_000.0),
                (6, "BET Structure", 160_000.0),
                (7, "BET Fluides", 180_000.0),
                (8, "MB", 140_000.0),
            ]),
            phase_targets: Vec::new(),
        },
    ]
}
