pub mod cli;
pub mod toml_config;

#[cfg(feature = "cli")]
use clap::{Parser, Subcommand};

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Parser)]
#[command(name = "phase-budget")]
#[command(about = "Split construction project budgets across phases and stakeholders")]
pub struct CliConfig {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "phase-budget.toml")]
    pub config: String,

    /// Override the project catalog file from the configuration
    #[arg(long)]
    pub data_file: Option<String>,

    /// Override the allocation store directory from the configuration
    #[arg(long)]
    pub output_path: Option<String>,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// List the projects of the catalog
    List,
    /// Compute and store the allocation of one project
    Compute {
        project_id: u32,

        /// Show the result without replacing stored allocations
        #[arg(long)]
        dry_run: bool,
    },
    /// Compute and store the allocation of every project
    ComputeAll,
    /// Print the stored allocation of a project
    Show { project_id: u32 },
    /// Export the stored allocation of a project
    Export {
        project_id: u32,

        /// Formats to write, defaults to the configured ones
        #[arg(long, value_delimiter = ',')]
        formats: Vec<String>,
    },
    /// Write the demo projects to the catalog file
    Seed {
        /// Replace an existing catalog
        #[arg(long)]
        force: bool,
    },
}

#[cfg(feature = "cli")]
impl CliConfig {
    /// 命令列參數優先於配置檔
    pub fn apply_overrides(&self, config: &mut toml_config::AppConfig) {
        if let Some(data_file) = &self.data_file {
            config.storage.data_file = data_file.clone();
            tracing::info!("🔧 Data file overridden to: {}", data_file);
        }
        if let Some(output_path) = &self.output_path {
            config.storage.output_path = output_path.clone();
            tracing::info!("🔧 Output path overridden to: {}", output_path);
        }
    }
}
