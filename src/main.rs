use clap::Parser;
use phase_budget::config::Command;
use phase_budget::utils::error::ErrorSeverity;
use phase_budget::utils::{logger, validation::Validate};
use phase_budget::{
    app, AllocationEngine, AllocationRunner, AppConfig, BudgetError, CliConfig, DatasetFile,
    LocalStorage, ProjectId,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = CliConfig::parse();

    // 配置檔載入失敗時日誌尚未初始化，直接輸出到 stderr
    let mut config = match AppConfig::from_file_or_default(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 建議: {}", e.recovery_suggestion());
            std::process::exit(1);
        }
    };

    // 初始化日誌
    if config.json_logging() {
        logger::init_json_logger(config.log_level());
    } else {
        logger::init_cli_logger(cli.verbose);
    }

    tracing::info!("Starting phase-budget CLI");
    if cli.verbose {
        tracing::debug!("CLI config: {:?}", cli);
    }

    cli.apply_overrides(&mut config);

    // 驗證配置
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    match run(&cli.command, &config).await {
        Ok(output) => {
            println!("{}", output);
        }
        Err(e) => {
            // 記錄詳細錯誤信息
            tracing::error!(
                "❌ Command failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 建議: {}", e.recovery_suggestion());

            // 根據錯誤嚴重程度決定退出碼
            let exit_code = match e.severity() {
                ErrorSeverity::Low => 0,
                ErrorSeverity::Medium => 2,
                ErrorSeverity::High => 1,
                ErrorSeverity::Critical => 3,
            };

            if exit_code > 0 {
                std::process::exit(exit_code);
            }
        }
    }

    Ok(())
}

async fn run(command: &Command, config: &AppConfig) -> Result<String, BudgetError> {
    let storage = LocalStorage::new(config.output_path());

    match command {
        Command::Seed { force } => {
            let written = app::seed(config.data_file(), *force)?;
            Ok(if written == 0 {
                format!(
                    "📦 {} already holds projects, use --force to replace them",
                    config.data_file()
                )
            } else {
                format!("🌱 {} demo projects written to {}", written, config.data_file())
            })
        }
        Command::List => {
            let catalog = DatasetFile::load(config.data_file())?;
            Ok(app::list_projects(&catalog))
        }
        Command::Show { project_id } => app::show(&storage, ProjectId(*project_id)),
        Command::Export {
            project_id,
            formats,
        } => {
            let formats = if formats.is_empty() {
                config.storage.export_formats.clone()
            } else {
                formats.clone()
            };
            let dir = storage.base_path().join("exports");
            let files = app::export(&storage, ProjectId(*project_id), &dir, &formats).await?;
            Ok(files
                .iter()
                .map(|f| format!("📁 {}", f.display()))
                .collect::<Vec<_>>()
                .join("\n"))
        }
        Command::Compute {
            project_id,
            dry_run,
        } => {
            let runner = build_runner(config, storage)?;
            app::compute(&runner, ProjectId(*project_id), *dry_run).await
        }
        Command::ComputeAll => {
            let runner = build_runner(config, storage)?;
            app::compute_all(&runner).await
        }
    }
}

fn build_runner(
    config: &AppConfig,
    storage: LocalStorage,
) -> Result<AllocationRunner<DatasetFile, LocalStorage>, BudgetError> {
    let catalog = DatasetFile::load(config.data_file())?;
    let engine = AllocationEngine::new(config.engine_settings());
    Ok(AllocationRunner::new(catalog, storage, engine)
        .with_weight_sum_tolerance(config.weight_sum_tolerance()))
}
