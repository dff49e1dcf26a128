use crate::core::engine::EngineSettings;
use crate::core::runner::DEFAULT_WEIGHT_SUM_TOLERANCE;
use crate::utils::error::{BudgetError, Result};
use crate::utils::validation::{
    validate_allowed_values, validate_non_empty_string, validate_path, validate_range, Validate,
};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const SUPPORTED_EXPORT_FORMATS: [&str; 2] = ["csv", "json"];

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    pub logging: Option<LoggingConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(flatten)]
    pub settings: EngineSettings,
    pub weight_sum_tolerance: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_data_file")]
    pub data_file: String,
    #[serde(default = "default_output_path")]
    pub output_path: String,
    #[serde(default = "default_export_formats")]
    pub export_formats: Vec<String>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_file: default_data_file(),
            output_path: default_output_path(),
            export_formats: default_export_formats(),
        }
    }
}

fn default_data_file() -> String {
    "projects.toml".to_string()
}

fn default_output_path() -> String {
    "./output".to_string()
}

fn default_export_formats() -> Vec<String> {
    vec!["csv".to_string()]
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: Option<String>,
    pub json: Option<bool>,
}

impl AppConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(BudgetError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 檔案不存在時使用預設配置
    pub fn from_file_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        if path.as_ref().exists() {
            Self::from_file(path)
        } else {
            tracing::debug!(
                "Config file {} not found, using defaults",
                path.as_ref().display()
            );
            Ok(Self::default())
        }
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| BudgetError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${BUDGET_DATA_FILE})
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| BudgetError::ConfigError {
            message: format!("Invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn validate_config(&self) -> Result<()> {
        let engine = &self.engine.settings;
        validate_range("engine.tolerance_percent", engine.tolerance_percent, 0.0, 100.0)?;
        validate_non_empty_string("engine.buffer_marker", &engine.buffer_marker)?;
        validate_range(
            "engine.weight_sum_tolerance",
            self.weight_sum_tolerance(),
            0.0,
            100.0,
        )?;

        validate_path("storage.data_file", &self.storage.data_file)?;
        validate_path("storage.output_path", &self.storage.output_path)?;
        validate_allowed_values(
            "storage.export_formats",
            &self.storage.export_formats,
            &SUPPORTED_EXPORT_FORMATS,
        )?;

        if let Some(level) = self.logging.as_ref().and_then(|l| l.level.as_deref()) {
            validate_allowed_values(
                "logging.level",
                &[level.to_lowercase()],
                &["trace", "debug", "info", "warn", "error"],
            )?;
        }

        Ok(())
    }

    pub fn engine_settings(&self) -> EngineSettings {
        self.engine.settings.clone()
    }

    pub fn weight_sum_tolerance(&self) -> f64 {
        self.engine
            .weight_sum_tolerance
            .unwrap_or(DEFAULT_WEIGHT_SUM_TOLERANCE)
    }

    pub fn data_file(&self) -> &str {
        &self.storage.data_file
    }

    pub fn output_path(&self) -> &str {
        &self.storage.output_path
    }

    pub fn json_logging(&self) -> bool {
        self.logging.as_ref().and_then(|l| l.json).unwrap_or(false)
    }

    pub fn log_level(&self) -> Option<&str> {
        self.logging.as_ref().and_then(|l| l.level.as_deref())
    }
}

impl Validate for AppConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
