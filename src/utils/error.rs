use thiserror::Error;

#[derive(Error, Debug)]
pub enum BudgetError {
    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration validation failed for '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Invalid input '{value}' for '{field}': {reason}")]
    InvalidInput {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Project precondition not met: {message}")]
    PreconditionFailed { message: String },

    #[error("Project {id} not found")]
    ProjectNotFound { id: u32 },

    #[error("Storage error: {message}")]
    StorageError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Io,
    Data,
    Configuration,
    Input,
    Storage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl BudgetError {
    pub fn invalid_input(field: &str, value: impl ToString, reason: &str) -> Self {
        BudgetError::InvalidInput {
            field: field.to_string(),
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            BudgetError::IoError(_) => ErrorCategory::Io,
            BudgetError::CsvError(_) | BudgetError::SerializationError(_) => ErrorCategory::Data,
            BudgetError::ConfigError { .. }
            | BudgetError::ConfigValidationError { .. }
            | BudgetError::InvalidConfigValueError { .. } => ErrorCategory::Configuration,
            BudgetError::InvalidInput { .. }
            | BudgetError::PreconditionFailed { .. }
            | BudgetError::ProjectNotFound { .. } => ErrorCategory::Input,
            BudgetError::StorageError { .. } => ErrorCategory::Storage,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Input => ErrorSeverity::High,
            ErrorCategory::Configuration => ErrorSeverity::High,
            ErrorCategory::Data => ErrorSeverity::Medium,
            ErrorCategory::Io | ErrorCategory::Storage => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> String {
        match self {
            BudgetError::IoError(_) => {
                "Check that the data file and output directory exist and are writable".to_string()
            }
            BudgetError::CsvError(_) | BudgetError::SerializationError(_) => {
                "The stored allocation file may be corrupted; re-run the computation".to_string()
            }
            BudgetError::ConfigError { .. } | BudgetError::ConfigValidationError { .. } => {
                "Review the TOML configuration file syntax and values".to_string()
            }
            BudgetError::InvalidConfigValueError { field, .. } => {
                format!("Fix the value of '{}' in the configuration", field)
            }
            BudgetError::InvalidInput { field, .. } => {
                format!("Correct '{}' in the project data before computing", field)
            }
            BudgetError::PreconditionFailed { .. } => {
                "Make sure the project has phases summing to 100% and at least one stakeholder"
                    .to_string()
            }
            BudgetError::ProjectNotFound { .. } => {
                "Run the 'list' command to see available project ids".to_string()
            }
            BudgetError::StorageError { .. } => {
                "Check the output path; previous allocations were left untouched".to_string()
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            BudgetError::InvalidInput { field, reason, .. } => {
                format!("Project data is invalid ({}): {}", field, reason)
            }
            BudgetError::ProjectNotFound { id } => format!("No project with id {}", id),
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, BudgetError>;
