use thiserror::Error;

#[derive(Error, Debug)]
pub enum JudgeError {
    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Invalid value for {field}: '{value}' ({reason})")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Configuration validation failed for {field}: {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Model reply error: {message}")]
    ModelReplyError { message: String },

    #[error("Data processing error: {message}")]
    ProcessingError { message: String },

    #[error("Validation error: {message}")]
    ValidationError { message: String },
}

/// 錯誤嚴重程度，對應 CLI 退出碼
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    FileSystem,
    DataFormat,
    Configuration,
    ModelReply,
}

impl JudgeError {
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            // 網路與模型回覆錯誤會先重試，走到這裡代表重試已耗盡
            JudgeError::ApiError(_) => ErrorSeverity::Medium,
            JudgeError::ModelReplyError { .. } => ErrorSeverity::Medium,
            JudgeError::IoError(_) => ErrorSeverity::Critical,
            JudgeError::SerializationError(_) => ErrorSeverity::High,
            JudgeError::ConfigError { .. } => ErrorSeverity::High,
            JudgeError::InvalidConfigValueError { .. } => ErrorSeverity::High,
            JudgeError::MissingConfigError { .. } => ErrorSeverity::High,
            JudgeError::ConfigValidationError { .. } => ErrorSeverity::High,
            JudgeError::ProcessingError { .. } => ErrorSeverity::High,
            JudgeError::ValidationError { .. } => ErrorSeverity::High,
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            JudgeError::ApiError(_) => ErrorCategory::Network,
            JudgeError::IoError(_) => ErrorCategory::FileSystem,
            JudgeError::SerializationError(_) => ErrorCategory::DataFormat,
            JudgeError::ModelReplyError { .. } => ErrorCategory::ModelReply,
            JudgeError::ConfigError { .. }
            | JudgeError::InvalidConfigValueError { .. }
            | JudgeError::MissingConfigError { .. }
            | JudgeError::ConfigValidationError { .. } => ErrorCategory::Configuration,
            JudgeError::ProcessingError { .. } | JudgeError::ValidationError { .. } => {
                ErrorCategory::DataFormat
            }
        }
    }

    pub fn recovery_suggestion(&self) -> String {
        match self {
            JudgeError::ApiError(_) => {
                "Check network connectivity and the API endpoint, then retry".to_string()
            }
            JudgeError::IoError(_) => {
                "Check file paths and filesystem permissions".to_string()
            }
            JudgeError::SerializationError(_) => {
                "Check that the input file is valid JSON".to_string()
            }
            JudgeError::ModelReplyError { .. } => {
                "Inspect the raw response log; lowering the batch size often helps the model keep its output well-formed"
                    .to_string()
            }
            JudgeError::MissingConfigError { field } if field.contains("api_key") => {
                "Set the NCHC_API_KEY environment variable or fill endpoint.api_key in the job config"
                    .to_string()
            }
            JudgeError::ConfigError { .. }
            | JudgeError::InvalidConfigValueError { .. }
            | JudgeError::MissingConfigError { .. }
            | JudgeError::ConfigValidationError { .. } => {
                "Review the job config file and command line arguments".to_string()
            }
            JudgeError::ProcessingError { .. } => {
                "Re-run with --verbose to see per-batch details".to_string()
            }
            JudgeError::ValidationError { .. } => {
                "Fix the offending input items; every element needs id and description".to_string()
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            JudgeError::ApiError(e) => format!("Could not reach the model endpoint: {}", e),
            JudgeError::IoError(e) => format!("File operation failed: {}", e),
            JudgeError::SerializationError(e) => format!("JSON handling failed: {}", e),
            JudgeError::ModelReplyError { message } => {
                format!("The model reply could not be used: {}", message)
            }
            JudgeError::ConfigError { message } => format!("Configuration problem: {}", message),
            JudgeError::InvalidConfigValueError { field, value, reason } => {
                format!("Bad value '{}' for {}: {}", value, field, reason)
            }
            JudgeError::MissingConfigError { field } => {
                format!("Missing configuration: {}", field)
            }
            JudgeError::ConfigValidationError { field, message } => {
                format!("Configuration check failed ({}): {}", field, message)
            }
            JudgeError::ProcessingError { message } => message.clone(),
            JudgeError::ValidationError { message } => message.clone(),
        }
    }
}

pub type Result<T> = std::result::Result<T, JudgeError>;
