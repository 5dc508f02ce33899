use crate::utils::error::{JudgeError, Result};
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// 預設值取自 NCHC 端點的既有設定
pub const DEFAULT_API_URL: &str = "https://outer-medusa.genai.nchc.org.tw/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "gpt-oss-120b";
pub const DEFAULT_TEMPERATURE: f64 = 0.2;
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 60;
pub const DEFAULT_RETRY_ATTEMPTS: u32 = 3;
pub const DEFAULT_RETRY_WAIT_SECONDS: u64 = 2;
pub const DEFAULT_BATCH_SIZE: usize = 20;
pub const API_KEY_ENV: &str = "NCHC_API_KEY";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobConfig {
    #[serde(default)]
    pub job: JobSection,
    #[serde(default)]
    pub endpoint: EndpointConfig,
    #[serde(default)]
    pub batch: BatchConfig,
    #[serde(default)]
    pub files: FilesConfig,
    #[serde(default)]
    pub monitoring: MonitoringConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobSection {
    pub name: Option<String>,
    pub description: Option<String>,
    pub version: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EndpointConfig {
    pub url: Option<String>,
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub temperature: Option<f64>,
    pub timeout_seconds: Option<u64>,
    pub retry_attempts: Option<u32>,
    pub retry_wait_seconds: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchConfig {
    pub size: Option<usize>,
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FilesConfig {
    pub input: Option<String>,
    pub results: Option<String>,
    pub raw_log: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MonitoringConfig {
    pub enabled: Option<bool>,
}

impl JobConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(JudgeError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        // 處理環境變數替換
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| JudgeError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${NCHC_API_KEY})
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| JudgeError::ConfigError {
            message: format!("invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn api_url(&self) -> &str {
        self.endpoint.url.as_deref().unwrap_or(DEFAULT_API_URL)
    }

    /// 金鑰優先序：配置檔（替換後）> 環境變數。未替換成功的 ${...} 佔位符視為未設定
    pub fn api_key(&self) -> Option<String> {
        match self.endpoint.api_key.as_deref() {
            Some(value) if !value.is_empty() && !value.starts_with("${") => {
                Some(value.to_string())
            }
            _ => std::env::var(API_KEY_ENV).ok().filter(|v| !v.is_empty()),
        }
    }

    pub fn model(&self) -> &str {
        self.endpoint.model.as_deref().unwrap_or(DEFAULT_MODEL)
    }

    pub fn temperature(&self) -> f64 {
        self.endpoint.temperature.unwrap_or(DEFAULT_TEMPERATURE)
    }

    pub fn timeout_seconds(&self) -> u64 {
        self.endpoint
            .timeout_seconds
            .unwrap_or(DEFAULT_TIMEOUT_SECONDS)
    }

    pub fn retry_attempts(&self) -> u32 {
        self.endpoint
            .retry_attempts
            .unwrap_or(DEFAULT_RETRY_ATTEMPTS)
    }

    pub fn retry_wait_seconds(&self) -> u64 {
        self.endpoint
            .retry_wait_seconds
            .unwrap_or(DEFAULT_RETRY_WAIT_SECONDS)
    }

    pub fn batch_size(&self) -> usize {
        self.batch.size.unwrap_or(DEFAULT_BATCH_SIZE)
    }

    pub fn limit(&self) -> Option<usize> {
        self.batch.limit
    }

    pub fn monitoring_enabled(&self) -> bool {
        self.monitoring.enabled.unwrap_or(false)
    }

    /// 驗證配置的合理性
    pub fn validate_config(&self) -> Result<()> {
        validation::validate_url("endpoint.url", self.api_url())?;
        validation::validate_non_empty_string("endpoint.model", self.model())?;
        validation::validate_range("endpoint.temperature", self.temperature(), 0.0, 2.0)?;
        validation::validate_positive_number("endpoint.timeout_seconds", self.timeout_seconds() as usize, 1)?;
        validation::validate_positive_number("endpoint.retry_attempts", self.retry_attempts() as usize, 1)?;
        validation::validate_positive_number("batch.size", self.batch_size(), 1)?;

        if self.api_key().is_none() {
            return Err(JudgeError::MissingConfigError {
                field: "endpoint.api_key".to_string(),
            });
        }

        if let Some(input) = self.files.input.as_deref() {
            validation::validate_path("files.input", input)?;
        }
        if let Some(results) = self.files.results.as_deref() {
            validation::validate_path("files.results", results)?;
        }
        if let Some(raw_log) = self.files.raw_log.as_deref() {
            validation::validate_path("files.raw_log", raw_log)?;
        }

        Ok(())
    }
}

impl Validate for JobConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_basic_job_config() {
        let toml_content = r#"
[job]
name = "likelihood-2026"
description = "Plausibility assessment batch job"
version = "1.0.0"

[endpoint]
url = "https://api.example.com/v1/chat/completions"
api_key = "test-key"
model = "gpt-oss-120b"

[batch]
size = 5
limit = 10

[files]
input = "descriptions.json"
results = "out.json"
raw_log = "raw.jsonl"
"#;

        let config = JobConfig::from_toml_str(toml_content).unwrap();

        assert_eq!(config.job.name.as_deref(), Some("likelihood-2026"));
        assert_eq!(config.api_url(), "https://api.example.com/v1/chat/completions");
        assert_eq!(config.batch_size(), 5);
        assert_eq!(config.limit(), Some(10));
        assert_eq!(config.files.input.as_deref(), Some("descriptions.json"));
    }

    #[test]
    fn test_defaults_when_sections_omitted() {
        let config = JobConfig::from_toml_str("").unwrap();

        assert_eq!(config.api_url(), DEFAULT_API_URL);
        assert_eq!(config.model(), DEFAULT_MODEL);
        assert_eq!(config.temperature(), DEFAULT_TEMPERATURE);
        assert_eq!(config.timeout_seconds(), DEFAULT_TIMEOUT_SECONDS);
        assert_eq!(config.retry_attempts(), DEFAULT_RETRY_ATTEMPTS);
        assert_eq!(config.retry_wait_seconds(), DEFAULT_RETRY_WAIT_SECONDS);
        assert_eq!(config.batch_size(), DEFAULT_BATCH_SIZE);
        assert_eq!(config.limit(), None);
        assert!(!config.monitoring_enabled());
    }

    #[test]
    fn test_env_var_substitution_and_key_fallback() {
        std::env::set_var("TEST_JOB_ENDPOINT", "https://test.api.com/v1/chat/completions");

        let toml_content = r#"
[endpoint]
url = "${TEST_JOB_ENDPOINT}"
api_key = "${TEST_UNSET_KEY_VAR}"
"#;

        let config = JobConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(config.api_url(), "https://test.api.com/v1/chat/completions");

        // 佔位符未被替換時視為未設定，回落到環境變數
        std::env::set_var(API_KEY_ENV, "env-key");
        assert_eq!(config.api_key().as_deref(), Some("env-key"));
        std::env::remove_var(API_KEY_ENV);

        std::env::remove_var("TEST_JOB_ENDPOINT");
    }

    #[test]
    fn test_config_validation_rejects_bad_url() {
        let toml_content = r#"
[endpoint]
url = "not-a-url"
api_key = "k"
"#;

        let config = JobConfig::from_toml_str(toml_content).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_rejects_zero_batch() {
        let toml_content = r#"
[endpoint]
api_key = "k"

[batch]
size = 0
"#;

        let config = JobConfig::from_toml_str(toml_content).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();

        let toml_content = r#"
[job]
name = "file-test"

[endpoint]
api_key = "k"
temperature = 0.7
"#;

        temp_file.write_all(toml_content.as_bytes()).unwrap();

        let config = JobConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.job.name.as_deref(), Some("file-test"));
        assert_eq!(config.temperature(), 0.7);
    }
}
