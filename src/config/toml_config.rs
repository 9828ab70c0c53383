use crate::utils::error::{EpiasError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// On-disk configuration (`epias.toml`). Every section and key is optional;
/// missing values fall back to [`Settings`](super::settings::Settings) defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TomlConfig {
    pub environment: Option<String>,
    pub debug: Option<bool>,
    pub api: Option<ApiSection>,
    pub auth: Option<AuthSection>,
    pub pagination: Option<PaginationSection>,
    pub cache: Option<CacheSection>,
    pub output: Option<OutputSection>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ApiSection {
    pub base_url: Option<String>,
    pub timeout_seconds: Option<u64>,
    pub retry_attempts: Option<u32>,
    pub retry_delay_seconds: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuthSection {
    pub url: Option<String>,
    pub test_url: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub tgt_validity_hours: Option<u64>,
    pub refresh_margin_minutes: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PaginationSection {
    pub default_page_size: Option<u32>,
    pub max_page_size: Option<u32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CacheSection {
    pub enabled: Option<bool>,
    pub dir: Option<String>,
    pub ttl_seconds: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OutputSection {
    pub path: Option<String>,
    pub formats: Option<Vec<String>>,
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(EpiasError::IoError)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| EpiasError::ConfigError {
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${EPIAS_PASSWORD})
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| EpiasError::ConfigError {
            message: format!("invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_full_config() {
        let toml_content = r#"
environment = "test"
debug = true

[api]
base_url = "https://seffaflik-prp.epias.com.tr/electricity-service/v1"
timeout_seconds = 10
retry_attempts = 5

[auth]
username = "analyst@example.com"
tgt_validity_hours = 2

[pagination]
default_page_size = 250
max_page_size = 500

[cache]
enabled = false

[output]
path = "./exports"
formats = ["csv", "tsv"]
"#;

        let config = TomlConfig::from_toml_str(toml_content).unwrap();

        assert_eq!(config.environment.as_deref(), Some("test"));
        assert_eq!(config.api.as_ref().unwrap().timeout_seconds, Some(10));
        assert_eq!(
            config.auth.as_ref().unwrap().username.as_deref(),
            Some("analyst@example.com")
        );
        assert_eq!(config.pagination.as_ref().unwrap().max_page_size, Some(500));
        assert_eq!(config.cache.as_ref().unwrap().enabled, Some(false));
        assert_eq!(
            config.output.unwrap().formats.unwrap(),
            vec!["csv".to_string(), "tsv".to_string()]
        );
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("EPIAS_TOML_TEST_PASSWORD", "s3cret");

        let toml_content = r#"
[auth]
password = "${EPIAS_TOML_TEST_PASSWORD}"
username = "${EPIAS_TOML_TEST_UNSET_USER}"
"#;

        let config = TomlConfig::from_toml_str(toml_content).unwrap();
        let auth = config.auth.unwrap();
        assert_eq!(auth.password.as_deref(), Some("s3cret"));
        // Unset variables are left untouched.
        assert_eq!(auth.username.as_deref(), Some("${EPIAS_TOML_TEST_UNSET_USER}"));

        std::env::remove_var("EPIAS_TOML_TEST_PASSWORD");
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        let result = TomlConfig::from_toml_str("[api]\nbase_ulr = \"https://x\"\n");
        assert!(matches!(result, Err(EpiasError::ConfigError { .. })));
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file
            .write_all(b"environment = \"development\"\n[cache]\nttl_seconds = 60\n")
            .unwrap();

        let config = TomlConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.environment.as_deref(), Some("development"));
        assert_eq!(config.cache.unwrap().ttl_seconds, Some(60));
    }
}
