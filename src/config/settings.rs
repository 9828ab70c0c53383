use super::toml_config::TomlConfig;
use crate::utils::error::{EpiasError, Result};
use crate::utils::validation::{
    validate_non_empty_string, validate_one_of, validate_path, validate_positive_number,
    validate_required_field, validate_url, Validate,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_API_BASE_URL: &str = "https://seffaflik.epias.com.tr/electricity-service/v1";
pub const DEFAULT_AUTH_URL: &str = "https://giris.epias.com.tr";
pub const DEFAULT_AUTH_TEST_URL: &str = "https://giris-prp.epias.com.tr";
pub const DEFAULT_CONFIG_FILE: &str = "epias.toml";
pub const OUTPUT_FORMATS: [&str; 3] = ["csv", "tsv", "json"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Production,
    Test,
    Development,
}

impl FromStr for Environment {
    type Err = EpiasError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "production" => Ok(Environment::Production),
            "test" => Ok(Environment::Test),
            "development" => Ok(Environment::Development),
            other => Err(EpiasError::InvalidConfigValueError {
                field: "ENVIRONMENT".to_string(),
                value: other.to_string(),
                reason: "Environment must be one of production, test, development".to_string(),
            }),
        }
    }
}

/// Password wrapper that never shows up in `Debug` output or logs.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Secret(***)")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: Secret,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheSettings {
    pub enabled: bool,
    pub dir: String,
    pub ttl_seconds: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputSettings {
    pub path: String,
    pub formats: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub api_base_url: String,
    pub auth_base_url: String,
    pub auth_test_url: String,
    pub username: Option<String>,
    pub password: Option<Secret>,
    pub environment: Environment,
    pub debug: bool,
    pub api_timeout_secs: u64,
    pub api_max_retries: u32,
    pub api_retry_delay_secs: u64,
    pub tgt_validity_hours: u64,
    pub tgt_refresh_margin_minutes: u64,
    pub default_page_size: u32,
    pub max_page_size: u32,
    pub cache: CacheSettings,
    pub output: OutputSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            auth_base_url: DEFAULT_AUTH_URL.to_string(),
            auth_test_url: DEFAULT_AUTH_TEST_URL.to_string(),
            username: None,
            password: None,
            environment: Environment::Production,
            debug: false,
            api_timeout_secs: 30,
            api_max_retries: 3,
            api_retry_delay_secs: 1,
            tgt_validity_hours: 2,
            tgt_refresh_margin_minutes: 10,
            default_page_size: 100,
            max_page_size: 1000,
            cache: CacheSettings {
                enabled: true,
                dir: ".epias-cache".to_string(),
                ttl_seconds: 3600,
            },
            output: OutputSettings {
                path: "./output".to_string(),
                formats: vec!["csv".to_string(), "json".to_string()],
            },
        }
    }
}

fn parse_env<T: FromStr>(key: &str, raw: &str) -> Result<T> {
    raw.trim()
        .parse::<T>()
        .map_err(|_| EpiasError::InvalidConfigValueError {
            field: key.to_string(),
            value: raw.to_string(),
            reason: "could not parse value".to_string(),
        })
}

fn parse_bool(key: &str, raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(EpiasError::InvalidConfigValueError {
            field: key.to_string(),
            value: raw.to_string(),
            reason: "expected a boolean".to_string(),
        }),
    }
}

impl Settings {
    /// Defaults, then the TOML file, then environment variables.
    ///
    /// With no explicit path, `epias.toml` in the working directory is used
    /// when present.
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let mut settings = Settings::default();

        match config_path {
            Some(path) => {
                tracing::debug!("Loading configuration from {}", path.display());
                settings.apply_file(&TomlConfig::from_file(path)?)?;
            }
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                tracing::debug!("Loading configuration from {}", DEFAULT_CONFIG_FILE);
                settings.apply_file(&TomlConfig::from_file(DEFAULT_CONFIG_FILE)?)?;
            }
            None => {}
        }

        settings.apply_env()?;
        Ok(settings)
    }

    pub fn apply_file(&mut self, file: &TomlConfig) -> Result<()> {
        if let Some(env) = &file.environment {
            self.environment = env.parse()?;
        }
        if let Some(debug) = file.debug {
            self.debug = debug;
        }
        if let Some(api) = &file.api {
            if let Some(url) = &api.base_url {
                self.api_base_url = url.clone();
            }
            if let Some(timeout) = api.timeout_seconds {
                self.api_timeout_secs = timeout;
            }
            if let Some(retries) = api.retry_attempts {
                self.api_max_retries = retries;
            }
            if let Some(delay) = api.retry_delay_seconds {
                self.api_retry_delay_secs = delay;
            }
        }
        if let Some(auth) = &file.auth {
            if let Some(url) = &auth.url {
                self.auth_base_url = url.clone();
            }
            if let Some(url) = &auth.test_url {
                self.auth_test_url = url.clone();
            }
            if let Some(username) = &auth.username {
                self.username = Some(username.clone());
            }
            if let Some(password) = &auth.password {
                self.password = Some(Secret::new(password.clone()));
            }
            if let Some(hours) = auth.tgt_validity_hours {
                self.tgt_validity_hours = hours;
            }
            if let Some(minutes) = auth.refresh_margin_minutes {
                self.tgt_refresh_margin_minutes = minutes;
            }
        }
        if let Some(pagination) = &file.pagination {
            if let Some(size) = pagination.default_page_size {
                self.default_page_size = size;
            }
            if let Some(size) = pagination.max_page_size {
                self.max_page_size = size;
            }
        }
        if let Some(cache) = &file.cache {
            if let Some(enabled) = cache.enabled {
                self.cache.enabled = enabled;
            }
            if let Some(dir) = &cache.dir {
                self.cache.dir = dir.clone();
            }
            if let Some(ttl) = cache.ttl_seconds {
                self.cache.ttl_seconds = ttl;
            }
        }
        if let Some(output) = &file.output {
            if let Some(path) = &output.path {
                self.output.path = path.clone();
            }
            if let Some(formats) = &output.formats {
                self.output.formats = formats.clone();
            }
        }
        Ok(())
    }

    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_env_with(|key| std::env::var(key).ok())
    }

    /// Overlay values from an arbitrary variable lookup (the process
    /// environment in production, a map in tests).
    pub fn apply_env_with<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("EPIAS_API_BASE_URL") {
            self.api_base_url = v;
        }
        if let Some(v) = lookup("EPIAS_AUTH_URL") {
            self.auth_base_url = v;
        }
        if let Some(v) = lookup("EPIAS_AUTH_TEST_URL") {
            self.auth_test_url = v;
        }
        if let Some(v) = lookup("EPIAS_USERNAME") {
            self.username = Some(v);
        }
        if let Some(v) = lookup("EPIAS_PASSWORD") {
            self.password = Some(Secret::new(v));
        }
        if let Some(v) = lookup("ENVIRONMENT") {
            self.environment = v.trim().parse()?;
        }
        if let Some(v) = lookup("DEBUG") {
            self.debug = parse_bool("DEBUG", &v)?;
        }
        if let Some(v) = lookup("API_TIMEOUT") {
            self.api_timeout_secs = parse_env("API_TIMEOUT", &v)?;
        }
        if let Some(v) = lookup("API_MAX_RETRIES") {
            self.api_max_retries = parse_env("API_MAX_RETRIES", &v)?;
        }
        if let Some(v) = lookup("API_RETRY_DELAY") {
            self.api_retry_delay_secs = parse_env("API_RETRY_DELAY", &v)?;
        }
        if let Some(v) = lookup("TGT_VALIDITY_HOURS") {
            self.tgt_validity_hours = parse_env("TGT_VALIDITY_HOURS", &v)?;
        }
        if let Some(v) = lookup("TGT_REFRESH_MARGIN_MINUTES") {
            self.tgt_refresh_margin_minutes = parse_env("TGT_REFRESH_MARGIN_MINUTES", &v)?;
        }
        if let Some(v) = lookup("DEFAULT_PAGE_SIZE") {
            self.default_page_size = parse_env("DEFAULT_PAGE_SIZE", &v)?;
        }
        if let Some(v) = lookup("MAX_PAGE_SIZE") {
            self.max_page_size = parse_env("MAX_PAGE_SIZE", &v)?;
        }
        if let Some(v) = lookup("EPIAS_CACHE_ENABLED") {
            self.cache.enabled = parse_bool("EPIAS_CACHE_ENABLED", &v)?;
        }
        if let Some(v) = lookup("EPIAS_CACHE_DIR") {
            self.cache.dir = v;
        }
        if let Some(v) = lookup("EPIAS_CACHE_TTL") {
            self.cache.ttl_seconds = parse_env("EPIAS_CACHE_TTL", &v)?;
        }
        if let Some(v) = lookup("EPIAS_OUTPUT_PATH") {
            self.output.path = v;
        }
        Ok(())
    }

    /// CAS login URL for the configured environment.
    pub fn auth_url(&self) -> &str {
        if self.environment == Environment::Test {
            &self.auth_test_url
        } else {
            &self.auth_base_url
        }
    }

    pub fn tgt_validity(&self) -> Duration {
        Duration::from_secs(self.tgt_validity_hours * 3600)
    }

    pub fn tgt_refresh_margin(&self) -> Duration {
        Duration::from_secs(self.tgt_refresh_margin_minutes * 60)
    }

    pub fn api_timeout(&self) -> Duration {
        Duration::from_secs(self.api_timeout_secs)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.api_retry_delay_secs)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache.ttl_seconds)
    }

    pub fn credentials(&self) -> Result<Credentials> {
        let username = validate_required_field("EPIAS_USERNAME", &self.username)?;
        let password = validate_required_field("EPIAS_PASSWORD", &self.password)?;
        validate_non_empty_string("EPIAS_USERNAME", username)?;
        validate_non_empty_string("EPIAS_PASSWORD", password.expose())?;
        Ok(Credentials {
            username: username.clone(),
            password: password.clone(),
        })
    }
}

impl Validate for Settings {
    fn validate(&self) -> Result<()> {
        validate_url("EPIAS_API_BASE_URL", &self.api_base_url)?;
        validate_url("EPIAS_AUTH_URL", &self.auth_base_url)?;
        validate_url("EPIAS_AUTH_TEST_URL", &self.auth_test_url)?;

        validate_positive_number("DEFAULT_PAGE_SIZE", self.default_page_size as usize, 1)?;
        validate_positive_number("MAX_PAGE_SIZE", self.max_page_size as usize, 1)?;
        if self.default_page_size > self.max_page_size {
            return Err(EpiasError::InvalidConfigValueError {
                field: "DEFAULT_PAGE_SIZE".to_string(),
                value: self.default_page_size.to_string(),
                reason: format!("must not exceed MAX_PAGE_SIZE ({})", self.max_page_size),
            });
        }

        validate_positive_number("TGT_VALIDITY_HOURS", self.tgt_validity_hours as usize, 1)?;
        if self.tgt_refresh_margin() >= self.tgt_validity() {
            return Err(EpiasError::InvalidConfigValueError {
                field: "TGT_REFRESH_MARGIN_MINUTES".to_string(),
                value: self.tgt_refresh_margin_minutes.to_string(),
                reason: "refresh margin must be shorter than the ticket validity".to_string(),
            });
        }

        validate_path("output.path", &self.output.path)?;
        if self.cache.enabled {
            validate_path("EPIAS_CACHE_DIR", &self.cache.dir)?;
        }
        if self.output.formats.is_empty() {
            return Err(EpiasError::InvalidConfigValueError {
                field: "output.formats".to_string(),
                value: String::new(),
                reason: "at least one output format is required".to_string(),
            });
        }
        for format in &self.output.formats {
            validate_one_of("output.formats", format, &OUTPUT_FORMATS)?;
        }

        Ok(())
    }
}
