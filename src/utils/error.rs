use thiserror::Error;

#[derive(Error, Debug)]
pub enum EpiasError {
    #[error("Zip operation failed: {0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("API returned HTTP {status} for {endpoint}: {message}")]
    HttpStatusError {
        endpoint: String,
        status: u16,
        message: String,
    },

    #[error("Authentication failed: {message}")]
    AuthError { message: String },

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Invalid value for '{field}' ({value}): {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Data processing error: {message}")]
    ProcessingError { message: String },

    #[error("Validation error: {message}")]
    ValidationError { message: String },

    #[error("Manifest error on line {line}: {message}")]
    ManifestError { line: usize, message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Authentication,
    Configuration,
    Data,
    Storage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl EpiasError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            EpiasError::ApiError(_) | EpiasError::HttpStatusError { .. } => ErrorCategory::Network,
            EpiasError::AuthError { .. } => ErrorCategory::Authentication,
            EpiasError::ConfigError { .. }
            | EpiasError::InvalidConfigValueError { .. }
            | EpiasError::MissingConfigError { .. } => ErrorCategory::Configuration,
            EpiasError::CsvError(_)
            | EpiasError::SerializationError(_)
            | EpiasError::ProcessingError { .. }
            | EpiasError::ValidationError { .. }
            | EpiasError::ManifestError { .. } => ErrorCategory::Data,
            EpiasError::ZipError(_) | EpiasError::IoError(_) => ErrorCategory::Storage,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            EpiasError::ValidationError { .. } | EpiasError::ManifestError { .. } => {
                ErrorSeverity::Low
            }
            EpiasError::ApiError(_) | EpiasError::HttpStatusError { .. } => ErrorSeverity::Medium,
            EpiasError::AuthError { .. }
            | EpiasError::ConfigError { .. }
            | EpiasError::InvalidConfigValueError { .. }
            | EpiasError::MissingConfigError { .. }
            | EpiasError::CsvError(_)
            | EpiasError::SerializationError(_)
            | EpiasError::ProcessingError { .. } => ErrorSeverity::High,
            EpiasError::ZipError(_) | EpiasError::IoError(_) => ErrorSeverity::Critical,
        }
    }

    /// Transport failures and 5xx responses are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            EpiasError::ApiError(e) => e.is_timeout() || e.is_connect(),
            EpiasError::HttpStatusError { status, .. } => *status >= 500,
            _ => false,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            EpiasError::ApiError(_) => "Check network connectivity and the EPIAS_API_BASE_URL setting",
            EpiasError::HttpStatusError { status, .. } if *status >= 500 => {
                "The transparency platform is having trouble, try again later"
            }
            EpiasError::HttpStatusError { .. } => {
                "Check the request parameters (date range, organization id)"
            }
            EpiasError::AuthError { .. } => {
                "Verify EPIAS_USERNAME / EPIAS_PASSWORD and the ENVIRONMENT setting"
            }
            EpiasError::ConfigError { .. }
            | EpiasError::InvalidConfigValueError { .. }
            | EpiasError::MissingConfigError { .. } => {
                "Review epias.toml and the EPIAS_* environment variables"
            }
            EpiasError::ManifestError { .. } => "Fix the reported manifest line",
            EpiasError::ValidationError { .. } => "Adjust the command arguments",
            EpiasError::CsvError(_)
            | EpiasError::SerializationError(_)
            | EpiasError::ProcessingError { .. } => {
                "The API response had an unexpected shape, rerun with --verbose"
            }
            EpiasError::ZipError(_) | EpiasError::IoError(_) => {
                "Check that the output and cache directories are writable"
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Network => format!("Could not reach the EPİAŞ API: {}", self),
            ErrorCategory::Authentication => format!("Login to EPİAŞ failed: {}", self),
            ErrorCategory::Configuration => format!("Configuration problem: {}", self),
            ErrorCategory::Data => format!("Data problem: {}", self),
            ErrorCategory::Storage => format!("File system problem: {}", self),
        }
    }
}

pub type Result<T> = std::result::Result<T, EpiasError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_errors_retry_only_on_server_side() {
        let server = EpiasError::HttpStatusError {
            endpoint: "/markets/dam/data/mcp".to_string(),
            status: 503,
            message: String::new(),
        };
        let client = EpiasError::HttpStatusError {
            endpoint: "/markets/dam/data/mcp".to_string(),
            status: 400,
            message: String::new(),
        };

        assert!(server.is_retryable());
        assert!(!client.is_retryable());
        assert_eq!(server.category(), ErrorCategory::Network);
    }

    #[test]
    fn test_severity_ordering() {
        let missing = EpiasError::MissingConfigError {
            field: "EPIAS_USERNAME".to_string(),
        };
        let io = EpiasError::IoError(std::io::Error::other("disk full"));

        assert_eq!(missing.severity(), ErrorSeverity::High);
        assert!(io.severity() > missing.severity());
        assert!(missing.user_friendly_message().starts_with("Configuration problem"));
    }
}
