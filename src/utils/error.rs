use thiserror::Error;

/// 報告內容的結構性驗證失敗種類
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationErrorKind {
    /// 無法解析為 JSON
    Malformed,
    /// JSON 合法，但不是預期的 STIX bundle 形狀
    UnexpectedShape,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind:?}: {detail}")]
pub struct ValidationError {
    pub kind: ValidationErrorKind,
    pub detail: String,
}

impl ValidationError {
    pub fn malformed(detail: impl Into<String>) -> Self {
        Self {
            kind: ValidationErrorKind::Malformed,
            detail: detail.into(),
        }
    }

    pub fn unexpected_shape(detail: impl Into<String>) -> Self {
        Self {
            kind: ValidationErrorKind::UnexpectedShape,
            detail: detail.into(),
        }
    }
}

#[derive(Error, Debug)]
pub enum ConnectorError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Missing required configuration: {field}")]
    MissingConfig { field: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Bundle submission failed: {message}")]
    Submission { message: String },

    #[error("Checkpoint error: {message}")]
    Checkpoint { message: String },

    #[error("OpenCTI platform error: {message}")]
    Platform { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Network,
    Data,
    Platform,
    System,
}

impl ConnectorError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            ConnectorError::Config { .. }
            | ConnectorError::MissingConfig { .. }
            | ConnectorError::InvalidConfigValue { .. } => ErrorCategory::Configuration,
            ConnectorError::Http(_) => ErrorCategory::Network,
            ConnectorError::Serialization(_) => ErrorCategory::Data,
            ConnectorError::Submission { .. }
            | ConnectorError::Checkpoint { .. }
            | ConnectorError::Platform { .. } => ErrorCategory::Platform,
            ConnectorError::Io(_) => ErrorCategory::System,
        }
    }

    /// 只有配置錯誤會阻止連接器啟動，其餘錯誤都在下一輪重試
    pub fn is_fatal(&self) -> bool {
        self.category() == ErrorCategory::Configuration
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Configuration => {
                "Check the TOML file and the OPENCTI_*, CONNECTOR_* and VIGILINTEL_* environment variables"
            }
            ErrorCategory::Network => {
                "Check connectivity to OpenCTI; the cycle will be retried after the next sleep"
            }
            ErrorCategory::Data => {
                "Stored state or a platform response could not be decoded; inspect the connector state"
            }
            ErrorCategory::Platform => {
                "Check that the OpenCTI platform is reachable and the token is valid"
            }
            ErrorCategory::System => "Check file permissions and available disk space",
        }
    }
}

pub type Result<T> = std::result::Result<T, ConnectorError>;
