use crate::utils::error::{ConnectorError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// 設定檔中的數值欄位，允許寫成整數或字串（例如 `"${LOOKBACK}"` 替換後的結果）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NumberOrString {
    Number(i64),
    Text(String),
}

impl NumberOrString {
    pub fn as_raw(&self) -> String {
        match self {
            NumberOrString::Number(n) => n.to_string(),
            NumberOrString::Text(s) => s.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    pub opencti: OpenCtiSection,
    pub connector: ConnectorSection,
    pub vigilintel: VigilIntelSection,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenCtiSection {
    pub url: Option<String>,
    pub token: Option<String>,
    pub request_timeout_seconds: Option<NumberOrString>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectorSection {
    pub id: Option<String>,
    pub name: Option<String>,
    pub scope: Option<String>,
    pub log_format: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VigilIntelSection {
    pub language: Option<String>,
    pub lookback_days: Option<NumberOrString>,
    pub interval_hours: Option<NumberOrString>,
    pub base_url: Option<String>,
    pub request_timeout_seconds: Option<NumberOrString>,
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| ConnectorError::Config {
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${OPENCTI_TOKEN})，找不到的變數保持原樣
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| ConnectorError::Config {
            message: format!("Invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }
}
