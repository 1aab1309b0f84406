pub mod toml_config;

use crate::domain::model::{report_url_template, Language, DEFAULT_BASE_URL};
use crate::domain::ports::ConfigProvider;
use crate::utils::error::{ConnectorError, Result};
use crate::utils::logger::LogFormat;
use crate::utils::validation::{
    validate_non_empty_string, validate_range, validate_required_field, validate_url, Validate,
};
use std::path::Path;
use std::time::Duration;
use toml_config::{NumberOrString, TomlConfig};

pub const DEFAULT_LOOKBACK_DAYS: u32 = 7;
pub const DEFAULT_INTERVAL_HOURS: u64 = 24;
pub const DEFAULT_REQUEST_TIMEOUT_SECONDS: u64 = 30;
/// bundle 匯入可能很慢，平台請求的預設逾時比報告下載長
pub const DEFAULT_OPENCTI_TIMEOUT_SECONDS: u64 = 300;
pub const DEFAULT_CONNECTOR_NAME: &str = "VigilIntel";
pub const DEFAULT_CONNECTOR_SCOPE: &str = "vigilintel";

/// 連接器的完整配置，啟動時讀取一次，之後不再變動
#[derive(Debug, Clone)]
pub struct ConnectorConfig {
    pub opencti_url: String,
    pub opencti_token: String,
    pub opencti_timeout_seconds: u64,
    pub connector_id: String,
    pub connector_name: String,
    pub connector_scope: String,
    pub log_format: LogFormat,
    pub language: Language,
    pub lookback_days: u32,
    pub interval_hours: u64,
    pub base_url: String,
    pub request_timeout_seconds: u64,
    url_template: String,
    warnings: Vec<String>,
}

impl ConnectorConfig {
    /// 讀取設定檔（不存在時略過）並套用環境變數覆蓋
    pub fn load(path: &Path) -> Result<Self> {
        let file = if path.exists() {
            TomlConfig::from_file(path)?
        } else {
            TomlConfig::default()
        };

        let config = Self::from_sources(file, |key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// 優先順序：環境變數 > 設定檔 > 預設值
    pub fn from_sources<E>(file: TomlConfig, env: E) -> Result<Self>
    where
        E: Fn(&str) -> Option<String>,
    {
        let pick = |key: &str, from_file: Option<String>| -> Option<String> {
            env(key)
                .filter(|value| !value.trim().is_empty())
                .or(from_file)
        };
        let pick_number = |key: &str, from_file: Option<NumberOrString>| -> Option<String> {
            pick(key, from_file.map(|n| n.as_raw()))
        };

        let mut warnings = Vec::new();

        let opencti_url = pick("OPENCTI_URL", file.opencti.url);
        let opencti_token = pick("OPENCTI_TOKEN", file.opencti.token);
        let connector_id = pick("CONNECTOR_ID", file.connector.id);

        let language = match pick("VIGILINTEL_LANGUAGE", file.vigilintel.language) {
            None => Language::default(),
            Some(raw) => raw.parse::<Language>().unwrap_or_else(|reason| {
                warnings.push(format!(
                    "Invalid VIGILINTEL_LANGUAGE '{}' ({}), defaulting to 'fr'",
                    raw, reason
                ));
                Language::French
            }),
        };

        let log_format = match pick("CONNECTOR_LOG_FORMAT", file.connector.log_format) {
            None => LogFormat::default(),
            Some(raw) => LogFormat::parse(&raw).ok_or_else(|| ConnectorError::InvalidConfigValue {
                field: "connector.log_format".to_string(),
                value: raw.clone(),
                reason: "expected 'text' or 'json'".to_string(),
            })?,
        };

        let lookback_days = parse_number(
            "vigilintel.lookback_days",
            pick_number("VIGILINTEL_LOOKBACK_DAYS", file.vigilintel.lookback_days),
            DEFAULT_LOOKBACK_DAYS,
        )?;
        let interval_hours = parse_number(
            "vigilintel.interval_hours",
            pick_number("VIGILINTEL_INTERVAL_HOURS", file.vigilintel.interval_hours),
            DEFAULT_INTERVAL_HOURS,
        )?;
        let request_timeout_seconds = parse_number(
            "vigilintel.request_timeout_seconds",
            pick_number(
                "VIGILINTEL_REQUEST_TIMEOUT_SECONDS",
                file.vigilintel.request_timeout_seconds,
            ),
            DEFAULT_REQUEST_TIMEOUT_SECONDS,
        )?;

        let opencti_timeout_seconds = parse_number(
            "opencti.request_timeout_seconds",
            pick_number(
                "OPENCTI_REQUEST_TIMEOUT_SECONDS",
                file.opencti.request_timeout_seconds,
            ),
            DEFAULT_OPENCTI_TIMEOUT_SECONDS,
        )?;

        let base_url = pick("VIGILINTEL_BASE_URL", file.vigilintel.base_url)
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        Ok(Self {
            opencti_url: validate_required_field("opencti.url", &opencti_url)?
                .trim_end_matches('/')
                .to_string(),
            opencti_token: validate_required_field("opencti.token", &opencti_token)?.clone(),
            opencti_timeout_seconds,
            connector_id: validate_required_field("connector.id", &connector_id)?.clone(),
            connector_name: pick("CONNECTOR_NAME", file.connector.name)
                .unwrap_or_else(|| DEFAULT_CONNECTOR_NAME.to_string()),
            connector_scope: pick("CONNECTOR_SCOPE", file.connector.scope)
                .unwrap_or_else(|| DEFAULT_CONNECTOR_SCOPE.to_string()),
            log_format,
            language,
            lookback_days,
            interval_hours,
            url_template: report_url_template(&base_url),
            base_url,
            request_timeout_seconds,
            warnings,
        })
    }

    /// 載入時發現但不致命的問題，logger 初始化後再輸出
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }

    pub fn opencti_timeout(&self) -> Duration {
        Duration::from_secs(self.opencti_timeout_seconds)
    }
}

fn parse_number<T>(field: &str, raw: Option<String>, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| ConnectorError::InvalidConfigValue {
                field: field.to_string(),
                value: raw.clone(),
                reason: e.to_string(),
            }),
    }
}

impl Validate for ConnectorConfig {
    fn validate(&self) -> Result<()> {
        validate_url("opencti.url", &self.opencti_url)?;
        validate_non_empty_string("opencti.token", &self.opencti_token)?;
        validate_non_empty_string("connector.id", &self.connector_id)?;
        validate_range("vigilintel.lookback_days", self.lookback_days, 1, 3650)?;
        validate_range("vigilintel.interval_hours", self.interval_hours, 1, 24 * 365)?;
        validate_range(
            "vigilintel.request_timeout_seconds",
            self.request_timeout_seconds,
            1,
            3600,
        )?;
        validate_range(
            "opencti.request_timeout_seconds",
            self.opencti_timeout_seconds,
            1,
            3600,
        )?;

        // 以範例日期展開模板，確認結果是合法的 http(s) URL
        let sample = self
            .url_template
            .replace("{year}", "2026")
            .replace("{month}", "01")
            .replace("{day}", "01")
            .replace("{lang}", self.language.code());
        validate_url("vigilintel.base_url", &sample)?;

        Ok(())
    }
}

impl ConfigProvider for ConnectorConfig {
    fn language(&self) -> Language {
        self.language
    }

    fn lookback_days(&self) -> u32 {
        self.lookback_days
    }

    fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_hours * 3600)
    }

    fn report_url_template(&self) -> &str {
        &self.url_template
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    fn required_env() -> Vec<(&'static str, &'static str)> {
        vec![
            ("OPENCTI_URL", "http://opencti:8080/"),
            ("OPENCTI_TOKEN", "token"),
            ("CONNECTOR_ID", "connector-vigilintel"),
        ]
    }

    #[test]
    fn test_defaults() {
        let config = ConnectorConfig::from_sources(TomlConfig::default(), env_of(&required_env()))
            .unwrap();

        assert!(config.validate().is_ok());
        assert_eq!(config.opencti_url, "http://opencti:8080");
        assert_eq!(config.language, Language::French);
        assert_eq!(config.lookback_days, 7);
        assert_eq!(config.interval(), Duration::from_secs(24 * 3600));
        assert_eq!(config.connector_name, "VigilIntel");
        assert_eq!(config.log_format, LogFormat::Text);
        assert_eq!(config.opencti_timeout(), Duration::from_secs(300));
        assert_eq!(
            config.report_url_template(),
            "https://raw.githubusercontent.com/kidrek/VigilIntel/main/{year}/{month}/{year}-{month}-{day}-report.stix_{lang}.json"
        );
        assert!(config.warnings().is_empty());
    }

    #[test]
    fn test_env_overrides_file() {
        let file = TomlConfig::from_toml_str(
            r#"
[vigilintel]
language = "fr"
lookback_days = 30
interval_hours = 6
"#,
        )
        .unwrap();

        let mut env = required_env();
        env.push(("VIGILINTEL_LANGUAGE", "en"));
        env.push(("VIGILINTEL_LOOKBACK_DAYS", "3"));

        let config = ConnectorConfig::from_sources(file, env_of(&env)).unwrap();
        assert_eq!(config.language, Language::English);
        assert_eq!(config.lookback_days, 3);
        assert_eq!(config.interval_hours, 6);
    }

    #[test]
    fn test_invalid_language_falls_back_to_french() {
        let mut env = required_env();
        env.push(("VIGILINTEL_LANGUAGE", "de"));

        let config = ConnectorConfig::from_sources(TomlConfig::default(), env_of(&env)).unwrap();
        assert_eq!(config.language, Language::French);
        assert_eq!(config.warnings().len(), 1);
    }

    #[test]
    fn test_missing_required_field_is_fatal() {
        let env = env_of(&[("OPENCTI_URL", "http://opencti:8080")]);
        let err = ConnectorConfig::from_sources(TomlConfig::default(), env).unwrap_err();
        assert!(matches!(err, ConnectorError::MissingConfig { ref field } if field == "opencti.token"));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_non_numeric_lookback_is_fatal() {
        let mut env = required_env();
        env.push(("VIGILINTEL_LOOKBACK_DAYS", "a week"));

        let err = ConnectorConfig::from_sources(TomlConfig::default(), env_of(&env)).unwrap_err();
        assert!(matches!(err, ConnectorError::InvalidConfigValue { .. }));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_zero_counts_fail_validation() {
        let mut env = required_env();
        env.push(("VIGILINTEL_LOOKBACK_DAYS", "0"));
        let config = ConnectorConfig::from_sources(TomlConfig::default(), env_of(&env)).unwrap();
        assert!(config.validate().is_err());

        let mut env = required_env();
        env.push(("VIGILINTEL_INTERVAL_HOURS", "0"));
        let config = ConnectorConfig::from_sources(TomlConfig::default(), env_of(&env)).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_opencti_timeout_is_configurable() {
        let file = TomlConfig::from_toml_str(
            r#"
[opencti]
request_timeout_seconds = 120
"#,
        )
        .unwrap();
        let config = ConnectorConfig::from_sources(file, env_of(&required_env())).unwrap();
        assert_eq!(config.opencti_timeout(), Duration::from_secs(120));
        assert_eq!(config.request_timeout(), Duration::from_secs(30));

        let mut env = required_env();
        env.push(("OPENCTI_REQUEST_TIMEOUT_SECONDS", "0"));
        let config = ConnectorConfig::from_sources(TomlConfig::default(), env_of(&env)).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_lookback_upper_bound() {
        let mut env = required_env();
        env.push(("VIGILINTEL_LOOKBACK_DAYS", "3650"));
        let config = ConnectorConfig::from_sources(TomlConfig::default(), env_of(&env)).unwrap();
        assert!(config.validate().is_ok());

        let mut env = required_env();
        env.push(("VIGILINTEL_LOOKBACK_DAYS", "3651"));
        let config = ConnectorConfig::from_sources(TomlConfig::default(), env_of(&env)).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_base_url_fails_validation() {
        let mut env = required_env();
        env.push(("VIGILINTEL_BASE_URL", "ftp://mirror.example.com"));
        let config = ConnectorConfig::from_sources(TomlConfig::default(), env_of(&env)).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[opencti]
url = "http://localhost:8080"
token = "file-token"

[connector]
id = "connector-from-file"

[vigilintel]
lookback_days = 14
"#,
        )
        .unwrap();

        let config = ConnectorConfig::load(&path).unwrap();
        assert_eq!(config.connector_id, "connector-from-file");
        assert_eq!(config.lookback_days, 14);
    }
}
