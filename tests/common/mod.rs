#![allow(dead_code)]

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use vigilintel_connector::config::toml_config::TomlConfig;
use vigilintel_connector::domain::ports::Clock;
use vigilintel_connector::ConnectorConfig;

pub struct FixedClock(pub DateTime<Utc>);

impl FixedClock {
    pub fn on(year: i32, month: u32, day: u32) -> Self {
        Self(Utc.with_ymd_and_hms(year, month, day, 7, 30, 0).unwrap())
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

/// 以 mock server 位址建立配置，報告與 OpenCTI 可以共用同一個 server
pub fn config_for(opencti_url: &str, report_base_url: &str, lookback_days: u32) -> ConnectorConfig {
    let lookback = lookback_days.to_string();
    let env = move |key: &str| -> Option<String> {
        match key {
            "OPENCTI_URL" => Some(opencti_url.to_string()),
            "OPENCTI_TOKEN" => Some("test-token".to_string()),
            "CONNECTOR_ID" => Some("connector-vigilintel-test".to_string()),
            "VIGILINTEL_BASE_URL" => Some(report_base_url.to_string()),
            "VIGILINTEL_LOOKBACK_DAYS" => Some(lookback.clone()),
            "VIGILINTEL_REQUEST_TIMEOUT_SECONDS" => Some("5".to_string()),
            _ => None,
        }
    };
    ConnectorConfig::from_sources(TomlConfig::default(), env).unwrap()
}

pub fn stix_bundle(objects: usize) -> serde_json::Value {
    let objects: Vec<serde_json::Value> = (0..objects)
        .map(|i| {
            serde_json::json!({
                "type": "indicator",
                "spec_version": "2.1",
                "id": format!("indicator--00000000-0000-4000-8000-{:012}", i),
                "pattern": "[domain-name:value = 'example.test']",
                "pattern_type": "stix",
            })
        })
        .collect();

    serde_json::json!({
        "type": "bundle",
        "id": "bundle--5d0092c5-5f74-4287-9642-33f4c354e56d",
        "objects": objects,
    })
}
