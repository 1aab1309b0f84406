use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// VigilIntel 倉庫的 raw 內容根目錄
pub const DEFAULT_BASE_URL: &str = "https://raw.githubusercontent.com/kidrek/VigilIntel/main";

/// 報告路徑模板，相對於 base URL
pub const REPORT_PATH_TEMPLATE: &str =
    "{year}/{month}/{year}-{month}-{day}-report.stix_{lang}.json";

/// 上次處理到哪一天；首次執行時為 `Absent`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LastProcessed {
    #[default]
    Absent,
    Present(NaiveDate),
}

impl LastProcessed {
    pub fn date(&self) -> Option<NaiveDate> {
        match self {
            LastProcessed::Absent => None,
            LastProcessed::Present(date) => Some(*date),
        }
    }
}

impl From<Option<NaiveDate>> for LastProcessed {
    fn from(value: Option<NaiveDate>) -> Self {
        value.map_or(LastProcessed::Absent, LastProcessed::Present)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Checkpoint {
    pub last_processed: LastProcessed,
    pub last_run: Option<DateTime<Utc>>,
}

/// 持久化格式：兩個 ISO-8601 date-time 字串
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CheckpointRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_processed_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_run: Option<String>,
}

impl Checkpoint {
    pub fn absent() -> Self {
        Self::default()
    }

    pub fn at(date: NaiveDate) -> Self {
        Self {
            last_processed: LastProcessed::Present(date),
            last_run: None,
        }
    }

    /// 以本輪最後一個成功日期推進檢查點，永不倒退
    pub fn advance(&self, candidate: Option<NaiveDate>, now: DateTime<Utc>) -> Self {
        let last_processed = match (self.last_processed.date(), candidate) {
            (Some(previous), Some(candidate)) => LastProcessed::Present(previous.max(candidate)),
            (None, Some(candidate)) => LastProcessed::Present(candidate),
            (_, None) => self.last_processed,
        };

        Self {
            last_processed,
            last_run: Some(now),
        }
    }

    pub fn to_record(&self) -> CheckpointRecord {
        CheckpointRecord {
            last_processed_date: self
                .last_processed
                .date()
                .map(|date| date.and_time(NaiveTime::MIN).and_utc().to_rfc3339()),
            last_run: self.last_run.map(|ts| ts.to_rfc3339()),
        }
    }

    /// 無法解析的日期視為沒有檢查點，交由上層記錄警告
    pub fn from_record(record: &CheckpointRecord) -> Self {
        Self {
            last_processed: record
                .last_processed_date
                .as_deref()
                .and_then(parse_checkpoint_date)
                .into(),
            last_run: record
                .last_run
                .as_deref()
                .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
                .map(|ts| ts.with_timezone(&Utc)),
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(&self.to_record())
    }
}

/// 接受 RFC 3339、不含時區的 date-time 或純日期
pub fn parse_checkpoint_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc).date_naive());
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(ts) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(ts.date());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Language {
    /// 法文，VigilIntel 的原始語言
    #[default]
    French,
    English,
}

impl Language {
    pub fn code(&self) -> &'static str {
        match self {
            Language::French => "fr",
            Language::English => "en",
        }
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fr" => Ok(Language::French),
            "en" => Ok(Language::English),
            other => Err(format!("unsupported language '{}', expected 'fr' or 'en'", other)),
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// 把 base URL 展開成完整的報告 URL 模板
pub fn report_url_template(base_url: &str) -> String {
    if base_url.contains("{year}") {
        base_url.to_string()
    } else {
        format!("{}/{}", base_url.trim_end_matches('/'), REPORT_PATH_TEMPLATE)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportTarget {
    pub date: NaiveDate,
    pub language: Language,
    pub url: String,
}

impl ReportTarget {
    pub fn new(date: NaiveDate, language: Language, url_template: &str) -> Self {
        let year = date.format("%Y").to_string();
        let month = date.format("%m").to_string();
        let day = date.format("%d").to_string();

        let url = url_template
            .replace("{year}", &year)
            .replace("{month}", &month)
            .replace("{day}", &day)
            .replace("{lang}", language.code());

        Self {
            date,
            language,
            url,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    Payload(Vec<u8>),
    NotFound,
    TransportError(String),
}

/// 已確認結構的 STIX bundle，內容原封不動交給 OpenCTI
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedBundle {
    pub(crate) value: serde_json::Value,
    pub(crate) object_count: usize,
}

impl ValidatedBundle {
    pub fn object_count(&self) -> usize {
        self.object_count
    }

    pub fn bundle_id(&self) -> Option<&str> {
        self.value.get("id").and_then(|id| id.as_str())
    }

    pub fn as_value(&self) -> &serde_json::Value {
        &self.value
    }

    pub fn to_json_string(&self) -> serde_json::Result<String> {
        serde_json::to_string(&self.value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureStage {
    Fetch,
    Validation,
    Submission,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DateOutcome {
    Imported { objects: usize },
    NotPublished,
    Failed { stage: FailureStage, reason: String },
}

impl DateOutcome {
    pub fn advances_checkpoint(&self) -> bool {
        !matches!(self, DateOutcome::Failed { .. })
    }
}

/// 一輪處理的結果摘要
#[derive(Debug, Clone, PartialEq)]
pub struct CycleReport {
    pub previous: LastProcessed,
    pub checkpoint: Checkpoint,
    pub planned: usize,
    pub outcomes: Vec<(NaiveDate, DateOutcome)>,
}

impl CycleReport {
    pub fn imported(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|(_, outcome)| matches!(outcome, DateOutcome::Imported { .. }))
            .count()
    }

    pub fn skipped(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|(_, outcome)| matches!(outcome, DateOutcome::NotPublished))
            .count()
    }

    pub fn errors(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|(_, outcome)| matches!(outcome, DateOutcome::Failed { .. }))
            .count()
    }

    /// 停在哪一天（下一輪會從這天重試）
    pub fn stopped_at(&self) -> Option<NaiveDate> {
        self.outcomes
            .iter()
            .find(|(_, outcome)| !outcome.advances_checkpoint())
            .map(|(date, _)| *date)
    }

    pub fn summary_message(&self) -> String {
        format!(
            "{} imported, {} skipped, {} errors (out of {} dates)",
            self.imported(),
            self.skipped(),
            self.errors(),
            self.planned
        )
    }
}
