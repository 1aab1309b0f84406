use crate::domain::model::{Checkpoint, FetchOutcome, Language, ReportTarget, ValidatedBundle};
use crate::utils::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use std::time::Duration;

/// 報告來源：一次嘗試，結果分為 payload / 不存在 / 傳輸錯誤
#[async_trait]
pub trait ReportSource: Send + Sync {
    async fn fetch(&self, target: &ReportTarget) -> FetchOutcome;
}

/// 檢查點讀寫。讀不到記錄時回傳 `Checkpoint::absent()`，不是錯誤
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    async fn load(&self) -> Result<Checkpoint>;
    async fn save(&self, checkpoint: &Checkpoint) -> Result<()>;
}

#[async_trait]
pub trait IngestionSubmitter: Send + Sync {
    /// 在平台上開一個 work，用於追蹤本輪匯入；不支援時回傳 `None`
    async fn begin_work(&self, _friendly_name: &str) -> Result<Option<String>> {
        Ok(None)
    }

    async fn submit(&self, bundle: &ValidatedBundle, work_id: Option<&str>) -> Result<()>;

    /// `in_error` 為 true 時，平台上的 work 會標示為失敗
    async fn complete_work(&self, _work_id: &str, _message: &str, _in_error: bool) -> Result<()> {
        Ok(())
    }
}

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    /// 只取日曆日，時間部分一律捨去
    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }
}

pub trait ConfigProvider: Send + Sync {
    fn language(&self) -> Language;
    fn lookback_days(&self) -> u32;
    fn interval(&self) -> Duration;
    fn report_url_template(&self) -> &str;
}

#[async_trait]
impl<T: CheckpointStore + ?Sized> CheckpointStore for Box<T> {
    async fn load(&self) -> Result<Checkpoint> {
        (**self).load().await
    }

    async fn save(&self, checkpoint: &Checkpoint) -> Result<()> {
        (**self).save(checkpoint).await
    }
}
