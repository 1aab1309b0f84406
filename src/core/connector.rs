use crate::core::resolver::resolve;
use crate::core::validator::validate;
use crate::domain::model::{
    CycleReport, DateOutcome, FailureStage, FetchOutcome, Language, LastProcessed, ReportTarget,
};
use crate::domain::ports::{CheckpointStore, Clock, ConfigProvider, IngestionSubmitter, ReportSource};
use crate::utils::error::Result;
use chrono::NaiveDate;
use std::future::Future;
use std::time::Duration;

/// 增量匯入主迴圈：解析日期 → 逐日抓取/驗證/提交 → 更新檢查點 → 休眠
pub struct ConnectorLoop<R, S, P, K>
where
    R: ReportSource,
    S: CheckpointStore,
    P: IngestionSubmitter,
    K: Clock,
{
    source: R,
    store: S,
    submitter: P,
    clock: K,
    language: Language,
    lookback_days: u32,
    interval: Duration,
    url_template: String,
}

impl<R, S, P, K> ConnectorLoop<R, S, P, K>
where
    R: ReportSource,
    S: CheckpointStore,
    P: IngestionSubmitter,
    K: Clock,
{
    pub fn new<C: ConfigProvider>(config: &C, source: R, store: S, submitter: P, clock: K) -> Self {
        Self {
            source,
            store,
            submitter,
            clock,
            language: config.language(),
            lookback_days: config.lookback_days(),
            interval: config.interval(),
            url_template: config.report_url_template().to_string(),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// 給定檢查點與日期，列出本輪會抓取的報告
    pub fn plan(&self, last_processed: LastProcessed, today: NaiveDate) -> Vec<ReportTarget> {
        resolve(last_processed, self.lookback_days, today)
            .into_iter()
            .map(|date| ReportTarget::new(date, self.language, &self.url_template))
            .collect()
    }

    /// 讀取目前檢查點並列出本輪計畫，不做任何寫入
    pub async fn dry_run(&self) -> Result<Vec<ReportTarget>> {
        let checkpoint = self.store.load().await?;
        Ok(self.plan(checkpoint.last_processed, self.clock.today()))
    }

    /// 執行一輪。逐日錯誤只會讓本輪提前結束；回傳 `Err` 代表檢查點無法讀寫
    pub async fn run_cycle(&self) -> Result<CycleReport> {
        let previous = self.store.load().await?;
        let today = self.clock.today();
        let targets = self.plan(previous.last_processed, today);

        match previous.last_processed {
            LastProcessed::Absent => {
                if let (Some(first), Some(last)) = (targets.first(), targets.last()) {
                    tracing::info!(
                        "First run detected, backfilling from {} to {}",
                        first.date,
                        last.date
                    );
                }
            }
            LastProcessed::Present(date) if targets.is_empty() => {
                tracing::info!("Already up-to-date (last processed: {})", date);
            }
            LastProcessed::Present(_) => {}
        }

        let work_id = if targets.is_empty() {
            None
        } else {
            let friendly_name = format!(
                "VigilIntel run @ {}",
                self.clock.now().format("%Y-%m-%d %H:%M:%S")
            );
            match self.submitter.begin_work(&friendly_name).await {
                Ok(work_id) => work_id,
                Err(e) => {
                    tracing::warn!("Could not open work on the platform: {}", e);
                    None
                }
            }
        };

        let total = targets.len();
        if total > 0 {
            tracing::info!("Processing {} date(s)", total);
        }

        let mut outcomes = Vec::with_capacity(total);
        let mut last_success = None;

        for (idx, target) in targets.iter().enumerate() {
            tracing::info!("[{}/{}] Processing {}", idx + 1, total, target.date);

            let outcome = self.process_date(target, work_id.as_deref()).await;
            let advances = outcome.advances_checkpoint();
            outcomes.push((target.date, outcome));

            if !advances {
                tracing::warn!(
                    "Stopping cycle at {}; it will be retried next cycle ({} date(s) left unprocessed)",
                    target.date,
                    total - idx
                );
                break;
            }
            last_success = Some(target.date);
        }

        let checkpoint = previous.advance(last_success, self.clock.now());
        let saved = self.store.save(&checkpoint).await;

        let report = CycleReport {
            previous: previous.last_processed,
            checkpoint,
            planned: total,
            outcomes,
        };

        if let Some(work_id) = work_id.as_deref() {
            let (message, in_error) = match &saved {
                Ok(()) => (report.summary_message(), false),
                Err(e) => (
                    format!("{}; checkpoint not saved: {}", report.summary_message(), e),
                    true,
                ),
            };
            if let Err(e) = self
                .submitter
                .complete_work(work_id, &message, in_error)
                .await
            {
                tracing::warn!("Could not close work {}: {}", work_id, e);
            }
        }

        saved?;

        match checkpoint.last_processed.date() {
            Some(date) if checkpoint.last_processed != previous.last_processed => {
                tracing::info!("State updated, last_processed_date={}", date)
            }
            _ => tracing::debug!("last_processed_date unchanged, recorded last_run"),
        }
        if total > 0 {
            tracing::info!("Run complete: {}", report.summary_message());
        }

        Ok(report)
    }

    async fn process_date(&self, target: &ReportTarget, work_id: Option<&str>) -> DateOutcome {
        let bytes = match self.source.fetch(target).await {
            FetchOutcome::Payload(bytes) => bytes,
            FetchOutcome::NotFound => {
                tracing::warn!("Report not found (404): {}", target.url);
                return DateOutcome::NotPublished;
            }
            FetchOutcome::TransportError(cause) => {
                tracing::error!("Network error fetching {}: {}", target.url, cause);
                return DateOutcome::Failed {
                    stage: FailureStage::Fetch,
                    reason: cause,
                };
            }
        };

        let bundle = match validate(&bytes) {
            Ok(bundle) => bundle,
            Err(e) => {
                tracing::error!("Invalid STIX bundle for {}: {}", target.date, e);
                return DateOutcome::Failed {
                    stage: FailureStage::Validation,
                    reason: e.to_string(),
                };
            }
        };

        let objects = bundle.object_count();
        tracing::info!("Valid STIX bundle for {}, {} objects", target.date, objects);

        match self.submitter.submit(&bundle, work_id).await {
            Ok(()) => DateOutcome::Imported { objects },
            Err(e) => {
                tracing::error!("Failed to send bundle for {} to OpenCTI: {}", target.date, e);
                DateOutcome::Failed {
                    stage: FailureStage::Submission,
                    reason: e.to_string(),
                }
            }
        }
    }

    /// 無限循環直到 `shutdown` 完成。shutdown 只在兩輪之間生效，不會中斷進行中的日期
    pub async fn run<F>(&self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        tracing::info!("Connector started");

        loop {
            if let Err(e) = self.run_cycle().await {
                tracing::error!(
                    "Cycle aborted: {} (category: {:?}). {}",
                    e,
                    e.category(),
                    e.recovery_suggestion()
                );
            }

            tracing::info!(
                "Sleeping {} hour(s) until next run",
                self.interval.as_secs() / 3600
            );

            // 進行中那一輪收到的 shutdown 優先於休眠
            tokio::select! {
                biased;
                _ = &mut shutdown => {
                    tracing::info!("Shutdown requested, stopping connector");
                    break;
                }
                _ = tokio::time::sleep(self.interval) => {}
            }
        }
    }
}
