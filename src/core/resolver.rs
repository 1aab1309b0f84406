use crate::domain::model::LastProcessed;
use chrono::{Days, NaiveDate};

/// 計算本輪需要處理的日期，遞增且連續。
///
/// - 沒有檢查點：回補 `lookback_days` 天，以 `today` 結尾
/// - 有檢查點：從檢查點隔天到 `today`；已是最新則為空
pub fn resolve(last_processed: LastProcessed, lookback_days: u32, today: NaiveDate) -> Vec<NaiveDate> {
    let start = match last_processed {
        LastProcessed::Absent => {
            if lookback_days == 0 {
                return Vec::new();
            }
            match today.checked_sub_days(Days::new(u64::from(lookback_days) - 1)) {
                Some(start) => start,
                None => NaiveDate::MIN,
            }
        }
        LastProcessed::Present(date) => match date.succ_opt() {
            Some(next) => next,
            None => return Vec::new(),
        },
    };

    start
        .iter_days()
        .take_while(|date| *date <= today)
        .collect()
}
