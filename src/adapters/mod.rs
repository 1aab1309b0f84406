// Adapters layer: concrete implementations for external systems (report host, OpenCTI, local state, clock).

pub mod file_store;
pub mod http_fetcher;
pub mod opencti;

use crate::domain::ports::Clock;
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
