pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

pub use crate::adapters::{
    file_store::FileCheckpointStore, http_fetcher::HttpReportFetcher, opencti::OpenCtiClient,
    SystemClock,
};
pub use crate::config::ConnectorConfig;
pub use crate::core::connector::ConnectorLoop;
pub use crate::utils::error::{ConnectorError, Result};
