pub mod connector;
pub mod resolver;
pub mod validator;

pub use crate::domain::model::{
    Checkpoint, CycleReport, DateOutcome, FetchOutcome, Language, LastProcessed, ReportTarget,
    ValidatedBundle,
};
pub use crate::domain::ports::{CheckpointStore, Clock, ConfigProvider, IngestionSubmitter, ReportSource};
pub use crate::utils::error::Result;
