use crate::domain::model::{Checkpoint, CheckpointRecord};
use crate::domain::ports::CheckpointStore;
use crate::utils::error::Result;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// 以本地 JSON 檔保存檢查點，格式與平台 state 相同
#[derive(Debug, Clone)]
pub struct FileCheckpointStore {
    path: PathBuf,
}

impl FileCheckpointStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl CheckpointStore for FileCheckpointStore {
    async fn load(&self) -> Result<Checkpoint> {
        let data = match tokio::fs::read(&self.path).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("No state file at {}, starting fresh", self.path.display());
                return Ok(Checkpoint::absent());
            }
            Err(e) => return Err(e.into()),
        };

        let record: CheckpointRecord = serde_json::from_slice(&data)?;
        let checkpoint = Checkpoint::from_record(&record);
        if record.last_processed_date.is_some() && checkpoint.last_processed.date().is_none() {
            tracing::warn!(
                "Ignoring unparsable last_processed_date {:?} in {}",
                record.last_processed_date,
                self.path.display()
            );
        }
        Ok(checkpoint)
    }

    async fn save(&self, checkpoint: &Checkpoint) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let data = serde_json::to_vec_pretty(&checkpoint.to_record())?;
        tokio::fs::write(&self.path, data).await?;
        Ok(())
    }
}
