//! Snapshot file storage
//!
//! Writes go to a sibling temp file and are renamed into place, so a crash
//! mid-write leaves the previous snapshot intact.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use escrowdesk_ledger::{Clock, DealLedger, LedgerSnapshot};
use tokio::sync::Mutex;

use crate::error::{ApiError, ApiResult};

/// Ledger snapshot persisted at a fixed path
#[derive(Debug)]
pub struct SnapshotStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl SnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Restore the ledger from disk, or `None` when no snapshot exists yet
    pub async fn load(&self, clock: Arc<dyn Clock>) -> ApiResult<Option<DealLedger>> {
        let text = match tokio::fs::read_to_string(&self.path).await {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(ApiError::Internal(format!(
                    "reading {}: {}",
                    self.path.display(),
                    e
                )))
            }
        };
        let snapshot = LedgerSnapshot::from_json(&text)?;
        let ledger = DealLedger::from_snapshot(snapshot, clock)?;
        Ok(Some(ledger))
    }

    /// Write the ledger's current state
    pub async fn save(&self, ledger: &DealLedger) -> ApiResult<()> {
        // Snapshot under the lock so the last write always carries the
        // newest state.
        let _guard = self.write_lock.lock().await;
        let json = ledger.snapshot().to_json()?;

        let tmp = self.path.with_extension("tmp");
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|e| io_error(dir, e))?;
        }
        tokio::fs::write(&tmp, json)
            .await
            .map_err(|e| io_error(&tmp, e))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| io_error(&self.path, e))?;

        tracing::debug!(path = %self.path.display(), deals = ledger.deal_count(), "Snapshot saved");
        Ok(())
    }
}

fn io_error(path: &Path, err: std::io::Error) -> ApiError {
    ApiError::Internal(format!("writing {}: {}", path.display(), err))
}
