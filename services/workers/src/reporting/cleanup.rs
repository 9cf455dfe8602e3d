//! Periodic TTL cleanup for expired reports (spec §4.G).

use carbonledger_core::error::AppResult;
use carbonledger_storage::repositories::reports::ReportRepository;
use chrono::Utc;

pub struct ReportCleanupWorker {
    reports: ReportRepository,
}

impl ReportCleanupWorker {
    pub fn new(reports: ReportRepository) -> Self {
        Self { reports }
    }

    /// Find reports past `expires_at` not already `expired`, delete the
    /// file if present, and mark expired. Returns the count processed.
    pub async fn run_once(&self) -> AppResult<usize> {
        let expired = self.reports.list_expired(Utc::now()).await?;
        let mut processed = 0;

        for report in expired {
            if let Some(path) = &report.file_path {
                match tokio::fs::remove_file(path).await {
                    Ok(()) => {}
                    Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
                    Err(err) => {
                        tracing::warn!(report_id = %report.id, error = %err, "failed to delete expired report file");
                    }
                }
            }
            self.reports.mark_expired(report.id).await?;
            processed += 1;
        }

        tracing::info!(count = processed, "report TTL cleanup pass complete");
        Ok(processed)
    }
}
