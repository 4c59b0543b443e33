//! Progress & Resume Tracker: gates file entry against the persisted
//! ledger and keeps an in-memory ETA estimate from trailing file speeds.

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::time::{Duration, Instant};
use tenderflow_db::{ledger, ConnectionPool, FileStatus, TenderflowDbError};
use tracing::info;

const TRAILING_WINDOW: usize = 5;

pub struct ProgressTracker {
    trailing_speeds: Mutex<VecDeque<f64>>,
}

/// A handle for one file's in-flight processing, used to compute its
/// records/second once it finishes.
pub struct FileProgress {
    started_at: Instant,
}

impl FileProgress {
    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self { trailing_speeds: Mutex::new(VecDeque::with_capacity(TRAILING_WINDOW)) }
    }

    /// Returns `false` if `file_name` is already marked `completed`.
    pub async fn should_process(
        &self,
        pool: &ConnectionPool,
        file_name: &str,
    ) -> Result<bool, TenderflowDbError> {
        let completed = ledger::is_completed(pool.raw(), file_name).await?;
        Ok(!completed)
    }

    pub fn start_file(&self) -> FileProgress {
        FileProgress { started_at: Instant::now() }
    }

    /// Records the records/second achieved by a finished file, folding it
    /// into the trailing window used for ETA estimation.
    pub fn record_speed(&self, progress: &FileProgress, record_count: usize) {
        let elapsed = progress.elapsed().as_secs_f64().max(0.001);
        let speed = record_count as f64 / elapsed;
        let mut speeds = self.trailing_speeds.lock();
        if speeds.len() == TRAILING_WINDOW {
            speeds.pop_front();
        }
        speeds.push_back(speed);
    }

    fn average_speed(&self) -> f64 {
        let speeds = self.trailing_speeds.lock();
        if speeds.is_empty() {
            return 0.0;
        }
        speeds.iter().sum::<f64>() / speeds.len() as f64
    }

    /// Estimated remaining time given how many files are left and the
    /// average records per file seen so far.
    pub fn eta(&self, remaining_files: usize, avg_records_per_file: f64) -> Duration {
        let speed = self.average_speed();
        if speed <= 0.0 || remaining_files == 0 {
            return Duration::ZERO;
        }
        let seconds = (remaining_files as f64 * avg_records_per_file) / speed;
        Duration::from_secs_f64(seconds.max(0.0))
    }

    /// Upserts the ledger entry for a file that just finished, successfully
    /// or not.
    pub async fn complete_file(
        &self,
        pool: &ConnectionPool,
        file_name: &str,
        record_count: i64,
        status: FileStatus,
        error_message: Option<&str>,
    ) -> Result<(), TenderflowDbError> {
        ledger::upsert_entry(pool.raw(), file_name, record_count, status.clone(), error_message).await?;
        info!(file_name, record_count, status = ?status, "recorded file completion");
        Ok(())
    }
}

impl Default for ProgressTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eta_is_zero_with_no_history() {
        let tracker = ProgressTracker::new();
        assert_eq!(tracker.eta(10, 100.0), Duration::ZERO);
    }

    #[test]
    fn trailing_window_caps_at_five() {
        let tracker = ProgressTracker::new();
        for _ in 0..8 {
            let progress = FileProgress { started_at: Instant::now() - Duration::from_secs(1) };
            tracker.record_speed(&progress, 100);
        }
        assert_eq!(tracker.trailing_speeds.lock().len(), TRAILING_WINDOW);
    }
}
