//! The Adaptive Batch Sizer: a single running batch size revised from live
//! memory telemetry before each insert.

use parking_lot::Mutex;
use tenderflow_infer::memory::{self, MemorySnapshot};
use tracing::info;

pub const MIN_BATCH_SIZE: usize = 10_000;
pub const MAX_BATCH_SIZE: usize = 1_000_000;

const LOW_WATERMARK: f64 = 0.60;
const MID_WATERMARK: f64 = 0.75;
const GROWTH_FACTOR_LOW: usize = 3;
const GROWTH_FACTOR_MID: f64 = 2.0;
const SHRINK_FACTOR_HIGH: f64 = 1.5;

pub struct AdaptiveBatchSizer {
    current: Mutex<usize>,
}

impl AdaptiveBatchSizer {
    /// Seeds the sizer from a coarse estimate:
    /// `(available_memory * 0.10) / 2048 bytes`, clamped to the allowed
    /// range.
    pub fn new() -> Self {
        let available = memory::available_bytes();
        let seed = ((available as f64 * 0.10) / 2048.0) as usize;
        let clamped = seed.clamp(MIN_BATCH_SIZE, MAX_BATCH_SIZE);
        info!(seed = clamped, "seeded adaptive batch size");
        Self { current: Mutex::new(clamped) }
    }

    pub fn current(&self) -> usize {
        *self.current.lock()
    }

    /// Revises the batch size from a fresh memory snapshot. Call before
    /// each batch.
    pub fn revise(&self) -> usize {
        let snapshot = memory::snapshot();
        self.revise_from(snapshot)
    }

    fn revise_from(&self, snapshot: MemorySnapshot) -> usize {
        let mut size = self.current.lock();
        let fraction = snapshot.fraction_of_target();
        let previous = *size;

        let next = if fraction < LOW_WATERMARK {
            previous.saturating_mul(GROWTH_FACTOR_LOW)
        } else if fraction < MID_WATERMARK {
            ((previous as f64) * GROWTH_FACTOR_MID) as usize
        } else if snapshot.utilization() > memory::HARD_CEILING_UTILIZATION {
            ((previous as f64) / SHRINK_FACTOR_HIGH) as usize
        } else {
            previous
        };

        let clamped = next.clamp(MIN_BATCH_SIZE, MAX_BATCH_SIZE);
        if clamped != previous {
            info!(from = previous, to = clamped, utilization = snapshot.utilization(), "adaptive batch size changed direction");
        }
        *size = clamped;
        clamped
    }
}

impl Default for AdaptiveBatchSizer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snap(total: u64, used_fraction: f64) -> MemorySnapshot {
        MemorySnapshot { total_bytes: total, used_bytes: (total as f64 * used_fraction) as u64 }
    }

    #[test]
    fn grows_triple_under_low_watermark() {
        let sizer = AdaptiveBatchSizer { current: Mutex::new(20_000) };
        let size = sizer.revise_from(snap(1_000_000_000, 0.10));
        assert_eq!(size, 60_000);
    }

    #[test]
    fn grows_double_under_mid_watermark() {
        let sizer = AdaptiveBatchSizer { current: Mutex::new(20_000) };
        let size = sizer.revise_from(snap(1_000_000_000, 0.50));
        assert_eq!(size, 40_000);
    }

    #[test]
    fn shrinks_above_hard_ceiling() {
        let sizer = AdaptiveBatchSizer { current: Mutex::new(30_000) };
        let size = sizer.revise_from(snap(1_000_000_000, 0.95));
        assert_eq!(size, 20_000);
    }

    #[test]
    fn never_drops_below_floor() {
        let sizer = AdaptiveBatchSizer { current: Mutex::new(10_000) };
        let size = sizer.revise_from(snap(1_000_000_000, 0.95));
        assert_eq!(size, MIN_BATCH_SIZE);
    }

    #[test]
    fn never_exceeds_ceiling() {
        let sizer = AdaptiveBatchSizer { current: Mutex::new(900_000) };
        let size = sizer.revise_from(snap(1_000_000_000, 0.10));
        assert_eq!(size, MAX_BATCH_SIZE);
    }
}
