//! Live memory telemetry shared by the inferencer's early-abort check and
//! the adaptive batch sizer.

use sysinfo::System;

/// Fraction of total system memory the pipeline is allowed to target before
/// backing off.
pub const TARGET_UTILIZATION: f64 = 0.80;
/// Hard ceiling; above this the pipeline must shed batch size immediately.
pub const HARD_CEILING_UTILIZATION: f64 = 0.90;

#[derive(Debug, Clone, Copy)]
pub struct MemorySnapshot {
    pub total_bytes: u64,
    pub used_bytes: u64,
}

impl MemorySnapshot {
    pub fn utilization(&self) -> f64 {
        if self.total_bytes == 0 {
            0.0
        } else {
            self.used_bytes as f64 / self.total_bytes as f64
        }
    }

    /// Utilization expressed as a fraction of the target (80%) budget, i.e.
    /// 1.0 means "exactly at target", not "100% of RAM".
    pub fn fraction_of_target(&self) -> f64 {
        let budget = self.total_bytes as f64 * TARGET_UTILIZATION;
        if budget == 0.0 {
            0.0
        } else {
            self.used_bytes as f64 / budget
        }
    }
}

/// Reads current memory usage. A fresh `System` is used rather than a
/// cached one: this is called at most once per sampling interval (every
/// 1000 records, or once per batch), not in a hot loop.
pub fn snapshot() -> MemorySnapshot {
    let mut system = System::new();
    system.refresh_memory();
    MemorySnapshot {
        total_bytes: system.total_memory(),
        used_bytes: system.used_memory(),
    }
}

pub fn available_bytes() -> u64 {
    let mut system = System::new();
    system.refresh_memory();
    system.available_memory()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn utilization_is_bounded() {
        let snap = MemorySnapshot { total_bytes: 1000, used_bytes: 500 };
        assert!((snap.utilization() - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn zero_total_does_not_panic() {
        let snap = MemorySnapshot { total_bytes: 0, used_bytes: 0 };
        assert_eq!(snap.utilization(), 0.0);
    }
}
