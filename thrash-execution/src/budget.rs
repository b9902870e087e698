//! Resource budget detection
//!
//! Computes the number of parallel worker processes the host actually
//! allows: cgroup v1 CPU quota over period when a quota is imposed, the
//! CPU-shares approximation when the quota is unlimited, and the logical
//! CPU count when no cgroup controller is mounted.

use std::path::Path;
use tracing::debug;

const DEFAULT_CGROUP_ROOT: &str = "/sys/fs/cgroup/cpu";

/// Quota value meaning "no limit imposed"
const QUOTA_UNLIMITED: i64 = -1;

/// One core's worth of CPU shares
const SHARES_PER_CORE: i64 = 1024;

/// Detect the CPU budget for the current process.
///
/// The raw value is NOT clamped: a fractional quota floors to 0 and callers
/// are expected to clamp to at least 1 and at most the requested total unit
/// count (see [`resolve`]).
pub fn detect_budget() -> u64 {
    detect_budget_at(Path::new(DEFAULT_CGROUP_ROOT))
}

/// Detect against an explicit cgroup controller root. Separated out so the
/// filesystem probing is testable.
pub fn detect_budget_at(root: &Path) -> u64 {
    let quota_file = root.join("cpu.cfs_quota_us");
    if !quota_file.exists() {
        return num_cpus::get() as u64;
    }

    // A present-but-unreadable file is a fallback branch, not an error.
    let Some(quota) = read_number(&quota_file) else {
        return num_cpus::get() as u64;
    };

    let period_file = root.join("cpu.cfs_period_us");
    let shares_file = root.join("cpu.shares");

    if quota != QUOTA_UNLIMITED && period_file.exists() {
        match read_number(&period_file) {
            Some(period) if period > 0 => {
                let budget = (quota / period).max(0) as u64;
                debug!(quota, period, budget, "cpu budget from cgroup quota");
                budget
            }
            _ => num_cpus::get() as u64,
        }
    } else if let Some(shares) = read_number(&shares_file) {
        // Managed environments report an unlimited quota but encode the
        // allotment in shares, one core per 1024.
        let budget = (shares / SHARES_PER_CORE).max(0) as u64;
        debug!(shares, budget, "cpu budget from cgroup shares");
        budget
    } else {
        num_cpus::get() as u64
    }
}

/// Clamp a detected budget for a workload: at least one process, never more
/// than there are units to run.
pub fn resolve(detected: u64, total_units: u64) -> u64 {
    detected.clamp(1, total_units.max(1))
}

fn read_number(path: &Path) -> Option<i64> {
    std::fs::read_to_string(path).ok()?.trim().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write(dir: &Path, name: &str, value: &str) {
        fs::write(dir.join(name), format!("{}\n", value)).unwrap();
    }

    #[test]
    fn no_quota_file_falls_back_to_cpu_count() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(detect_budget_at(dir.path()), num_cpus::get() as u64);
    }

    #[test]
    fn quota_over_period() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "cpu.cfs_quota_us", "400000");
        write(dir.path(), "cpu.cfs_period_us", "100000");
        assert_eq!(detect_budget_at(dir.path()), 4);
    }

    #[test]
    fn fractional_quota_floors() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "cpu.cfs_quota_us", "150000");
        write(dir.path(), "cpu.cfs_period_us", "100000");
        assert_eq!(detect_budget_at(dir.path()), 1);
    }

    #[test]
    fn unlimited_quota_uses_shares() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "cpu.cfs_quota_us", "-1");
        write(dir.path(), "cpu.cfs_period_us", "100000");
        write(dir.path(), "cpu.shares", "2048");
        assert_eq!(detect_budget_at(dir.path()), 2);
    }

    #[test]
    fn sub_core_shares_floor_to_zero_without_clamping() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "cpu.cfs_quota_us", "-1");
        write(dir.path(), "cpu.shares", "512");
        // The detector does not clamp; resolve() does.
        assert_eq!(detect_budget_at(dir.path()), 0);
    }

    #[test]
    fn resolve_clamps_both_ends() {
        assert_eq!(resolve(0, 50), 1);
        assert_eq!(resolve(8, 3), 3);
        assert_eq!(resolve(8, 50), 8);
        assert_eq!(resolve(4, 0), 1);
    }
}
