//! Startup staggering
//!
//! Two layers of thundering-herd mitigation: a linear per-process ramp
//! (process `i` waits `ramp_time * i` before starting anything) and a small
//! randomized per-task jitter inside each process. Both are bounded waits
//! on the shutdown handle, so an interrupt during ramp-up aborts cleanly
//! before any load is generated.

use rand::Rng;
use std::time::Duration;
use tracing::info;

use crate::shutdown::ShutdownHandle;

/// Wait out this process's slot in the linear ramp. Returns true when
/// shutdown fired during the wait, in which case the caller starts zero
/// tasks.
pub async fn ramp_delay(process_index: usize, ramp_time: u64, handle: &ShutdownHandle) -> bool {
    let delay = Duration::from_secs(ramp_time.saturating_mul(process_index as u64));
    if delay.is_zero() {
        return handle.is_set();
    }
    info!(process_index, delay_secs = delay.as_secs(), "ramp delay before start");
    handle.wait(delay).await
}

/// Per-task startup jitter, uniform over `0..=jitter_max` seconds. Returns
/// true when shutdown fired during the wait.
pub async fn task_jitter(jitter_max: u64, handle: &ShutdownHandle) -> bool {
    let secs = rand::rng().random_range(0..=jitter_max);
    if secs == 0 {
        return handle.is_set();
    }
    handle.wait(Duration::from_secs(secs)).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn process_zero_starts_immediately() {
        let handle = ShutdownHandle::new();
        let start = tokio::time::Instant::now();
        assert!(!ramp_delay(0, 30, &handle).await);
        assert!(start.elapsed() < Duration::from_millis(50));
    }

    #[tokio::test]
    async fn zero_ramp_time_starts_immediately() {
        let handle = ShutdownHandle::new();
        assert!(!ramp_delay(5, 0, &handle).await);
    }

    #[tokio::test]
    async fn preset_shutdown_aborts_ramp() {
        let handle = ShutdownHandle::new();
        handle.set();
        let start = tokio::time::Instant::now();
        assert!(ramp_delay(3, 3600, &handle).await);
        assert!(start.elapsed() < Duration::from_millis(50));
    }

    #[tokio::test]
    async fn shutdown_during_ramp_aborts() {
        let handle = ShutdownHandle::new();
        let setter = handle.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            setter.set();
        });
        assert!(ramp_delay(1, 3600, &handle).await);
    }

    #[tokio::test]
    async fn jitter_respects_preset_shutdown() {
        let handle = ShutdownHandle::new();
        handle.set();
        assert!(task_jitter(10, &handle).await);
    }

    #[tokio::test]
    async fn zero_jitter_bound_never_waits() {
        let handle = ShutdownHandle::new();
        let start = tokio::time::Instant::now();
        assert!(!task_jitter(0, &handle).await);
        assert!(start.elapsed() < Duration::from_millis(50));
    }
}
