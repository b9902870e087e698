//! Workload partitioning across worker processes

use serde::{Deserialize, Serialize};

use crate::error::{ExecutionError, ExecutionResult};

/// The share of the workload assigned to one worker process
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessAssignment {
    /// Index of the worker process, 0-based
    pub process_index: usize,
    /// Number of logical tasks this process fans out
    pub units: u64,
    /// Target subsequence the process cycles over per task
    pub targets: Vec<String>,
}

/// Split `total_units` into `budget` identical per-process counts.
///
/// Plain floor division: when `total_units` does not divide evenly, the
/// remainder units are not assigned to any process. That matches the
/// historical behavior of this harness and is asserted by tests rather
/// than redistributed.
pub fn partition(total_units: u64, budget: u64) -> Vec<u64> {
    debug_assert!(budget >= 1);
    let share = total_units / budget;
    vec![share; budget as usize]
}

/// Split the target list into at most `budget` contiguous chunks (chunk
/// size `ceil(len / budget)`) and pair processes with chunks by cycling:
/// process `i` receives chunk `i mod n_chunks`.
///
/// Capping the chunk count at the process count guarantees every target
/// is assigned to at least one process, for any budget and list length.
pub fn distribute_targets(targets: &[String], budget: u64) -> Vec<Vec<String>> {
    debug_assert!(budget >= 1);
    debug_assert!(!targets.is_empty());
    let chunk_size = targets.len().div_ceil(budget as usize);
    let chunks: Vec<Vec<String>> = targets
        .chunks(chunk_size)
        .map(|chunk| chunk.to_vec())
        .collect();
    (0..budget as usize)
        .map(|i| chunks[i % chunks.len()].clone())
        .collect()
}

/// Infinite cyclic view over a process's target subsequence: task `k` is
/// assigned `targets[k mod len]`. A fixed array and a modulo cursor, no
/// iterator state to exhaust.
#[derive(Debug, Clone)]
pub struct TargetCycle {
    targets: Vec<String>,
}

impl TargetCycle {
    pub fn new(targets: Vec<String>) -> ExecutionResult<Self> {
        if targets.is_empty() {
            return Err(ExecutionError::InvalidWorkload(
                "target cycle must not be empty".to_string(),
            ));
        }
        Ok(Self { targets })
    }

    /// Target for logical task `k`
    pub fn get(&self, k: usize) -> &str {
        &self.targets[k % self.targets.len()]
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn targets(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn uneven_division_drops_remainder() {
        let chunks = partition(10, 3);
        assert_eq!(chunks, vec![3, 3, 3]);
        assert_eq!(chunks.iter().sum::<u64>(), 9);
    }

    #[test]
    fn even_division_assigns_everything() {
        let chunks = partition(9, 3);
        assert_eq!(chunks, vec![3, 3, 3]);
        assert_eq!(chunks.iter().sum::<u64>(), 9);
    }

    #[test]
    fn partition_sum_never_exceeds_total() {
        for total in 0..40u64 {
            for budget in 1..8u64 {
                let chunks = partition(total, budget);
                assert_eq!(chunks.len(), budget as usize);
                let sum: u64 = chunks.iter().sum();
                assert_eq!(sum, budget * (total / budget));
                assert!(sum <= total);
                if total % budget == 0 {
                    assert_eq!(sum, total);
                }
            }
        }
    }

    #[test]
    fn fewer_units_than_processes_assigns_zero() {
        assert_eq!(partition(2, 4), vec![0, 0, 0, 0]);
    }

    #[test]
    fn distribution_cycles_chunks_across_processes() {
        let groups = distribute_targets(&targets(&["a", "b", "c"]), 2);
        // Chunks of size ceil(3/2) = 2: [a, b], [c].
        assert_eq!(groups, vec![targets(&["a", "b"]), targets(&["c"])]);
    }

    #[test]
    fn matching_counts_give_one_target_per_process() {
        let groups = distribute_targets(&targets(&["a", "b", "c"]), 3);
        assert_eq!(
            groups,
            vec![targets(&["a"]), targets(&["b"]), targets(&["c"])]
        );
    }

    #[test]
    fn more_processes_than_chunks_wraps_around() {
        let groups = distribute_targets(&targets(&["a", "b"]), 5);
        assert_eq!(groups.len(), 5);
        assert_eq!(
            groups,
            vec![
                targets(&["a"]),
                targets(&["b"]),
                targets(&["a"]),
                targets(&["b"]),
                targets(&["a"]),
            ]
        );
    }

    #[test]
    fn single_process_is_assigned_the_whole_list() {
        let list = targets(&["a", "b", "c", "d", "e"]);
        let groups = distribute_targets(&list, 1);
        assert_eq!(groups, vec![list]);
    }

    #[test]
    fn distribution_is_deterministic_and_covering() {
        // Lists much longer than the budget exercise the chunk-count cap.
        let list: Vec<String> = (0..9).map(|i| format!("ns-{}", i)).collect();
        for budget in 1..6u64 {
            let first = distribute_targets(&list, budget);
            let second = distribute_targets(&list, budget);
            assert_eq!(first, second);
            assert_eq!(first.len(), budget as usize);
            for target in &list {
                assert!(
                    first.iter().any(|group| group.contains(target)),
                    "target {} unassigned at budget {}",
                    target,
                    budget
                );
            }
        }
    }

    #[test]
    fn cycle_wraps_modulo_len() {
        let cycle = TargetCycle::new(targets(&["a", "b"])).unwrap();
        let assigned: Vec<&str> = (0..5).map(|k| cycle.get(k)).collect();
        assert_eq!(assigned, vec!["a", "b", "a", "b", "a"]);
    }

    #[test]
    fn cycle_is_restartable() {
        let cycle = TargetCycle::new(targets(&["a", "b", "c"])).unwrap();
        let first: Vec<&str> = (0..7).map(|k| cycle.get(k)).collect();
        let again: Vec<&str> = (0..7).map(|k| cycle.get(k)).collect();
        assert_eq!(first, again);
    }

    #[test]
    fn empty_cycle_rejected() {
        assert!(TargetCycle::new(vec![]).is_err());
    }
}
