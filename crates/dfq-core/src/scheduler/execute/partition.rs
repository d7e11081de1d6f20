//! Round-robin assignment of work units to sub-queues.

use crate::document::WorkUnit;

/// Partition units into `workers` sub-queues: unit `i` goes to queue
/// `i % workers`. Round-robin rather than contiguous chunking, so degenerate
/// input ordering (e.g. all long spans first) cannot starve one worker.
pub(super) fn partition_round_robin(units: Vec<WorkUnit>, workers: usize) -> Vec<Vec<WorkUnit>> {
    let workers = workers.max(1);
    let mut queues: Vec<Vec<WorkUnit>> = (0..workers)
        .map(|_| Vec::with_capacity(units.len() / workers + 1))
        .collect();
    for unit in units {
        queues[unit.index % workers].push(unit);
    }
    queues
}
