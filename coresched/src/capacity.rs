use crate::utils::*;

/// Static description of the scratchpad partition available to one
/// scheduling unit: how many bytes exist in total, and how many workers
/// execute concurrently out of the same physical block.
///
/// Whether the capacity is actually subdivided per worker is a policy
/// choice of the target backend, not a structural property of the
/// packing itself; hence [`usable_bytes`](CapacityModel::usable_bytes)
/// takes the policy as a parameter.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CapacityModel {
    pub total_bytes:  Bytes,
    pub worker_count: usize,
}

impl CapacityModel {
    pub fn new(total_bytes: Bytes, worker_count: usize) -> Self {
        assert!(worker_count > 0, "a scratchpad with no workers is useless");
        Self {
            total_bytes,
            worker_count,
        }
    }

    pub fn per_worker_bytes(&self) -> Bytes {
        self.total_bytes / self.worker_count
    }

    /// The capacity one scheduling problem gets to play with.
    pub fn usable_bytes(&self, split_across_workers: bool) -> Bytes {
        if split_across_workers {
            self.per_worker_bytes()
        } else {
            self.total_bytes
        }
    }
}
