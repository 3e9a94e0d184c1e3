use crate::utils::*;

/// Stop the search once more than this many feasible packings have been
/// seen. Bounds worst-case compile latency at the cost of packing
/// quality; whether the bound should scale with problem size is an open
/// tuning question, which is why it is a per-problem field and not a
/// constant buried in the solver.
pub const DEFAULT_SOLUTION_CAP: u32 = 3;

/// Wall-clock budget a problem gets unless the caller says otherwise.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// One schedulable buffer as the engine sees it: a handle, a fixed byte
/// size, and a fixed liveness window. Everything else about the buffer
/// is irrelevant to packing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Item {
    pub id:   BufferId,
    pub size: Bytes,
    pub life: Lifetime,
}

impl Item {
    /// Time-space area, used by the solver's ordering heuristics.
    pub fn area(&self) -> usize {
        self.size * self.life.len()
    }
}

/// The immutable input to one scheduling invocation. Problems are
/// self-contained; separate invocations share nothing, so concurrent
/// callers may schedule independent kernels without coordination.
#[derive(Clone, Debug)]
pub struct Problem {
    pub items:    Vec<Item>,
    pub capacity: Bytes,
    /// Run the solver portfolio on multiple threads.
    pub parallel: bool,
    /// Wall-clock budget. There is no mid-flight cancellation; a caller
    /// that wants to abandon a search lets this elapse.
    pub timeout:  Duration,
    /// Early-stop bound, see [`DEFAULT_SOLUTION_CAP`].
    pub solution_cap: u32,
}

/// Appears while constructing a [`Problem`] out of ill-formed items.
#[derive(Error, Debug)]
#[error("{message}\n{culprit:?}")]
pub struct ProblemError {
    pub message: String,
    pub culprit: Item,
}

impl Problem {
    /// Gatekeeper to the engine. A successfully returned problem is
    /// guaranteed to satisfy the engine's structural assumptions:
    /// - no lifetime runs backwards
    /// - no two items share a handle
    ///
    /// Zero-sized items and zero-width lifetimes are legal; both are
    /// degenerate cases the solver handles without search.
    pub fn new(items: Vec<Item>, capacity: Bytes) -> Result<Self, ProblemError> {
        let mut seen: FastSet<BufferId> = FastSet::default();
        for it in &items {
            if it.life.start > it.life.end {
                return Err(ProblemError {
                    message: String::from("Item with backwards lifetime found!"),
                    culprit: *it,
                });
            }
            if !seen.insert(it.id) {
                return Err(ProblemError {
                    message: String::from("Two items with same handle found!"),
                    culprit: *it,
                });
            }
        }

        Ok(Self {
            items,
            capacity,
            parallel: false,
            timeout: DEFAULT_TIMEOUT,
            solution_cap: DEFAULT_SOLUTION_CAP,
        })
    }

    /// Builds a problem straight out of the lifetime analyzer's output.
    pub fn from_liveness(
        arena:     &BufferArena,
        lifetimes: &FastMap<BufferId, Lifetime>,
        capacity:  Bytes,
    ) -> Result<Self, ProblemError> {
        let items = lifetimes
            .iter()
            .map(|(&id, &life)| Item {
                id,
                size: arena.get(id).size_bytes,
                life,
            })
            .collect();

        Self::new(items, capacity)
    }
}
