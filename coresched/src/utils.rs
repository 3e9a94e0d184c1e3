pub use std::{
    cell::Cell,
    cmp::Ordering,
    collections::BinaryHeap,
    hash::{BuildHasherDefault, Hash},
    rc::Rc,
    sync::{
        atomic::{AtomicU32, Ordering as AtomicOrder},
        Mutex,
    },
    time::{Duration, Instant},
};

pub use ahash::AHasher;
pub use indexmap::{IndexMap, IndexSet};
pub use itertools::Itertools;
pub use thiserror::Error;

pub use crate::{
    capacity::CapacityModel,
    io::{ItemSource, LivenessCsv},
    lifetime::{liveness, Lifetime, Operation},
    problem::{Item, Problem, ProblemError},
    schedule::{Assignment, SchedulingFailure, TimelineRecord},
    solver::{schedule, schedule_with, SolveBudget, SolveOutcome, SolverBackend},
    Buffer, BufferArena, StorageClass,
};

/// The unit for measuring space. We design for 64-bit hosts; a `usize`
/// comfortably covers any scratchpad we shall ever meet.
pub type Bytes = usize;

/// The unit for measuring logical time. `coresched` does not care what a
/// step *is* (an instruction, a fused operator, a DMA slot), as long as
/// the program order is total and the liveness invariant of [`Lifetime`]
/// is preserved.
pub type Step = usize;

/// Arena handle of a [`Buffer`]. All maps in the crate key on this.
pub type BufferId = u32;

pub type FastMap<K, V> = IndexMap<K, V, BuildHasherDefault<AHasher>>;
pub type FastSet<T> = IndexSet<T, BuildHasherDefault<AHasher>>;

/// Offsets keyed by buffer handle. This is the raw payload of an
/// [`Assignment`].
pub type OffsetMap = FastMap<BufferId, Bytes>;

/// For each buffer, the handles of the buffers temporally overlapping
/// it. Interference is symmetric; both directions are stored.
pub type InterferenceGraph = FastMap<BufferId, Vec<BufferId>>;

//---START PLACEMENT PRIMITIVES
/// A buffer which has been assigned an offset inside the scratchpad.
/// Search-local: each solver pass owns its registry of these, so no
/// `Arc` is needed.
pub struct PlacedBuffer {
    pub id:     BufferId,
    pub size:   Bytes,
    pub offset: Cell<Bytes>,
}

impl PlacedBuffer {
    pub fn new(item: &Item) -> Self {
        Self {
            id:     item.id,
            size:   item.size,
            offset: Cell::new(0),
        }
    }

    pub fn next_avail_addr(&self) -> Bytes {
        self.offset.get() + self.size
    }
}

// Gap scans walk already-placed neighbours in ascending offset.
impl Ord for PlacedBuffer {
    #[inline]
    fn cmp(&self, other: &Self) -> Ordering {
        self.offset
            .cmp(&other.offset)
            .then(self.next_avail_addr().cmp(&other.next_avail_addr()))
            // Avoid "equal" buffers in traversed sets.
            .then(self.id.cmp(&other.id))
    }
}

impl PartialOrd for PlacedBuffer {
    #[inline]
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for PlacedBuffer {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for PlacedBuffer {}

pub type PlacedRegistry = FastMap<BufferId, Rc<PlacedBuffer>>;
//---END PLACEMENT PRIMITIVES
