//! Welcome to `coresched`!
//!
//! `coresched` assigns start offsets inside a fixed-capacity on-chip
//! scratchpad to the ephemeral buffers of a fused tensor kernel. Each
//! buffer is live for a contiguous window of program steps; buffers whose
//! windows overlap must not share addresses, while buffers whose windows
//! are disjoint may. Packing the resulting fixed-time/free-space
//! rectangles is NP-hard, so instead of a greedy stack allocator the
//! engine builds a declarative non-overlap model and hands it to a
//! bounded combinatorial search (see [`solver`]).
//!
//! The pipeline is: [`lifetime::liveness`] turns an ordered operation
//! sequence into per-buffer lifetimes, [`Problem`] packages them with a
//! capacity and tuning knobs, [`schedule`] returns either a complete
//! [`Assignment`] or a typed [`SchedulingFailure`] the calling pass can
//! act on (spill and retry, raise the budget, and so on).

mod buffer;
pub mod capacity;
pub mod io;
pub mod lifetime;
pub mod problem;
pub mod schedule;
pub mod solver;
pub mod utils;

use crate::utils::*;

/// A candidate for on-chip placement. Buffers are value-like: they live
/// in a [`BufferArena`] and every map in the crate keys on their
/// [`BufferId`] handle, never on reference identity.
///
/// A buffer's [`size_bytes`](Buffer::size_bytes) is fixed and known at
/// schedule time. Its address is *not* stored here while scheduling runs:
/// the engine returns a separate [`Assignment`], and the caller folds it
/// back in through [`BufferArena::apply`], exactly once per buffer.
///
/// [`shape`](Buffer::shape) and [`strides`](Buffer::strides) are carried
/// only for the diagnostic timeline dump; the engine never reads them.
#[derive(Clone, Debug, Eq)]
pub struct Buffer {
    pub id:         BufferId,
    pub name:       String,
    pub size_bytes: Bytes,
    pub class:      StorageClass,
    pub shape:      Vec<usize>,
    pub strides:    Vec<usize>,
    assigned_offset: Option<Bytes>,
}

/// Distinguishes buffers this engine may move from buffers it must not
/// touch.
///
/// *Pinned* buffers (kernel inputs, outputs, persistent constants) keep
/// whatever address the surrounding compiler gave them; the lifetime
/// analyzer skips them and they never enter a [`Problem`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StorageClass {
    Scratch,
    Pinned,
}

/// Handle-keyed home of all [`Buffer`]s of one kernel. Handles are plain
/// arena indices, so lookups are O(1) and the whole model is free of
/// shared mutable state.
#[derive(Clone, Debug, Default)]
pub struct BufferArena {
    bufs: Vec<Buffer>,
}

pub use crate::capacity::CapacityModel;
pub use crate::io::{ItemSource, LivenessCsv};
pub use crate::lifetime::{liveness, Lifetime, Operation};
pub use crate::problem::{Item, Problem, ProblemError, DEFAULT_SOLUTION_CAP, DEFAULT_TIMEOUT};
pub use crate::schedule::{Assignment, SchedulingFailure, TimelineRecord};
pub use crate::solver::{
    schedule, schedule_with, PackingModel, PackingSearch, SolveBudget, SolveOutcome, SolverBackend,
};
pub use crate::utils::{BufferId, Bytes, InterferenceGraph, OffsetMap, Step};
