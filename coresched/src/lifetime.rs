use crate::utils::*;

/// The half-open step window `[start, end)` during which a buffer's
/// contents must stay valid.
///
/// > ***ATTENTION:*** one must at all times be cognizant of the liveness
/// > semantics at the window's tips. In `coresched` memory is **not**
/// > live at `end`: if one buffer starts at the very step another one
/// > ends, the two may share the same offset.
///
/// A zero-width window (`start == end`) is a single-instant value. It
/// occupies no time and therefore interferes with nothing; the engine
/// places such buffers at whatever offset is convenient.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Lifetime {
    pub start: Step,
    pub end:   Step,
}

impl Lifetime {
    pub fn new(start: Step, end: Step) -> Self {
        debug_assert!(start <= end, "lifetime runs backwards: [{start}, {end})");
        Self { start, end }
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn len(&self) -> Step {
        self.end - self.start
    }

    /// Returns `true` if the two windows intersect. Empty windows
    /// intersect nothing, themselves included.
    pub fn overlaps(&self, other: &Self) -> bool {
        !self.is_empty()
            && !other.is_empty()
            && self.start < other.end
            && other.start < self.end
    }
}

/// One step of the already-ordered operation sequence: the buffers it
/// defines and the buffers it reads. Ordering is owed to the upstream
/// lowering pass; `coresched` never reorders.
#[derive(Clone, Debug, Default)]
pub struct Operation {
    pub defines: Vec<BufferId>,
    pub reads:   Vec<BufferId>,
}

/// Walks the operation sequence and computes, for every schedulable
/// buffer, the window during which it must hold valid data: from its
/// defining step to its last reading step, or one step past the
/// definition for a value nobody ever reads. Pinned buffers are skipped
/// entirely.
///
/// Pure computation, no failure mode. A buffer read before being defined
/// is an upstream defect and asserts instead of being tolerated.
pub fn liveness(ops: &[Operation], arena: &BufferArena) -> FastMap<BufferId, Lifetime> {
    let mut defined_at: FastMap<BufferId, Step> = FastMap::default();
    let mut last_read: FastMap<BufferId, Step> = FastMap::default();

    for (step, op) in ops.iter().enumerate() {
        for &id in &op.defines {
            if arena.get(id).is_pinned() {
                continue;
            }
            assert!(
                defined_at.insert(id, step).is_none(),
                "buffer {id} defined twice"
            );
        }
        for &id in &op.reads {
            if arena.get(id).is_pinned() {
                continue;
            }
            assert!(
                defined_at.contains_key(&id),
                "buffer {id} read before being defined"
            );
            last_read.insert(id, step);
        }
    }

    defined_at
        .into_iter()
        .map(|(id, start)| {
            let end = match last_read.get(&id) {
                Some(&r) => r,
                // Write-only dead value. Give it the minimal window so a
                // careless caller still gets a safe packing.
                None => start + 1,
            };

            (id, Lifetime::new(start, end))
        })
        .collect()
}

#[derive(Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Birth,
    Death,
}

/// Traversal of an item set can be thought of as an ordered stream of
/// events. Each non-empty lifetime generates two, one per tip. We use
/// the stream to compute peak load and the interference graph in a
/// single sweep.
#[derive(Eq)]
pub struct Event {
    pub id:   BufferId,
    pub kind: EventKind,
    pub time: Step,
}

impl Ord for Event {
    fn cmp(&self, other: &Self) -> Ordering {
        // `BinaryHeap` is a max-priority queue; we want a min-one, so
        // the time comparison is reversed. At equal times deaths must
        // pop before births, otherwise back-to-back windows would be
        // reported as interfering.
        if self.time != other.time {
            other.time.cmp(&self.time)
        } else {
            match (self.kind, other.kind) {
                (EventKind::Death, EventKind::Birth) => Ordering::Greater,
                (EventKind::Birth, EventKind::Death) => Ordering::Less,
                _ => Ordering::Equal,
            }
        }
    }
}

impl PartialOrd for Event {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Event {
    fn eq(&self, other: &Self) -> bool {
        self.time == other.time && self.kind == other.kind
    }
}

pub fn events(items: &[Item]) -> BinaryHeap<Event> {
    let mut res = BinaryHeap::new();
    for it in items {
        if it.life.is_empty() {
            continue;
        }
        res.push(Event {
            id:   it.id,
            kind: EventKind::Birth,
            time: it.life.start,
        });
        res.push(Event {
            id:   it.id,
            kind: EventKind::Death,
            time: it.life.end,
        });
    }

    res
}

/// Sweeps the event stream once, producing the interference graph and
/// the peak simultaneous load in bytes. The peak is a lower bound on any
/// feasible capacity; the graph is the engine's non-overlap constraint
/// in adjacency form.
pub fn sweep(items: &[Item]) -> (InterferenceGraph, Bytes) {
    let sizes: FastMap<BufferId, Bytes> = items.iter().map(|it| (it.id, it.size)).collect();
    let mut ig: InterferenceGraph = items.iter().map(|it| (it.id, vec![])).collect();
    let mut live: FastSet<BufferId> = FastSet::default();
    let (mut running, mut peak): (Bytes, Bytes) = (0, 0);

    let mut evts = events(items);
    while let Some(e) = evts.pop() {
        match e.kind {
            EventKind::Birth => {
                for &other in &live {
                    ig.get_mut(&other).unwrap().push(e.id);
                    ig.get_mut(&e.id).unwrap().push(other);
                }
                live.insert(e.id);
                running += sizes[&e.id];
                if running > peak {
                    peak = running;
                }
            }
            EventKind::Death => {
                live.swap_remove(&e.id);
                running -= sizes[&e.id];
            }
        }
    }

    (ig, peak)
}
