use crate::utils::*;

/// Why a scheduling call produced no assignment. All three kinds are
/// ordinary values the calling pass inspects for its retry policy; none
/// of them panics. (Malformed models, by contrast, are defects and do
/// panic; see [`crate::solver::PackingModel::build`].)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchedulingFailure {
    /// A single buffer exceeds total capacity. Detected before any model
    /// is built; always recoverable by spilling that buffer.
    #[error("buffer {id} needs {size} bytes but the scratchpad holds {capacity}")]
    BufferTooLarge {
        id:       BufferId,
        size:     Bytes,
        capacity: Bytes,
    },

    /// The search obtained no certificate either way within its budget.
    /// The caller may raise the timeout or shrink the working set.
    #[error("no packing certified within {budget:?}")]
    TimedOut { budget: Duration },

    /// Proven: no packing of these buffers fits the capacity. Indicates
    /// genuine memory pressure, not a transient solver limitation, and
    /// deserves distinct logging upstream.
    #[error("packing proven infeasible: peak load {peak_load} bytes against {capacity} of scratchpad")]
    Unsatisfiable { peak_load: Bytes, capacity: Bytes },
}

/// The output artifact of a successful scheduling call: an immutable
/// offset per buffer, wrapped together with the originating lifetimes
/// for diagnostics. Success itself is carried by the `Result` the engine
/// returns, so there is no flag to check here.
#[derive(Clone, Debug)]
pub struct Assignment {
    items:    Vec<Item>,
    offsets:  OffsetMap,
    capacity: Bytes,
}

impl Assignment {
    pub(crate) fn new(items: &[Item], offsets: OffsetMap, capacity: Bytes) -> Self {
        Self {
            items: items.to_vec(),
            offsets,
            capacity,
        }
    }

    pub fn offset_of(&self, id: BufferId) -> Option<Bytes> {
        self.offsets.get(&id).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (BufferId, Bytes)> + '_ {
        self.offsets.iter().map(|(&id, &o)| (id, o))
    }

    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    pub fn capacity(&self) -> Bytes {
        self.capacity
    }

    /// Highest address any buffer reaches; the packing's makespan.
    pub fn peak_address(&self) -> Bytes {
        self.items
            .iter()
            .map(|it| self.offsets[&it.id] + it.size)
            .max()
            .unwrap_or(0)
    }

    /// One record per scheduled buffer, for external timeline tooling.
    /// Pure export; scheduling correctness never depends on it.
    pub fn timeline(&self, arena: &BufferArena) -> Vec<TimelineRecord> {
        self.items
            .iter()
            .map(|it| {
                let buf = arena.get(it.id);
                TimelineRecord {
                    name:    buf.name.clone(),
                    life:    it.life,
                    offset:  self.offsets[&it.id],
                    size:    it.size,
                    shape:   buf.shape.clone(),
                    strides: buf.strides.clone(),
                }
            })
            .collect()
    }

    /// Renders the timeline as plain structured text, one line per
    /// buffer. The format is a courtesy to visualization tools, not a
    /// stable interface.
    pub fn render_timeline(&self, arena: &BufferArena) -> String {
        let mut out = String::from("name,start,end,offset,size,shape,stride\n");
        for rec in self.timeline(arena) {
            out.push_str(&rec.to_string());
            out.push('\n');
        }

        out
    }
}

/// What one buffer looks like on the exported timeline.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TimelineRecord {
    pub name:    String,
    pub life:    Lifetime,
    pub offset:  Bytes,
    pub size:    Bytes,
    pub shape:   Vec<usize>,
    pub strides: Vec<usize>,
}

impl std::fmt::Display for TimelineRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{},{},{},{},{},{},{}",
            self.name,
            self.life.start,
            self.life.end,
            self.offset,
            self.size,
            self.shape.iter().map(|d| d.to_string()).join("x"),
            self.strides.iter().map(|s| s.to_string()).join("x"),
        )
    }
}
