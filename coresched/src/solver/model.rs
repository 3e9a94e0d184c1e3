use crate::lifetime::sweep;
use crate::utils::*;

/// Declarative form of one scheduling problem: every buffer is a
/// rectangle with a fixed extent along the time axis (its lifetime) and
/// a free offset along the space axis, domain `[0, capacity - size]`.
/// The single constraint is that no two rectangles may overlap in both
/// axes at once. Since the time extents are fixed, two rectangles can
/// collide only when their lifetimes overlap, which is exactly the
/// interference rule. The graph is carried in adjacency form rather
/// than built and colored explicitly.
pub struct PackingModel {
    pub rects:     Vec<Item>,
    pub capacity:  Bytes,
    pub ig:        InterferenceGraph,
    /// Peak simultaneous load; a lower bound on any feasible capacity.
    pub peak_load: Bytes,
}

impl PackingModel {
    /// Builds the model out of a gatekept problem.
    ///
    /// Panics on a malformed domain. The engine's preconditions make
    /// these unreachable for any input that came through [`Problem`]'s
    /// constructor; reaching one means the engine or its caller is
    /// broken, and masking that as "no schedule" would silently corrupt
    /// the memory layout downstream.
    pub fn build(problem: &Problem) -> Self {
        for it in &problem.items {
            if it.size > problem.capacity {
                panic!(
                    "model construction: buffer {} has empty offset domain ({} > {} bytes)",
                    it.id, it.size, problem.capacity,
                );
            }
            if it.life.start > it.life.end {
                panic!("model construction: buffer {} has a backwards lifetime", it.id);
            }
        }

        let (ig, peak_load) = sweep(&problem.items);

        Self {
            rects: problem.items.clone(),
            capacity: problem.capacity,
            ig,
            peak_load,
        }
    }

    /// Returns `true` iff `offsets` is a complete, in-range,
    /// non-overlapping placement of every rectangle.
    pub fn certify(&self, offsets: &OffsetMap) -> bool {
        let sizes: FastMap<BufferId, Bytes> =
            self.rects.iter().map(|r| (r.id, r.size)).collect();
        for r in &self.rects {
            let o = match offsets.get(&r.id) {
                Some(&o) => o,
                None => return false,
            };
            if o + r.size > self.capacity {
                return false;
            }
            if r.size == 0 {
                continue;
            }
            for nb in &self.ig[&r.id] {
                // Adjacency is symmetric; checking each edge twice is
                // cheap enough for a certifier.
                let (no, nsize) = (offsets[nb], sizes[nb]);
                if nsize == 0 {
                    continue;
                }
                if o < no + nsize && no < o + r.size {
                    return false;
                }
            }
        }

        true
    }
}
