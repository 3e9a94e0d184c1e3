use super::{PackingModel, SolveBudget, SolveOutcome, SolverBackend};
use crate::utils::*;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rayon::prelude::*;

/// Problems up to this many non-degenerate rectangles get the complete
/// branch-and-bound, which can certify infeasibility. Anything bigger
/// goes to the portfolio, which can only find or time out.
const EXHAUSTIVE_LIMIT: usize = 12;

/// How many randomized passes one portfolio worker attempts before
/// giving up on improving further.
const MAX_ROUNDS: u32 = 100;

/// The clock is consulted once per this many search nodes.
const DEADLINE_STRIDE: u64 = 64;

/// The default backend: an in-house combinatorial search over the
/// non-overlap model.
///
/// Three stages, cheapest first. The peak-load certificate settles
/// over-subscribed kernels without any search. Small problems then get
/// an exhaustive enumeration of normalized placements, so a negative
/// answer is a proof. Large problems get randomized best-fit passes over
/// varied orderings, serially or as a rayon portfolio; passes repeat
/// until the early-stop bound, the round limit or the deadline fires,
/// and the lowest-peak placement seen wins.
pub struct PackingSearch;

impl SolverBackend for PackingSearch {
    fn solve(&self, model: &PackingModel, budget: &SolveBudget) -> SolveOutcome {
        if model.peak_load > model.capacity {
            // Pigeonhole at the peak step; no search can undo this.
            log::debug!(
                "peak load {} exceeds capacity {}: infeasible without search",
                model.peak_load,
                model.capacity,
            );
            return SolveOutcome::Infeasible;
        }

        let searchable = model
            .rects
            .iter()
            .filter(|r| r.size > 0 && !r.life.is_empty())
            .count();
        if searchable <= EXHAUSTIVE_LIMIT {
            exhaustive(model, budget)
        } else {
            portfolio(model, budget)
        }
    }
}

fn by_id(model: &PackingModel) -> FastMap<BufferId, Item> {
    model.rects.iter().map(|r| (r.id, *r)).collect()
}

/// Offsets of the rectangles no search is needed for: zero-sized buffers
/// occupy no space, zero-width lifetimes occupy no time. Both go to
/// offset zero.
fn degenerate_offsets(model: &PackingModel) -> OffsetMap {
    model
        .rects
        .iter()
        .filter(|r| r.size == 0 || r.life.is_empty())
        .map(|r| (r.id, 0))
        .collect()
}

//---START COMPLETE SEARCH
struct Dfs<'a> {
    model:        &'a PackingModel,
    items:        FastMap<BufferId, Item>,
    /// Rectangles the search actually branches on.
    targets:      Vec<BufferId>,
    offsets:      OffsetMap,
    placed:       usize,
    best:         Option<(Bytes, OffsetMap)>,
    found:        u32,
    nodes:        u64,
    deadline:     Instant,
    hit_deadline: bool,
    solution_cap: u32,
}

impl<'a> Dfs<'a> {
    fn stop(&self) -> bool {
        self.hit_deadline || self.found > self.solution_cap
    }

    fn conflicts(&self, id: BufferId, cand: Bytes) -> bool {
        let size = self.items[&id].size;
        for nb in &self.model.ig[&id] {
            let no = match self.offsets.get(nb) {
                Some(&o) => o,
                None => continue,
            };
            let nsize = self.items[nb].size;
            if nsize == 0 {
                continue;
            }
            if cand < no + nsize && no < cand + size {
                return true;
            }
        }

        false
    }

    fn record(&mut self) {
        self.found += 1;
        let peak = self
            .offsets
            .iter()
            .map(|(id, &o)| o + self.items[id].size)
            .max()
            .unwrap_or(0);
        if self.best.as_ref().map_or(true, |(b, _)| peak < *b) {
            log::debug!("improved: peak address {} ({} found)", peak, self.found);
            self.best = Some((peak, self.offsets.clone()));
        }
    }

    /// Enumerates placements in normalized order: rectangles are fixed
    /// one by one in strictly increasing `(offset, id)`, and a candidate
    /// offset is either zero or the top of an already-placed interfering
    /// rectangle. Any feasible placement can be slid down into this
    /// form, so exhausting the enumeration is a proof of infeasibility.
    fn descend(&mut self, frontier: Option<(Bytes, BufferId)>) {
        self.nodes += 1;
        if self.nodes % DEADLINE_STRIDE == 0 && Instant::now() >= self.deadline {
            self.hit_deadline = true;
        }
        if self.stop() {
            return;
        }
        if self.placed == self.targets.len() {
            self.record();
            return;
        }

        for idx in 0..self.targets.len() {
            let id = self.targets[idx];
            if self.offsets.contains_key(&id) {
                continue;
            }
            let size = self.items[&id].size;

            let mut cands: Vec<Bytes> = vec![0];
            for nb in &self.model.ig[&id] {
                if let Some(&no) = self.offsets.get(nb) {
                    let nsize = self.items[nb].size;
                    if nsize > 0 {
                        cands.push(no + nsize);
                    }
                }
            }
            cands.sort_unstable();
            cands.dedup();

            for cand in cands {
                if let Some((fo, fid)) = frontier {
                    if cand < fo || (cand == fo && id <= fid) {
                        continue;
                    }
                }
                if cand + size > self.model.capacity {
                    // Candidates are ascending; the rest are worse.
                    break;
                }
                if self.conflicts(id, cand) {
                    continue;
                }
                self.offsets.insert(id, cand);
                self.placed += 1;
                self.descend(Some((cand, id)));
                self.placed -= 1;
                self.offsets.swap_remove(&id);
                if self.stop() {
                    return;
                }
            }
        }
    }
}

fn exhaustive(model: &PackingModel, budget: &SolveBudget) -> SolveOutcome {
    let items = by_id(model);
    let offsets = degenerate_offsets(model);
    let targets: Vec<BufferId> = model
        .rects
        .iter()
        .filter(|r| !offsets.contains_key(&r.id))
        .map(|r| r.id)
        .collect();

    let mut dfs = Dfs {
        model,
        items,
        targets,
        offsets,
        placed: 0,
        best: None,
        found: 0,
        nodes: 0,
        deadline: budget.deadline,
        hit_deadline: false,
        solution_cap: budget.solution_cap,
    };
    dfs.descend(None);

    match (dfs.best, dfs.hit_deadline) {
        (Some((_, offsets)), _) => SolveOutcome::Found(offsets),
        (None, true) => SolveOutcome::TimedOut,
        (None, false) => SolveOutcome::Infeasible,
    }
}
//---END COMPLETE SEARCH

//---START PORTFOLIO
fn ordering(rects: &[Item], round: u32, rng: &mut StdRng) -> Vec<BufferId> {
    let mut view: Vec<&Item> = rects.iter().collect();
    match round % 4 {
        // Big rocks first.
        0 => view.sort_unstable_by(|a, b| b.size.cmp(&a.size)),
        1 => view.sort_unstable_by(|a, b| b.area().cmp(&a.area())),
        2 => view.sort_unstable_by(|a, b| {
            a.life
                .start
                .cmp(&b.life.start)
                .then(b.size.cmp(&a.size))
        }),
        _ => view.shuffle(rng),
    }

    view.into_iter().map(|r| r.id).collect()
}

/// Performs one best/first-fit pass over an already-ordered collection
/// of rectangles. For each one, the already-placed buffers overlapping
/// it are walked in ascending offset, looking for the lowest gap
/// (first fit) or the tightest gap (best fit) that holds it. Returns
/// the full offset map and its peak address, or `None` as soon as one
/// rectangle would spill past capacity.
fn fit_pass(
    model:    &PackingModel,
    items:    &FastMap<BufferId, Item>,
    order:    &[BufferId],
    best_fit: bool,
) -> Option<(Bytes, OffsetMap)> {
    let mut placed: PlacedRegistry = PlacedRegistry::default();
    let mut peak: Bytes = 0;

    for id in order {
        let item = &items[id];
        let entry = Rc::new(PlacedBuffer::new(item));
        if item.size == 0 || item.life.is_empty() {
            placed.insert(*id, entry);
            continue;
        }

        let neigh = neighbours(model, &placed, *id);
        let mut offset_runner: Bytes = 0;
        let mut best: Option<(Bytes, Bytes)> = None;
        for nb in &neigh {
            let no = nb.offset.get();
            if no > offset_runner {
                let gap = no - offset_runner;
                if gap >= item.size {
                    if !best_fit {
                        best = Some((gap, offset_runner));
                        break;
                    } else if best.map_or(true, |(g, _)| gap < g) {
                        best = Some((gap, offset_runner));
                    }
                }
            }
            offset_runner = offset_runner.max(nb.next_avail_addr());
        }

        let offset = match best {
            Some((_, o)) => o,
            None => offset_runner,
        };
        if offset + item.size > model.capacity {
            return None;
        }
        entry.offset.set(offset);
        peak = peak.max(entry.next_avail_addr());
        placed.insert(*id, entry);
    }

    let offsets = placed
        .iter()
        .map(|(&id, pb)| (id, pb.offset.get()))
        .collect();

    Some((peak, offsets))
}

fn neighbours(model: &PackingModel, placed: &PlacedRegistry, id: BufferId) -> Vec<Rc<PlacedBuffer>> {
    model.ig[&id]
        .iter()
        .filter_map(|nb| placed.get(nb))
        .filter(|pb| pb.size > 0)
        .cloned()
        .sorted_unstable()
        .collect()
}

fn portfolio(model: &PackingModel, budget: &SolveBudget) -> SolveOutcome {
    let items = by_id(model);
    let best: Mutex<Option<(Bytes, OffsetMap)>> = Mutex::new(None);
    let found = AtomicU32::new(0);

    let worker = |seed: u64| {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut round = seed as u32;
        let last = seed as u32 + MAX_ROUNDS;
        while round < last {
            if Instant::now() >= budget.deadline {
                break;
            }
            if found.load(AtomicOrder::Relaxed) > budget.solution_cap {
                break;
            }
            let order = ordering(&model.rects, round, &mut rng);
            if let Some((peak, offsets)) = fit_pass(model, &items, &order, round % 2 == 1) {
                found.fetch_add(1, AtomicOrder::Relaxed);
                let mut guard = best.lock().unwrap();
                if guard.as_ref().map_or(true, |(b, _)| peak < *b) {
                    log::debug!("improved: peak address {} (round {})", peak, round);
                    *guard = Some((peak, offsets));
                }
            }
            round += 1;
        }
    };

    if budget.workers > 1 {
        (0..budget.workers as u64).into_par_iter().for_each(worker);
    } else {
        worker(0);
    }

    match best.into_inner().unwrap() {
        Some((_, offsets)) => SolveOutcome::Found(offsets),
        None => SolveOutcome::TimedOut,
    }
}
//---END PORTFOLIO
