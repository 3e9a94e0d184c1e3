pub mod model;
pub mod search;

pub use self::model::PackingModel;
pub use self::search::PackingSearch;

use crate::utils::*;

/// Effort bounds handed to a backend alongside the model.
#[derive(Clone, Copy, Debug)]
pub struct SolveBudget {
    pub deadline:     Instant,
    pub workers:      usize,
    pub solution_cap: u32,
}

/// Terminal states of one solver dispatch. A dispatch is born idle,
/// enters its search on [`SolverBackend::solve`], and ends in exactly
/// one of these:
///
/// - [`Found`](SolveOutcome::Found): at least one feasible placement was
///   produced, possibly via early stop; the best one seen is returned.
/// - [`Infeasible`](SolveOutcome::Infeasible): proof that no placement
///   exists, independent of any early-stop bound.
/// - [`TimedOut`](SolveOutcome::TimedOut): neither a placement nor a
///   proof within the deadline.
#[derive(Clone, Debug)]
pub enum SolveOutcome {
    Found(OffsetMap),
    Infeasible,
    TimedOut,
}

/// Narrow seam between the scheduling logic and the concrete
/// combinatorial search, so the backend is swappable (and mockable in
/// tests) without touching the engine.
pub trait SolverBackend {
    fn solve(&self, model: &PackingModel, budget: &SolveBudget) -> SolveOutcome;
}

/// Assigns a scratchpad offset to every item of `problem`, or explains
/// why it cannot.
///
/// Blocking: returns only once the search finishes, proves infeasibility
/// or exhausts its wall-clock budget. Stateless across calls; the input
/// is read-only and the assignment is freshly allocated.
pub fn schedule(problem: &Problem) -> Result<Assignment, SchedulingFailure> {
    schedule_with(problem, &PackingSearch)
}

/// [`schedule`] with an explicit backend.
pub fn schedule_with(
    problem: &Problem,
    backend: &dyn SolverBackend,
) -> Result<Assignment, SchedulingFailure> {
    // A buffer bigger than the whole scratchpad makes the problem
    // statically infeasible. Catching it here keeps a cheap local defect
    // from masquerading as a genuine packing failure out of the solver.
    for it in &problem.items {
        if it.size > problem.capacity {
            return Err(SchedulingFailure::BufferTooLarge {
                id:       it.id,
                size:     it.size,
                capacity: problem.capacity,
            });
        }
    }

    let model = PackingModel::build(problem);
    let budget = SolveBudget {
        deadline:     Instant::now() + problem.timeout,
        workers:      if problem.parallel {
            rayon::current_num_threads().max(2)
        } else {
            1
        },
        solution_cap: problem.solution_cap,
    };
    log::debug!(
        "dispatching {} rectangles, capacity {}, peak load {}, {} worker(s)",
        model.rects.len(),
        model.capacity,
        model.peak_load,
        budget.workers,
    );

    match backend.solve(&model, &budget) {
        SolveOutcome::Found(offsets) => {
            debug_assert!(
                model.certify(&offsets),
                "solver returned an invalid placement"
            );
            Ok(Assignment::new(&problem.items, offsets, problem.capacity))
        }
        SolveOutcome::Infeasible => {
            log::warn!(
                "kernel is over-subscribed: peak load {} of {} bytes",
                model.peak_load,
                model.capacity,
            );
            Err(SchedulingFailure::Unsatisfiable {
                peak_load: model.peak_load,
                capacity:  problem.capacity,
            })
        }
        SolveOutcome::TimedOut => Err(SchedulingFailure::TimedOut {
            budget: problem.timeout,
        }),
    }
}
