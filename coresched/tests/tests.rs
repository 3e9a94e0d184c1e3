use coresched::*;
use std::io::Cursor;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use coresched::utils::Itertools;

fn item(id: BufferId, start: Step, end: Step, size: Bytes) -> Item {
    Item {
        id,
        size,
        life: Lifetime::new(start, end),
    }
}

fn quick(items: Vec<Item>, capacity: Bytes) -> Problem {
    let mut p = Problem::new(items, capacity).unwrap();
    p.timeout = Duration::from_secs(5);

    p
}

/// Checks the two placement invariants: every buffer in range, every
/// interfering pair disjoint in address space.
fn assert_valid(problem: &Problem, assignment: &Assignment) {
    for it in &problem.items {
        let o = assignment.offset_of(it.id).expect("unplaced buffer");
        assert!(o + it.size <= problem.capacity, "buffer {} out of range", it.id);
    }
    for (a, b) in problem.items.iter().tuple_combinations() {
        if !a.life.overlaps(&b.life) || a.size == 0 || b.size == 0 {
            continue;
        }
        let (oa, ob) = (
            assignment.offset_of(a.id).unwrap(),
            assignment.offset_of(b.id).unwrap(),
        );
        assert!(
            oa + a.size <= ob || ob + b.size <= oa,
            "buffers {} and {} interfere in space",
            a.id,
            b.id
        );
    }
}

#[test]
fn single_buffer_fills_the_scratchpad() {
    let p = quick(vec![item(0, 0, 5, 100)], 100);
    let a = schedule(&p).unwrap();
    assert_eq!(a.offset_of(0), Some(0));
    assert_eq!(a.peak_address(), 100);
}

#[test]
fn overlapping_pair_oversubscribes() {
    let p = quick(vec![item(0, 0, 3, 60), item(1, 0, 3, 60)], 100);
    match schedule(&p) {
        Err(SchedulingFailure::Unsatisfiable {
            peak_load,
            capacity,
        }) => {
            assert_eq!(peak_load, 120);
            assert_eq!(capacity, 100);
        }
        other => panic!("expected a certified failure, got {other:?}"),
    }
}

#[test]
fn disjoint_pair_shares_addresses() {
    let p = quick(vec![item(0, 0, 2, 60), item(1, 2, 4, 60)], 60);
    let a = schedule(&p).unwrap();
    // The whole point of scheduling over bump-allocating.
    assert_eq!(a.offset_of(0), Some(0));
    assert_eq!(a.offset_of(1), Some(0));
}

#[test]
fn freed_space_is_reused() {
    let p = quick(
        vec![item(0, 0, 4, 40), item(1, 1, 3, 40), item(2, 3, 5, 40)],
        80,
    );
    let a = schedule(&p).unwrap();
    assert_valid(&p, &a);
    assert!(a.peak_address() <= 80);
}

#[test]
fn oversized_buffer_fails_before_any_search() {
    let backend = CountingBackend::default();
    let p = quick(vec![item(0, 0, 5, 200)], 100);
    match schedule_with(&p, &backend) {
        Err(SchedulingFailure::BufferTooLarge { id, size, capacity }) => {
            assert_eq!((id, size, capacity), (0, 200, 100));
        }
        other => panic!("expected BufferTooLarge, got {other:?}"),
    }
    assert_eq!(backend.calls.load(Ordering::SeqCst), 0);

    // Control: a well-formed problem does reach the backend.
    let p = quick(vec![item(0, 0, 5, 50)], 100);
    schedule_with(&p, &backend).unwrap();
    assert_eq!(backend.calls.load(Ordering::SeqCst), 1);
}

#[derive(Default)]
struct CountingBackend {
    calls: AtomicU32,
}

impl SolverBackend for CountingBackend {
    fn solve(&self, model: &PackingModel, budget: &SolveBudget) -> SolveOutcome {
        self.calls.fetch_add(1, Ordering::SeqCst);

        PackingSearch.solve(model, budget)
    }
}

#[test]
fn zero_width_lifetime_interferes_with_nothing() {
    let p = quick(vec![item(0, 2, 2, 100), item(1, 0, 5, 100)], 100);
    let a = schedule(&p).unwrap();
    // Single-instant values occupy no time, so both fill the scratchpad.
    assert_eq!(a.offset_of(0), Some(0));
    assert_eq!(a.offset_of(1), Some(0));
}

#[test]
fn zero_budget_times_out() {
    // Thirteen rectangles push the problem past the exhaustive search
    // and into the portfolio, which respects the deadline up front.
    let items = (0..13).map(|i| item(i, 0, 2, 1)).collect();
    let mut p = quick(items, 100);
    p.timeout = Duration::ZERO;
    match schedule(&p) {
        Err(SchedulingFailure::TimedOut { .. }) => {}
        other => panic!("expected TimedOut, got {other:?}"),
    }
}

#[test]
fn portfolio_packs_wide_kernels() {
    // 24 buffers in three disjoint waves of eight; each wave fills the
    // scratchpad exactly.
    let mut items = vec![];
    for wave in 0..3u32 {
        for slot in 0..8u32 {
            let start = (wave * 2) as Step;
            items.push(item(wave * 8 + slot, start, start + 2, 16));
        }
    }
    let mut p = quick(items, 128);
    let a = schedule(&p).unwrap();
    assert_valid(&p, &a);
    assert_eq!(a.peak_address(), 128);

    p.parallel = true;
    let a = schedule(&p).unwrap();
    assert_valid(&p, &a);
}

#[test]
fn liveness_follows_defs_and_last_reads() {
    let mut arena = BufferArena::new();
    let a = arena.add("a", 64, StorageClass::Scratch);
    let b = arena.add("b", 32, StorageClass::Scratch);
    let c = arena.add("c", 16, StorageClass::Scratch);
    let w = arena.add("weights", 128, StorageClass::Pinned);

    let ops = vec![
        Operation {
            defines: vec![a],
            reads:   vec![w],
        },
        Operation {
            defines: vec![b],
            reads:   vec![a],
        },
        Operation {
            defines: vec![c],
            reads:   vec![a, b],
        },
        Operation {
            defines: vec![],
            reads:   vec![b],
        },
    ];

    let lifetimes = liveness(&ops, &arena);
    assert_eq!(lifetimes[&a], Lifetime::new(0, 2));
    assert_eq!(lifetimes[&b], Lifetime::new(1, 3));
    // Never read: minimal window past its definition.
    assert_eq!(lifetimes[&c], Lifetime::new(2, 3));
    // Pinned buffers never enter the problem.
    assert!(!lifetimes.contains_key(&w));
}

#[test]
#[should_panic(expected = "read before being defined")]
fn reading_an_undefined_buffer_is_a_defect() {
    let mut arena = BufferArena::new();
    let ghost = arena.add("ghost", 8, StorageClass::Scratch);
    let ops = vec![Operation {
        defines: vec![],
        reads:   vec![ghost],
    }];
    liveness(&ops, &arena);
}

#[test]
#[should_panic(expected = "defined twice")]
fn redefining_a_buffer_is_a_defect() {
    let mut arena = BufferArena::new();
    let x = arena.add("x", 8, StorageClass::Scratch);
    let ops = vec![
        Operation {
            defines: vec![x],
            reads:   vec![],
        },
        Operation {
            defines: vec![x],
            reads:   vec![],
        },
    ];
    liveness(&ops, &arena);
}

#[test]
fn full_pipeline_from_ops_to_applied_offsets() {
    let mut arena = BufferArena::new();
    let input = arena.add("input", 256, StorageClass::Pinned);
    let act0 = arena.add("act0", 48, StorageClass::Scratch);
    let act1 = arena.add("act1", 48, StorageClass::Scratch);
    let out = arena.add("out", 48, StorageClass::Scratch);

    // act0 = f(input); act1 = g(act0); out = h(act1); sink(out)
    let ops = vec![
        Operation {
            defines: vec![act0],
            reads:   vec![input],
        },
        Operation {
            defines: vec![act1],
            reads:   vec![act0],
        },
        Operation {
            defines: vec![out],
            reads:   vec![act1],
        },
        Operation {
            defines: vec![],
            reads:   vec![out],
        },
    ];

    let lifetimes = liveness(&ops, &arena);
    // Each value dies the step its consumer is born, so the chain hands
    // off cleanly and one 48-byte slot suffices.
    let mut problem = Problem::from_liveness(&arena, &lifetimes, 48).unwrap();
    problem.timeout = Duration::from_secs(5);
    let assignment = schedule(&problem).unwrap();
    assert_valid(&problem, &assignment);

    arena.apply(&assignment);
    assert!(arena.get(act0).assigned_offset().is_some());
    assert!(arena.get(input).assigned_offset().is_none());
}

#[test]
fn offsets_fold_back_into_the_arena() {
    let mut arena = BufferArena::new();
    let a = arena.add("a", 60, StorageClass::Scratch);
    let b = arena.add("b", 60, StorageClass::Scratch);
    let p = quick(vec![item(a, 0, 2, 60), item(b, 2, 4, 60)], 60);
    let assignment = schedule(&p).unwrap();

    arena.apply(&assignment);
    assert_eq!(arena.get(a).assigned_offset(), Some(0));
    assert_eq!(arena.get(b).assigned_offset(), Some(0));
}

#[test]
#[should_panic(expected = "assigned twice")]
fn reapplying_an_assignment_is_a_defect() {
    let mut arena = BufferArena::new();
    let a = arena.add("a", 10, StorageClass::Scratch);
    let p = quick(vec![item(a, 0, 2, 10)], 64);
    let assignment = schedule(&p).unwrap();
    arena.apply(&assignment);
    arena.apply(&assignment);
}

#[test]
fn timeline_lists_every_scheduled_buffer() {
    let mut arena = BufferArena::new();
    let a = arena.add_tensor("act0", 64, StorageClass::Scratch, vec![8, 8], vec![8, 1]);
    let b = arena.add("act1", 32, StorageClass::Scratch);
    let p = quick(vec![item(a, 0, 2, 64), item(b, 1, 3, 32)], 128);
    let assignment = schedule(&p).unwrap();

    let dump = assignment.render_timeline(&arena);
    let mut lines = dump.lines();
    assert_eq!(lines.next(), Some("name,start,end,offset,size,shape,stride"));
    let body: Vec<&str> = lines.collect();
    assert_eq!(body.len(), 2);
    let act0 = body.iter().find(|l| l.starts_with("act0,")).unwrap();
    assert!(act0.contains("8x8"));
    assert!(act0.ends_with("8x1"));
}

#[test]
fn csv_rows_parse_and_feed_a_problem() {
    let csv = "id,start,end,size\nb0,0,2,60\nb1,2,4,60\n";
    let rows = io::parse_csv(Cursor::new(csv)).unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].name, "b0");
    assert_eq!(rows[1].size, 60);

    let mut arena = BufferArena::new();
    let items = io::rows_to_items(rows, &mut arena);
    let p = quick(items, 60);
    let a = schedule(&p).unwrap();
    assert_eq!(a.len(), 2);
}

#[test]
fn malformed_csv_is_rejected() {
    assert!(io::parse_csv(Cursor::new("id,start,end,size\nb0,0,2\n")).is_err());
    assert!(io::parse_csv(Cursor::new("id,start,end,size\nb0,zero,2,4\n")).is_err());
}

#[test]
fn gatekeeper_rejects_malformed_items() {
    let backwards = Item {
        id:   0,
        size: 8,
        life: Lifetime { start: 3, end: 1 },
    };
    let err = Problem::new(vec![backwards], 64).unwrap_err();
    assert!(err.message.contains("backwards"));

    let err = Problem::new(vec![item(7, 0, 2, 8), item(7, 4, 6, 8)], 64).unwrap_err();
    assert!(err.message.contains("same handle"));
}

#[test]
fn capacity_subdivision_is_a_policy_choice() {
    let cap = CapacityModel::new(1024, 4);
    assert_eq!(cap.per_worker_bytes(), 256);
    assert_eq!(cap.usable_bytes(true), 256);
    assert_eq!(cap.usable_bytes(false), 1024);
}
