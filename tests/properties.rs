//! Property-based checks of the allocator, VMA and paging invariants.

use std::collections::{HashMap, VecDeque};

use proptest::prelude::*;
use vm_engine::symbol::Binding;
use vm_engine::*;

#[derive(Debug, Clone)]
enum Op {
    Alloc { region_id: usize, size: usize },
    Free { region_id: usize },
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (0..8usize, 1..700usize).prop_map(|(region_id, size)| Op::Alloc { region_id, size }),
        2 => (0..8usize).prop_map(|region_id| Op::Free { region_id }),
    ]
}

fn engine(ram_frames: usize) -> MemoryEngine {
    let config = EngineConfig::new()
        .with_ram_frames(ram_frames)
        .with_swap_frames(1024);
    let engine = MemoryEngine::new(config).unwrap();
    engine.spawn(1).unwrap();
    engine
}

fn apply(engine: &MemoryEngine, op: &Op) {
    match *op {
        Op::Alloc { region_id, size } => {
            engine.allocate(1, size, region_id).unwrap();
        }
        Op::Free { region_id } => {
            // Freeing an unbound id is an expected failure
            let _ = engine.deallocate(1, region_id);
        }
    }
}

struct Snapshot {
    start: usize,
    frontier: usize,
    end: usize,
    free: FreeList,
    bound: Vec<(usize, Binding)>,
}

fn snapshot(engine: &MemoryEngine) -> Snapshot {
    engine
        .with_space(1, |space| {
            let vma = space.get_vma(DEFAULT_VMA).unwrap();
            Snapshot {
                start: vma.start,
                frontier: vma.frontier,
                end: vma.end,
                free: vma.free_list.clone(),
                bound: space.symbols().iter().collect(),
            }
        })
        .unwrap()
}

fn check_free_list(list: &FreeList) -> Result<(), TestCaseError> {
    let regions = list.regions();
    for pair in regions.windows(2) {
        prop_assert!(pair[0].hi <= pair[1].hi, "not sorted by hi: {:?}", regions);
    }
    for (i, a) in regions.iter().enumerate() {
        for b in &regions[i + 1..] {
            prop_assert!(!a.overlaps(b), "{} overlaps {}", a, b);
            let large = a.len() >= list.merge_threshold() || b.len() >= list.merge_threshold();
            prop_assert!(!(large && a.touches(b)), "{} and {} left unmerged", a, b);
        }
    }
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Free list stays sorted and merged after every operation
    #[test]
    fn free_list_stays_sorted_and_merged(ops in prop::collection::vec(op(), 1..60)) {
        let engine = engine(64);
        for op in &ops {
            apply(&engine, op);
            check_free_list(&snapshot(&engine).free)?;
        }
    }

    /// start <= frontier <= end, and the frontier never moves down
    #[test]
    fn frontier_is_bounded_and_monotonic(ops in prop::collection::vec(op(), 1..60)) {
        let engine = engine(64);
        let mut last_frontier = 0;
        for op in &ops {
            apply(&engine, op);
            let snap = snapshot(&engine);
            prop_assert!(snap.start <= snap.frontier && snap.frontier <= snap.end);
            prop_assert!(snap.frontier >= last_frontier);
            last_frontier = snap.frontier;
        }
    }

    /// Bound ranges never overlap each other or any free region
    #[test]
    fn bound_and_free_ranges_are_disjoint(ops in prop::collection::vec(op(), 1..60)) {
        let engine = engine(64);
        for op in &ops {
            apply(&engine, op);
        }

        let snap = snapshot(&engine);
        for (i, (_, a)) in snap.bound.iter().enumerate() {
            prop_assert!(snap.start <= a.region.lo && a.region.hi <= snap.end);
            for (_, b) in &snap.bound[i + 1..] {
                prop_assert!(!a.region.overlaps(&b.region));
            }
            for free in snap.free.regions() {
                prop_assert!(!a.region.overlaps(free), "{} bound and free", a.region);
            }
        }
    }

    /// Every fault evicts the page that has been resident longest
    #[test]
    fn fault_evicts_longest_resident(accesses in prop::collection::vec(0..12usize, 1..60)) {
        const K: usize = 4;
        let engine = engine(K);
        engine.allocate(1, 12 * PAGE_SIZE, 0).unwrap();

        let mut model: VecDeque<usize> = (0..K).collect();
        for page in accesses {
            engine.write(1, page as u8, 0, page * PAGE_SIZE).unwrap();
            if !model.contains(&page) {
                model.pop_front();
                model.push_back(page);
            }

            let queue = engine
                .with_space(1, |space| space.pager().resident().iter().collect::<Vec<_>>())
                .unwrap();
            prop_assert_eq!(queue, model.iter().copied().collect::<Vec<_>>());
        }
    }

    /// A written byte reads back unchanged, whatever faults happen in between
    #[test]
    fn write_then_read_round_trips(
        writes in prop::collection::vec((0..2048usize, any::<u8>()), 1..80)
    ) {
        let engine = engine(3);
        engine.allocate(1, 2048, 0).unwrap();

        let mut model = HashMap::new();
        for &(offset, value) in &writes {
            engine.write(1, value, 0, offset).unwrap();
            model.insert(offset, value);
        }
        for (&offset, &value) in &model {
            prop_assert_eq!(engine.read(1, 0, offset), Ok(value));
        }
    }
}
