use patchwork::{Interval, RangeSet};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

const SPACE: u64 = 256;

fn interval() -> impl Strategy<Value = Interval> {
    (0..SPACE, 0..24u64).prop_map(|(from, len)| Interval::new(from, (from + len).min(SPACE)))
}

/// Byte-per-byte model of what a sequence of inserts covers
fn bitmap(intervals: &[Interval]) -> Vec<bool> {
    let mut bits = vec![false; SPACE as usize];
    for iv in intervals {
        for b in iv.start()..iv.end() {
            bits[b as usize] = true;
        }
    }
    bits
}

#[test]
fn test_adjacent_chunks_merge_to_single_run() {
    let mut set = RangeSet::new();
    for (from, to) in [(0, 2), (2, 5), (8, 10), (10, 12), (5, 8)] {
        set.add(Interval::new(from, to));
    }
    assert_eq!(set.intervals(), &[Interval::new(0, 12)]);
}

#[test]
fn test_gap_blocks_containment() {
    let mut set = RangeSet::new();
    set.add(Interval::from(0..5));
    set.add(Interval::from(6..10));
    assert!(!set.contains(&Interval::new(0, 10)));
    assert_eq!(set.len(), 2);
}

proptest! {
    #[test]
    fn test_runs_stay_sorted_and_disjoint(inserts in prop::collection::vec(interval(), 0..64)) {
        let mut set = RangeSet::new();
        for iv in &inserts {
            set.add(*iv);

            let runs = set.intervals();
            for pair in runs.windows(2) {
                prop_assert!(pair[0].start() < pair[1].start());
                prop_assert!(!pair[0].intersects(&pair[1]), "{} touches {}", pair[0], pair[1]);
            }
            prop_assert!(runs.iter().all(|run| !run.is_empty()));
        }
    }

    #[test]
    fn test_every_insert_is_contained(inserts in prop::collection::vec(interval(), 1..64)) {
        let mut set = RangeSet::new();
        for iv in &inserts {
            set.add(*iv);
        }
        for iv in inserts.iter().filter(|iv| !iv.is_empty()) {
            prop_assert!(set.contains(iv), "{} missing from {}", iv, set);
        }
    }

    #[test]
    fn test_matches_bitmap_model(
        inserts in prop::collection::vec(interval(), 0..64),
        query in interval(),
    ) {
        let mut set = RangeSet::new();
        for iv in &inserts {
            set.add(*iv);
        }
        let bits = bitmap(&inserts);

        let covered = bits.iter().filter(|b| **b).count() as u64;
        prop_assert_eq!(set.covered_len(), covered);

        if !query.is_empty() {
            let all_set = (query.start()..query.end()).all(|b| bits[b as usize]);
            prop_assert_eq!(set.contains(&query), all_set);
        }
    }

    #[test]
    fn test_insert_order_does_not_matter(inserts in prop::collection::vec(interval(), 0..32)) {
        let mut forward = RangeSet::new();
        for iv in &inserts {
            forward.add(*iv);
        }
        let mut backward = RangeSet::new();
        for iv in inserts.iter().rev() {
            backward.add(*iv);
        }
        prop_assert_eq!(forward, backward);
    }
}
