//! Covered-range bookkeeping
//!
//! A [`RangeSet`] records which byte ranges of a resource have been written.
//! Runs are kept sorted by start offset and never touch each other: inserting
//! an interval that overlaps or merely touches existing runs folds all of them
//! into one.

use std::fmt;
use std::ops::Range;

/// Half-open byte range `[from, to)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Interval {
    from: u64,
    to: u64,
}

impl Interval {
    /// # Panics
    ///
    /// Panics if `from > to`.
    #[must_use]
    pub fn new(from: u64, to: u64) -> Self {
        assert!(from <= to, "interval start {from} is past its end {to}");
        Self { from, to }
    }

    #[must_use]
    pub fn start(&self) -> u64 {
        self.from
    }

    #[must_use]
    pub fn end(&self) -> u64 {
        self.to
    }

    #[must_use]
    pub fn len(&self) -> u64 {
        self.to - self.from
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.from == self.to
    }

    /// True if `other` lies entirely inside `self`
    #[must_use]
    pub fn contains(&self, other: &Interval) -> bool {
        self.from <= other.from && self.to >= other.to
    }

    /// True if the intervals overlap or share an endpoint
    #[must_use]
    pub fn intersects(&self, other: &Interval) -> bool {
        if self.from > other.from {
            other.to >= self.from
        } else {
            self.to >= other.from
        }
    }

    /// Smallest interval spanning both
    #[must_use]
    pub fn merge(&self, other: &Interval) -> Interval {
        Interval {
            from: self.from.min(other.from),
            to: self.to.max(other.to),
        }
    }
}

impl From<Range<u64>> for Interval {
    fn from(range: Range<u64>) -> Self {
        Self::new(range.start, range.end)
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.from, self.to)
    }
}

/// Ordered, merged, non-touching set of intervals
///
/// Invariants after every call to [`RangeSet::add`]:
/// - runs are sorted ascending by start offset
/// - no two runs intersect (adjacent runs are merged into one)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RangeSet {
    runs: Vec<Interval>,
}

impl RangeSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an interval, folding it into every run it intersects
    ///
    /// Empty intervals are ignored.
    pub fn add(&mut self, interval: Interval) {
        if interval.is_empty() {
            return;
        }

        // Runs before `start` end strictly before the new interval begins,
        // so neither they nor anything merged below can reach them.
        let start = self.runs.partition_point(|run| run.to < interval.from);

        let mut merged = interval;
        let mut end = start;
        while let Some(run) = self.runs.get(end) {
            if !run.intersects(&merged) {
                break;
            }
            merged = merged.merge(run);
            end += 1;
        }

        self.runs.splice(start..end, std::iter::once(merged));
    }

    /// True if a single run covers all of `interval`
    ///
    /// A query spanning a gap between two runs is not contained, however
    /// small the gap.
    #[must_use]
    pub fn contains(&self, interval: &Interval) -> bool {
        self.runs.iter().any(|run| run.contains(interval))
    }

    /// The runs, in ascending order
    #[must_use]
    pub fn intervals(&self) -> &[Interval] {
        &self.runs
    }

    /// Number of disjoint runs
    #[must_use]
    pub fn len(&self) -> usize {
        self.runs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    /// Total number of bytes covered by all runs
    #[must_use]
    pub fn covered_len(&self) -> u64 {
        self.runs.iter().map(Interval::len).sum()
    }
}

impl fmt::Display for RangeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (idx, run) in self.runs.iter().enumerate() {
            if idx > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{run}")?;
        }
        write!(f, "]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn iv(from: u64, to: u64) -> Interval {
        Interval::new(from, to)
    }

    #[test]
    fn test_interval_contains_and_intersects() {
        // (a, b, a contains b, a intersects b)
        let cases = [
            (iv(0, 5), iv(3, 10), false, true),
            (iv(2, 5), iv(5, 10), false, true),
            (iv(0, 5), iv(0, 5), true, true),
            (iv(0, 5), iv(1, 5), true, true),
            (iv(0, 5), iv(0, 4), true, true),
            (iv(0, 5), iv(6, 10), false, false),
            (iv(0, 50), iv(45, 52), false, true),
        ];

        for (idx, (a, b, contains, intersects)) in cases.iter().enumerate() {
            assert_eq!(a.contains(b), *contains, "case #{idx} contains");
            assert_eq!(a.intersects(b), *intersects, "case #{idx} intersects");
            assert_eq!(b.intersects(a), *intersects, "case #{idx} intersects, swapped");
        }
    }

    #[test]
    #[should_panic(expected = "past its end")]
    fn test_reversed_interval_panics() {
        let _ = Interval::new(5, 2);
    }

    #[test]
    fn test_cascading_merge_fills_gap() {
        let mut set = RangeSet::new();
        set.add(iv(0, 2));
        set.add(iv(2, 5));
        set.add(iv(8, 10));
        set.add(iv(10, 12));
        assert_eq!(set.intervals(), &[iv(0, 5), iv(8, 12)]);

        set.add(iv(5, 8));
        assert_eq!(set.intervals(), &[iv(0, 12)]);
    }

    #[test]
    fn test_merge_swallows_several_runs() {
        let mut set = RangeSet::new();
        for from in [1, 4, 7, 10] {
            set.add(iv(from, from + 1));
        }
        assert_eq!(set.len(), 4);

        set.add(iv(0, 12));
        assert_eq!(set.intervals(), &[iv(0, 12)]);
    }

    #[test]
    fn test_out_of_order_inserts() {
        let mut set = RangeSet::new();
        set.add(iv(20, 30));
        set.add(iv(0, 5));
        set.add(iv(10, 15));
        assert_eq!(set.intervals(), &[iv(0, 5), iv(10, 15), iv(20, 30)]);
        assert_eq!(set.covered_len(), 20);
        assert_eq!(set.to_string(), "[0-5, 10-15, 20-30]");
    }

    #[test]
    fn test_contains_requires_single_run() {
        let mut set = RangeSet::new();
        set.add(iv(0, 5));
        set.add(iv(6, 10));

        assert!(!set.contains(&iv(0, 10)));
        assert!(set.contains(&iv(0, 5)));
        assert!(set.contains(&iv(7, 9)));
        assert!(!set.contains(&iv(4, 7)));
    }

    #[test]
    fn test_mixed_sequence() {
        let mut set = RangeSet::new();
        for (from, to) in [
            (0, 2),
            (2, 5),
            (8, 10),
            (15, 25),
            (10, 12),
            (2, 4),
            (5, 8),
            (25, 26),
            (27, 28),
            (26, 27),
            (28, 29),
        ] {
            set.add(iv(from, to));
        }

        assert!(set.contains(&iv(0, 10)));
        assert!(set.contains(&iv(6, 12)));
        assert!(!set.contains(&iv(0, 25)));
        assert!(set.contains(&iv(15, 29)));
        assert_eq!(set.intervals(), &[iv(0, 12), iv(15, 29)]);
    }

    #[test]
    fn test_empty_interval_is_ignored() {
        let mut set = RangeSet::new();
        set.add(iv(3, 3));
        assert!(set.is_empty());
        assert!(!set.contains(&iv(3, 3)));
    }
}
