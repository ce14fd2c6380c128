//! Interval marking over a byte range
//!
//! [`IntervalSet`] stamps values onto sub-ranges of `[0, len)` and reports
//! the maximal runs that hold a given value. Segments split lazily at their
//! midpoint when a stamp covers only part of them and collapse back into one
//! when both halves end up holding the same value, so a file with thousands
//! of marked identifiers still compacts into a handful of excerpts.

/// Value stamped onto the span the caller already has.
pub const EXCLUDED: u8 = 0;
/// Value stamped onto definitions that belong in the result.
pub const INCLUDED: u8 = 1;

#[derive(Debug, Clone)]
struct Segment<V> {
    lo: usize,
    hi: usize,
    /// Set only on leaves; internal segments always hold `None`.
    value: Option<V>,
    children: Option<Box<[Segment<V>; 2]>>,
}

impl<V: Copy + Eq> Segment<V> {
    fn leaf(lo: usize, hi: usize, value: Option<V>) -> Self {
        Self {
            lo,
            hi,
            value,
            children: None,
        }
    }

    fn mid(&self) -> usize {
        (self.lo + self.hi) / 2
    }

    fn update(&mut self, l: usize, r: usize, value: V) {
        if l == self.lo && r == self.hi {
            self.value = Some(value);
            self.children = None;
            return;
        }

        let mid = self.mid();
        if self.children.is_none() {
            let inherited = self.value.take();
            self.children = Some(Box::new([
                Segment::leaf(self.lo, mid, inherited),
                Segment::leaf(mid, self.hi, inherited),
            ]));
        }

        if let Some(children) = self.children.as_mut() {
            let [left, right] = &mut **children;
            if r <= mid {
                left.update(l, r, value);
            } else if l >= mid {
                right.update(l, r, value);
            } else {
                left.update(l, mid, value);
                right.update(mid, r, value);
            }
        }

        self.pull_up();
    }

    /// Collapse the children when both are leaves holding the same value.
    fn pull_up(&mut self) {
        let merged = match self.children.as_deref() {
            Some([left, right]) if left.children.is_none() && right.children.is_none() => {
                match (left.value, right.value) {
                    (Some(a), Some(b)) if a == b => Some(a),
                    _ => None,
                }
            }
            _ => None,
        };

        if let Some(value) = merged {
            self.value = Some(value);
            self.children = None;
        } else {
            self.value = None;
        }
    }

    fn collect(&self, l: usize, r: usize, value: V, out: &mut Vec<(usize, usize)>) {
        if l >= r {
            return;
        }
        match self.children.as_deref() {
            None => {
                if self.value == Some(value) {
                    push_run(out, (l.max(self.lo), r.min(self.hi)));
                }
            }
            Some([left, right]) => {
                let mid = self.mid();
                if l < mid {
                    left.collect(l, r.min(mid), value, out);
                }
                if r > mid {
                    right.collect(l.max(mid), r, value, out);
                }
            }
        }
    }

    #[cfg(test)]
    fn value_at(&self, offset: usize) -> Option<V> {
        match self.children.as_deref() {
            None => self.value,
            Some([left, right]) => {
                if offset < self.mid() {
                    left.value_at(offset)
                } else {
                    right.value_at(offset)
                }
            }
        }
    }

    #[cfg(test)]
    fn segment_count(&self) -> usize {
        match self.children.as_deref() {
            None => 1,
            Some([left, right]) => 1 + left.segment_count() + right.segment_count(),
        }
    }
}

/// Append a run, joining it to the previous one when they touch.
fn push_run(out: &mut Vec<(usize, usize)>, run: (usize, usize)) {
    if run.0 >= run.1 {
        return;
    }
    match out.last_mut() {
        Some(last) if last.1 == run.0 => last.1 = run.1,
        _ => out.push(run),
    }
}

/// Binary-split interval structure over `[0, len)`.
#[derive(Debug, Clone)]
pub struct IntervalSet<V = u8> {
    root: Segment<V>,
}

impl<V: Copy + Eq> IntervalSet<V> {
    /// Create a set covering `[0, len)` with every offset unset.
    pub fn new(len: usize) -> Self {
        Self {
            root: Segment::leaf(0, len, None),
        }
    }

    pub fn len(&self) -> usize {
        self.root.hi
    }

    pub fn is_empty(&self) -> bool {
        self.root.hi == 0
    }

    /// Stamp `value` onto `[l, r)`. The span is clipped to the set; empty spans are ignored.
    pub fn update(&mut self, l: usize, r: usize, value: V) {
        let r = r.min(self.root.hi);
        if l >= r {
            return;
        }
        self.root.update(l, r, value);
    }

    /// Maximal runs inside `[l, r)` currently stamped `value`, in ascending order.
    pub fn ranges(&self, l: usize, r: usize, value: V) -> Vec<(usize, usize)> {
        let mut out = Vec::new();
        self.root.collect(l, r.min(self.root.hi), value, &mut out);
        out
    }

    /// Value stamped at a single offset, if any.
    #[cfg(test)]
    pub fn value_at(&self, offset: usize) -> Option<V> {
        if offset >= self.root.hi {
            return None;
        }
        self.root.value_at(offset)
    }

    /// Number of live segments, a measure of how fragmented the set is.
    #[cfg(test)]
    pub fn segment_count(&self) -> usize {
        self.root.segment_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_then_query_whole_span() {
        let mut set = IntervalSet::new(10);
        set.update(0, 10, INCLUDED);
        assert_eq!(set.ranges(0, 10, INCLUDED), vec![(0, 10)]);
    }

    #[test]
    fn test_split_and_exclude() {
        let mut set = IntervalSet::new(10);
        set.update(0, 10, INCLUDED);
        set.update(3, 6, EXCLUDED);
        assert_eq!(set.ranges(0, 10, INCLUDED), vec![(0, 3), (6, 10)]);
        assert_eq!(set.ranges(0, 10, EXCLUDED), vec![(3, 6)]);
    }

    #[test]
    fn test_adjacent_runs_merge() {
        let mut set = IntervalSet::new(10);
        set.update(0, 5, INCLUDED);
        set.update(5, 10, INCLUDED);
        assert_eq!(set.ranges(0, 10, INCLUDED), vec![(0, 10)]);
        assert_eq!(set.segment_count(), 1);
    }

    #[test]
    fn test_unaligned_adjacent_runs_merge() {
        let mut set = IntervalSet::new(100);
        set.update(7, 23, INCLUDED);
        set.update(23, 61, INCLUDED);
        set.update(80, 81, INCLUDED);
        assert_eq!(set.ranges(0, 100, INCLUDED), vec![(7, 61), (80, 81)]);
    }

    #[test]
    fn test_overlapping_updates() {
        let mut set = IntervalSet::new(50);
        set.update(10, 30, INCLUDED);
        set.update(20, 40, INCLUDED);
        assert_eq!(set.ranges(0, 50, INCLUDED), vec![(10, 40)]);
    }

    #[test]
    fn test_stamp_overrides_previous_value() {
        let mut set = IntervalSet::new(16);
        set.update(0, 16, EXCLUDED);
        set.update(4, 8, INCLUDED);
        set.update(0, 16, INCLUDED);
        assert_eq!(set.ranges(0, 16, INCLUDED), vec![(0, 16)]);
        assert!(set.ranges(0, 16, EXCLUDED).is_empty());
    }

    #[test]
    fn test_query_window_clips_runs() {
        let mut set = IntervalSet::new(20);
        set.update(2, 18, INCLUDED);
        assert_eq!(set.ranges(5, 10, INCLUDED), vec![(5, 10)]);
        assert!(set.ranges(18, 20, INCLUDED).is_empty());
    }

    #[test]
    fn test_unset_and_out_of_range() {
        let mut set: IntervalSet = IntervalSet::new(8);
        assert!(set.ranges(0, 8, INCLUDED).is_empty());
        assert_eq!(set.value_at(3), None);

        set.update(6, 100, INCLUDED);
        set.update(5, 5, EXCLUDED);
        assert_eq!(set.ranges(0, 100, INCLUDED), vec![(6, 8)]);
        assert_eq!(set.value_at(7), Some(INCLUDED));
        assert_eq!(set.value_at(8), None);
    }

    #[test]
    fn test_empty_set() {
        let mut set: IntervalSet = IntervalSet::new(0);
        set.update(0, 10, INCLUDED);
        assert!(set.is_empty());
        assert!(set.ranges(0, 10, INCLUDED).is_empty());
    }

    #[test]
    fn test_single_byte_marks() {
        let mut set = IntervalSet::new(9);
        for offset in [1, 2, 3, 6] {
            set.update(offset, offset + 1, INCLUDED);
        }
        assert_eq!(set.ranges(0, 9, INCLUDED), vec![(1, 4), (6, 7)]);
    }
}
