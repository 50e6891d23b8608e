use chess::ChessMove;

use crate::types::{pack_move, unpack_move};

/// How a stored score relates to the true value of its position.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Bound {
    /// Exact minimax value within the stored depth.
    Exact,
    /// True value is at least the stored score (a beta cutoff produced it).
    LowerBound,
    /// True value is at most the stored score (alpha was never raised).
    UpperBound,
}

#[derive(Clone, Copy, Debug)]
pub struct Entry {
    pub key: u64,
    /// Remaining depth at the time the entry was computed.
    pub depth: u32,
    pub score: f64,
    pub bound: Bound,
    /// Half-move clock at store time; replacement heuristic only.
    pub age: u32,
    best: u16,
}

impl Entry {
    pub fn best_move(&self) -> Option<ChessMove> {
        unpack_move(self.best)
    }
}

const ASSOC: usize = 4;
const DEFAULT_MEMO_MB: usize = 128;

/// Fingerprint-keyed score memo. Fixed capacity, 4-way set-associative;
/// storing over a full bucket evicts the shallowest entry (oldest on depth
/// ties), so deep results survive shallow churn.
pub struct Memo {
    buckets: Vec<[Option<Entry>; ASSOC]>,
    mask: usize,
}

impl Default for Memo {
    fn default() -> Self {
        Self::new()
    }
}

impl Memo {
    pub fn new() -> Self {
        Self::with_capacity_mb(DEFAULT_MEMO_MB)
    }

    pub fn with_capacity_mb(mb: usize) -> Self {
        let entry_sz = std::mem::size_of::<Option<Entry>>().max(1);
        let bytes = mb.saturating_mul(1024 * 1024);
        let total_entries = (bytes / entry_sz).max(ASSOC);
        let mut buckets = (total_entries / ASSOC).max(1);

        // round down to a power of two
        let mut pow2 = 1usize;
        while (pow2 << 1) <= buckets {
            pow2 <<= 1;
        }
        buckets = pow2;

        Self { buckets: vec![[None; ASSOC]; buckets], mask: buckets - 1 }
    }

    #[inline]
    fn idx(&self, key: u64) -> usize {
        (key as usize) & self.mask
    }

    /// Deepest entry stored under `key`, if any.
    pub fn lookup(&self, key: u64) -> Option<Entry> {
        let bucket = &self.buckets[self.idx(key)];
        let mut found: Option<Entry> = None;
        for e in bucket.iter().flatten() {
            if e.key == key && found.map_or(true, |f| e.depth > f.depth) {
                found = Some(*e);
            }
        }
        found
    }

    pub fn store(
        &mut self,
        key: u64,
        best: Option<ChessMove>,
        depth: u32,
        score: f64,
        bound: Bound,
        age: u32,
    ) {
        assert!(!score.is_nan(), "memo corruption: NaN score for key {key:#x}");
        let i = self.idx(key);
        let bucket = &mut self.buckets[i];
        let entry = Entry {
            key,
            depth,
            score,
            bound,
            age,
            best: best.map(pack_move).unwrap_or(0),
        };

        // Same key: overwrite in place.
        for slot in bucket.iter_mut() {
            if matches!(slot, Some(e) if e.key == key) {
                *slot = Some(entry);
                return;
            }
        }
        for slot in bucket.iter_mut() {
            if slot.is_none() {
                *slot = Some(entry);
                return;
            }
        }

        // Evict the shallowest slot, oldest on ties.
        let mut replace_at = 0usize;
        for j in 1..ASSOC {
            if let (Some(e), Some(r)) = (&bucket[j], &bucket[replace_at]) {
                if e.depth < r.depth || (e.depth == r.depth && e.age < r.age) {
                    replace_at = j;
                }
            }
        }
        bucket[replace_at] = Some(entry);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chess::Square;
    use std::str::FromStr;

    fn some_move() -> ChessMove {
        ChessMove::new(
            Square::from_str("e2").unwrap(),
            Square::from_str("e4").unwrap(),
            None,
        )
    }

    #[test]
    fn lookup_returns_what_was_stored() {
        let mut memo = Memo::with_capacity_mb(1);
        assert!(memo.lookup(42).is_none());
        memo.store(42, Some(some_move()), 3, 1.5, Bound::Exact, 7);
        let e = memo.lookup(42).unwrap();
        assert_eq!(e.depth, 3);
        assert_eq!(e.score, 1.5);
        assert_eq!(e.bound, Bound::Exact);
        assert_eq!(e.age, 7);
        assert_eq!(e.best_move(), Some(some_move()));
    }

    #[test]
    fn same_key_overwrites_in_place() {
        let mut memo = Memo::with_capacity_mb(1);
        memo.store(42, None, 2, -0.5, Bound::UpperBound, 0);
        memo.store(42, Some(some_move()), 5, 3.0, Bound::LowerBound, 1);
        let e = memo.lookup(42).unwrap();
        assert_eq!(e.depth, 5);
        assert_eq!(e.bound, Bound::LowerBound);
        assert_eq!(e.best_move(), Some(some_move()));
    }

    #[test]
    fn full_bucket_evicts_the_shallowest() {
        let mut memo = Memo::with_capacity_mb(1);
        // Same low bits, distinct high bits: all five land in one bucket.
        let key = |i: u64| 0x5u64 | (i << 33);
        memo.store(key(1), None, 3, 0.0, Bound::Exact, 0);
        memo.store(key(2), None, 1, 0.0, Bound::Exact, 0);
        memo.store(key(3), None, 4, 0.0, Bound::Exact, 0);
        memo.store(key(4), None, 2, 0.0, Bound::Exact, 0);
        memo.store(key(5), None, 5, 0.0, Bound::Exact, 0);
        assert!(memo.lookup(key(2)).is_none(), "shallowest entry evicted");
        for k in [key(1), key(3), key(4), key(5)] {
            assert!(memo.lookup(k).is_some());
        }
    }

    #[test]
    fn entry_without_a_move_reports_none() {
        let mut memo = Memo::with_capacity_mb(1);
        memo.store(9, None, 1, 0.0, Bound::Exact, 0);
        assert_eq!(memo.lookup(9).unwrap().best_move(), None);
    }
}
