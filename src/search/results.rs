use std::collections::BinaryHeap;
use std::cmp::Ordering;
use serde::{Serialize, Deserialize};

/// One ranked row of a BM25 search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowIdWithScore {
    pub row_id: u64,
    pub score: f32,
    pub seg_id: u32,
    pub doc_id: u32,
    pub docs: Vec<String>,  // Matched terms, filled when requested
}

impl RowIdWithScore {
    /// Result order: higher score first, then lower row id
    pub fn rank_cmp(&self, other: &Self) -> Ordering {
        other.score
            .total_cmp(&self.score)
            .then_with(|| self.row_id.cmp(&other.row_id))
    }
}

// Heap entry ordered by rank, so the max-heap top is the worst kept hit
struct Ranked(RowIdWithScore);

impl PartialEq for Ranked {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Ranked {}

impl PartialOrd for Ranked {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Ranked {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.rank_cmp(&other.0)
    }
}

/// Top-K collector for efficient result collection
pub struct TopKCollector {
    heap: BinaryHeap<Ranked>,
    pub k: usize,
    pub total_collected: usize,  // Track total documents processed
}

impl TopKCollector {
    pub fn new(k: usize) -> Self {
        TopKCollector {
            heap: BinaryHeap::with_capacity(k.saturating_add(1).min(1024)),
            k,
            total_collected: 0,
        }
    }

    pub fn collect(&mut self, hit: RowIdWithScore) {
        self.total_collected += 1;
        if self.k == 0 {
            return;
        }

        if self.heap.len() < self.k {
            self.heap.push(Ranked(hit));
            return;
        }

        let hit = Ranked(hit);
        if let Some(worst) = self.heap.peek() {
            if hit < *worst {
                self.heap.pop();
                self.heap.push(hit);
            }
        }
    }

    /// Fold in another collector, e.g. one filled by a different segment
    pub fn merge(&mut self, other: TopKCollector) {
        self.total_collected += other.total_collected;
        for Ranked(hit) in other.heap {
            self.collect(hit);
            self.total_collected -= 1;
        }
    }

    pub fn into_sorted_vec(self) -> Vec<RowIdWithScore> {
        self.heap
            .into_sorted_vec()
            .into_iter()
            .map(|Ranked(hit)| hit)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(row_id: u64, score: f32) -> RowIdWithScore {
        RowIdWithScore { row_id, score, seg_id: 0, doc_id: 0, docs: Vec::new() }
    }

    fn rows(hits: &[RowIdWithScore]) -> Vec<u64> {
        hits.iter().map(|h| h.row_id).collect()
    }

    #[test]
    fn test_keeps_best_k() {
        let mut collector = TopKCollector::new(2);
        for (row, score) in [(1, 0.5), (2, 2.0), (3, 1.0), (4, 0.1)] {
            collector.collect(hit(row, score));
        }
        assert_eq!(collector.total_collected, 4);
        assert_eq!(rows(&collector.into_sorted_vec()), vec![2, 3]);
    }

    #[test]
    fn test_ties_break_on_row_id() {
        let mut collector = TopKCollector::new(2);
        for row in [9, 4, 7] {
            collector.collect(hit(row, 1.0));
        }
        assert_eq!(rows(&collector.into_sorted_vec()), vec![4, 7]);
    }

    #[test]
    fn test_zero_k_collects_nothing() {
        let mut collector = TopKCollector::new(0);
        collector.collect(hit(1, 1.0));
        assert!(collector.into_sorted_vec().is_empty());
    }

    #[test]
    fn test_merge() {
        let mut a = TopKCollector::new(3);
        let mut b = TopKCollector::new(3);
        a.collect(hit(1, 1.0));
        a.collect(hit(2, 3.0));
        b.collect(hit(3, 2.0));
        b.collect(hit(4, 0.5));
        a.merge(b);
        assert_eq!(a.total_collected, 4);
        assert_eq!(rows(&a.into_sorted_vec()), vec![2, 3, 1]);
    }
}
