use crate::core::config::Config;
use crate::storage::segment::SegmentMeta;

/// Policy for deciding when and how to merge segments
pub trait MergePolicy: Send + Sync {
    /// Check if segments should be merged
    fn should_merge(&self, segments: &[SegmentMeta]) -> bool;

    /// Select segments to merge
    fn select_segments_to_merge(&self, segments: &[SegmentMeta]) -> Vec<SegmentMeta>;
}

/// Tiered merge policy (similar to Lucene's TieredMergePolicy), sized by
/// document count
pub struct TieredMergePolicy {
    pub max_segments_per_tier: usize,
    pub max_merge_doc_count: u32,
    pub min_segments_to_merge: usize,
    pub max_segments_to_merge: usize,
}

impl Default for TieredMergePolicy {
    fn default() -> Self {
        TieredMergePolicy::from_config(&Config::default())
    }
}

impl TieredMergePolicy {
    pub fn from_config(config: &Config) -> Self {
        TieredMergePolicy {
            max_segments_per_tier: config.max_segments_per_tier,
            max_merge_doc_count: config.max_merge_doc_count,
            min_segments_to_merge: config.min_segments_to_merge,
            max_segments_to_merge: config.max_segments_to_merge,
        }
    }

    fn is_small(&self, segment: &SegmentMeta) -> bool {
        segment.doc_count <= self.max_merge_doc_count / 2
    }
}

impl MergePolicy for TieredMergePolicy {
    fn should_merge(&self, segments: &[SegmentMeta]) -> bool {
        // Trigger merge if we have too many segments
        if segments.len() > self.max_segments_per_tier {
            return true;
        }

        // Merge if we have many small segments
        let small_segments = segments.iter().filter(|s| self.is_small(s)).count();
        small_segments >= self.min_segments_to_merge
    }

    fn select_segments_to_merge(&self, segments: &[SegmentMeta]) -> Vec<SegmentMeta> {
        // Smallest first; equal sizes keep commit order
        let mut sorted_segments = segments.to_vec();
        sorted_segments.sort_by_key(|s| (s.doc_count, s.id));

        let mut selected = Vec::new();
        let mut current_docs: u64 = 0;

        for segment in sorted_segments {
            if !self.is_small(&segment) {
                continue;
            }

            // Check if adding this segment would exceed max size
            if current_docs + segment.doc_count as u64 > self.max_merge_doc_count as u64 {
                break;
            }

            current_docs += segment.doc_count as u64;
            selected.push(segment);

            // Don't merge too many segments at once
            if selected.len() >= self.max_segments_to_merge {
                break;
            }
        }

        // Only merge if we have enough segments
        if selected.len() < self.min_segments_to_merge {
            Vec::new()
        } else {
            selected
        }
    }
}
