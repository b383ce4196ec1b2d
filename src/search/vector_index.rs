use std::cmp::Ordering;
use std::collections::BinaryHeap;

use rayon::prelude::*;

use crate::error::AdvisorError;

/// In-memory index over the vocabulary vectors, immutable after build.
///
/// Vectors are unit-normalized into one flat matrix; queries run an exact
/// top-k scan under the angular metric. A changed vocabulary requires a
/// rebuild (new session), never an in-place mutation.
pub struct VectorIndex {
    dimension: usize,
    matrix: Vec<f32>,
    len: usize,
}

/// One query hit: the slot assigned at build time plus its angular
/// distance to the query (smaller is closer).
#[derive(Debug, Clone, PartialEq)]
pub struct Neighbor {
    pub slot: usize,
    pub distance: f32,
}

#[derive(PartialEq)]
struct ScoredSlot {
    score: f32,
    slot: usize,
}

impl Eq for ScoredSlot {}

impl PartialOrd for ScoredSlot {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ScoredSlot {
    // The heap must pop its worst entry first: lowest score, then highest
    // slot on equal scores, with NaN ranked below every real score.
    fn cmp(&self, other: &Self) -> Ordering {
        match other.score.partial_cmp(&self.score) {
            Some(Ordering::Equal) => self.slot.cmp(&other.slot),
            Some(ord) => ord,
            None => {
                if self.score.is_nan() && !other.score.is_nan() {
                    Ordering::Greater
                } else if !self.score.is_nan() && other.score.is_nan() {
                    Ordering::Less
                } else {
                    self.slot.cmp(&other.slot)
                }
            }
        }
    }
}

impl VectorIndex {
    /// Builds the index from one vector per vocabulary entry, in order.
    /// Slot `i` of the index corresponds to entry `i` of the input.
    pub fn build(vectors: &[Vec<f32>]) -> Result<Self, AdvisorError> {
        let first = vectors.first().ok_or(AdvisorError::EmptyVocabulary)?;
        let dimension = first.len();

        let mut matrix = Vec::with_capacity(vectors.len() * dimension);
        for vector in vectors {
            if vector.len() != dimension {
                return Err(AdvisorError::DimensionMismatch {
                    expected: dimension,
                    found: vector.len(),
                });
            }
            matrix.extend_from_slice(&normalize(vector));
        }

        Ok(Self {
            dimension,
            matrix,
            len: vectors.len(),
        })
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Exact k-nearest-neighbour query. Returns at most `min(k, len)`
    /// neighbors, ascending angular distance, ties broken by ascending
    /// slot so results are stable across runs.
    pub fn nearest(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>, AdvisorError> {
        if query.len() != self.dimension {
            return Err(AdvisorError::DimensionMismatch {
                expected: self.dimension,
                found: query.len(),
            });
        }
        if k == 0 {
            return Ok(Vec::new());
        }

        let query_norm = normalize(query);
        let scores: Vec<f32> = self
            .matrix
            .par_chunks_exact(self.dimension)
            .map(|row| dot_product(row, &query_norm))
            .collect();

        let mut heap = BinaryHeap::with_capacity(k + 1);
        for (slot, &score) in scores.iter().enumerate() {
            heap.push(ScoredSlot { score, slot });
            if heap.len() > k {
                heap.pop();
            }
        }

        // Ascending by Ord = best (highest cosine, lowest slot) first.
        Ok(heap
            .into_sorted_vec()
            .into_iter()
            .map(|s| Neighbor {
                slot: s.slot,
                distance: angular_distance(s.score),
            })
            .collect())
    }
}

#[inline]
fn dot_product(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

/// Angular distance between unit vectors with the given cosine, as used
/// by angular-metric indexes: sqrt(2 - 2*cos), in [0, 2].
#[inline]
fn angular_distance(cosine: f32) -> f32 {
    (2.0 - 2.0 * cosine).max(0.0).sqrt()
}

/// Normalize a vector to unit length. A zero vector stays zero rather
/// than dividing by zero; its cosine against anything is then 0.
fn normalize(vector: &[f32]) -> Vec<f32> {
    let norm_sq: f32 = vector.iter().map(|&x| x * x).sum();
    if norm_sq == 0.0 {
        return vec![0.0; vector.len()];
    }
    let inv_norm = 1.0 / norm_sq.sqrt();
    vector.iter().map(|&x| x * inv_norm).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    fn generate_vectors(count: usize, dim: usize) -> Vec<Vec<f32>> {
        let mut rng = rand::thread_rng();
        (0..count)
            .map(|_| (0..dim).map(|_| rng.gen::<f32>() - 0.5).collect())
            .collect()
    }

    #[test]
    fn test_build_empty_fails() {
        let result = VectorIndex::build(&[]);
        assert!(matches!(result, Err(AdvisorError::EmptyVocabulary)));
    }

    #[test]
    fn test_build_dimension_mismatch_fails() {
        let vectors = vec![vec![1.0, 0.0, 0.0], vec![0.0, 1.0]];
        let result = VectorIndex::build(&vectors);
        assert!(matches!(
            result,
            Err(AdvisorError::DimensionMismatch {
                expected: 3,
                found: 2
            })
        ));
    }

    #[test]
    fn test_query_dimension_mismatch_fails() {
        let index = VectorIndex::build(&[vec![1.0, 0.0]]).unwrap();
        let result = index.nearest(&[1.0, 0.0, 0.0], 1);
        assert!(matches!(
            result,
            Err(AdvisorError::DimensionMismatch {
                expected: 2,
                found: 3
            })
        ));
    }

    #[test]
    fn test_nearest_returns_self_first() {
        let vectors = generate_vectors(100, 16);
        let index = VectorIndex::build(&vectors).unwrap();

        let results = index.nearest(&vectors[42], 5).unwrap();
        assert_eq!(results.len(), 5);
        assert_eq!(results[0].slot, 42);
        assert!(results[0].distance < 1e-3);

        // Distances come back ascending.
        for pair in results.windows(2) {
            assert!(pair[0].distance <= pair[1].distance);
        }
    }

    #[test]
    fn test_k_clamped_to_index_size() {
        let vectors = generate_vectors(3, 8);
        let index = VectorIndex::build(&vectors).unwrap();
        let results = index.nearest(&vectors[0], 10).unwrap();
        assert_eq!(results.len(), 3);
    }

    #[test]
    fn test_no_duplicate_slots() {
        let vectors = generate_vectors(20, 8);
        let index = VectorIndex::build(&vectors).unwrap();
        let results = index.nearest(&vectors[0], 20).unwrap();
        let mut slots: Vec<usize> = results.iter().map(|n| n.slot).collect();
        slots.sort_unstable();
        slots.dedup();
        assert_eq!(slots.len(), 20);
    }

    #[test]
    fn test_ties_broken_by_slot_order() {
        // Three identical vectors: all at distance 0 from the query, so
        // ranking must fall back to insertion order.
        let vectors = vec![
            vec![1.0, 0.0],
            vec![1.0, 0.0],
            vec![1.0, 0.0],
            vec![0.0, 1.0],
        ];
        let index = VectorIndex::build(&vectors).unwrap();
        let results = index.nearest(&[1.0, 0.0], 3).unwrap();
        let slots: Vec<usize> = results.iter().map(|n| n.slot).collect();
        assert_eq!(slots, vec![0, 1, 2]);
    }

    #[test]
    fn test_deterministic_across_runs() {
        let vectors = generate_vectors(50, 8);
        let index = VectorIndex::build(&vectors).unwrap();
        let query = &vectors[7];
        let first = index.nearest(query, 10).unwrap();
        let second = index.nearest(query, 10).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_angular_distance_ordering_matches_cosine() {
        // A query aligned with slot 0, orthogonal to slot 1, opposed to slot 2.
        let vectors = vec![vec![1.0, 0.0], vec![0.0, 1.0], vec![-1.0, 0.0]];
        let index = VectorIndex::build(&vectors).unwrap();
        let results = index.nearest(&[1.0, 0.0], 3).unwrap();
        assert_eq!(results[0].slot, 0);
        assert_eq!(results[1].slot, 1);
        assert_eq!(results[2].slot, 2);
        assert!(results[0].distance < 1e-6);
        assert!((results[1].distance - 2.0_f32.sqrt()).abs() < 1e-5);
        assert!((results[2].distance - 2.0).abs() < 1e-5);
    }
}
