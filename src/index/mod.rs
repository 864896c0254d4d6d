//! Exact nearest-neighbour search over the corpus embedding matrix.
//!
//! The matrix is loaded once and never mutated, so [`EmbeddingIndex::search`]
//! takes `&self` and may run from any number of threads at once.


use ndarray::{Array2, ArrayView1};
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use tracing::debug;

use crate::{LegalRagError, Result};

/// A single ranked result: the matrix row and its squared L2 distance to the query.
/// Lower distance means more similar.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchHit {
    pub row_index: usize,
    pub distance: f32,
}

/// Heap entry ordered by distance, then row index, so ties resolve deterministically.
#[derive(Debug, Clone, Copy)]
struct Candidate(SearchHit);

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Candidate {}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0
            .distance
            .total_cmp(&other.0.distance)
            .then_with(|| self.0.row_index.cmp(&other.0.row_index))
    }
}

/// Brute-force L2 index over an immutable `[N, D]` matrix
#[derive(Debug, Clone)]
pub struct EmbeddingIndex {
    matrix: Array2<f32>,
}

impl EmbeddingIndex {
    #[inline]
    pub fn new(matrix: Array2<f32>) -> Self {
        debug!(
            "Embedding index ready: {} vectors of dimension {}",
            matrix.nrows(),
            matrix.ncols()
        );
        Self { matrix }
    }

    /// Build an index from individual row vectors, all of length `dimension`
    #[inline]
    pub fn from_rows(rows: Vec<Vec<f32>>, dimension: usize) -> Result<Self> {
        let row_count = rows.len();
        let mut flat = Vec::with_capacity(row_count * dimension);

        for (row_index, row) in rows.into_iter().enumerate() {
            if row.len() != dimension {
                return Err(LegalRagError::asset_load(
                    "embeddings",
                    format!(
                        "row {} has {} values, expected {}",
                        row_index,
                        row.len(),
                        dimension
                    ),
                ));
            }
            flat.extend(row);
        }

        let matrix = Array2::from_shape_vec((row_count, dimension), flat)
            .map_err(|e| LegalRagError::asset_load("embeddings", e))?;
        Ok(Self::new(matrix))
    }

    /// Number of indexed vectors (N)
    #[inline]
    pub fn len(&self) -> usize {
        self.matrix.nrows()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.matrix.nrows() == 0
    }

    /// Vector dimension (D)
    #[inline]
    pub fn dimension(&self) -> usize {
        self.matrix.ncols()
    }

    /// Return the `k` rows closest to `query`, ascending by squared L2 distance.
    ///
    /// `k` larger than the corpus is clamped; `k == 0` is rejected.
    #[inline]
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit>> {
        if query.len() != self.dimension() {
            return Err(LegalRagError::DimensionMismatch {
                expected: self.dimension(),
                actual: query.len(),
            });
        }

        if k == 0 {
            return Err(LegalRagError::Config(
                "search requires k >= 1".to_string(),
            ));
        }

        let k = k.min(self.len());
        if k == 0 {
            debug!("Search over empty index returns no hits");
            return Ok(Vec::new());
        }

        // Max-heap of the k best candidates seen so far; the root is the worst of them.
        let mut heap = BinaryHeap::with_capacity(k + 1);
        for (row_index, row) in self.matrix.rows().into_iter().enumerate() {
            let candidate = Candidate(SearchHit {
                row_index,
                distance: squared_l2(row, query),
            });

            if heap.len() < k {
                heap.push(candidate);
            } else if heap.peek().is_some_and(|worst| candidate < *worst) {
                heap.pop();
                heap.push(candidate);
            }
        }

        let hits: Vec<SearchHit> = heap
            .into_sorted_vec()
            .into_iter()
            .map(|candidate| candidate.0)
            .collect();

        debug!(
            "Searched {} vectors, returning {} hits (requested {})",
            self.len(),
            hits.len(),
            k
        );
        Ok(hits)
    }
}

#[inline]
fn squared_l2(row: ArrayView1<'_, f32>, query: &[f32]) -> f32 {
    row.iter()
        .zip(query)
        .map(|(a, b)| {
            let d = a - b;
            d * d
        })
        .sum()
}
