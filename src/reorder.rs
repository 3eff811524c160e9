//! Bandwidth-reducing reordering of sparse matrices.
use nalgebra_sparse::pattern::SparsityPattern;
use std::collections::VecDeque;
use std::error::Error;
use std::fmt;

/// A representation of an index permutation.
///
/// More precisely, given `n` objects stored contiguously, the permutation internally
/// stores a permutation array `perm` such that for *target index* `i` in `0 .. n`,
/// the corresponding *source index* is given by
///
/// ```ignore
/// target[i] = source[perm[i]]
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Permutation {
    perm: Vec<usize>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct InvalidPermutation;

impl fmt::Display for InvalidPermutation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Invalid permutation")
    }
}

impl Error for InvalidPermutation {}

impl Permutation {
    pub fn from_vec(perm: Vec<usize>) -> Result<Self, InvalidPermutation> {
        let mut visited = vec![false; perm.len()];
        for &index in &perm {
            match visited.get_mut(index) {
                Some(seen) if !*seen => *seen = true,
                _ => return Err(InvalidPermutation),
            }
        }
        Ok(Self { perm })
    }

    pub fn identity(n: usize) -> Self {
        Self { perm: (0..n).collect() }
    }

    pub fn len(&self) -> usize {
        self.perm.len()
    }

    pub fn is_empty(&self) -> bool {
        self.perm.is_empty()
    }

    pub fn perm(&self) -> &[usize] {
        &self.perm
    }

    pub fn reverse(&mut self) {
        self.perm.reverse()
    }

    pub fn source_index(&self, target_index: usize) -> usize {
        self.perm[target_index]
    }

    pub fn inverse(&self) -> Permutation {
        let mut inverse_perm = vec![usize::MAX; self.len()];
        for (target_idx, &source_idx) in self.perm().iter().enumerate() {
            inverse_perm[source_idx] = target_idx;
        }
        Self { perm: inverse_perm }
    }

    pub fn apply_to_slice<T: Clone>(&self, slice: &[T]) -> Vec<T> {
        assert_eq!(
            slice.len(),
            self.len(),
            "Slice and permutation must have the same size."
        );
        self.perm()
            .iter()
            .map(|source_idx| slice[*source_idx].clone())
            .collect()
    }
}

/// Create a vertex permutation for a structurally symmetric sparse matrix using the
/// Cuthill-McKee algorithm.
pub fn cuthill_mckee(sparsity_pattern: &SparsityPattern) -> Permutation {
    assert_eq!(
        sparsity_pattern.major_dim(),
        sparsity_pattern.minor_dim(),
        "Matrix must be square."
    );
    let n = sparsity_pattern.major_dim();

    let adjacent_vertices = |vertex_idx| sparsity_pattern.lane(vertex_idx);
    let vertex_degree = |vertex_idx| adjacent_vertices(vertex_idx).len();

    // Start vertices are candidates in order of increasing degree. For patterns with
    // several disjoint components we restart from the first candidate not yet visited.
    let mut start_candidates: Vec<usize> = (0..n).collect();
    start_candidates.sort_by_key(|&vertex_idx| vertex_degree(vertex_idx));

    let mut queue = VecDeque::new();
    let mut permutation = Vec::with_capacity(n);
    let mut visited = vec![false; n];
    let mut adjacency_workspace = Vec::new();

    for start_vertex in start_candidates {
        if visited[start_vertex] {
            continue;
        }
        queue.push_back(start_vertex);
        visited[start_vertex] = true;

        while let Some(vertex) = queue.pop_front() {
            adjacency_workspace.clear();
            adjacency_workspace.extend_from_slice(adjacent_vertices(vertex));
            adjacency_workspace.sort_unstable_by_key(|idx| vertex_degree(*idx));

            permutation.push(vertex);

            // Breadth-first search, visiting neighbors from lowest to highest degree
            for &adjacent_vertex in &adjacency_workspace {
                if !visited[adjacent_vertex] {
                    visited[adjacent_vertex] = true;
                    queue.push_back(adjacent_vertex);
                }
            }
        }
    }

    assert_eq!(permutation.len(), n, "Internal error: Permutation has invalid length");
    Permutation { perm: permutation }
}

/// Create a vertex permutation for a structurally symmetric sparse matrix using the
/// Reverse Cuthill-McKee (RCM) algorithm.
pub fn reverse_cuthill_mckee(sparsity_pattern: &SparsityPattern) -> Permutation {
    let mut perm = cuthill_mckee(sparsity_pattern);
    perm.reverse();
    perm
}

/// The half bandwidths `(lower, upper)` of a pattern after applying the given permutation
/// symmetrically to its rows and columns.
pub fn permuted_bandwidths(sparsity_pattern: &SparsityPattern, permutation: &Permutation) -> (usize, usize) {
    let inverse = permutation.inverse();
    let mut lower = 0;
    let mut upper = 0;
    for row in 0..sparsity_pattern.major_dim() {
        let new_row = inverse.source_index(row);
        for &col in sparsity_pattern.lane(row) {
            let new_col = inverse.source_index(col);
            if new_row > new_col {
                lower = lower.max(new_row - new_col);
            } else {
                upper = upper.max(new_col - new_row);
            }
        }
    }
    (lower, upper)
}
