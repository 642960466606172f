//! `IndexedSlices` (§4.C): a batched sparse gradient — a 2-D tensor of row
//! vectors paired with a parallel id sequence, plus the duplicate-merge step
//! optimizers run before applying sparse updates.

use std::collections::HashMap;

use crate::kernel;
use crate::tensor::{Tensor, TensorLike, TensorLikeMut};

/// Sentinel id marking a row that `merge_duplicates` has folded away.
pub const SENTINEL_ID: i64 = -1;

#[derive(Debug, Clone)]
pub struct IndexedSlices {
    vectors: Tensor,
    ids: Vec<i64>,
}

impl IndexedSlices {
    pub fn new(vectors: Tensor, ids: Vec<i64>) -> Self {
        debug_assert_eq!(
            vectors.dims().first().copied().unwrap_or(-1),
            ids.len() as i64,
            "IndexedSlices: row count must match id count"
        );
        IndexedSlices { vectors, ids }
    }

    pub fn vectors(&self) -> &Tensor {
        &self.vectors
    }

    pub fn vectors_mut(&mut self) -> &mut Tensor {
        &mut self.vectors
    }

    pub fn ids(&self) -> &[i64] {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Rewrites `self` in place: rows sharing an id are summed into the
    /// first member of the group, and every other member's id is set to
    /// `SENTINEL_ID` so downstream updates skip it.
    ///
    /// Idempotent after the first call — a second pass groups all-`-1` rows
    /// into one group, but sentinel rows are never folded into anything
    /// (see the `id == SENTINEL_ID` guard below), so the sums don't change.
    pub fn merge_duplicates(&mut self) {
        let mut groups: HashMap<i64, Vec<usize>> = HashMap::new();
        for (row, &id) in self.ids.iter().enumerate() {
            if id == SENTINEL_ID {
                continue;
            }
            groups.entry(id).or_default().push(row);
        }

        for rows in groups.values() {
            if rows.len() < 2 {
                continue;
            }
            let (&first, rest) = rows.split_first().expect("group has >= 2 members");

            // Float32 only, per §4.E. Owned copies first: `kernel::sum` needs
            // the group's rows borrowed together, which can't overlap with
            // the `row_mut` borrow used to write the result back below.
            let owned_rows: Vec<Vec<f32>> = rows
                .iter()
                .map(|&row| {
                    self.vectors
                        .row(row as i64)
                        .unwrap()
                        .as_elements::<f32>()
                        .to_vec()
                })
                .collect();
            let row_refs: Vec<&[f32]> = owned_rows.iter().map(Vec::as_slice).collect();
            let summed = kernel::sum(&row_refs);

            let mut dst = self.vectors.row_mut(first as i64).unwrap();
            dst.as_elements_mut::<f32>().copy_from_slice(&summed);
            for &row in rest {
                self.ids[row] = SENTINEL_ID;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ElementType;

    fn slices(rows: &[(i64, [f32; 2])]) -> IndexedSlices {
        let mut flat = Vec::with_capacity(rows.len() * 2);
        let mut ids = Vec::with_capacity(rows.len());
        for (id, v) in rows {
            ids.push(*id);
            flat.extend_from_slice(v);
        }
        let vectors = Tensor::new_from_elements(&flat, vec![rows.len() as i64, 2]).unwrap();
        IndexedSlices::new(vectors, ids)
    }

    #[test]
    fn merge_sums_duplicate_rows_and_sentinels_the_rest() {
        // Scenario S3's shape: ids = [1, 1, 2].
        let mut g = slices(&[(1, [1.0, 1.0]), (1, [2.0, 2.0]), (2, [3.0, 3.0])]);
        g.merge_duplicates();
        assert_eq!(g.ids(), &[1, -1, 2]);
        assert_eq!(
            g.vectors().row(0).unwrap().as_elements::<f32>(),
            &[3.0, 3.0]
        );
        assert_eq!(
            g.vectors().row(2).unwrap().as_elements::<f32>(),
            &[3.0, 3.0]
        );
    }

    #[test]
    fn dedup_conservation_and_sentinel_count() {
        // Testable properties 4 and 5.
        let mut g = slices(&[
            (5, [1.0, 0.0]),
            (5, [1.0, 0.0]),
            (5, [1.0, 0.0]),
            (6, [2.0, 0.0]),
        ]);
        let original_sum_id5 = 3.0;
        g.merge_duplicates();
        let surviving: f32 = g
            .ids()
            .iter()
            .enumerate()
            .filter(|(_, &id)| id == 5)
            .map(|(i, _)| g.vectors().row(i as i64).unwrap().as_elements::<f32>()[0])
            .sum();
        assert_eq!(surviving, original_sum_id5);

        let sentinel_count = g.ids().iter().filter(|&&id| id == SENTINEL_ID).count();
        assert_eq!(sentinel_count, 4 - 2); // 4 rows, 2 distinct ids
    }

    #[test]
    fn merge_is_idempotent() {
        let mut g = slices(&[(1, [1.0, 1.0]), (1, [2.0, 2.0])]);
        g.merge_duplicates();
        let after_first: Vec<i64> = g.ids().to_vec();
        let first_row: Vec<f32> = g.vectors().row(0).unwrap().as_elements::<f32>().to_vec();
        g.merge_duplicates();
        assert_eq!(g.ids(), after_first.as_slice());
        assert_eq!(g.vectors().row(0).unwrap().as_elements::<f32>(), first_row);
    }
}
