//! Embedding table (§4.B): a mapping from 64-bit row-id to a uniform-width
//! vector, with rows materialized lazily on first access.

use std::collections::HashMap;

use crate::errors::{PsError, PsResult};
use crate::sparse::IndexedSlices;
use crate::tensor::{Tensor, TensorLike};
use crate::types::ElementType;

/// Initializers the table knows how to apply to a freshly created row.
/// Unknown names are rejected at table-construction time (§9 note 5), not
/// lazily when a row is first touched.
const KNOWN_INITIALIZERS: &[&str] = &["zero"];

#[derive(Debug, Clone)]
pub struct EmbeddingTable {
    dim: i64,
    dtype: ElementType,
    initializer: String,
    rows: HashMap<i64, Tensor>,
}

impl EmbeddingTable {
    pub fn new(dim: i64, initializer: impl Into<String>, dtype: ElementType) -> PsResult<Self> {
        let initializer = initializer.into();
        if !KNOWN_INITIALIZERS.contains(&initializer.as_str()) {
            return Err(PsError::UnknownInitializer(initializer));
        }
        Ok(EmbeddingTable {
            dim,
            dtype,
            initializer,
            rows: HashMap::new(),
        })
    }

    pub fn dim(&self) -> i64 {
        self.dim
    }

    pub fn dtype(&self) -> ElementType {
        self.dtype
    }

    pub fn initializer(&self) -> &str {
        &self.initializer
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn contains(&self, id: i64) -> bool {
        self.rows.contains_key(&id)
    }

    fn new_row(&self) -> Tensor {
        // Only "zero" is implemented; construction already rejected anything
        // else, so this is the only branch that can be reached.
        debug_assert_eq!(self.initializer, "zero");
        Tensor::new_empty(vec![self.dim], self.dtype)
    }

    /// `Get`: returns the vector for `id`, creating (and inserting) a zero
    /// row on first access. Idempotent — later calls return the same row.
    pub fn get(&mut self, id: i64) -> &mut Tensor {
        self.rows.entry(id).or_insert_with_key(|_| {
            let row = Tensor::new_empty(vec![self.dim], self.dtype);
            debug_assert_eq!(self.initializer, "zero");
            row
        })
    }

    /// `GetMany`: a fresh `IndexedSlices` snapshot — row *i* is a *copy* of
    /// `Get(ids[i])`, not an aliased view, so pull responses are stable even
    /// while the table keeps mutating under later gradient pushes.
    pub fn get_many(&mut self, ids: &[i64]) -> IndexedSlices {
        let mut vectors = Tensor::new_empty(vec![ids.len() as i64, self.dim], self.dtype);
        for (i, &id) in ids.iter().enumerate() {
            let row = self.get(id);
            let row_copy = row.clone();
            vectors.set_row(i as i64, &row_copy);
        }
        IndexedSlices::new(vectors, ids.to_vec())
    }

    /// `Set`: copies row *i* of `is.vectors` into the stored vector for
    /// `is.ids[i]`, creating it first if absent (§9 note 4 — this
    /// preserves the source's `SetEmbeddingVectors`/`Get` behavior rather
    /// than rejecting unknown keys).
    pub fn set(&mut self, is: &IndexedSlices) {
        for (i, &id) in is.ids().iter().enumerate() {
            let row = is.vectors().row(i as i64).expect("row index in range");
            self.get(id).copy_from(&row);
        }
    }
}
