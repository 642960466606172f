//! Model container (§4/§3): named dense tensors + named embedding tables,
//! a monotonic version, and the `initialized` flag the pull path checks.

use std::collections::HashMap;

use crate::embedding::EmbeddingTable;
use crate::errors::PsError;
use crate::sparse::IndexedSlices;
use crate::tensor::Tensor;
use crate::types::ElementType;

/// Logical fields of a `PushModel`/`PushGradients` payload (§6 `Model`).
/// The wire encoding itself lives in `server::pb`; this is the
/// already-decoded shape the core operates on.
#[derive(Debug, Clone, Default)]
pub struct ModelUpdate {
    pub version: i32,
    pub dense: HashMap<String, Tensor>,
    pub sparse: HashMap<String, IndexedSlices>,
    pub embed_infos: Vec<EmbeddingTableInfo>,
}

#[derive(Debug, Clone)]
pub struct EmbeddingTableInfo {
    pub name: String,
    pub dim: i64,
    pub initializer: String,
    pub dtype: ElementType,
}

#[derive(Debug, Default)]
pub struct Model {
    version: i32,
    initialized: bool,
    dense: HashMap<String, Tensor>,
    embed: HashMap<String, EmbeddingTable>,
}

impl Model {
    pub fn new() -> Self {
        Model::default()
    }

    pub fn version(&self) -> i32 {
        self.version
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn dense(&self) -> &HashMap<String, Tensor> {
        &self.dense
    }

    pub fn dense_mut(&mut self) -> &mut HashMap<String, Tensor> {
        &mut self.dense
    }

    pub fn get_dense(&self, name: &str) -> Option<&Tensor> {
        self.dense.get(name)
    }

    pub fn get_dense_mut(&mut self, name: &str) -> Option<&mut Tensor> {
        self.dense.get_mut(name)
    }

    pub fn get_embedding(&self, name: &str) -> Option<&EmbeddingTable> {
        self.embed.get(name)
    }

    pub fn get_embedding_mut(&mut self, name: &str) -> Option<&mut EmbeddingTable> {
        self.embed.get_mut(name)
    }

    pub fn embeddings(&self) -> &HashMap<String, EmbeddingTable> {
        &self.embed
    }

    /// Registers an embedding table's schema. A no-op if the name already
    /// exists — testable property 6 ("idempotent schema"). Returns `Err` if
    /// the existing table's `dim` conflicts with the requested one (a
    /// contract violation the source doesn't guard against at all; this
    /// spec treats it as fatal rather than silently keeping the old dim).
    pub fn set_embedding_table_info(
        &mut self,
        info: &EmbeddingTableInfo,
    ) -> Result<(), PsError> {
        if let Some(existing) = self.embed.get(&info.name) {
            if existing.dim() != info.dim {
                return Err(PsError::ConflictingEmbeddingSchema {
                    name: info.name.clone(),
                    existing: existing.dim(),
                    requested: info.dim,
                });
            }
            return Ok(());
        }
        let table = EmbeddingTable::new(info.dim, info.initializer.clone(), info.dtype)?;
        self.embed.insert(info.name.clone(), table);
        Ok(())
    }

    /// `InitFromModel` (`PushModel`'s data half, §4.G(1)): registers
    /// embedding schemas, overwrites dense tensors by name, applies any
    /// included sparse rows, and bumps `version` monotonically. Does *not*
    /// flip `initialized` or touch the optimizer — the server handler does
    /// both, in the order §4.G(1) and §9 note 3 require.
    pub fn apply_push(&mut self, update: &ModelUpdate) -> Result<(), PsError> {
        for info in &update.embed_infos {
            self.set_embedding_table_info(info)?;
        }
        for (name, tensor) in &update.dense {
            self.dense.insert(name.clone(), tensor.clone());
        }
        for (name, is) in &update.sparse {
            let table = self
                .embed
                .get_mut(name)
                .ok_or_else(|| PsError::UnknownParameter(name.clone()))?;
            table.set(is);
        }
        if update.version >= 0 {
            self.version = self.version.max(update.version);
        }
        Ok(())
    }

    pub fn mark_initialized(&mut self) {
        self.initialized = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dense_update(name: &str, data: &[f32], dims: Vec<i64>) -> ModelUpdate {
        let mut u = ModelUpdate::default();
        u.dense
            .insert(name.to_string(), Tensor::new_from_elements(data, dims).unwrap());
        u
    }

    #[test]
    fn fresh_model_is_uninitialized_with_empty_maps() {
        let m = Model::new();
        assert!(!m.is_initialized());
        assert_eq!(m.version(), 0);
        assert!(m.dense().is_empty());
    }

    #[test]
    fn apply_push_inserts_dense_params_by_name() {
        // Mirrors model_test.go's TestPsModelInit.
        let mut m = Model::new();
        let mut u = dense_update("t1", &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0], vec![2, 3]);
        u.dense.insert(
            "t2".into(),
            Tensor::new_from_elements(&[1.0f32, 2.0, 1.1, 2.2], vec![2, 2]).unwrap(),
        );
        m.apply_push(&u).unwrap();

        assert_eq!(m.dense().len(), 2);
        assert!(m.get_dense("t1").is_some());
        assert!(m.get_dense("t2").is_some());
        assert!(m.get_dense("t3").is_none());
    }

    #[test]
    fn version_never_decreases() {
        // Testable property 7.
        let mut m = Model::new();
        let mut u = ModelUpdate::default();
        u.version = 5;
        m.apply_push(&u).unwrap();
        assert_eq!(m.version(), 5);

        u.version = 2;
        m.apply_push(&u).unwrap();
        assert_eq!(m.version(), 5);

        u.version = 9;
        m.apply_push(&u).unwrap();
        assert_eq!(m.version(), 9);
    }

    #[test]
    fn repeated_schema_registration_is_idempotent() {
        // Testable property 6 / scenario S6.
        let mut m = Model::new();
        let info = EmbeddingTableInfo {
            name: "e".into(),
            dim: 4,
            initializer: "zero".into(),
            dtype: ElementType::Float32,
        };
        m.set_embedding_table_info(&info).unwrap();
        m.set_embedding_table_info(&info).unwrap();
        assert_eq!(m.get_embedding("e").unwrap().dim(), 4);
    }

    #[test]
    fn conflicting_schema_dim_is_rejected() {
        let mut m = Model::new();
        let info_a = EmbeddingTableInfo {
            name: "e".into(),
            dim: 4,
            initializer: "zero".into(),
            dtype: ElementType::Float32,
        };
        let info_b = EmbeddingTableInfo { dim: 8, ..info_a.clone() };
        m.set_embedding_table_info(&info_a).unwrap();
        assert!(m.set_embedding_table_info(&info_b).is_err());
    }
}
