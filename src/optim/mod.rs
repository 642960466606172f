//! Optimizers (§4.F): one coarse step counter plus a dense/sparse gradient
//! application path each parameter kind goes through. Modeled as a tagged
//! enum rather than a trait object — the spec calls out that the fixed,
//! small set of kinds doesn't need dynamic dispatch, and a `match` keeps the
//! per-kind state (Adam's three shadow models) out of a `dyn` vtable.

use std::collections::HashMap;

use crate::errors::{PsError, PsResult};
use crate::kernel;
use crate::model::{EmbeddingTableInfo, Model};
use crate::sparse::IndexedSlices;
use crate::tensor::{Tensor, TensorLike, TensorLikeMut};

#[derive(Debug)]
pub struct SgdOptimizer {
    lr: f32,
    step: i64,
}

#[derive(Debug)]
pub struct AdamOptimizer {
    lr: f32,
    step: i64,
    beta1: f32,
    beta2: f32,
    epsilon: f32,
    amsgrad: bool,
    m: Model,
    v: Model,
    max_square: Model,
}

#[derive(Debug)]
pub enum Optimizer {
    Sgd(SgdOptimizer),
    Adam(AdamOptimizer),
}

/// `NewOptimizer`: builds a configured optimizer by name. Unlike the source
/// — whose `"Adam"` arm is a stubbed-out `return nil` with a `TODO` — this
/// wires Adam up fully, since §4.F specifies its update rule completely;
/// see the "Adam factory" entry in the design notes for the reasoning.
pub fn new_optimizer(kind: &str, lr: f32, beta1: f32, beta2: f32, epsilon: f32, amsgrad: bool) -> PsResult<Optimizer> {
    match kind {
        "SGD" => Ok(Optimizer::Sgd(SgdOptimizer { lr, step: 0 })),
        "Adam" => Ok(Optimizer::Adam(AdamOptimizer {
            lr,
            step: 0,
            beta1,
            beta2,
            epsilon,
            amsgrad,
            m: Model::new(),
            v: Model::new(),
            max_square: Model::new(),
        })),
        other => Err(PsError::UnknownOptimizer(other.to_string())),
    }
}

impl Optimizer {
    pub fn lr(&self) -> f32 {
        match self {
            Optimizer::Sgd(o) => o.lr,
            Optimizer::Adam(o) => o.lr,
        }
    }

    pub fn step(&self) -> i64 {
        match self {
            Optimizer::Sgd(o) => o.step,
            Optimizer::Adam(o) => o.step,
        }
    }

    /// `InitFromModelPB`: SGD has no auxiliary state. Adam allocates
    /// zero-filled `m`/`v`/`maxSquare` shadows matching each dense tensor's
    /// shape and each embedding table's schema.
    pub fn init_from_model(&mut self, dense: &HashMap<String, Tensor>, embed_infos: &[EmbeddingTableInfo]) -> PsResult<()> {
        let Optimizer::Adam(opt) = self else {
            return Ok(());
        };
        for (name, tensor) in dense {
            let zeros = tensor.zeros_like();
            opt.m.dense_mut().insert(name.clone(), zeros.clone());
            opt.v.dense_mut().insert(name.clone(), zeros.clone());
            opt.max_square.dense_mut().insert(name.clone(), zeros);
        }
        for info in embed_infos {
            opt.m.set_embedding_table_info(info)?;
            opt.v.set_embedding_table_info(info)?;
            opt.max_square.set_embedding_table_info(info)?;
        }
        Ok(())
    }

    /// Applies dense gradients using the optimizer's *current* `step` for
    /// Adam's bias correction — callers are responsible for having already
    /// incremented it (`apply_all` does this before dispatching here).
    pub fn apply_dense(&mut self, grads: &HashMap<String, Tensor>, model: &mut Model) -> PsResult<()> {
        match self {
            Optimizer::Sgd(opt) => {
                for (name, grad) in grads {
                    let param = model
                        .get_dense_mut(name)
                        .ok_or_else(|| PsError::UnknownParameter(name.clone()))?;
                    kernel::sgd(grad.as_elements::<f32>(), param.as_elements_mut::<f32>(), opt.lr)?;
                }
            }
            Optimizer::Adam(opt) => {
                for (name, grad) in grads {
                    let param = model
                        .get_dense_mut(name)
                        .ok_or_else(|| PsError::UnknownParameter(name.clone()))?;
                    let m = opt
                        .m
                        .get_dense_mut(name)
                        .ok_or_else(|| PsError::UnknownParameter(name.clone()))?;
                    let v = opt
                        .v
                        .get_dense_mut(name)
                        .ok_or_else(|| PsError::UnknownParameter(name.clone()))?;
                    let (m_elems, v_elems) = (m.as_elements_mut::<f32>(), v.as_elements_mut::<f32>());
                    let mut max_sq_elems: &mut [f32] = &mut [];
                    let mut max_sq_storage;
                    if opt.amsgrad {
                        let max_sq = opt
                            .max_square
                            .get_dense_mut(name)
                            .ok_or_else(|| PsError::UnknownParameter(name.clone()))?;
                        max_sq_storage = max_sq.as_elements_mut::<f32>().to_vec();
                        kernel::adam(
                            grad.as_elements::<f32>(),
                            param.as_elements_mut::<f32>(),
                            m_elems,
                            v_elems,
                            &mut max_sq_storage,
                            opt.lr,
                            opt.step,
                            opt.beta1,
                            opt.beta2,
                            opt.epsilon,
                            true,
                        )?;
                        max_sq.as_elements_mut::<f32>().copy_from_slice(&max_sq_storage);
                    } else {
                        kernel::adam(
                            grad.as_elements::<f32>(),
                            param.as_elements_mut::<f32>(),
                            m_elems,
                            v_elems,
                            &mut max_sq_elems,
                            opt.lr,
                            opt.step,
                            opt.beta1,
                            opt.beta2,
                            opt.epsilon,
                            false,
                        )?;
                    }
                }
            }
        }
        Ok(())
    }

    /// Same `step` contract as `apply_dense`: the caller must have already
    /// bumped `step` for this call's Adam bias correction to land right.
    pub fn apply_sparse(&mut self, grads: &HashMap<String, IndexedSlices>, model: &mut Model) -> PsResult<()> {
        match self {
            Optimizer::Sgd(opt) => {
                for (name, grad) in grads {
                    let mut grad = grad.clone();
                    grad.merge_duplicates();
                    let table = model
                        .get_embedding_mut(name)
                        .ok_or_else(|| PsError::UnknownParameter(name.clone()))?;
                    if grad.vectors().dims().get(1).copied() != Some(table.dim()) {
                        return Err(PsError::SizeMismatch {
                            grad_len: grad.vectors().dims().get(1).copied().unwrap_or(0) as usize,
                            target_len: table.dim() as usize,
                        });
                    }
                    for (i, &id) in grad.ids().iter().enumerate() {
                        if id == crate::sparse::SENTINEL_ID {
                            continue;
                        }
                        let subgrad = grad.vectors().row(i as i64).expect("row index in range");
                        let param = table.get(id);
                        kernel::sgd(subgrad.as_elements::<f32>(), param.as_elements_mut::<f32>(), opt.lr)?;
                    }
                }
            }
            Optimizer::Adam(opt) => {
                for (name, grad) in grads {
                    let mut grad = grad.clone();
                    grad.merge_duplicates();
                    let table = model
                        .get_embedding_mut(name)
                        .ok_or_else(|| PsError::UnknownParameter(name.clone()))?;
                    for (i, &id) in grad.ids().iter().enumerate() {
                        if id == crate::sparse::SENTINEL_ID {
                            continue;
                        }
                        let subgrad: Vec<f32> = grad
                            .vectors()
                            .row(i as i64)
                            .expect("row index in range")
                            .as_elements::<f32>()
                            .to_vec();
                        let param = table.get(id);
                        let m_table = opt
                            .m
                            .get_embedding_mut(name)
                            .ok_or_else(|| PsError::UnknownParameter(name.clone()))?;
                        let m = m_table.get(id);
                        let mut m_elems = m.as_elements_mut::<f32>().to_vec();
                        let v_table = opt
                            .v
                            .get_embedding_mut(name)
                            .ok_or_else(|| PsError::UnknownParameter(name.clone()))?;
                        let v = v_table.get(id);
                        let mut v_elems = v.as_elements_mut::<f32>().to_vec();
                        let mut max_sq_elems: Vec<f32> = if opt.amsgrad {
                            let max_sq_table = opt
                                .max_square
                                .get_embedding_mut(name)
                                .ok_or_else(|| PsError::UnknownParameter(name.clone()))?;
                            max_sq_table.get(id).as_elements::<f32>().to_vec()
                        } else {
                            Vec::new()
                        };

                        kernel::adam(
                            &subgrad,
                            param.as_elements_mut::<f32>(),
                            &mut m_elems,
                            &mut v_elems,
                            &mut max_sq_elems,
                            opt.lr,
                            opt.step,
                            opt.beta1,
                            opt.beta2,
                            opt.epsilon,
                            opt.amsgrad,
                        )?;

                        opt.m.get_embedding_mut(name).unwrap().get(id).as_elements_mut::<f32>().copy_from_slice(&m_elems);
                        opt.v.get_embedding_mut(name).unwrap().get(id).as_elements_mut::<f32>().copy_from_slice(&v_elems);
                        if opt.amsgrad {
                            opt.max_square
                                .get_embedding_mut(name)
                                .unwrap()
                                .get(id)
                                .as_elements_mut::<f32>()
                                .copy_from_slice(&max_sq_elems);
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// `ApplyGradients`: increments the step counter first, then applies the
    /// dense half and the sparse half in order, short-circuiting on the
    /// first error — partial application of an earlier name's update is
    /// observable, matching the source's unwound-loop behavior.
    pub fn apply_all(
        &mut self,
        dense: &HashMap<String, Tensor>,
        sparse: &HashMap<String, IndexedSlices>,
        model: &mut Model,
    ) -> PsResult<()> {
        match self {
            Optimizer::Sgd(o) => o.step += 1,
            Optimizer::Adam(o) => o.step += 1,
        }
        self.apply_dense(dense, model)?;
        self.apply_sparse(sparse, model)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tensor::Tensor;
    use crate::types::ElementType;

    #[test]
    fn unknown_kind_is_rejected_at_construction() {
        assert!(new_optimizer("RMSProp", 0.1, 0.9, 0.999, 1e-8, false).is_err());
    }

    #[test]
    fn sgd_apply_dense_updates_named_param_only() {
        // Scenario S1.
        let mut model = Model::new();
        model
            .dense_mut()
            .insert("w".into(), Tensor::new_from_elements(&[1.0f32, 2.0], vec![2]).unwrap());
        let mut opt = new_optimizer("SGD", 0.1, 0.9, 0.999, 1e-8, false).unwrap();

        let mut grads = HashMap::new();
        grads.insert("w".to_string(), Tensor::new_from_elements(&[1.0f32, 1.0], vec![2]).unwrap());
        opt.apply_dense(&grads, &mut model).unwrap();

        assert_eq!(model.get_dense("w").unwrap().as_elements::<f32>(), &[0.9, 1.9]);
        assert_eq!(opt.step(), 0); // apply_dense alone doesn't bump step; apply_all does.
    }

    #[test]
    fn sgd_apply_dense_rejects_unknown_name() {
        let mut model = Model::new();
        let mut opt = new_optimizer("SGD", 0.1, 0.9, 0.999, 1e-8, false).unwrap();
        let mut grads = HashMap::new();
        grads.insert("missing".to_string(), Tensor::new_from_elements(&[1.0f32], vec![1]).unwrap());
        assert!(opt.apply_dense(&grads, &mut model).is_err());
    }

    #[test]
    fn apply_all_increments_step_once_per_call() {
        let mut model = Model::new();
        let mut opt = new_optimizer("SGD", 0.1, 0.9, 0.999, 1e-8, false).unwrap();
        opt.apply_all(&HashMap::new(), &HashMap::new(), &mut model).unwrap();
        opt.apply_all(&HashMap::new(), &HashMap::new(), &mut model).unwrap();
        assert_eq!(opt.step(), 2);
    }

    #[test]
    fn adam_apply_sparse_moves_param_away_from_zero() {
        // Scenario S2, roughly: sparse Adam should move a touched row.
        let mut model = Model::new();
        let info = EmbeddingTableInfo {
            name: "e".into(),
            dim: 2,
            initializer: "zero".into(),
            dtype: ElementType::Float32,
        };
        model.set_embedding_table_info(&info).unwrap();
        let mut opt = new_optimizer("Adam", 0.1, 0.9, 0.999, 1e-8, false).unwrap();
        opt.init_from_model(&HashMap::new(), std::slice::from_ref(&info)).unwrap();

        let vectors = Tensor::new_from_elements(&[1.0f32, 1.0], vec![1, 2]).unwrap();
        let is = IndexedSlices::new(vectors, vec![7]);
        let mut sparse = HashMap::new();
        sparse.insert("e".to_string(), is);

        // Goes through apply_all, not apply_sparse directly: Adam's
        // bias-correction needs step >= 1, and only apply_all bumps it.
        opt.apply_all(&HashMap::new(), &sparse, &mut model).unwrap();
        let row = model
            .get_embedding_mut("e")
            .unwrap()
            .get(7)
            .as_elements::<f32>()
            .to_vec();
        assert!(row[0] < 0.0 && row[1] < 0.0);
    }
}
