//! Wire <-> core conversions between the generated protobuf types and the
//! in-process `Tensor`/`IndexedSlices`/`Model` types.

use std::collections::HashMap;

use crate::errors::PsError;
use crate::model::{EmbeddingTableInfo, ModelUpdate};
use crate::sparse::IndexedSlices;
use crate::tensor::{Tensor, TensorLike};
use crate::types::ElementType;

use super::pb;

impl From<&Tensor> for pb::Tensor {
    fn from(t: &Tensor) -> Self {
        pb::Tensor {
            dims: t.dims().to_vec(),
            dtype: t.dtype().to_wire(),
            content: t.content().to_vec(),
        }
    }
}

impl TryFrom<&pb::Tensor> for Tensor {
    type Error = PsError;

    fn try_from(t: &pb::Tensor) -> Result<Self, Self::Error> {
        let dtype = ElementType::from_wire(t.dtype)
            .ok_or_else(|| PsError::UnknownParameter(format!("dtype code {}", t.dtype)))?;
        Ok(Tensor::from_raw_parts(t.dims.clone(), dtype, t.content.clone()))
    }
}

impl From<&IndexedSlices> for pb::IndexedSlices {
    fn from(is: &IndexedSlices) -> Self {
        pb::IndexedSlices {
            vectors: Some(is.vectors().into()),
            ids: is.ids().to_vec(),
        }
    }
}

impl TryFrom<&pb::IndexedSlices> for IndexedSlices {
    type Error = PsError;

    fn try_from(is: &pb::IndexedSlices) -> Result<Self, Self::Error> {
        let vectors = is
            .vectors
            .as_ref()
            .ok_or_else(|| PsError::UnknownParameter("indexed_slices.vectors".into()))?;
        let vectors = Tensor::try_from(vectors)?;
        Ok(IndexedSlices::new(vectors, is.ids.clone()))
    }
}

impl TryFrom<&pb::EmbeddingTableInfo> for EmbeddingTableInfo {
    type Error = PsError;

    fn try_from(info: &pb::EmbeddingTableInfo) -> Result<Self, Self::Error> {
        let dtype = ElementType::from_wire(info.dtype)
            .ok_or_else(|| PsError::UnknownParameter(format!("dtype code {}", info.dtype)))?;
        Ok(EmbeddingTableInfo {
            name: info.name.clone(),
            dim: info.dim,
            initializer: info.initializer.clone(),
            dtype,
        })
    }
}

impl TryFrom<&pb::Model> for ModelUpdate {
    type Error = PsError;

    fn try_from(m: &pb::Model) -> Result<Self, Self::Error> {
        let mut dense = HashMap::with_capacity(m.dense_parameters.len());
        for (name, t) in &m.dense_parameters {
            dense.insert(name.clone(), Tensor::try_from(t)?);
        }
        let mut sparse = HashMap::with_capacity(m.indexed_slices.len());
        for (name, is) in &m.indexed_slices {
            sparse.insert(name.clone(), IndexedSlices::try_from(is)?);
        }
        let mut embed_infos = Vec::with_capacity(m.embedding_table_infos.len());
        for info in &m.embedding_table_infos {
            embed_infos.push(EmbeddingTableInfo::try_from(info)?);
        }
        Ok(ModelUpdate {
            version: m.version,
            dense,
            sparse,
            embed_infos,
        })
    }
}
