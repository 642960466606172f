//! The gRPC service (§4.G): four RPCs over one coarse-grained lock, exactly
//! as `Server.PushModel`/`PushGradients`/`PullDenseParameters`/
//! `PullEmbeddingTable` dispatch to `Model`/`Optimizer` in the source. The
//! `parking_lot::Mutex` is never held across an `.await` — every handler
//! takes the lock, does its synchronous work, and drops the guard before
//! returning.

pub mod convert;
#[allow(clippy::all)]
pub mod pb;

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tonic::{Request, Response, Status};

use crate::model::{Model, ModelUpdate};
use crate::optim::Optimizer;

use pb::parameter_server_server::ParameterServer;
use pb::{
    Empty, Model as PbModel, PullDenseParametersRequest, PullDenseParametersResponse,
    PullEmbeddingTableRequest, PushGradientResponse, Tensor as PbTensor,
};

struct PsState {
    model: Model,
    optimizer: Optimizer,
}

/// Shared server handle; cheap to clone, holds the single state lock.
#[derive(Clone)]
pub struct ParameterServerImpl {
    state: Arc<Mutex<PsState>>,
}

impl ParameterServerImpl {
    pub fn new(optimizer: Optimizer) -> Self {
        ParameterServerImpl {
            state: Arc::new(Mutex::new(PsState {
                model: Model::new(),
                optimizer,
            })),
        }
    }
}

#[tonic::async_trait]
impl ParameterServer for ParameterServerImpl {
    #[tracing::instrument(skip_all, name = "rpc_push_model")]
    async fn push_model(&self, request: Request<PbModel>) -> Result<Response<Empty>, Status> {
        let update = ModelUpdate::try_from(request.get_ref())
            .map_err(|e| Status::invalid_argument(e.to_string()))?;

        let mut guard = self.state.lock();
        let state = &mut *guard;
        state
            .model
            .apply_push(&update)
            .map_err(|e| Status::invalid_argument(e.to_string()))?;
        state
            .optimizer
            .init_from_model(state.model.dense(), &update.embed_infos)
            .map_err(|e| Status::internal(e.to_string()))?;
        state.model.mark_initialized();

        Ok(Response::new(Empty {}))
    }

    #[tracing::instrument(skip_all, name = "rpc_push_gradients")]
    async fn push_gradients(
        &self,
        request: Request<PbModel>,
    ) -> Result<Response<PushGradientResponse>, Status> {
        let update = ModelUpdate::try_from(request.get_ref())
            .map_err(|e| Status::invalid_argument(e.to_string()))?;

        let mut guard = self.state.lock();
        let state = &mut *guard;
        if !state.model.is_initialized() {
            return Err(Status::failed_precondition(
                "model has not been initialized by a PushModel call yet",
            ));
        }
        let result = state
            .optimizer
            .apply_all(&update.dense, &update.sparse, &mut state.model);
        let version = state.model.version();

        // §4.G(2): errors are reported but any updates applied before the
        // failing name still stick, mirroring the source's unwound loop.
        result.map_err(|e| Status::invalid_argument(e.to_string()))?;

        Ok(Response::new(PushGradientResponse {
            accepted: true,
            version,
        }))
    }

    #[tracing::instrument(skip_all, name = "rpc_pull_dense_parameters")]
    async fn pull_dense_parameters(
        &self,
        _request: Request<PullDenseParametersRequest>,
    ) -> Result<Response<PullDenseParametersResponse>, Status> {
        let state = self.state.lock();
        if !state.model.is_initialized() {
            return Ok(Response::new(PullDenseParametersResponse {
                initialized: false,
                version: 0,
                dense_parameters: HashMap::new(),
            }));
        }
        let dense_parameters = state
            .model
            .dense()
            .iter()
            .map(|(name, t)| (name.clone(), PbTensor::from(t)))
            .collect();
        Ok(Response::new(PullDenseParametersResponse {
            initialized: true,
            version: state.model.version(),
            dense_parameters,
        }))
    }

    #[tracing::instrument(skip_all, name = "rpc_pull_embedding_table")]
    async fn pull_embedding_table(
        &self,
        request: Request<PullEmbeddingTableRequest>,
    ) -> Result<Response<PbTensor>, Status> {
        let req = request.into_inner();
        let mut state = self.state.lock();
        let table = state
            .model
            .get_embedding_mut(&req.name)
            .ok_or_else(|| Status::not_found(format!("unknown embedding table: {}", req.name)))?;
        let slices = table.get_many(&req.ids);
        Ok(Response::new(PbTensor::from(slices.vectors())))
    }
}
