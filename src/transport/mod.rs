//! gRPC transport layer for the resolver.
//!
//! The canonical request surface is `ResolverIR`. This transport carries
//! it as JSON bytes and returns the JSON-serialized engine response.

use std::sync::Arc;

use serde::Serialize;
use tonic::{Request, Response, Status};

use crate::engine::ResolverEngine;
use crate::error::{ExecutionError, ResolverError};
use crate::ir::ResolverIR;

pub mod proto {
    tonic::include_proto!("resolver");
}

use proto::resolver_service_server::{ResolverService, ResolverServiceServer};

/// Maximum size of a `ResolverIR` JSON payload.
const MAX_IR_JSON_BYTES: usize = 1024 * 1024; // 1 MiB

/// Maximum size of a response JSON payload. Pass reports list every group.
const MAX_RESPONSE_JSON_BYTES: usize = 16 * 1024 * 1024; // 16 MiB

/// gRPC service implementation for the resolver.
pub struct ResolverServiceImpl {
    engine: Arc<ResolverEngine>,
}

impl ResolverServiceImpl {
    #[must_use]
    pub fn new(engine: Arc<ResolverEngine>) -> Self {
        Self { engine }
    }

    #[must_use]
    pub fn into_server(self) -> ResolverServiceServer<Self> {
        ResolverServiceServer::new(self)
    }
}

fn invalid_argument(msg: impl Into<String>) -> Status {
    Status::invalid_argument(msg.into())
}

fn parse_ir(bytes: &[u8]) -> Result<ResolverIR, Status> {
    if bytes.is_empty() {
        return Err(invalid_argument("ir_json is required"));
    }
    if bytes.len() > MAX_IR_JSON_BYTES {
        return Err(invalid_argument("ir_json exceeds maximum size"));
    }

    serde_json::from_slice(bytes)
        .map_err(|e| invalid_argument(format!("invalid ResolverIR JSON: {e}")))
}

fn encode_json<T: Serialize>(value: &T, max: usize) -> Result<Vec<u8>, Status> {
    let bytes = serde_json::to_vec(value)
        .map_err(|e| Status::internal(format!("failed to serialize response JSON: {e}")))?;
    if bytes.len() > max {
        return Err(Status::resource_exhausted("serialized JSON exceeds size limit"));
    }
    Ok(bytes)
}

/// Maps an engine error to a gRPC status.
///
/// Partial pass failures are not errors; they travel in the response body.
pub fn status_from_resolver_error(err: ResolverError) -> Status {
    match err {
        ResolverError::Validation(v) => Status::invalid_argument(v.to_string()),
        ResolverError::Transport(t) => Status::invalid_argument(t.to_string()),
        ResolverError::Internal { message } => Status::internal(message),
        ResolverError::Execution(e) => match e {
            ExecutionError::RestaurantNotFound { .. } | ExecutionError::InspectionNotFound { .. } => {
                Status::not_found(e.to_string())
            }
            ExecutionError::InvalidOperation { .. } => Status::failed_precondition(e.to_string()),
            ExecutionError::Storage { .. } | ExecutionError::Disconnected { .. } => {
                Status::internal(e.to_string())
            }
        },
    }
}

#[tonic::async_trait]
impl ResolverService for ResolverServiceImpl {
    async fn execute(
        &self,
        request: Request<proto::ExecuteRequest>,
    ) -> Result<Response<proto::ExecuteResponse>, Status> {
        let req = request.into_inner();
        let ir = parse_ir(&req.ir_json)?;

        // Passes hold the store for their whole duration.
        let engine = Arc::clone(&self.engine);
        let resp = tokio::task::spawn_blocking(move || engine.execute(ir))
            .await
            .map_err(|e| Status::internal(format!("engine task failed: {e}")))?
            .map_err(status_from_resolver_error)?;

        let response_json = encode_json(&resp, MAX_RESPONSE_JSON_BYTES)?;
        Ok(Response::new(proto::ExecuteResponse { response_json }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use tonic::Request;

    use crate::inspection::InspectionPayload;
    use crate::ir::{InspectionLookup, Request as IrRequest, ResolvePayload};

    fn make_engine() -> Arc<ResolverEngine> {
        Arc::new(ResolverEngine::in_memory())
    }

    fn execute_request(ir: &ResolverIR) -> Request<proto::ExecuteRequest> {
        Request::new(proto::ExecuteRequest {
            ir_json: serde_json::to_vec(ir).unwrap(),
        })
    }

    fn record(id: &str, name: &str) -> InspectionPayload {
        InspectionPayload {
            inspection_id: Some(id.to_string()),
            name: Some(name.to_string()),
            address: Some("100 W Randolph St".to_string()),
            city: Some("Chicago".to_string()),
            state: Some("IL".to_string()),
            zip: Some("60601".to_string()),
            ..InspectionPayload::default()
        }
    }

    #[tokio::test]
    async fn execute_returns_json_response() {
        let svc = ResolverServiceImpl::new(make_engine());
        for (id, name) in [("1", "Kim's Diner"), ("2", "Kims Diner")] {
            let ir = ResolverIR::new(IrRequest::LoadInspection(record(id, name)));
            svc.execute(execute_request(&ir)).await.unwrap();
        }

        let ir = ResolverIR::new(IrRequest::Resolve(ResolvePayload::blocked(4)));
        let resp = svc.execute(execute_request(&ir)).await.unwrap().into_inner();
        let v: serde_json::Value = serde_json::from_slice(&resp.response_json).unwrap();
        assert_eq!(v["type"], "resolve");
        assert_eq!(v["report"]["mode"], "blocked");
        assert_eq!(v["report"]["merged"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn malformed_ir_is_invalid_argument() {
        let svc = ResolverServiceImpl::new(make_engine());
        let status = svc
            .execute(Request::new(proto::ExecuteRequest {
                ir_json: b"{\"op\":".to_vec(),
            }))
            .await
            .unwrap_err();
        assert_eq!(status.code(), tonic::Code::InvalidArgument);

        let status = svc
            .execute(Request::new(proto::ExecuteRequest { ir_json: Vec::new() }))
            .await
            .unwrap_err();
        assert_eq!(status.code(), tonic::Code::InvalidArgument);
    }

    #[tokio::test]
    async fn unknown_inspection_is_not_found() {
        let svc = ResolverServiceImpl::new(make_engine());
        let ir = ResolverIR::new(IrRequest::LinkedByInspection(InspectionLookup::new("404")));
        let status = svc.execute(execute_request(&ir)).await.unwrap_err();
        assert_eq!(status.code(), tonic::Code::NotFound);
    }

    #[test]
    fn storage_errors_map_to_internal() {
        let err: ResolverError =
            crate::storage::StorageError::BackendError("locked".to_string()).into();
        assert_eq!(status_from_resolver_error(err).code(), tonic::Code::Internal);
    }
}
