//! Per-operation request handlers.
//!
//! Each request moves through the same steps: decode the body, check
//! parameters and resolve paths, open the input, execute, then stream the
//! produced file. The first failing step decides the response.

use std::sync::Arc;

use axum::{body::Bytes, extract::State, response::Response};
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use crate::operation::{CompressRequest, ConvertRequest, OperationRequest, ResizeRequest};
use crate::processing::validation::ensure_readable;
use crate::server::errors::ApiError;
use crate::server::response::{stream_file, ContentType};
use crate::server::AppState;

/// Messages and response rules that differ between endpoints
struct Endpoint {
    open_failure: &'static str,
    execute_failure: &'static str,
    output_label: &'static str,
    content_type: ContentType,
}

const RESIZE: Endpoint = Endpoint {
    open_failure: "Failed to open image file",
    execute_failure: "Error resizing image",
    output_label: "resized image",
    content_type: ContentType::Detect,
};

const CONVERT: Endpoint = Endpoint {
    open_failure: "Failed to open PNG file",
    execute_failure: "Error converting PNG to JPEG",
    output_label: "converted JPEG",
    content_type: ContentType::Fixed("image/jpeg"),
};

const COMPRESS: Endpoint = Endpoint {
    open_failure: "Failed to open image file",
    execute_failure: "Error compressing image",
    output_label: "compressed image",
    content_type: ContentType::Fixed("image/jpeg"),
};

pub async fn resize(State(state): State<Arc<AppState>>, body: Bytes) -> Result<Response, ApiError> {
    handle::<ResizeRequest>(&state, &body, &RESIZE).await
}

pub async fn convert(State(state): State<Arc<AppState>>, body: Bytes) -> Result<Response, ApiError> {
    handle::<ConvertRequest>(&state, &body, &CONVERT).await
}

pub async fn compress(State(state): State<Arc<AppState>>, body: Bytes) -> Result<Response, ApiError> {
    handle::<CompressRequest>(&state, &body, &COMPRESS).await
}

/// Installed as the non-POST fallback of every operation route
pub async fn method_not_allowed() -> ApiError {
    ApiError::method_not_allowed()
}

pub async fn not_found() -> ApiError {
    ApiError::not_found()
}

async fn handle<T>(state: &AppState, body: &[u8], endpoint: &Endpoint) -> Result<Response, ApiError>
where
    T: DeserializeOwned + Into<OperationRequest>,
{
    let request: OperationRequest = serde_json::from_slice::<T>(body)
        .map_err(|err| {
            debug!("rejecting body: {}", err);
            ApiError::bad_request("Failed to decode JSON request")
        })?
        .into();

    let operation = request.operation();
    state
        .validator
        .validate(&operation)
        .map_err(|err| ApiError::from_gateway("Invalid request", &err))?;

    let paths = state
        .resolver
        .resolve(&request)
        .map_err(|err| ApiError::from_gateway("Invalid request", &err))?;

    ensure_readable(&paths.input)
        .await
        .map_err(|err| ApiError::internal(format!("{}: {}", endpoint.open_failure, err)))?;

    let result = state
        .executor
        .execute(operation, paths.input.as_path(), paths.output.as_path())
        .await
        .map_err(|err| ApiError::from_gateway(endpoint.execute_failure, &err))?;

    info!(
        operation = operation.name(),
        input = ?paths.input,
        output = ?result.output_path,
        bytes = result.file_size,
        elapsed_ms = u64::try_from(result.elapsed.as_millis()).unwrap_or(u64::MAX),
        "operation completed"
    );

    stream_file(&result.output_path, endpoint.content_type, endpoint.output_label).await
}
