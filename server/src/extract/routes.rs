//! HTTP handlers for the extraction actions

use std::sync::Arc;

use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use serde::Serialize;
use serde_json::Value;

use super::registry::{ActionDescriptor, ActionRegistry, FieldKind, FieldSpec, RequestSchema};
use super::service::ExtractService;
use super::types::{BlobRequest, ExtractError};

/// Application state shared by all extraction routes
#[derive(Clone)]
pub struct ExtractState {
    pub service: Arc<ExtractService>,
}

/// Error response for the extraction API; `detail` always carries a
/// client-safe message. The status is fixed by the error variant at
/// construction, never re-derived from the serialized fields.
#[derive(Debug, Serialize)]
pub struct ExtractErrorResponse {
    #[serde(skip)]
    pub status: StatusCode,
    pub detail: String,
    pub code: &'static str,
}

impl From<ExtractError> for ExtractErrorResponse {
    fn from(e: ExtractError) -> Self {
        let (status, code) = match &e {
            ExtractError::Decode(_) => (StatusCode::BAD_REQUEST, "decode_error"),
            ExtractError::ImageTooLarge { .. } => (StatusCode::BAD_REQUEST, "image_too_large"),
            ExtractError::Saturated => (StatusCode::SERVICE_UNAVAILABLE, "saturated"),
            ExtractError::Timeout(_) => (StatusCode::SERVICE_UNAVAILABLE, "timeout"),
            ExtractError::Algorithm(_) => (StatusCode::INTERNAL_SERVER_ERROR, "algorithm_error"),
            ExtractError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        };
        // Internal failures are logged server-side with full detail; the
        // client only ever sees a generic message for them.
        let detail = match &e {
            ExtractError::Algorithm(_) | ExtractError::Internal(_) => {
                "internal processing error".to_string()
            }
            other => other.to_string(),
        };
        Self { status, detail, code }
    }
}

impl IntoResponse for ExtractErrorResponse {
    fn into_response(self) -> Response {
        (self.status, Json(self)).into_response()
    }
}

/// Log a handler failure with enough context to tell the failure classes
/// apart, then convert it into the client-facing response.
fn fail(action: &'static str, e: ExtractError) -> Response {
    match &e {
        ExtractError::Decode(_) | ExtractError::ImageTooLarge { .. } => {
            tracing::warn!(action, error = %e, "rejected request input");
        }
        ExtractError::Saturated | ExtractError::Timeout(_) => {
            tracing::warn!(action, error = %e, "shedding load");
        }
        ExtractError::Algorithm(_) | ExtractError::Internal(_) => {
            tracing::error!(action, error = %e, "extraction failed");
        }
    }
    ExtractErrorResponse::from(e).into_response()
}

fn parse_request(body: Value) -> Result<BlobRequest, ExtractError> {
    // The dispatcher has already schema-checked the body; a failure here
    // means schema and struct drifted apart.
    serde_json::from_value(body)
        .map_err(|e| ExtractError::Internal(format!("schema/struct mismatch: {e}")))
}

/// POST /blob/extract - Compute a blob mask, returned as raw 1-bit PNG bytes
pub async fn handle_blob_extract(state: ExtractState, body: Value) -> Response {
    let request = match parse_request(body) {
        Ok(r) => r,
        Err(e) => return fail("blob-extract", e),
    };
    tracing::debug!(
        action = "blob-extract",
        payload_bytes = request.image_data.len(),
        "processing request"
    );

    match state.service.extract_blob(request).await {
        Ok(png_bytes) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "image/png")],
            png_bytes,
        )
            .into_response(),
        Err(e) => fail("blob-extract", e),
    }
}

/// POST /features/extract - Compute a blob mask and features, returned as
/// `{blob: <base64 PNG>, features: {...}}`
pub async fn handle_features_extract(state: ExtractState, body: Value) -> Response {
    let request = match parse_request(body) {
        Ok(r) => r,
        Err(e) => return fail("features-extract", e),
    };
    tracing::debug!(
        action = "features-extract",
        payload_bytes = request.image_data.len(),
        "processing request"
    );

    match state.service.extract_features(request).await {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(e) => fail("features-extract", e),
    }
}

const BLOB_REQUEST_SCHEMA: RequestSchema = RequestSchema {
    fields: &[FieldSpec {
        name: "image_data",
        kind: FieldKind::String,
        required: true,
    }],
};

/// Build the registry of extraction actions.
pub fn extract_registry() -> ActionRegistry {
    let mut registry = ActionRegistry::new();
    registry.register(ActionDescriptor {
        name: "blob-extract",
        path: "/blob/extract",
        summary: "Compute a blob mask from an IFCB image",
        description: "Segment a base64-encoded PNG ROI and return the binary \
                      blob mask as a 1-bit PNG.",
        tags: &["blobs"],
        schema: BLOB_REQUEST_SCHEMA,
        handler: Arc::new(|state, body| Box::pin(handle_blob_extract(state, body))),
    });
    registry.register(ActionDescriptor {
        name: "features-extract",
        path: "/features/extract",
        summary: "Compute a blob mask and features from an IFCB image",
        description: "Segment a base64-encoded PNG ROI and return the blob \
                      mask together with its region measurements.",
        tags: &["blobs", "features"],
        schema: BLOB_REQUEST_SCHEMA,
        handler: Arc::new(|state, body| Box::pin(handle_features_extract(state, body))),
    });
    registry
}

/// Build extraction API routes
pub fn extract_routes(state: ExtractState) -> Router {
    extract_registry().into_router(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    async fn response_parts(e: ExtractError) -> (StatusCode, Value) {
        let response = ExtractErrorResponse::from(e).into_response();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_client_input_failures_map_to_400() {
        let (status, body) = response_parts(ExtractError::Decode("bad base64".to_string())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "decode_error");
        assert!(body["detail"].as_str().unwrap().contains("bad base64"));

        let (status, body) = response_parts(ExtractError::ImageTooLarge {
            width: 9000,
            height: 10,
            max_dim: 4096,
        })
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "image_too_large");
    }

    #[tokio::test]
    async fn test_overload_failures_map_to_503() {
        let (status, body) = response_parts(ExtractError::Saturated).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["code"], "saturated");
        assert!(body["detail"].is_string());

        let (status, body) = response_parts(ExtractError::Timeout(Duration::from_secs(30))).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["code"], "timeout");
    }

    #[tokio::test]
    async fn test_internal_failures_map_to_500_with_generic_detail() {
        for e in [
            ExtractError::Internal("pixel buffer shape mismatch".to_string()),
            ExtractError::Algorithm("index out of bounds".to_string()),
        ] {
            let (status, body) = response_parts(e).await;
            assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
            // Server-side detail must never reach the client
            assert_eq!(body["detail"], "internal processing error");
        }
    }
}
