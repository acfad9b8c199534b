//! Common Test Utilities for Integration Tests
//!
//! Shared helpers used across integration test modules.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::Request;
use axum::response::Response;
use axum::{Json, Router, routing::get};
use ifcb_features_server::config::{ExtractConfig, OffloadConfig};
use ifcb_features_server::extract::codec::{self, PngBitDepth};
use ifcb_features_server::extract::{ExtractService, ExtractState, extract_routes};
use ndarray::Array2;
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Extraction config sized for tests: small pool, small images
pub fn test_extract_config() -> ExtractConfig {
    ExtractConfig {
        max_image_dim: 64,
        offload: OffloadConfig {
            workers: 2,
            queue_depth: 8,
            timeout: Duration::from_secs(5),
        },
    }
}

/// Create a test application router with state
pub fn create_test_app_with_state() -> (Router, ExtractState) {
    let state = ExtractState {
        service: Arc::new(ExtractService::new(&test_extract_config())),
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/health", get(health))
        .merge(extract_routes(state.clone()))
        .layer(cors);

    (app, state)
}

/// Create a test application router with all routes configured
pub fn create_test_app() -> Router {
    create_test_app_with_state().0
}

/// 10x10 grayscale ROI fixture: dark 4x4 particle on a light background,
/// returned as a base64-encoded 8-bit PNG.
pub fn test_roi_base64() -> String {
    let mut gray = Array2::from_elem((10, 10), 200u8);
    for y in 3..7 {
        for x in 3..7 {
            gray[[y, x]] = 30;
        }
    }
    let png_bytes = codec::encode_png(&gray, PngBitDepth::Eight).unwrap();
    codec::to_base64(&png_bytes)
}

/// Build a JSON POST request for an extraction action
pub fn post_json(uri: &str, payload: &serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(payload).unwrap()))
        .unwrap()
}

/// Collect a response body and parse it as JSON
pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// Collect a response body as raw bytes
pub async fn body_bytes(response: Response) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

/// Assert that PNG bytes are a 1-bit grayscale image of the given size
pub fn assert_one_bit_png(bytes: &[u8], width: u32, height: u32) {
    let decoder = png::Decoder::new(std::io::Cursor::new(bytes));
    let reader = decoder.read_info().unwrap();
    let info = reader.info();
    assert_eq!(info.bit_depth, png::BitDepth::One);
    assert_eq!(info.color_type, png::ColorType::Grayscale);
    assert_eq!(info.width, width);
    assert_eq!(info.height, height);
}
