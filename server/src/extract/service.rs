//! Extraction service: orchestrates codec, offload and the ROI algorithms

use std::time::Instant;

use metrics::{counter, histogram};

use crate::config::ExtractConfig;
use crate::features;

use super::codec::{self, PngBitDepth};
use super::offload::BlockingPool;
use super::types::{BlobRequest, ExtractError, FeaturesResponse};

/// Service executing the extraction actions.
///
/// Each request runs its whole decode -> algorithm -> encode sequence as a
/// single unit on the blocking pool, so the CPU-bound stretch never touches
/// the I/O threads.
pub struct ExtractService {
    pool: BlockingPool,
    max_image_dim: u32,
}

impl ExtractService {
    pub fn new(config: &ExtractConfig) -> Self {
        Self {
            pool: BlockingPool::new(&config.offload),
            max_image_dim: config.max_image_dim,
        }
    }

    /// Number of extraction requests currently in flight
    pub fn in_flight(&self) -> usize {
        self.pool.in_flight()
    }

    /// Decode, segment and re-encode as a 1-bit PNG.
    pub async fn extract_blob(&self, request: BlobRequest) -> Result<Vec<u8>, ExtractError> {
        let max_dim = self.max_image_dim;
        self.timed("blob-extract", self.pool.submit(move || {
            let pixels = codec::decode_image(&request.image_data, max_dim)?;
            let mask = features::segment_roi(&pixels);
            codec::encode_png(&mask, PngBitDepth::One)
        }))
        .await
    }

    /// Decode, segment, measure, and package mask + features.
    pub async fn extract_features(
        &self,
        request: BlobRequest,
    ) -> Result<FeaturesResponse, ExtractError> {
        let max_dim = self.max_image_dim;
        self.timed("features-extract", self.pool.submit(move || {
            let pixels = codec::decode_image(&request.image_data, max_dim)?;
            let (mask, feature_set) = features::compute_features(&pixels);
            let png_bytes = codec::encode_png(&mask, PngBitDepth::One)?;
            Ok(FeaturesResponse {
                blob: codec::to_base64(&png_bytes),
                features: feature_set,
            })
        }))
        .await
    }

    async fn timed<T>(
        &self,
        action: &'static str,
        fut: impl Future<Output = Result<T, ExtractError>>,
    ) -> Result<T, ExtractError> {
        let start = Instant::now();
        let result = fut.await;
        histogram!("ifcb_extract_duration_seconds", "action" => action).record(start.elapsed());
        if result.is_err() {
            counter!("ifcb_extract_errors_total", "action" => action).increment(1);
        }
        result
    }
}
