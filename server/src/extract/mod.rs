//! Request-processing layer: codec, offload, dispatch and handlers

pub mod codec;
pub mod offload;
pub mod registry;
pub mod routes;
pub mod service;
pub mod types;

pub use offload::BlockingPool;
pub use registry::{ActionDescriptor, ActionRegistry};
pub use routes::{ExtractState, extract_registry, extract_routes};
pub use service::ExtractService;
pub use types::{ExtractError, FeatureSet, FeatureValue, MaskArray, PixelArray};
