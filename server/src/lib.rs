//! IFCB Features Server Library
//!
//! This module exports the server components for use in integration tests
//! and external tooling.

pub mod config;
pub mod extract;
pub mod features;

// Re-export commonly used types
pub use config::Config;
pub use extract::{ExtractService, ExtractState, extract_routes};
pub use extract::types::{BlobRequest, ExtractError, FeaturesResponse};
