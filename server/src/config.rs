//! Server configuration
//!
//! Configuration is loaded from environment variables; every value has a
//! working default so the server starts with no environment at all.

use std::env;
use std::time::Duration;

/// Main server configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Server bind address
    pub host: String,
    /// Server port
    pub port: u16,

    /// Extraction pipeline configuration
    pub extract: ExtractConfig,
}

/// Extraction pipeline configuration
#[derive(Debug, Clone)]
pub struct ExtractConfig {
    /// Maximum accepted image dimension (pixels per side)
    pub max_image_dim: u32,
    /// Blocking offload configuration
    pub offload: OffloadConfig,
}

/// Blocking worker pool configuration
#[derive(Debug, Clone)]
pub struct OffloadConfig {
    /// Maximum simultaneously executing CPU-bound units
    pub workers: usize,
    /// Additional units admitted beyond the executing ones; submissions
    /// past workers + queue_depth are rejected with 503
    pub queue_depth: usize,
    /// Per-request processing timeout (queue wait + execution)
    pub timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8010,
            extract: ExtractConfig::default(),
        }
    }
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            max_image_dim: 4096,
            offload: OffloadConfig::default(),
        }
    }
}

impl Default for OffloadConfig {
    fn default() -> Self {
        Self {
            workers: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4),
            queue_depth: 32,
            timeout: Duration::from_secs(30),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();

        // Server config
        if let Ok(host) = env::var("HOST") {
            config.host = host;
        }
        if let Ok(port) = env::var("PORT")
            && let Ok(p) = port.parse()
        {
            config.port = p;
        }

        // Extraction config
        if let Ok(val) = env::var("EXTRACT_MAX_IMAGE_DIM")
            && let Ok(dim) = val.parse()
        {
            config.extract.max_image_dim = dim;
        }
        if let Ok(val) = env::var("EXTRACT_WORKERS")
            && let Ok(workers) = val.parse::<usize>()
            && workers > 0
        {
            config.extract.offload.workers = workers;
        }
        if let Ok(val) = env::var("EXTRACT_QUEUE_DEPTH")
            && let Ok(depth) = val.parse()
        {
            config.extract.offload.queue_depth = depth;
        }
        if let Ok(val) = env::var("EXTRACT_TIMEOUT_SECS")
            && let Ok(secs) = val.parse::<u64>()
        {
            config.extract.offload.timeout = Duration::from_secs(secs);
        }

        config
    }
}
